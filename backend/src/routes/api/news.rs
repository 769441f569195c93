use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use clinic_storage::news::{parse_news_date, NewNewsItem, NewsItem, NewsRepository, NewsUpdate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use super::SuccessResponse;
use crate::{
    middleware::AdminAccess,
    types::{AppError, ListQuery, ValidatedJson},
};

/// A news post
#[derive(Debug, Serialize, JsonSchema)]
pub struct NewsItemResponse {
    /// String-encoded creation timestamp in milliseconds
    pub id: String,
    /// Headline
    pub title: String,
    /// Body text
    pub content: String,
    /// Publication date (ISO-8601, UTC)
    pub date: String,
}

impl From<NewsItem> for NewsItemResponse {
    fn from(item: NewsItem) -> Self {
        Self {
            id: item.id,
            title: item.title,
            content: item.content,
            date: item.date.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Request to create a news post
#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct CreateNewsRequest {
    /// Headline
    #[serde(default)]
    #[validate(length(min = 1, message = "Title and content are required"))]
    pub title: String,

    /// Body text
    #[serde(default)]
    #[validate(length(min = 1, message = "Title and content are required"))]
    pub content: String,

    /// Publication date, RFC 3339 or `YYYY-MM-DD`. Defaults to now when missing or blank.
    #[serde(default)]
    pub date: Option<String>,
}

/// Request to change a news post. Omitted fields keep their value.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct UpdateNewsRequest {
    /// New headline
    #[serde(default)]
    pub title: Option<String>,

    /// New body text
    #[serde(default)]
    pub content: Option<String>,
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, AppError> {
    parse_news_date(value).ok_or_else(|| AppError::bad_request("Invalid date"))
}

/// List news posts
///
/// Returns posts newest first, truncated to `limit` when given.
/// Storage failures yield an empty list.
#[instrument(skip_all)]
pub async fn list_news(
    Extension(news): Extension<Arc<NewsRepository>>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<NewsItemResponse>> {
    let items = news.get_latest(query.limit()).await;
    Json(items.into_iter().map(NewsItemResponse::from).collect())
}

/// Get a news post by ID
///
/// # Errors
///
/// Returns `404 NOT_FOUND` if no post has the ID
#[instrument(skip_all, fields(id = %id))]
pub async fn get_news(
    Extension(news): Extension<Arc<NewsRepository>>,
    Path(id): Path<String>,
) -> Result<Json<NewsItemResponse>, AppError> {
    news.get_by_id(&id)
        .await
        .map(|item| Json(item.into()))
        .ok_or_else(|| AppError::not_found("News not found"))
}

/// Create a news post
///
/// # Returns
///
/// Returns `201 CREATED` with the stored post
///
/// # Errors
///
/// Returns an error if:
/// - `400 BAD_REQUEST` - Title or content missing, or the date is invalid
/// - `401 UNAUTHORIZED` - Invalid or missing admin token
/// - `409 CONFLICT` - The collection was modified concurrently
/// - `500 INTERNAL_SERVER_ERROR` - The collection could not be persisted
#[instrument(skip_all)]
pub async fn create_news(
    _admin: AdminAccess,
    Extension(news): Extension<Arc<NewsRepository>>,
    ValidatedJson(payload): ValidatedJson<CreateNewsRequest>,
) -> Result<(StatusCode, Json<NewsItemResponse>), AppError> {
    let date = payload
        .date
        .as_deref()
        .map(str::trim)
        .filter(|date| !date.is_empty())
        .map(parse_date)
        .transpose()?;

    let item = news
        .create(NewNewsItem {
            title: payload.title,
            content: payload.content,
            date,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(item.into())))
}

/// Update a news post
///
/// Replaces the title and/or content. The date is kept.
///
/// # Errors
///
/// Returns an error if:
/// - `400 BAD_REQUEST` - Neither title nor content given
/// - `401 UNAUTHORIZED` - Invalid or missing admin token
/// - `404 NOT_FOUND` - No post has the ID
/// - `409 CONFLICT` - The collection was modified concurrently
/// - `500 INTERNAL_SERVER_ERROR` - The collection could not be persisted
#[instrument(skip_all, fields(id = %id))]
pub async fn update_news(
    _admin: AdminAccess,
    Extension(news): Extension<Arc<NewsRepository>>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateNewsRequest>,
) -> Result<Json<NewsItemResponse>, AppError> {
    let update = NewsUpdate {
        title: payload.title,
        content: payload.content,
    };

    if update.is_empty() {
        return Err(AppError::bad_request("Nothing to update"));
    }

    let item = news.update(&id, update).await?;
    Ok(Json(item.into()))
}

/// Delete a news post
///
/// # Errors
///
/// Returns an error if:
/// - `401 UNAUTHORIZED` - Invalid or missing admin token
/// - `404 NOT_FOUND` - No post has the ID
/// - `409 CONFLICT` - The collection was modified concurrently
/// - `500 INTERNAL_SERVER_ERROR` - The collection could not be persisted
#[instrument(skip_all, fields(id = %id))]
pub async fn delete_news(
    _admin: AdminAccess,
    Extension(news): Extension<Arc<NewsRepository>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    news.delete(&id).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const MISSING_FIELDS_MESSAGE: &str = "Title and content are required";

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2025-01-10T08:30:00+01:00").unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 10, 7, 30, 0).unwrap()
        );
        assert_eq!(
            parse_date("2025-01-10").unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap()
        );
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn test_response_date_format() {
        let item = NewsItem {
            id: "1".to_string(),
            title: "t".to_string(),
            content: "c".to_string(),
            date: Utc.with_ymd_and_hms(2024, 12, 1, 12, 0, 0).unwrap(),
        };
        assert_eq!(
            NewsItemResponse::from(item).date,
            "2024-12-01T12:00:00.000Z"
        );
    }

    #[test]
    fn test_create_request_requires_title_and_content() {
        let request: CreateNewsRequest =
            serde_json::from_value(serde_json::json!({ "title": "A" })).unwrap();
        let errors = request.validate().unwrap_err();
        let field_errors = errors.field_errors();
        assert!(field_errors.contains_key("content"));
        assert_eq!(
            field_errors["content"][0].message.as_deref(),
            Some(MISSING_FIELDS_MESSAGE)
        );
    }
}
