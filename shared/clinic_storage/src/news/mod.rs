//! News posts shown on the public site

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::blob::BlobStore;
use crate::document::{
    CollectionConfig, Document, DocumentRepository, DocumentStorageResult, InsertPosition,
    MissingDocumentPolicy, RetryPolicy,
};

/// Prefix holding the collection documents
pub const DATA_PREFIX: &str = "data/";

/// Pathname of the news document
pub const NEWS_DOCUMENT_PATH: &str = "data/news.json";

/// 2024-12-01T12:00:00Z
const FIRST_DEFAULT_TIMESTAMP: i64 = 1_733_054_400;

/// 2024-11-15T10:30:00Z
const SECOND_DEFAULT_TIMESTAMP: i64 = 1_731_666_600;

/// Parses a news date: RFC 3339, or a plain `YYYY-MM-DD` date taken as midnight UTC
#[must_use]
pub fn parse_news_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
}

/// Stored documents may hold date-only values
fn deserialize_news_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_news_date(&value)
        .ok_or_else(|| de::Error::custom(format!("invalid news date: {value}")))
}

/// A news post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    /// String-encoded creation timestamp in milliseconds
    pub id: String,
    /// Headline
    pub title: String,
    /// Body text
    pub content: String,
    /// Publication date
    #[serde(deserialize_with = "deserialize_news_date")]
    pub date: DateTime<Utc>,
}

impl Document for NewsItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
}

/// Fields of a news post to create
#[derive(Debug, Clone)]
pub struct NewNewsItem {
    /// Headline
    pub title: String,
    /// Body text
    pub content: String,
    /// Publication date, defaults to now
    pub date: Option<DateTime<Utc>>,
}

/// Fields of a news post to replace. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct NewsUpdate {
    /// New headline
    pub title: Option<String>,
    /// New body text
    pub content: Option<String>,
}

impl NewsUpdate {
    /// Whether the update would change nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

/// Items written when the news document does not exist yet
#[must_use]
pub fn default_news() -> Vec<NewsItem> {
    vec![
        NewsItem {
            id: "1".to_string(),
            title: "Zmiana godzin przyjęć w okresie świątecznym".to_string(),
            content: "Informujemy, że w dniach 24-26 grudnia przychodnia będzie nieczynna. \
                      W dniach 27-31 grudnia przyjmujemy w godzinach 10-14."
                .to_string(),
            date: DateTime::from_timestamp(FIRST_DEFAULT_TIMESTAMP, 0).unwrap_or_default(),
        },
        NewsItem {
            id: "2".to_string(),
            title: "Nowa usługa - badania USG".to_string(),
            content: "Z przyjemnością informujemy, że od stycznia 2025 roku rozszerzamy naszą \
                      ofertę o szczegółowe badania USG. Zapraszamy do zapisów."
                .to_string(),
            date: DateTime::from_timestamp(SECOND_DEFAULT_TIMESTAMP, 0).unwrap_or_default(),
        },
    ]
}

/// Storage for news posts
pub struct NewsRepository {
    documents: DocumentRepository<NewsItem>,
}

impl NewsRepository {
    /// Default collection settings: appended items, initialized with [`default_news`]
    #[must_use]
    pub fn default_config() -> CollectionConfig<NewsItem> {
        CollectionConfig {
            name: "news",
            prefix: DATA_PREFIX.to_string(),
            path: NEWS_DOCUMENT_PATH.to_string(),
            missing: MissingDocumentPolicy::Initialize(default_news()),
            insert_at: InsertPosition::Append,
            retry: RetryPolicy::default(),
            conditional_writes: true,
        }
    }

    /// Creates a repository with custom collection settings
    #[must_use]
    pub fn new(store: Arc<dyn BlobStore>, config: CollectionConfig<NewsItem>) -> Self {
        Self {
            documents: DocumentRepository::new(store, config),
        }
    }

    /// All posts, newest first. Read failures yield an empty list.
    pub async fn get_all(&self) -> Vec<NewsItem> {
        self.documents.get_all().await
    }

    /// The `limit` newest posts
    pub async fn get_latest(&self, limit: Option<usize>) -> Vec<NewsItem> {
        self.documents.get_latest(limit).await
    }

    /// Post with the given id
    pub async fn get_by_id(&self, id: &str) -> Option<NewsItem> {
        self.documents.get_by_id(id).await
    }

    /// Appends a new post
    ///
    /// # Errors
    ///
    /// Returns `DocumentStorageError` if the collection cannot be read or persisted
    pub async fn create(&self, news: NewNewsItem) -> DocumentStorageResult<NewsItem> {
        let date = news.date.unwrap_or_else(Utc::now);
        self.documents
            .create(|id| NewsItem {
                id,
                title: news.title,
                content: news.content,
                date,
            })
            .await
    }

    /// Replaces the title and/or content of a post
    ///
    /// # Errors
    ///
    /// Returns `DocumentStorageError::NotFound` if the post does not exist
    pub async fn update(&self, id: &str, update: NewsUpdate) -> DocumentStorageResult<NewsItem> {
        self.documents
            .update(id, |item| {
                if let Some(title) = update.title {
                    item.title = title;
                }
                if let Some(content) = update.content {
                    item.content = content;
                }
            })
            .await
    }

    /// Removes a post
    ///
    /// # Errors
    ///
    /// Returns `DocumentStorageError::NotFound` if the post does not exist
    pub async fn delete(&self, id: &str) -> DocumentStorageResult<NewsItem> {
        self.documents.delete(id).await
    }
}
