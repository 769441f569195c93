use std::sync::Arc;

use aide::openapi::OpenApi;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    Extension,
};
use clinic_storage::{
    blob::BlobStore, news::NewsRepository, patient_image::PatientImageRepository,
};
use datadog_tracing::axum::{shutdown_signal, OtelAxumLayer, OtelInResponseLayer};
use tokio::net::TcpListener;
use tower_http::{set_header::SetResponseHeaderLayer, timeout::TimeoutLayer};

use crate::routes;
use crate::{middleware::AdminAuth, types::Environment};

/// `Cache-Control` value sent with every response
pub const NO_CACHE: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

/// Builds the application router with all dependencies attached
#[must_use]
pub fn router(
    environment: &Environment,
    news: Arc<NewsRepository>,
    patients: Arc<PatientImageRepository>,
    blob_store: Arc<dyn BlobStore>,
    admin_auth: AdminAuth,
) -> axum::Router {
    let mut openapi = OpenApi::default();

    routes::handler(environment)
        .finish_api(&mut openapi)
        .layer(Extension(openapi))
        .layer(Extension(news))
        .layer(Extension(patients))
        .layer(Extension(blob_store))
        .layer(Extension(admin_auth))
        .layer(DefaultBodyLimit::max(environment.max_upload_bytes()))
        // Responses are never cached by browsers or proxies
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(NO_CACHE),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ))
        .layer(TimeoutLayer::new(environment.request_timeout()))
}

/// Starts the server with the given environment and dependencies
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(
    environment: Environment,
    news: Arc<NewsRepository>,
    patients: Arc<PatientImageRepository>,
    blob_store: Arc<dyn BlobStore>,
) -> anyhow::Result<()> {
    let admin_auth = AdminAuth::from_environment(&environment);

    let router = router(&environment, news, patients, blob_store, admin_auth)
        // Include trace context as header into the response
        .layer(OtelInResponseLayer)
        // Start OpenTelemetry trace on incoming request
        .layer(OtelAxumLayer::default());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], environment.port()));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🔄 Clinic Backend started on http://{addr}");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(anyhow::Error::from)
}
