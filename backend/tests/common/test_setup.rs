use axum::{body::Body, http::Request, response::Response, Router};
use clinic_backend::{middleware::AdminAuth, server, types::Environment};
use clinic_storage::{
    blob::{BlobStore, InMemoryBlobStore},
    document::{MissingDocumentPolicy, RetryPolicy},
    news::NewsRepository,
    patient_image::PatientImageRepository,
};
use std::sync::Arc;
use tower::ServiceExt;

use super::utils::MULTIPART_BOUNDARY;

/// Admin token accepted by the test router
pub const TEST_ADMIN_TOKEN: &str = "test-admin-token";

/// Setup test environment with tracing
pub fn setup_test_env() {
    // Initialize tracing for tests
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// Options for [`TestSetup::with_options`]
pub struct TestOptions {
    pub admin_auth: AdminAuth,
    pub news_missing: Option<MissingDocumentPolicy<clinic_storage::news::NewsItem>>,
    pub environment: Environment,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            admin_auth: AdminAuth::new(Some(TEST_ADMIN_TOKEN.to_string()), false),
            news_missing: None,
            environment: Environment::Development {
                disable_auth: false,
            },
        }
    }
}

/// Router backed by an in-memory blob store
pub struct TestSetup {
    pub router: Router,
    pub store: Arc<InMemoryBlobStore>,
    pub news: Arc<NewsRepository>,
    pub patients: Arc<PatientImageRepository>,
}

impl TestSetup {
    pub fn new() -> Self {
        Self::with_options(TestOptions::default())
    }

    pub fn with_options(options: TestOptions) -> Self {
        setup_test_env();

        let store = Arc::new(InMemoryBlobStore::new());
        let blob_store: Arc<dyn BlobStore> = store.clone();

        let mut news_config = NewsRepository::default_config().with_retry(RetryPolicy::immediate(3));
        if let Some(missing) = options.news_missing {
            news_config = news_config.with_missing_policy(missing);
        }
        let news = Arc::new(NewsRepository::new(blob_store.clone(), news_config));

        let patients = Arc::new(PatientImageRepository::new(
            blob_store.clone(),
            PatientImageRepository::default_config().with_retry(RetryPolicy::immediate(3)),
        ));

        let router = server::router(
            &options.environment,
            news.clone(),
            patients.clone(),
            blob_store,
            options.admin_auth,
        );

        Self {
            router,
            store,
            news,
            patients,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn send_get_request(&self, route: &str) -> Response {
        let request = Request::builder()
            .uri(route)
            .method("GET")
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn send_json_request(
        &self,
        method: &str,
        route: &str,
        payload: serde_json::Value,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder()
            .uri(route)
            .method(method)
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(payload.to_string())).unwrap())
            .await
    }

    pub async fn send_post_request(&self, route: &str, payload: serde_json::Value) -> Response {
        self.send_json_request("POST", route, payload, Some(TEST_ADMIN_TOKEN))
            .await
    }

    pub async fn send_put_request(&self, route: &str, payload: serde_json::Value) -> Response {
        self.send_json_request("PUT", route, payload, Some(TEST_ADMIN_TOKEN))
            .await
    }

    pub async fn send_delete_request(&self, route: &str, token: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(route).method("DELETE");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn send_multipart_request(
        &self,
        route: &str,
        body: Vec<u8>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder()
            .uri(route)
            .method("POST")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
            );
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }
}
