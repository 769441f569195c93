use clinic_backend::{server, storage, types::Environment};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();

    // Configure logging format based on environment
    // Use JSON format for staging/production (Datadog), regular format for development
    match environment {
        Environment::Production | Environment::Staging => {
            fmt()
                .json()
                .with_env_filter(EnvFilter::from_default_env())
                .init();
        }
        Environment::Development { .. } => {
            fmt().with_env_filter(EnvFilter::from_default_env()).init();
        }
    }

    let blob_store = storage::blob_store(&environment).await;
    let news = storage::news_repository(&environment, blob_store.clone());
    let patients = storage::patient_image_repository(&environment, blob_store.clone());

    server::start(environment, news, patients, blob_store).await
}
