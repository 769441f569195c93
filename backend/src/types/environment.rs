//! Environment configuration for different deployment stages

use std::env;
use std::str::FromStr;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};
use clinic_storage::document::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
use strum::{Display, EnumString};

/// Default listen port
const DEFAULT_PORT: u16 = 8001;

/// Default request timeout
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default limit for multipart uploads: 10 MiB
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Object store implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StorageBackend {
    /// Amazon S3 (or LocalStack in development)
    S3,
    /// Process-local map, contents are lost on restart
    Memory,
}

/// What a collection read does when the collection document is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MissingDocumentMode {
    /// Write the collection's initial items and return them
    Initialize,
    /// Return an empty collection without writing
    ReturnEmpty,
}

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack` or the in-memory store)
    Development {
        /// Skip the admin bearer token check
        disable_auth: bool,
    },
}

/// Reads and parses an environment variable, falling back to `default` when unset or invalid
fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|val| val.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development {
                disable_auth: parse_var("DISABLE_AUTH", false),
            },
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Returns the S3 bucket name for the environment
    ///
    /// # Panics
    ///
    /// Panics if the `S3_BUCKET_NAME` environment variable is not set outside development
    #[must_use]
    pub fn s3_bucket(&self) -> String {
        match self {
            Self::Production | Self::Staging => {
                env::var("S3_BUCKET_NAME").expect("S3_BUCKET_NAME environment variable is not set")
            }
            Self::Development { .. } => {
                env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "clinic-site".to_string())
            }
        }
    }

    /// URL prefix under which stored objects are publicly reachable
    #[must_use]
    pub fn blob_public_base_url(&self) -> String {
        env::var("BLOB_PUBLIC_BASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| match self.override_aws_endpoint_url() {
                Some(endpoint) => format!("{endpoint}/{}", self.s3_bucket()),
                None => format!("https://{}.s3.amazonaws.com", self.s3_bucket()),
            })
    }

    /// Object store implementation to use
    ///
    /// # Panics
    ///
    /// Panics if the in-memory store is requested outside development
    #[must_use]
    pub fn storage_backend(&self) -> StorageBackend {
        let backend = parse_var("STORAGE_BACKEND", StorageBackend::S3);

        if backend == StorageBackend::Memory && !matches!(self, Self::Development { .. }) {
            panic!("STORAGE_BACKEND=memory is only allowed in development");
        }

        backend
    }

    /// Bearer token required by mutating routes, `None` when not configured
    #[must_use]
    pub fn admin_token(&self) -> Option<String> {
        env::var("ADMIN_API_TOKEN")
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    /// Whether the admin token check is skipped
    #[must_use]
    pub const fn disable_auth(&self) -> bool {
        matches!(self, Self::Development { disable_auth: true })
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development { .. } | Self::Staging)
    }

    /// Missing document behaviour of the news collection
    #[must_use]
    pub fn news_missing_document(&self) -> MissingDocumentMode {
        parse_var("NEWS_MISSING_DOCUMENT", MissingDocumentMode::Initialize)
    }

    /// Missing document behaviour of the patient image collection
    #[must_use]
    pub fn patients_missing_document(&self) -> MissingDocumentMode {
        parse_var("PATIENTS_MISSING_DOCUMENT", MissingDocumentMode::ReturnEmpty)
    }

    /// Whether collection writes carry a version precondition
    #[must_use]
    pub fn conditional_writes(&self) -> bool {
        parse_var("CONDITIONAL_WRITES", true)
    }

    /// Retry policy for collection document writes
    #[must_use]
    pub fn write_retry_policy(&self) -> RetryPolicy {
        let base_delay_ms = parse_var(
            "WRITE_RETRY_BASE_DELAY_MS",
            u64::try_from(DEFAULT_BASE_DELAY.as_millis()).unwrap_or(1_000),
        );

        RetryPolicy {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(base_delay_ms),
        }
    }

    /// Timeout applied to every HTTP request
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(parse_var(
            "REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        ))
    }

    /// Maximum accepted request body size for uploads
    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        parse_var("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)
    }

    /// Port the HTTP server listens on
    #[must_use]
    pub fn port(&self) -> u16 {
        parse_var("PORT", DEFAULT_PORT)
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
            Self::Development { .. } => Some("http://localhost:4566"),
        }
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// AWS S3 service configuration
    pub async fn s3_client_config(&self) -> aws_sdk_s3::Config {
        let aws_config = self.aws_config().await;
        let s3_config: aws_sdk_s3::Config = (&aws_config).into();
        let mut builder = s3_config.to_builder();

        // Override "force path style" to true for compatibility with LocalStack
        // https://github.com/awslabs/aws-sdk-rust/discussions/874
        if matches!(self, Self::Development { .. }) {
            builder.set_force_path_style(Some(true));
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_vars() {
        for name in [
            "APP_ENV",
            "DISABLE_AUTH",
            "STORAGE_BACKEND",
            "ADMIN_API_TOKEN",
            "NEWS_MISSING_DOCUMENT",
            "PATIENTS_MISSING_DOCUMENT",
            "S3_BUCKET_NAME",
            "BLOB_PUBLIC_BASE_URL",
            "WRITE_RETRY_BASE_DELAY_MS",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn test_environment_from_env() {
        clear_vars();

        // Test development (default)
        assert_eq!(
            Environment::from_env(),
            Environment::Development {
                disable_auth: false
            }
        );

        // Test development with auth disabled
        env::set_var("APP_ENV", "development");
        env::set_var("DISABLE_AUTH", "true");
        let environment = Environment::from_env();
        assert!(environment.disable_auth());

        // Test staging
        env::set_var("APP_ENV", "staging");
        assert_eq!(Environment::from_env(), Environment::Staging);
        assert!(!Environment::Staging.disable_auth());

        // Test production
        env::set_var("APP_ENV", "Production");
        assert_eq!(Environment::from_env(), Environment::Production);

        clear_vars();
    }

    #[test]
    #[serial]
    #[should_panic(expected = "Invalid environment: invalid")]
    fn test_invalid_environment() {
        env::set_var("APP_ENV", "invalid");
        let _ = Environment::from_env();
    }

    #[test]
    #[serial]
    fn test_missing_document_modes() {
        clear_vars();
        let environment = Environment::Development {
            disable_auth: false,
        };

        assert_eq!(
            environment.news_missing_document(),
            MissingDocumentMode::Initialize
        );
        assert_eq!(
            environment.patients_missing_document(),
            MissingDocumentMode::ReturnEmpty
        );

        env::set_var("NEWS_MISSING_DOCUMENT", "return_empty");
        env::set_var("PATIENTS_MISSING_DOCUMENT", "INITIALIZE");
        assert_eq!(
            environment.news_missing_document(),
            MissingDocumentMode::ReturnEmpty
        );
        assert_eq!(
            environment.patients_missing_document(),
            MissingDocumentMode::Initialize
        );

        // Invalid values fall back to the default
        env::set_var("NEWS_MISSING_DOCUMENT", "sometimes");
        assert_eq!(
            environment.news_missing_document(),
            MissingDocumentMode::Initialize
        );

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_admin_token() {
        clear_vars();
        let environment = Environment::Production;
        assert_eq!(environment.admin_token(), None);

        env::set_var("ADMIN_API_TOKEN", "   ");
        assert_eq!(environment.admin_token(), None);

        env::set_var("ADMIN_API_TOKEN", " secret ");
        assert_eq!(environment.admin_token(), Some("secret".to_string()));

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_storage_settings() {
        clear_vars();
        let environment = Environment::Development {
            disable_auth: false,
        };

        assert_eq!(environment.storage_backend(), StorageBackend::S3);
        assert_eq!(
            environment.blob_public_base_url(),
            "http://localhost:4566/clinic-site"
        );

        env::set_var("STORAGE_BACKEND", "memory");
        assert_eq!(environment.storage_backend(), StorageBackend::Memory);

        env::set_var("S3_BUCKET_NAME", "vet-prod");
        assert_eq!(
            Environment::Production.blob_public_base_url(),
            "https://vet-prod.s3.amazonaws.com"
        );

        env::set_var("BLOB_PUBLIC_BASE_URL", "https://cdn.example.com");
        assert_eq!(
            Environment::Production.blob_public_base_url(),
            "https://cdn.example.com"
        );

        clear_vars();
    }

    #[test]
    #[serial]
    #[should_panic(expected = "only allowed in development")]
    fn test_memory_storage_rejected_in_production() {
        clear_vars();
        env::set_var("STORAGE_BACKEND", "memory");
        let _ = Environment::Production.storage_backend();
    }

    #[test]
    #[serial]
    fn test_write_retry_policy() {
        clear_vars();
        let environment = Environment::Staging;
        assert_eq!(
            environment.write_retry_policy(),
            RetryPolicy::default()
        );

        env::set_var("WRITE_RETRY_BASE_DELAY_MS", "10");
        assert_eq!(
            environment.write_retry_policy().base_delay,
            Duration::from_millis(10)
        );

        clear_vars();
    }
}
