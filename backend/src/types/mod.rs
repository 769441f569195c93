mod environment;
mod error;
mod extractors;

pub use environment::{Environment, MissingDocumentMode, StorageBackend};
pub use error::{ApiErrorResponse, AppError};
pub use extractors::{ListQuery, ValidatedJson};
