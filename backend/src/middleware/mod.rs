/// Admin bearer token check
pub mod auth;

pub use auth::{AdminAccess, AdminAuth};
