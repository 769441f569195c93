//! Admin bearer token check for mutating routes

use aide::OperationIo;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};

use crate::types::{AppError, Environment};

/// Admin credentials checked by [`AdminAccess`]
#[derive(Debug, Clone, Default)]
pub struct AdminAuth {
    /// Expected bearer token, `None` when not configured
    token: Option<String>,
    /// Skip the check entirely (development only)
    disabled: bool,
}

impl AdminAuth {
    /// Creates admin credentials from an explicit token
    #[must_use]
    pub const fn new(token: Option<String>, disabled: bool) -> Self {
        Self { token, disabled }
    }

    /// Reads `ADMIN_API_TOKEN` and `DISABLE_AUTH` for the environment
    #[must_use]
    pub fn from_environment(environment: &Environment) -> Self {
        let auth = Self::new(environment.admin_token(), environment.disable_auth());

        if auth.disabled {
            tracing::warn!("Admin authentication is disabled");
        } else if auth.token.is_none() {
            tracing::warn!("ADMIN_API_TOKEN is not set, mutating routes will be rejected");
        }

        auth
    }

    fn verify(&self, bearer: Option<&str>) -> Result<(), AppError> {
        if self.disabled {
            return Ok(());
        }

        let expected = self.token.as_deref().ok_or_else(|| {
            tracing::error!("Admin token is not configured");
            AppError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server authentication is not configured",
            )
        })?;

        let token =
            bearer.ok_or_else(|| AppError::new(StatusCode::UNAUTHORIZED, "Unauthorized"))?;

        if constant_time_eq(token.as_bytes(), expected.as_bytes()) {
            Ok(())
        } else {
            Err(AppError::new(StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

/// Compares two byte strings without short-circuiting on the first difference
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Proof that the request carried the admin bearer token
///
/// Add it as a handler argument to protect a route:
/// ```ignore
/// async fn protected_handler(
///     _admin: AdminAccess,
///     // ... other extractors
/// ) -> Result<impl IntoResponse, AppError> {
///     Ok("Protected content")
/// }
/// ```
#[derive(Debug, Clone, Copy, OperationIo)]
pub struct AdminAccess;

impl<S> FromRequestParts<S> for AdminAccess
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = parts.extensions.get::<AdminAuth>().ok_or_else(|| {
            tracing::error!("AdminAuth extension is missing");
            AppError::internal()
        })?;

        let bearer = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))
            .map(str::trim);

        auth.verify(bearer)?;
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_token() {
        let auth = AdminAuth::new(Some("secret".to_string()), false);

        assert!(auth.verify(Some("secret")).is_ok());
        assert_eq!(
            auth.verify(Some("secrets")).unwrap_err().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            auth.verify(None).unwrap_err().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_verify_without_configured_token() {
        let auth = AdminAuth::new(None, false);
        assert_eq!(
            auth.verify(Some("anything")).unwrap_err().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let disabled = AdminAuth::new(None, true);
        assert!(disabled.verify(None).is_ok());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
