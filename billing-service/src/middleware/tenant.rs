//! Tenant context extraction for multi-tenancy support.
//!
//! The organization and actor identity arrive as explicit request headers
//! set by the authenticating front end; every billing operation is scoped by
//! them rather than by any ambient session state.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use uuid::Uuid;

/// Tenant context extracted from request headers.
#[derive(Debug, Clone)]
pub struct TenantContext {
    /// Organization the request operates on.
    pub tenant_id: Uuid,
    /// User performing the request, when known.
    pub user_id: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant_id = parts
            .headers
            .get("X-Tenant-ID")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::AuthError(anyhow::anyhow!("Missing X-Tenant-ID header"))
            })?;

        let tenant_id = Uuid::parse_str(tenant_id).map_err(|_| {
            AppError::AuthError(anyhow::anyhow!("X-Tenant-ID is not a valid UUID"))
        })?;

        let user_id = parts
            .headers
            .get("X-User-ID")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let span = tracing::Span::current();
        span.record("tenant_id", tenant_id.to_string().as_str());
        if let Some(ref uid) = user_id {
            span.record("user_id", uid.as_str());
        }

        Ok(TenantContext { tenant_id, user_id })
    }
}
