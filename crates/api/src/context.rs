//! Caller identity forwarded by the authenticating gateway.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::RecordId;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ORGANIZATION_ID_HEADER: &str = "x-organization-id";

/// Who is calling, as asserted by the gateway. Both ids are optional at
/// extraction; endpoints that need an organization call
/// [`CallerContext::organization_id`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CallerContext {
    pub user_id: Option<RecordId>,
    organization_id: Option<RecordId>,
}

impl CallerContext {
    /// The calling user, required by endpoints that act on their own
    /// account.
    pub fn require_user_id(&self) -> Result<RecordId, ApiError> {
        self.user_id
            .ok_or_else(|| ApiError::BadRequest("User ID is required".to_string()))
    }

    /// The caller's organization, required by org-scoped endpoints.
    pub fn organization_id(&self) -> Result<RecordId, ApiError> {
        self.organization_id
            .ok_or_else(|| ApiError::BadRequest("Organization ID is required".to_string()))
    }
}

fn header_id(parts: &Parts, name: &str) -> Result<Option<RecordId>, ApiError> {
    let Some(value) = parts.headers.get(name) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {name} header")))?
        .trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|e| ApiError::BadRequest(format!("Invalid {name} header: {e}")))
}

impl<S: Send + Sync> FromRequestParts<S> for CallerContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            user_id: header_id(parts, USER_ID_HEADER)?,
            organization_id: header_id(parts, ORGANIZATION_ID_HEADER)?,
        })
    }
}
