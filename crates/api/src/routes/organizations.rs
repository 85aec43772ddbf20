//! Organization bootstrap endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::RecordId;
use resource_store::ResourceStore;
use saga::{BootstrapOutcome, BootstrapRequest, OrganizationOwner};
use serde::Deserialize;

use crate::context::CallerContext;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct OwnerInput {
    /// Optional echo of the caller's id; must match `x-user-id` if sent.
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Deserialize)]
pub struct OrganizationInput {
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateOrganizationRequest {
    pub user: OwnerInput,
    pub organization: OrganizationInput,
}

/// POST /organizations: create an organization owned by the calling
/// identity and make them its superadmin.
///
/// The owner is always the caller from `x-user-id`. A body `user.id` naming
/// anyone else is refused.
#[tracing::instrument(skip(state, caller, req))]
pub async fn create<S: ResourceStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: CallerContext,
    Json(req): Json<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<BootstrapOutcome>), ApiError> {
    let owner_id = caller.require_user_id()?;
    if let Some(claimed) = req.user.id
        && claimed != owner_id
    {
        tracing::warn!(%owner_id, %claimed, "organization owner does not match caller");
        return Err(ApiError::Forbidden(
            "Cannot create an organization for another user".to_string(),
        ));
    }

    let outcome = state
        .coordinator
        .bootstrap_organization(BootstrapRequest {
            owner: OrganizationOwner {
                id: owner_id,
                email: req.user.email,
                first_name: req.user.first_name,
                last_name: req.user.last_name,
            },
            organization_name: req.organization.name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}
