//! Rental provisioning endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use domain::PropertyWithUnits;
use resource_store::ResourceStore;
use saga::RentalRequest;

use crate::context::CallerContext;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /rentals: create a property with its units in the caller's
/// organization. Responds with the stored property and nested units.
#[tracing::instrument(skip(state, caller, req), fields(units = req.units.len()))]
pub async fn create<S: ResourceStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: CallerContext,
    Json(req): Json<RentalRequest>,
) -> Result<(StatusCode, Json<PropertyWithUnits>), ApiError> {
    let organization_id = caller.organization_id()?;
    let rental = state
        .coordinator
        .provision_rental(organization_id, req)
        .await?;

    Ok((StatusCode::CREATED, Json(rental)))
}
