//! Invitation endpoints: send, verify and accept.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use common::RecordId;
use domain::{InvitationStatus, RoleName, ValidationError};
use resource_store::ResourceStore;
use saga::{AcceptInvitation, AcceptedUser, SendInvitation, VerifiedInvitation};
use serde::{Deserialize, Serialize};

use crate::context::CallerContext;
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "job_title")]
    pub job_title: Option<String>,
    #[serde(default, alias = "department_id")]
    pub department_id: Option<String>,
}

#[derive(Deserialize)]
pub struct VerifyQuery {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct InvitationSummary {
    pub id: RecordId,
    pub email: String,
    pub expires_at: DateTime<Utc>,
    pub status: InvitationStatus,
}

#[derive(Serialize)]
pub struct InviteResponse {
    pub message: &'static str,
    pub invitation: InvitationSummary,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub message: &'static str,
    pub invitation: VerifiedInvitation,
}

#[derive(Serialize)]
pub struct AcceptResponse {
    pub message: &'static str,
    pub user: AcceptedUser,
}

// -- Handlers --

/// POST /invite/{role}: invite an email into the caller's organization.
#[tracing::instrument(skip(state, caller, req))]
pub async fn invite<S: ResourceStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(role): Path<String>,
    caller: CallerContext,
    Json(req): Json<InviteRequest>,
) -> Result<Json<InviteResponse>, ApiError> {
    let role = RoleName::from_invite_path(&role)?;
    let email = req.email.unwrap_or_default();
    if email.trim().is_empty() {
        return Err(ValidationError::Missing("Email").into());
    }
    let organization_id = caller.organization_id()?;

    let invitation = state
        .coordinator
        .invitations()
        .send(SendInvitation {
            email,
            role,
            organization_id,
            invited_by: caller.user_id,
            job_title: req.job_title,
            department_id: req.department_id,
        })
        .await?;

    Ok(Json(InviteResponse {
        message: "Invitation sent successfully",
        invitation: InvitationSummary {
            id: invitation.id,
            email: invitation.email,
            expires_at: invitation.expires_at,
            status: invitation.status,
        },
    }))
}

/// GET /invite/verify/{token}?email=: check that a pending invitation is
/// still acceptable.
#[tracing::instrument(skip(state, token, query))]
pub async fn verify<S: ResourceStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(token): Path<String>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let email = query.email.unwrap_or_default();
    let invitation = state
        .coordinator
        .invitations()
        .verify(&token, &email)
        .await?;

    Ok(Json(VerifyResponse {
        message: "Invitation is valid",
        invitation,
    }))
}

/// POST /invite/accept/{token}: create the invitee's account.
#[tracing::instrument(skip(state, token, req))]
pub async fn accept<S: ResourceStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(token): Path<String>,
    Json(req): Json<AcceptRequest>,
) -> Result<Json<AcceptResponse>, ApiError> {
    let user = state
        .coordinator
        .accept_invitation(AcceptInvitation {
            token,
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
        })
        .await?;

    Ok(Json(AcceptResponse {
        message: "Account created successfully",
        user,
    }))
}
