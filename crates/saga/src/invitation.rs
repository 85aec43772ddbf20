//! Invitation lifecycle manager.
//!
//! Owns sending, verification and the `pending -> accepted` transition.
//! Expiry is never written; it is evaluated against the injected clock each
//! time a pending invitation is read.

use std::sync::Arc;

use common::{Clock, RecordId};
use domain::{
    Invitation, InvitationStatus, NewInvitation, Organization, RoleName, UserProfile,
    ValidationError,
};
use resource_store::{Collection, Filter, ResourceStore, ResourceStoreExt};
use serde::Serialize;
use serde_json::json;

use crate::config::SagaConfig;
use crate::error::{Result, SagaError, StepError};
use crate::executor::{SagaExecution, Step};
use crate::resolver::RoleResolver;
use crate::services::{InvitationNotice, InvitationSender};

/// The saga type identifier for sending an invitation.
pub const SAGA_TYPE: &str = "InvitationSend";

/// Step name: create the pending invitation. Compensated by deleting it.
pub const STEP_CREATE_INVITATION: &str = "create_invitation";

/// Step name: hand the invitation to the sender.
pub const STEP_DELIVER_INVITATION: &str = "deliver_invitation";

/// Role lookup that runs before the invitation is written.
const STEP_RESOLVE_ROLE: &str = "resolve_role";

/// Input to [`InvitationManager::send`].
#[derive(Debug, Clone)]
pub struct SendInvitation {
    pub email: String,
    pub role: RoleName,
    pub organization_id: RecordId,
    pub invited_by: Option<RecordId>,
    pub job_title: Option<String>,
    pub department_id: Option<String>,
}

/// A pending invitation with its organization and role names resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedInvitation {
    pub id: RecordId,
    pub email: String,
    pub organization_id: RecordId,
    /// Empty when the organization could not be read.
    pub organization_name: String,
    pub role_id: RecordId,
    /// Empty when the role could not be read.
    pub role: String,
}

/// Manages invitation state over the resource store.
pub struct InvitationManager<S, N> {
    store: S,
    sender: N,
    roles: RoleResolver<S>,
    clock: Arc<dyn Clock>,
    config: SagaConfig,
}

impl<S, N> InvitationManager<S, N>
where
    S: ResourceStore + Clone,
    N: InvitationSender,
{
    pub fn new(store: S, sender: N, clock: Arc<dyn Clock>, config: SagaConfig) -> Self {
        let roles = RoleResolver::new(store.clone());
        Self {
            store,
            sender,
            roles,
            clock,
            config,
        }
    }

    pub fn sender(&self) -> &N {
        &self.sender
    }

    /// Creates a pending invitation and delivers it.
    ///
    /// Rejected before any write when the email already has a profile or
    /// the role is missing. If delivery fails the invitation row is
    /// deleted again.
    #[tracing::instrument(
        skip(self, request),
        fields(saga_type = SAGA_TYPE, email = %request.email, role = %request.role)
    )]
    pub async fn send(&self, request: SendInvitation) -> Result<Invitation> {
        let email = request.email.trim().to_string();
        if email.is_empty() {
            return Err(ValidationError::Missing("Email").into());
        }

        let existing: Option<UserProfile> = self
            .store
            .find_one(Collection::UserProfiles, Filter::new().eq("email", email.as_str()))
            .await?;
        if existing.is_some() {
            return Err(SagaError::EmailAlreadyRegistered { email });
        }

        let role = self
            .roles
            .resolve(request.role)
            .await
            .map_err(|e| precondition(STEP_RESOLVE_ROLE, e))?;

        let new_invitation = NewInvitation::pending(
            email.as_str(),
            request.organization_id,
            role.id,
            request.invited_by,
            self.clock.now(),
            self.config.invitation_ttl,
        );

        let store = &self.store;
        let sender = &self.sender;
        let mut saga = SagaExecution::start(SAGA_TYPE, &self.config);

        let invitation: Invitation = saga
            .execute(
                Step::new(STEP_CREATE_INVITATION, async move {
                    store
                        .create::<_, Invitation>(Collection::Invitations, &new_invitation)
                        .await
                })
                .compensate_with(move |invitation: &Invitation| {
                    let id = invitation.id;
                    Box::pin(async move {
                        store
                            .delete(Collection::Invitations, id)
                            .await
                            .map_err(StepError::from)
                    })
                }),
            )
            .await?;

        let team_member = request.role == RoleName::TeamMember;
        let notice = InvitationNotice {
            invitation_id: invitation.id,
            email: email.clone(),
            organization_id: invitation.organization_id,
            role: request.role,
            token: invitation.token.clone().unwrap_or_default(),
            redirect_to: self.config.redirect_url.clone(),
            job_title: request.job_title.filter(|_| team_member),
            department_id: request.department_id.filter(|_| team_member),
        };
        saga.execute(Step::new(STEP_DELIVER_INVITATION, async move {
            sender.send_invitation(&notice).await
        }))
        .await?;

        saga.finish()?;
        metrics::counter!("invitations_sent_total").increment(1);
        tracing::info!(
            invitation_id = %invitation.id,
            expires_at = %invitation.expires_at,
            "invitation sent"
        );

        Ok(invitation)
    }

    /// Returns the pending invitation for `email`, failing if there is none
    /// or it is past its deadline. Never writes.
    ///
    /// If several pending invitations exist for the email, the oldest wins.
    pub async fn pending_invitation(&self, email: &str) -> Result<Invitation> {
        let found: Option<Invitation> = self
            .store
            .find_one(
                Collection::Invitations,
                Filter::new()
                    .eq("email", email)
                    .eq("status", InvitationStatus::Pending.as_str()),
            )
            .await?;

        let invitation = found.ok_or_else(|| SagaError::InvitationNotFound {
            email: email.to_string(),
        })?;

        if invitation.is_expired_at(self.clock.now()) {
            metrics::counter!("invitations_expired_total").increment(1);
            tracing::info!(
                invitation_id = %invitation.id,
                expires_at = %invitation.expires_at,
                "invitation expired"
            );
            return Err(SagaError::InvitationExpired {
                email: email.to_string(),
                expired_at: invitation.expires_at,
            });
        }

        Ok(invitation)
    }

    /// Checks that a pending, unexpired invitation exists for `email`.
    ///
    /// The lookup is by email; `token` is only logged for correlation.
    #[tracing::instrument(skip(self, token), fields(token_prefix = %token.get(..8).unwrap_or(token)))]
    pub async fn verify(&self, token: &str, email: &str) -> Result<VerifiedInvitation> {
        if token.trim().is_empty() || email.trim().is_empty() {
            return Err(ValidationError::MissingFields("Token and email are required").into());
        }

        let invitation = self.pending_invitation(email.trim()).await?;

        let organization_name = match self
            .store
            .fetch::<Organization>(Collection::Organizations, invitation.organization_id)
            .await
        {
            Ok(organization) => organization.map(|o| o.name).unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read invitation organization");
                String::new()
            }
        };
        let role = match self.roles.by_id(invitation.role_id).await {
            Ok(role) => role.name,
            Err(e) => {
                tracing::warn!(error = %e, "could not read invitation role");
                String::new()
            }
        };

        Ok(VerifiedInvitation {
            id: invitation.id,
            email: invitation.email,
            organization_id: invitation.organization_id,
            organization_name,
            role_id: invitation.role_id,
            role,
        })
    }

    /// Moves a pending invitation to accepted. An already accepted
    /// invitation is returned unchanged.
    pub async fn mark_accepted(
        &self,
        invitation: &Invitation,
    ) -> std::result::Result<Invitation, StepError> {
        if !invitation.status.can_transition_to(InvitationStatus::Accepted) {
            tracing::debug!(invitation_id = %invitation.id, "invitation already accepted");
            return Ok(invitation.clone());
        }

        let patch = json!({ "status": InvitationStatus::Accepted });
        Ok(self
            .store
            .patch(Collection::Invitations, invitation.id, &patch)
            .await?)
    }
}

/// Maps a failed lookup that runs before any write.
fn precondition(step: &'static str, err: StepError) -> SagaError {
    match err {
        StepError::RoleNotFound(role) => SagaError::RoleNotFound { role },
        StepError::Store(store) => SagaError::Store(store),
        other => SagaError::StepFailed {
            step,
            source: other,
            compensation_failures: Vec::new(),
        },
    }
}
