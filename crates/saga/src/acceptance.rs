//! Invitation acceptance saga constants and payloads.
//!
//! Only the first two steps are fatal. The tail (role lookup, role
//! assignment, marking the invitation accepted) is best-effort: the account
//! must exist even if that bookkeeping fails.

use common::RecordId;
use domain::ValidationError;
use serde::Serialize;

/// The saga type identifier for invitation acceptance.
pub const SAGA_TYPE: &str = "InvitationAcceptance";

/// Step name: create the identity. Fatal.
pub const STEP_CREATE_IDENTITY: &str = "create_identity";

/// Step name: upsert the profile keyed by the identity id. Fatal.
pub const STEP_UPSERT_PROFILE: &str = "upsert_profile";

/// Step name: resolve the invited role. Best-effort.
pub const STEP_RESOLVE_ROLE: &str = "resolve_role";

/// Step name: assign the invited role. Best-effort.
pub const STEP_ASSIGN_ROLE: &str = "assign_role";

/// Step name: flip the invitation to accepted. Best-effort.
pub const STEP_MARK_ACCEPTED: &str = "mark_accepted";

/// Input to the acceptance saga.
#[derive(Debug, Clone)]
pub struct AcceptInvitation {
    /// Correlation only; the invitation is looked up by email.
    pub token: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl AcceptInvitation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("Token", &self.token),
            ("Email", &self.email),
            ("Password", &self.password),
            ("First name", &self.first_name),
            ("Last name", &self.last_name),
        ];
        match required.into_iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(ValidationError::Missing(field)),
            None => Ok(()),
        }
    }
}

/// The account created by a successful acceptance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptedUser {
    pub id: RecordId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub organization_id: RecordId,
    /// Empty when the best-effort role lookup failed.
    pub role: String,
}
