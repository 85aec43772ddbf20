//! Tenant-owner bootstrap saga constants and payloads.

use common::RecordId;
use domain::{Organization, RoleAssignment, UserProfile, ValidationError};
use serde::{Deserialize, Serialize};

/// The saga type identifier for organization bootstrap.
pub const SAGA_TYPE: &str = "OrganizationBootstrap";

/// Step name: create the organization. Compensated by deleting it.
pub const STEP_CREATE_ORGANIZATION: &str = "create_organization";

/// Step name: attach the owner's profile to the new organization.
pub const STEP_UPSERT_PROFILE: &str = "upsert_profile";

/// Step name: resolve the superadmin role.
pub const STEP_RESOLVE_ROLE: &str = "resolve_role";

/// Step name: assign the superadmin role to the owner.
pub const STEP_ASSIGN_ROLE: &str = "assign_role";

/// The account that will own the new organization.
#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationOwner {
    /// Identity-provider id; the profile is keyed by it.
    pub id: RecordId,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Input to the bootstrap saga.
#[derive(Debug, Clone)]
pub struct BootstrapRequest {
    pub owner: OrganizationOwner,
    pub organization_name: String,
}

impl BootstrapRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.organization_name.trim().is_empty() {
            return Err(ValidationError::Missing("Organization name"));
        }
        if self.owner.email.trim().is_empty() {
            return Err(ValidationError::Missing("Email"));
        }
        Ok(())
    }
}

/// Rows written by a successful bootstrap.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapOutcome {
    pub organization: Organization,
    pub user_profile: UserProfile,
    pub role_assignment: RoleAssignment,
}
