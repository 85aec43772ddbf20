//! Roles and role assignments.

use std::str::FromStr;

use common::RecordId;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// The fixed set of role names seeded into the roles table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleName {
    Superadmin,
    TeamMember,
    Tenant,
    Vendor,
    Owner,
}

impl RoleName {
    pub const ALL: [RoleName; 5] = [
        RoleName::Superadmin,
        RoleName::TeamMember,
        RoleName::Tenant,
        RoleName::Vendor,
        RoleName::Owner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Superadmin => "superadmin",
            RoleName::TeamMember => "team_member",
            RoleName::Tenant => "tenant",
            RoleName::Vendor => "vendor",
            RoleName::Owner => "owner",
        }
    }

    /// Maps the `/invite/{role}` path segment onto a role.
    ///
    /// Only the invitable roles are accepted; `team` is the path alias for
    /// `team_member`.
    pub fn from_invite_path(segment: &str) -> Result<Self, ValidationError> {
        match segment {
            "team" | "team_member" => Ok(RoleName::TeamMember),
            "tenant" => Ok(RoleName::Tenant),
            "vendor" => Ok(RoleName::Vendor),
            "owner" => Ok(RoleName::Owner),
            other => Err(ValidationError::UnknownRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for RoleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleName::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownRole(s.to_string()))
    }
}

/// A stored role. Names are matched exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RecordId,
    pub name: String,
}

/// Links a profile to a role within an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: RecordId,
    pub user_id: RecordId,
    pub role_id: RecordId,
    pub organization_id: RecordId,
}

/// Insert payload for a role assignment.
#[derive(Debug, Clone, Serialize)]
pub struct NewRoleAssignment {
    pub user_id: RecordId,
    pub role_id: RecordId,
    pub organization_id: RecordId,
}
