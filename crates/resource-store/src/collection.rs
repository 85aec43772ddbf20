//! The closed set of collections the back office writes to.

use serde::{Deserialize, Serialize};

/// A named resource collection.
///
/// Collection names double as SQL table names, so the set is closed:
/// nothing outside this enum is ever interpolated into a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Organizations,
    UserProfiles,
    Roles,
    RoleAssignments,
    Properties,
    Units,
    Invitations,
}

impl Collection {
    /// Every collection, in dependency order.
    pub const ALL: [Collection; 7] = [
        Collection::Organizations,
        Collection::UserProfiles,
        Collection::Roles,
        Collection::RoleAssignments,
        Collection::Properties,
        Collection::Units,
        Collection::Invitations,
    ];

    /// Returns the backing table name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Organizations => "organizations",
            Collection::UserProfiles => "user_profiles",
            Collection::Roles => "roles",
            Collection::RoleAssignments => "user_roles",
            Collection::Properties => "properties",
            Collection::Units => "units",
            Collection::Invitations => "organization_invitations",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
