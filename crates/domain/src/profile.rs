//! User profiles.

use common::RecordId;
use serde::{Deserialize, Serialize};

/// Account state of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    #[default]
    Active,
    Inactive,
    Pending,
}

/// A stored user profile. The id is the one issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: RecordId,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub organization_id: Option<RecordId>,
    #[serde(default)]
    pub status: ProfileStatus,
}

/// Upsert payload for a profile.
///
/// Keyed by `id`: an existing profile is updated in place and reattached to
/// `organization_id`, otherwise a new one is created. `None` fields are left
/// out of the payload so an update keeps whatever is stored.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpsert {
    pub id: RecordId,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub organization_id: RecordId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProfileStatus>,
}
