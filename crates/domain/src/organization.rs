//! Organizations: the tenant boundary every other row is scoped to.

use common::RecordId;
use serde::{Deserialize, Serialize};

/// Billing state of an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Inactive,
}

/// A stored organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub subscription_status: SubscriptionStatus,
}

/// Insert payload for an organization.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrganization {
    pub name: String,
    pub subscription_status: SubscriptionStatus,
}

impl NewOrganization {
    /// An organization that starts with an active subscription.
    pub fn active(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subscription_status: SubscriptionStatus::Active,
        }
    }
}
