//! Invitation lifecycle.
//!
//! State transitions:
//! ```text
//! pending ──(accept)──► accepted
//!    │
//!    └──(now > expires_at, evaluated on read)──► expired
//! ```
//!
//! `expired` is never written. It is derived from the stored status, the
//! stored `expires_at` and the current time, so a row stays `pending` in the
//! store after its deadline passes.

use chrono::{DateTime, Duration, Utc};
use common::RecordId;
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};

/// How long an invitation stays acceptable after it is sent.
pub const INVITATION_TTL_HOURS: i64 = 24;

const TOKEN_BYTES: usize = 20;

/// Stored status of an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    #[default]
    Pending,
    Accepted,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
        }
    }

    /// Returns true if a stored row may move from `self` to `next`.
    ///
    /// Only `pending -> accepted` exists; nothing returns to `pending`.
    pub fn can_transition_to(&self, next: InvitationStatus) -> bool {
        matches!(
            (self, next),
            (InvitationStatus::Pending, InvitationStatus::Accepted)
        )
    }
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective state of an invitation at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationState {
    Pending,
    Accepted,
    Expired,
}

impl InvitationState {
    /// Evaluates the effective state. Pure: no clock, no store.
    ///
    /// A pending invitation is expired once `now` is strictly after
    /// `expires_at`. Accepted invitations never expire.
    pub fn evaluate(
        status: InvitationStatus,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        match status {
            InvitationStatus::Accepted => InvitationState::Accepted,
            InvitationStatus::Pending if now > expires_at => InvitationState::Expired,
            InvitationStatus::Pending => InvitationState::Pending,
        }
    }
}

/// A stored invitation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: RecordId,
    pub email: String,
    pub organization_id: RecordId,
    pub role_id: RecordId,
    #[serde(default)]
    pub invited_by: Option<RecordId>,
    pub status: InvitationStatus,
    #[serde(default)]
    pub token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Invitation {
    pub fn state_at(&self, now: DateTime<Utc>) -> InvitationState {
        InvitationState::evaluate(self.status, self.expires_at, now)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == InvitationState::Expired
    }
}

/// Insert payload for an invitation.
#[derive(Debug, Clone, Serialize)]
pub struct NewInvitation {
    pub email: String,
    pub organization_id: RecordId,
    pub role_id: RecordId,
    pub invited_by: Option<RecordId>,
    pub status: InvitationStatus,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl NewInvitation {
    /// A pending invitation that expires `ttl` after `now`, with a fresh
    /// token.
    pub fn pending(
        email: impl Into<String>,
        organization_id: RecordId,
        role_id: RecordId,
        invited_by: Option<RecordId>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            email: email.into(),
            organization_id,
            role_id,
            invited_by,
            status: InvitationStatus::Pending,
            token: generate_token(),
            expires_at: now + ttl,
        }
    }
}

/// Generates a random invitation token: 20 bytes from the OS RNG, hex
/// encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sent_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn pending_until_deadline_inclusive() {
        let expires_at = sent_at() + Duration::hours(INVITATION_TTL_HOURS);

        assert_eq!(
            InvitationState::evaluate(InvitationStatus::Pending, expires_at, sent_at()),
            InvitationState::Pending
        );
        assert_eq!(
            InvitationState::evaluate(InvitationStatus::Pending, expires_at, expires_at),
            InvitationState::Pending
        );
        assert_eq!(
            InvitationState::evaluate(
                InvitationStatus::Pending,
                expires_at,
                expires_at + Duration::milliseconds(1)
            ),
            InvitationState::Expired
        );
    }

    #[test]
    fn accepted_never_expires() {
        let expires_at = sent_at();
        assert_eq!(
            InvitationState::evaluate(
                InvitationStatus::Accepted,
                expires_at,
                expires_at + Duration::days(365)
            ),
            InvitationState::Accepted
        );
    }

    #[test]
    fn only_pending_to_accepted() {
        assert!(InvitationStatus::Pending.can_transition_to(InvitationStatus::Accepted));
        assert!(!InvitationStatus::Accepted.can_transition_to(InvitationStatus::Pending));
        assert!(!InvitationStatus::Pending.can_transition_to(InvitationStatus::Pending));
    }

    #[test]
    fn new_invitation_expires_after_ttl() {
        let invitation = NewInvitation::pending(
            "jane@co.com",
            RecordId::new(),
            RecordId::new(),
            None,
            sent_at(),
            Duration::hours(INVITATION_TTL_HOURS),
        );

        assert_eq!(invitation.status, InvitationStatus::Pending);
        assert_eq!(invitation.expires_at, sent_at() + Duration::hours(24));
    }

    #[test]
    fn tokens_are_random_hex() {
        let first = generate_token();
        let second = generate_token();

        assert_eq!(first.len(), TOKEN_BYTES * 2);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(InvitationStatus::Accepted).unwrap(),
            "accepted"
        );
    }
}
