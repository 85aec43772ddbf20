//! Invitation delivery trait and in-memory implementation.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use common::RecordId;
use domain::RoleName;
use thiserror::Error;

/// What the sender needs to deliver one invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationNotice {
    pub invitation_id: RecordId,
    pub email: String,
    pub organization_id: RecordId,
    pub role: RoleName,
    pub token: String,
    pub redirect_to: String,
    /// Team-member metadata; `None` for other roles.
    pub job_title: Option<String>,
    pub department_id: Option<String>,
}

/// Delivery failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("Failed to send invitation to {email}: {reason}")]
    Failed { email: String, reason: String },
}

/// Trait for the outbound invitation channel.
#[async_trait]
pub trait InvitationSender: Send + Sync {
    /// Hands the invitation to the delivery channel.
    async fn send_invitation(&self, notice: &InvitationNotice) -> Result<(), DeliveryError>;
}

#[derive(Debug, Default)]
struct InMemorySenderState {
    sent: Vec<InvitationNotice>,
    fail_on_send: bool,
}

/// In-memory sender that records notices and logs them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInvitationSender {
    state: Arc<RwLock<InMemorySenderState>>,
}

impl InMemoryInvitationSender {
    /// Creates a new in-memory sender.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the sender to fail every delivery.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.write().fail_on_send = fail;
    }

    /// Returns the number of notices delivered.
    pub fn sent_count(&self) -> usize {
        self.read().sent.len()
    }

    /// Returns the most recent notice, if any.
    pub fn last_notice(&self) -> Option<InvitationNotice> {
        self.read().sent.last().cloned()
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemorySenderState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemorySenderState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl InvitationSender for InMemoryInvitationSender {
    async fn send_invitation(&self, notice: &InvitationNotice) -> Result<(), DeliveryError> {
        let mut state = self.write();

        if state.fail_on_send {
            return Err(DeliveryError::Failed {
                email: notice.email.clone(),
                reason: "mail service unavailable".to_string(),
            });
        }

        tracing::info!(
            invitation_id = %notice.invitation_id,
            email = %notice.email,
            role = %notice.role,
            redirect_to = %notice.redirect_to,
            "invitation delivered"
        );
        state.sent.push(notice.clone());
        Ok(())
    }
}
