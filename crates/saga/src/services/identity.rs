//! Identity provider trait and in-memory implementation.
//!
//! Credentials live outside the resource store. The provider issues the id
//! that the user's profile is keyed by.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use common::RecordId;
use thiserror::Error;

/// Shortest password the in-memory provider accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

/// A sign-up request.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub invitation_id: RecordId,
    pub organization_id: RecordId,
}

/// An identity created by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: RecordId,
    pub email: String,
}

/// Reasons the provider refuses a sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("User already registered")]
    EmailTaken,

    #[error("{0}")]
    Rejected(String),
}

/// Trait for the external authenticator.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates an identity for the given credentials.
    async fn sign_up(&self, request: SignUp) -> Result<Identity, IdentityError>;
}

#[derive(Debug, Default)]
struct InMemoryIdentityState {
    identities: HashMap<String, Identity>,
    fail_on_sign_up: bool,
}

/// In-memory identity provider for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityProvider {
    state: Arc<RwLock<InMemoryIdentityState>>,
}

impl InMemoryIdentityProvider {
    /// Creates a new in-memory identity provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the provider to reject every sign-up.
    pub fn set_fail_on_sign_up(&self, fail: bool) {
        self.write().fail_on_sign_up = fail;
    }

    /// Returns the number of identities created.
    pub fn identity_count(&self) -> usize {
        self.read().identities.len()
    }

    /// Returns true if an identity exists for the email.
    pub fn has_identity(&self, email: &str) -> bool {
        self.read().identities.contains_key(&email.to_lowercase())
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryIdentityState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryIdentityState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_up(&self, request: SignUp) -> Result<Identity, IdentityError> {
        let mut state = self.write();

        if state.fail_on_sign_up {
            return Err(IdentityError::Rejected(
                "Identity provider unavailable".to_string(),
            ));
        }
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::Rejected(format!(
                "Password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let key = request.email.to_lowercase();
        if state.identities.contains_key(&key) {
            return Err(IdentityError::EmailTaken);
        }

        let identity = Identity {
            id: RecordId::new(),
            email: request.email,
        };
        state.identities.insert(key, identity.clone());
        Ok(identity)
    }
}
