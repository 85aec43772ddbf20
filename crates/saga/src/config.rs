//! Saga runtime settings.

use std::time::Duration;

use domain::INVITATION_TTL_HOURS;

/// Default per-step time limit.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// Where invitation emails send the recipient by default.
pub const DEFAULT_REDIRECT_URL: &str = "http://localhost:5173/auth/accept-invitation";

/// Settings shared by every saga execution.
#[derive(Debug, Clone)]
pub struct SagaConfig {
    /// Limit for each forward step and each compensation. `None` waits
    /// forever.
    pub step_timeout: Option<Duration>,

    /// How long an invitation stays acceptable.
    pub invitation_ttl: chrono::Duration,

    /// Redirect target carried in invitation notices.
    pub redirect_url: String,
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            step_timeout: Some(DEFAULT_STEP_TIMEOUT),
            invitation_ttl: chrono::Duration::hours(INVITATION_TTL_HOURS),
            redirect_url: DEFAULT_REDIRECT_URL.to_string(),
        }
    }
}

impl SagaConfig {
    pub fn with_step_timeout(mut self, step_timeout: Option<Duration>) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    pub fn with_redirect_url(mut self, redirect_url: impl Into<String>) -> Self {
        self.redirect_url = redirect_url.into();
        self
    }

    pub fn with_invitation_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.invitation_ttl = ttl;
        self
    }
}
