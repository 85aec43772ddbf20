//! Application configuration loaded from environment variables.

use std::time::Duration;

use saga::SagaConfig;

/// Path on the frontend that completes an invitation.
const ACCEPT_INVITATION_PATH: &str = "/auth/accept-invitation";

/// Output format of the `fmt` tracing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset runs in memory
/// - `FRONTEND_URL`: base URL invitation links point at
///   (default: `"http://localhost:5173"`)
/// - `SAGA_STEP_TIMEOUT_SECS`: per-step timeout, `0` disables (default: `30`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub frontend_url: String,
    pub step_timeout: Option<Duration>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or_default(),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            frontend_url: lookup("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            step_timeout: match lookup("SAGA_STEP_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok())
            {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.step_timeout,
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Where the invitation email sends the invitee.
    pub fn redirect_url(&self) -> String {
        format!(
            "{}{ACCEPT_INVITATION_PATH}",
            self.frontend_url.trim_end_matches('/')
        )
    }

    /// Saga settings derived from this configuration.
    pub fn saga_config(&self) -> SagaConfig {
        SagaConfig::default()
            .with_step_timeout(self.step_timeout)
            .with_redirect_url(self.redirect_url())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            frontend_url: "http://localhost:5173".to_string(),
            step_timeout: Some(saga::config::DEFAULT_STEP_TIMEOUT),
        }
    }
}
