//! Engine configuration
//!
//! Defaults come from environment variables so binaries and tests can
//! override them without code changes.

use std::time::Duration;

/// Scorer URL environment variable.
pub const SCORER_URL_ENV: &str = "PROMPTGATE_SCORER_URL";
/// Scorer timeout (whole seconds) environment variable. Zero or unparseable
/// values fall back to the default.
pub const SCORER_TIMEOUT_ENV: &str = "PROMPTGATE_SCORER_TIMEOUT_SECS";
/// Timeout applied to a scorer call when nothing else is configured.
pub const DEFAULT_SCORER_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Evaluation service endpoint used by `HttpScorer`
    pub scorer_url: Option<String>,
    /// Upper bound on one scorer call; expiry is a scoring error
    pub scorer_timeout: Duration,
    /// User agent sent by the HTTP scorer
    pub user_agent: String,
}

/// Whole seconds from an environment value; zero is rejected because it
/// would time out every scorer call.
fn parse_timeout_secs(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|secs| *secs > 0)
}

impl Default for EngineConfig {
    fn default() -> Self {
        let scorer_timeout = std::env::var(SCORER_TIMEOUT_ENV)
            .ok()
            .and_then(|raw| parse_timeout_secs(&raw))
            .unwrap_or(DEFAULT_SCORER_TIMEOUT_SECS);

        EngineConfig {
            scorer_url: std::env::var(SCORER_URL_ENV)
                .ok()
                .filter(|url| !url.trim().is_empty()),
            scorer_timeout: Duration::from_secs(scorer_timeout),
            user_agent: format!("promptgate/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Set the scorer endpoint
    pub fn with_scorer_url(mut self, url: impl Into<String>) -> Self {
        self.scorer_url = Some(url.into());
        self
    }

    /// Set the scorer timeout
    pub fn with_scorer_timeout(mut self, timeout: Duration) -> Self {
        self.scorer_timeout = timeout;
        self
    }
}
