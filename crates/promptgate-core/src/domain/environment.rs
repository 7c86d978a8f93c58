//! Environment slots and promotion outcomes.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use promptgate_state::VersionId;
use serde::{Deserialize, Serialize};

use super::error::PromptGateError;

/// A named slot a version can occupy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = PromptGateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(PromptGateError::UnknownEnvironment(other.to_string())),
        }
    }
}

/// Result of a committed publish.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishOutcome {
    /// The new production version.
    pub production: VersionId,
    /// Its average evaluation score.
    pub score: f64,
    /// Production before this publish.
    pub previous: Option<VersionId>,
    pub published_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse_accepts_prod_alias() {
        assert_eq!(
            "staging".parse::<Environment>().unwrap(),
            Environment::Staging
        );
        assert_eq!(
            "PROD".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
    }

    #[test]
    fn test_environment_parse_unknown() {
        let err = "canary".parse::<Environment>().unwrap_err();
        assert!(matches!(err, PromptGateError::UnknownEnvironment(ref e) if e == "canary"));
    }

    #[test]
    fn test_environment_serde() {
        let json = serde_json::to_string(&Environment::Production).expect("serialize");
        assert_eq!(json, "\"production\"");
        let back: Environment = serde_json::from_str("\"staging\"").expect("deserialize");
        assert_eq!(back, Environment::Staging);
    }
}
