//! External evaluation scorer.
//!
//! The engine never scores prompts itself: a [`Scorer`] turns a prompt's
//! content into one [`FixtureResult`] per fixture of its suite. Two
//! implementations are provided:
//!
//! - [`HttpScorer`] posts the prompt to a remote evaluation service.
//! - [`ScriptedScorer`] answers from an in-memory table (tests, offline runs).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::domain::error::ScoringError;
use crate::domain::eval::FixtureResult;

/// Scores prompt content against a fixture suite.
///
/// Implementations must not apply their own timeout policy; the caller
/// (`EvaluationRunner`) bounds every call.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, content: &str) -> Result<Vec<FixtureResult>, ScoringError>;
}

// ---------------------------------------------------------------------------
// HttpScorer
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    results: Vec<FixtureResult>,
}

/// Scorer backed by an HTTP evaluation service.
///
/// Sends `POST <url>` with `{"prompt": "..."}` and expects
/// `{"results": [FixtureResult, ...]}`.
pub struct HttpScorer {
    url: String,
    http_client: reqwest::Client,
}

impl HttpScorer {
    pub fn new(url: impl Into<String>, user_agent: &str) -> Result<Self, ScoringError> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| ScoringError::Unreachable(format!("http client: {}", e)))?;
        Ok(Self {
            url: url.into(),
            http_client,
        })
    }

    /// Build from engine configuration. Fails when no scorer URL is set.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ScoringError> {
        let url = config.scorer_url.as_deref().ok_or_else(|| {
            ScoringError::Unreachable("no scorer URL configured".to_string())
        })?;
        Self::new(url, &config.user_agent)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Scorer for HttpScorer {
    async fn score(&self, content: &str) -> Result<Vec<FixtureResult>, ScoringError> {
        debug!(url = %self.url, bytes = content.len(), "requesting scores");
        let response = self
            .http_client
            .post(&self.url)
            .json(&ScoreRequest { prompt: content })
            .send()
            .await
            .map_err(|e| ScoringError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoringError::Unreachable(format!(
                "{} returned {}",
                self.url, status
            )));
        }

        let body: ScoreResponse = response
            .json()
            .await
            .map_err(|e| ScoringError::Malformed(e.to_string()))?;
        Ok(body.results)
    }
}

// ---------------------------------------------------------------------------
// ScriptedScorer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Script {
    Results(Vec<FixtureResult>),
    Fail(ScoringError),
}

/// Scorer answering from a content → results table.
///
/// Content without a script is reported as `ScoringError::Unreachable`.
#[derive(Debug, Default)]
pub struct ScriptedScorer {
    scripts: Mutex<HashMap<String, Script>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

/// One fixture per score, ids `fx-1`, `fx-2`, ...
pub fn fixtures_from_scores(scores: &[f64]) -> Vec<FixtureResult> {
    scores
        .iter()
        .enumerate()
        .map(|(i, score)| FixtureResult {
            fixture_id: format!("fx-{}", i + 1),
            input: format!("fixture input {}", i + 1),
            category: "general".to_string(),
            score: *score,
            keywords_found: 0,
            keywords_total: 0,
        })
        .collect()
}

impl ScriptedScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scores(self, content: &str, scores: &[f64]) -> Self {
        self.with_results(content, fixtures_from_scores(scores))
    }

    pub fn with_results(mut self, content: &str, results: Vec<FixtureResult>) -> Self {
        self.scripts
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(content.to_string(), Script::Results(results));
        self
    }

    pub fn with_failure(mut self, content: &str, error: ScoringError) -> Self {
        self.scripts
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(content.to_string(), Script::Fail(error));
        self
    }

    /// Sleep this long before answering every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the script for `content` on a shared scorer.
    pub fn set_scores(&self, content: &str, scores: &[f64]) {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                content.to_string(),
                Script::Results(fixtures_from_scores(scores)),
            );
    }

    /// Make `content` fail on a shared scorer.
    pub fn set_failure(&self, content: &str, error: ScoringError) {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(content.to_string(), Script::Fail(error));
    }

    /// Number of `score` calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scorer for ScriptedScorer {
    async fn score(&self, content: &str) -> Result<Vec<FixtureResult>, ScoringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let script = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(content)
            .cloned();
        match script {
            Some(Script::Results(results)) => Ok(results),
            Some(Script::Fail(err)) => Err(err),
            None => Err(ScoringError::Unreachable(
                "no scripted results for this content".to_string(),
            )),
        }
    }
}
