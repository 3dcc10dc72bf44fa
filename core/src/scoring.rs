//! External scoring capability behind a one-method trait.
//!
//! The analysis pipeline hands each stage's structured prompt to a
//! [`ScoringBackend`] and gets back a score in [0,100] plus a short summary.
//! When no backend is configured, every stage degrades to a fixed neutral
//! score and a sentinel summary, which keeps the transaction lifecycle
//! deterministic without the external dependency. Implementations are
//! expected to time-bound `invoke`; a timeout surfaces as an `Err` and is
//! absorbed by the same degraded path.

use crate::error::{self, AmlError, AmlResult};
use std::collections::VecDeque;
use std::sync::Mutex;

pub const NEUTRAL_SCORE: f64 = 50.0;
pub const UNCONFIGURED_SUMMARY: &str = "scoring backend not configured";

#[derive(Debug, Clone, PartialEq)]
pub struct StageScore {
    pub score: f64,
    pub summary: String,
}

impl StageScore {
    pub fn new(score: f64, summary: impl Into<String>) -> Self {
        Self {
            score: score.clamp(0.0, 100.0),
            summary: summary.into(),
        }
    }

    pub fn neutral() -> Self {
        Self {
            score: NEUTRAL_SCORE,
            summary: UNCONFIGURED_SUMMARY.into(),
        }
    }
}

pub trait ScoringBackend: Send + Sync {
    /// Score one structured prompt. Must return a score in [0,100]; callers
    /// clamp defensively via [`StageScore::new`].
    fn invoke(&self, prompt: &str) -> AmlResult<StageScore>;

    /// False when this backend is the neutral fallback.
    fn configured(&self) -> bool {
        true
    }
}

/// Sentinel backend used when no scoring provider is configured.
pub struct UnconfiguredScorer;

impl ScoringBackend for UnconfiguredScorer {
    fn invoke(&self, _prompt: &str) -> AmlResult<StageScore> {
        Ok(StageScore::neutral())
    }

    fn configured(&self) -> bool {
        false
    }
}

/// Build a backend from the configured provider name. "none" (or empty)
/// selects the neutral fallback; anything else is an operator
/// misconfiguration and fatal before any analysis stage runs.
pub fn backend_for_provider(provider: &str) -> AmlResult<Box<dyn ScoringBackend>> {
    match provider {
        "" | "none" | "stub" => {
            log::warn!("scoring provider not configured; stages will use neutral fallback");
            Ok(Box::new(UnconfiguredScorer))
        }
        other => Err(AmlError::scoring(
            error::SCORING_BAD_PROVIDER,
            format!("unsupported scoring provider '{other}'"),
        )),
    }
}

/// Test backend replaying a scripted sequence of responses, then a fallback.
pub struct ScriptedScorer {
    responses: Mutex<VecDeque<StageScore>>,
    fallback: StageScore,
}

impl ScriptedScorer {
    pub fn new(responses: impl IntoIterator<Item = StageScore>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            fallback: StageScore::neutral(),
        }
    }

    /// Every invocation returns the same score.
    pub fn constant(score: f64, summary: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: StageScore::new(score, summary),
        }
    }
}

impl ScoringBackend for ScriptedScorer {
    fn invoke(&self, _prompt: &str) -> AmlResult<StageScore> {
        let mut queue = self.responses.lock().expect("scorer lock poisoned");
        Ok(queue.pop_front().unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Test backend that always fails, for exercising the degraded path.
pub struct FailingScorer;

impl ScoringBackend for FailingScorer {
    fn invoke(&self, _prompt: &str) -> AmlResult<StageScore> {
        Err(AmlError::scoring(
            error::SCORING_UNAVAILABLE,
            "scoring backend unavailable",
        ))
    }
}
