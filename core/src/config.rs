//! Engine configuration: rule thresholds, stage weights, lookup windows.
//!
//! All settings are plain data passed in at construction time so rules and
//! the finalizer stay independently testable with injected values.

use crate::{error::AmlResult, types::Severity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    /// Deposits at or above this amount trigger the High Deposit rule.
    pub deposit_threshold: f64,
    /// Max |sell − buy| for a trade to count as negligible profit.
    pub negligible_profit_threshold: f64,
    /// Lookback window for the Rapid Deposit-Withdrawal rule.
    pub rapid_cycle_hours: i64,
    /// Transaction count that trips the Velocity rule (current one included).
    pub velocity_txn_count: i64,
    pub velocity_window_minutes: i64,
    pub cross_border_severity: Severity,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            deposit_threshold: 10_000.0,
            negligible_profit_threshold: 1.0,
            rapid_cycle_hours: 24,
            velocity_txn_count: 5,
            velocity_window_minutes: 60,
            cross_border_severity: Severity::High,
        }
    }
}

/// Aggregation weights for the five analysis stages. Must sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageWeights {
    pub behavioral: f64,
    pub network: f64,
    pub contextual: f64,
    pub evidence: f64,
    pub false_positive: f64,
}

impl Default for StageWeights {
    fn default() -> Self {
        Self {
            behavioral: 0.25,
            network: 0.20,
            contextual: 0.20,
            evidence: 0.20,
            false_positive: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmlConfig {
    pub rules: RuleThresholds,
    pub weights: StageWeights,
    /// How many recent transactions the analysis stages see.
    pub history_limit: i64,
    /// Scoring backend selector: "none" runs the neutral fallback.
    pub scoring_provider: String,
}

impl Default for AmlConfig {
    fn default() -> Self {
        Self {
            rules: RuleThresholds::default(),
            weights: StageWeights::default(),
            history_limit: 50,
            scoring_provider: "none".into(),
        }
    }
}

impl AmlConfig {
    /// Load configuration from a JSON file. Missing fields fall back to
    /// defaults, so a partial override file is valid.
    pub fn load(path: &str) -> AmlResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config {path}: {e}"))?;
        Ok(serde_json::from_str(&raw)?)
    }
}
