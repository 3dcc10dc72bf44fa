//! Shared domain types: entity structs, status enums, id and timestamp helpers.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Natural key of an account (ACC-XXXXXXXXX).
pub type AccountNumber = String;

// ── Enums ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    TradeBuy,
    TradeSell,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::TradeBuy => "trade-buy",
            TransactionType::TradeSell => "trade-sell",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(TransactionType::Deposit),
            "withdrawal" => Some(TransactionType::Withdrawal),
            "trade-buy" => Some(TransactionType::TradeBuy),
            "trade-sell" => Some(TransactionType::TradeSell),
            _ => None,
        }
    }

    /// Deposits and trade sells credit the account; the other two debit it.
    pub fn balance_delta(&self, amount: f64) -> f64 {
        match self {
            TransactionType::Deposit | TransactionType::TradeSell => amount,
            TransactionType::Withdrawal | TransactionType::TradeBuy => -amount,
        }
    }

    pub fn is_debit(&self) -> bool {
        matches!(self, TransactionType::Withdrawal | TransactionType::TradeBuy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Held,
    Completed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Held => "held",
            TransactionStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TransactionStatus::Pending),
            "held" => Some(TransactionStatus::Held),
            "completed" => Some(TransactionStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Priority rank used for primary-alert selection; lower is more severe.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            _ => None,
        }
    }
}

/// ACCEPTED is non-terminal; CLOSE is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseStatus {
    #[serde(rename = "OPEN")]
    Open,
    #[serde(rename = "ACCEPTED")]
    Accepted,
    #[serde(rename = "CLOSE")]
    Close,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Open => "OPEN",
            CaseStatus::Accepted => "ACCEPTED",
            CaseStatus::Close => "CLOSE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(CaseStatus::Open),
            "ACCEPTED" => Some(CaseStatus::Accepted),
            "CLOSE" => Some(CaseStatus::Close),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionKind {
    #[serde(rename = "ACCEPT")]
    Accept,
    #[serde(rename = "REJECT")]
    Reject,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Accept => "ACCEPT",
            DecisionKind::Reject => "REJECT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACCEPT" => Some(DecisionKind::Accept),
            "REJECT" => Some(DecisionKind::Reject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    FalsePositive,
    Low,
    Medium,
    High,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::FalsePositive => "false_positive",
            Classification::Low => "low",
            Classification::Medium => "medium",
            Classification::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "false_positive" => Some(Classification::FalsePositive),
            "low" => Some(Classification::Low),
            "medium" => Some(Classification::Medium),
            "high" => Some(Classification::High),
            _ => None,
        }
    }
}

// ── Entities ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    pub customer_type: String,
    pub full_name: String,
    pub nationality: String,
    pub residency_country: String,
    pub kyc_status: String,
    pub risk_rating: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_number: AccountNumber,
    pub customer_id: String,
    pub account_type: String,
    pub account_status: String,
    pub branch_code: String,
    pub balance_amount: f64,
    pub balance_currency: String,
    pub opened_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub account_number: AccountNumber,
    pub transaction_amount: f64,
    pub transaction_currency: String,
    pub transaction_date: DateTime<Utc>,
    pub transaction_type: TransactionType,
    pub transaction_status: TransactionStatus,
    pub purpose: Option<String>,
    pub deposit_source_type: Option<String>,
    pub deposit_source_value: Option<String>,
    pub deposit_source_country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: String,
    pub account_number: AccountNumber,
    pub transaction_id: String,
    pub alert_type: String,
    pub severity: Severity,
    pub rule_id: String,
    pub description: String,
    pub triggered_date: DateTime<Utc>,
}

/// Per-account high-risk marker. Set once a rule fires for the account and
/// never cleared automatically (flag=0 means revoked by an operator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighRiskFlag {
    pub account_number: AccountNumber,
    pub high_risk_flag: i64,
    pub overall_risk_score: i64,
    pub risk_source: String,
    pub risk_reason: String,
    pub detected_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub case_id: String,
    pub alert_id: String,
    pub account_number: AccountNumber,
    pub transaction_id: Option<String>,
    pub case_status: CaseStatus,
    pub case_score: f64,
    pub classification: Classification,
    pub behavioral_score: f64,
    pub behavioral_summary: String,
    pub network_score: f64,
    pub network_summary: String,
    pub contextual_score: f64,
    pub contextual_summary: String,
    pub evidence_score: f64,
    pub evidence_summary: String,
    pub false_positive_score: f64,
    pub false_positive_summary: String,
    pub assigned_to: Option<String>,
    pub assigned_date: Option<DateTime<Utc>>,
    pub case_opened_date: DateTime<Utc>,
    pub case_closed_date: Option<DateTime<Utc>>,
    pub case_summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseDecision {
    pub id: Option<i64>,
    pub case_id: String,
    pub decision: DecisionKind,
    pub decision_by: String,
    pub decision_date: DateTime<Utc>,
    pub decision_reason: String,
    pub next_action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseDocument {
    pub document_id: String,
    pub case_id: String,
    pub content_type: String,
    pub content: String,
    pub generated_by: String,
    pub version: i64,
}

// ── Id generation ────────────────────────────────────────────────────────────

/// Generate a prefixed entity id (e.g. TXN-A1B2C3D, ACC-1F2E3D4C5).
/// Suffix lengths follow the id scheme of the data model.
pub fn new_id(prefix: &str) -> String {
    let len = match prefix {
        "TXN" => 7,
        "ACC" => 9,
        _ => 6, // CUST, ALERT, CASE, DOC
    };
    let hex = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{prefix}-{}", &hex[..len])
}

// ── Timestamps ───────────────────────────────────────────────────────────────

/// Serialize a timestamp for storage. Fixed-width UTC RFC 3339 with
/// microsecond precision, so lexicographic SQL comparisons match time order.
pub fn ts_to_db(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn ts_from_db(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
