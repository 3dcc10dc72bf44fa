//! Transaction screening and case adjudication engine.
//!
//! Transactions are submitted through [`engine::AmlEngine`], screened by a
//! fixed set of detection rules, and either completed or held. A held
//! transaction spawns an alert, a five-stage risk analysis, and an
//! investigation case, which analysts then adjudicate.

pub mod case_service;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod rule_engine;
pub mod rules;
pub mod scoring;
pub mod store;
pub mod transaction_service;
pub mod types;

pub use engine::AmlEngine;
pub use error::{AmlError, AmlResult};
