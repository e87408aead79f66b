// 🚨 Error Types - what can go wrong inside the engine
//
// File-level plumbing uses anyhow (see tables.rs, pipeline.rs).
// Everything the core can signal by itself lives here.

use thiserror::Error;

use crate::entities::Category;

/// Result alias for the simulation core.
pub type SimResult<T> = Result<T, SimError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Excluding the incumbent left no candidate in the category.
    /// Callers treat this as a suppressed switch, never as fatal.
    #[error("no alternative vendor for site {site_id} in category {category}")]
    NoAlternativeVendor { site_id: String, category: Category },

    /// The ledger broke its own invariants (gap, overlap, double seed...).
    #[error("ledger consistency violation: {0}")]
    LedgerConsistency(String),

    /// A row in an input table is malformed or references something unknown.
    #[error("input validation failed: {0}")]
    InputValidation(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A distribution could not be built from its parameters.
    #[error("distribution error: {0}")]
    Distribution(String),
}

impl SimError {
    pub fn input(msg: impl Into<String>) -> Self {
        SimError::InputValidation(msg.into())
    }

    pub fn ledger(msg: impl Into<String>) -> Self {
        SimError::LedgerConsistency(msg.into())
    }

    /// True for the one condition callers are expected to recover from.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SimError::NoAlternativeVendor { .. })
    }
}
