// 🔌 Integration Matrix - how well each vendor plugs into each site's EHR

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::SimError;

// ============================================================================
// INTEGRATION QUALITY
// ============================================================================

/// Ordinal integration level, stored as 0/1/2 in every table
/// Pairs missing from the matrix count as manual.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum IntegrationQuality {
    /// 0 - manual re-keying
    #[default]
    Manual,
    /// 1 - file exchange (CSV, STL upload)
    Partial,
    /// 2 - live API
    Full,
}

impl IntegrationQuality {
    pub fn level(&self) -> u8 {
        match self {
            IntegrationQuality::Manual => 0,
            IntegrationQuality::Partial => 1,
            IntegrationQuality::Full => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IntegrationQuality::Manual => "None (manual)",
            IntegrationQuality::Partial => "Partial (CSV)",
            IntegrationQuality::Full => "Full (API)",
        }
    }
}

impl TryFrom<u8> for IntegrationQuality {
    type Error = SimError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(IntegrationQuality::Manual),
            1 => Ok(IntegrationQuality::Partial),
            2 => Ok(IntegrationQuality::Full),
            other => Err(SimError::input(format!(
                "integration_quality must be 0, 1 or 2 (got {})",
                other
            ))),
        }
    }
}

impl From<IntegrationQuality> for u8 {
    fn from(quality: IntegrationQuality) -> Self {
        quality.level()
    }
}

impl fmt::Display for IntegrationQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

// ============================================================================
// INTEGRATION SCORE (table row)
// ============================================================================

/// One row of `integration_matrix.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationScore {
    pub site_id: String,
    pub vendor_id: String,
    pub integration_quality: IntegrationQuality,
}

// ============================================================================
// INTEGRATION MATRIX
// ============================================================================

/// site_id -> vendor_id -> quality
#[derive(Debug, Clone, Default)]
pub struct IntegrationMatrix {
    scores: HashMap<String, HashMap<String, IntegrationQuality>>,
    len: usize,
}

impl IntegrationMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from table rows; a repeated (site, vendor) pair is an input error
    pub fn from_scores(rows: &[IntegrationScore]) -> Result<Self, SimError> {
        let mut matrix = IntegrationMatrix::new();
        for row in rows {
            if matrix.insert(&row.site_id, &row.vendor_id, row.integration_quality).is_some() {
                return Err(SimError::input(format!(
                    "duplicate integration score for ({}, {})",
                    row.site_id, row.vendor_id
                )));
            }
        }
        Ok(matrix)
    }

    /// Returns the previous score if the pair was already present
    pub fn insert(
        &mut self,
        site_id: &str,
        vendor_id: &str,
        quality: IntegrationQuality,
    ) -> Option<IntegrationQuality> {
        let previous = self
            .scores
            .entry(site_id.to_string())
            .or_default()
            .insert(vendor_id.to_string(), quality);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Explicit score, if any
    pub fn get(&self, site_id: &str, vendor_id: &str) -> Option<IntegrationQuality> {
        self.scores.get(site_id).and_then(|m| m.get(vendor_id)).copied()
    }

    /// Score with the manual default for missing pairs
    pub fn quality(&self, site_id: &str, vendor_id: &str) -> IntegrationQuality {
        self.get(site_id, vendor_id).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All (site, vendor) pairs, for reference checks
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str, IntegrationQuality)> {
        self.scores.iter().flat_map(|(site, row)| {
            row.iter()
                .map(move |(vendor, q)| (site.as_str(), vendor.as_str(), *q))
        })
    }
}
