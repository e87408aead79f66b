// 🏷️ Category - the fixed set of vendor service classes
//
// Exactly one vendor per site per category is active at any time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SimError;

// ============================================================================
// CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Lab,
    #[serde(rename = "RCM")]
    Rcm,
    Telephony,
    Scheduling,
    Clearinghouse,
    #[serde(rename = "IT_MSP")]
    ItMsp,
    Supplies,
}

impl Category {
    /// Canonical order, as the vendor catalog lists them
    pub const ALL: [Category; 7] = [
        Category::Lab,
        Category::Rcm,
        Category::Telephony,
        Category::Scheduling,
        Category::Clearinghouse,
        Category::ItMsp,
        Category::Supplies,
    ];

    /// Column value used in every table
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Lab => "Lab",
            Category::Rcm => "RCM",
            Category::Telephony => "Telephony",
            Category::Scheduling => "Scheduling",
            Category::Clearinghouse => "Clearinghouse",
            Category::ItMsp => "IT_MSP",
            Category::Supplies => "Supplies",
        }
    }

    /// Revenue-cycle vendors move KPIs harder than everyone else
    pub fn kpi_weight(&self) -> f64 {
        match self {
            Category::Rcm => 1.5,
            _ => 1.0,
        }
    }

    /// (base, tier_delta) for monthly pricing
    pub fn pricing(&self) -> (u32, u32) {
        match self {
            Category::Lab => (8000, 500),
            Category::Rcm => (2500, 500),
            Category::Telephony => (600, 200),
            Category::Scheduling => (400, 100),
            Category::Clearinghouse => (200, 100),
            Category::ItMsp => (1500, 500),
            Category::Supplies => (1200, 300),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SimError::input(format!("unknown category: {:?}", s)))
    }
}
