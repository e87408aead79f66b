// 🦷 Site Entity - one dental practice in the panel

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// One row of `sites.csv`. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub site_id: String,
    pub region: String,
    pub ehr_system: String,
    pub date_joined: NaiveDate,
    pub annual_revenue: u64,
}

impl Site {
    pub fn validate(&self) -> SimResult<()> {
        if self.site_id.trim().is_empty() {
            return Err(SimError::input("site with empty site_id"));
        }
        if self.ehr_system.trim().is_empty() {
            return Err(SimError::input(format!(
                "site {} has no ehr_system",
                self.site_id
            )));
        }
        Ok(())
    }
}

/// Site ids are 1-based and zero-padded: S001, S002, ...
pub fn site_id(index: usize) -> String {
    format!("S{:03}", index + 1)
}
