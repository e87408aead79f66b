// 🏪 Vendor Entity - catalog row with category, tier and price

use serde::{Deserialize, Serialize};

use super::Category;
use crate::error::{SimError, SimResult};

/// Best and worst tier
pub const TIER_BEST: u8 = 1;
pub const TIER_WORST: u8 = 3;

// ============================================================================
// VENDOR ENTITY
// ============================================================================

/// One row of `vendors.csv`. Immutable for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub vendor_id: String,
    pub name: String,
    pub category: Category,

    /// 1 = best, 3 = worst
    pub tier: u8,

    pub monthly_price_per_site: u32,
}

impl Vendor {
    /// Vendor priced from its category's rules
    pub fn new(vendor_id: &str, name: &str, category: Category, tier: u8) -> Self {
        Vendor {
            vendor_id: vendor_id.to_string(),
            name: name.to_string(),
            category,
            tier,
            monthly_price_per_site: price_for(category, tier),
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.vendor_id.trim().is_empty() {
            return Err(SimError::input("vendor with empty vendor_id"));
        }
        if !(TIER_BEST..=TIER_WORST).contains(&self.tier) {
            return Err(SimError::input(format!(
                "vendor {} has tier {} (expected {}-{})",
                self.vendor_id, self.tier, TIER_BEST, TIER_WORST
            )));
        }
        Ok(())
    }
}

/// Tier 1 is discounted, tier 3 carries a premium
pub fn price_for(category: Category, tier: u8) -> u32 {
    let (base, delta) = category.pricing();
    match tier {
        1 => base - delta,
        2 => base,
        _ => base + delta,
    }
}

// ============================================================================
// CATALOG
// ============================================================================

/// The fixed 20-vendor catalog
pub fn vendor_catalog() -> Vec<Vendor> {
    use Category::*;

    vec![
        // lab
        Vendor::new("V001", "National Dental Labs", Lab, 2),
        Vendor::new("V002", "Glidewell", Lab, 3),
        Vendor::new("V003", "DDS Lab", Lab, 1),
        Vendor::new("V004", "NDX", Lab, 2),
        // rcm
        Vendor::new("V005", "Apex Dental Billing", Rcm, 2),
        Vendor::new("V006", "EOS Healthcare", Rcm, 3),
        Vendor::new("V007", "Dental Billing Solutions", Rcm, 1),
        // telephony
        Vendor::new("V008", "Weave", Telephony, 3),
        Vendor::new("V009", "Solutionreach", Telephony, 2),
        Vendor::new("V010", "Dental Phone Pro", Telephony, 1),
        // scheduling
        Vendor::new("V011", "Lighthouse 360", Scheduling, 2),
        Vendor::new("V012", "Dental Intelligence", Scheduling, 3),
        Vendor::new("V013", "Simple Scheduler", Scheduling, 1),
        // clearinghouse
        Vendor::new("V014", "DentalXChange", Clearinghouse, 2),
        Vendor::new("V015", "NEA Fast Attach", Clearinghouse, 2),
        // it msp
        Vendor::new("V016", "Dental IT Solutions", ItMsp, 2),
        Vendor::new("V017", "MicroMD IT", ItMsp, 3),
        Vendor::new("V018", "Tech4Dentists", ItMsp, 1),
        // supplies
        Vendor::new("V019", "Patterson Dental", Supplies, 2),
        Vendor::new("V020", "Benco Dental", Supplies, 2),
    ]
}
