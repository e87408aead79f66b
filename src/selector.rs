// 🎯 Vendor Selector - softmax pick over integration quality and tier
//
// One function serves both initial assignment and post-switch replacement:
//
//   weight(v) = exp(0.5 × quality(site, v) + 0.3 × tier(v))
//
// normalised over the category's candidates (minus the incumbent, if any).

use rand::Rng;

use crate::entities::{Category, IntegrationQuality, Panel, Vendor};
use crate::error::{SimError, SimResult};
use crate::rng::pick_weighted;

pub const QUALITY_COEFFICIENT: f64 = 0.5;
pub const TIER_COEFFICIENT: f64 = 0.3;

/// Unnormalised softmax weight for one candidate
pub fn selection_weight(quality: IntegrationQuality, tier: u8) -> f64 {
    (QUALITY_COEFFICIENT * quality.level() as f64 + TIER_COEFFICIENT * tier as f64).exp()
}

// ============================================================================
// VENDOR SELECTOR
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct VendorSelector<'a> {
    panel: &'a Panel,
}

impl<'a> VendorSelector<'a> {
    pub fn new(panel: &'a Panel) -> Self {
        VendorSelector { panel }
    }

    /// Candidates with their selection probabilities, in vendor-table order
    pub fn distribution(
        &self,
        site_id: &str,
        category: Category,
        exclude: Option<&str>,
    ) -> Vec<(&'a Vendor, f64)> {
        let panel = self.panel;
        let weighted: Vec<(&'a Vendor, f64)> = panel
            .vendors_in(category)
            .filter(|v| Some(v.vendor_id.as_str()) != exclude)
            .map(|v| {
                let quality = panel.quality(site_id, &v.vendor_id);
                (v, selection_weight(quality, v.tier))
            })
            .collect();

        let total: f64 = weighted.iter().map(|(_, w)| w).sum();
        weighted.into_iter().map(|(v, w)| (v, w / total)).collect()
    }

    /// Pick with an externally supplied uniform draw `u ∈ [0, 1)`
    pub fn select_with_draw(
        &self,
        site_id: &str,
        category: Category,
        exclude: Option<&str>,
        u: f64,
    ) -> SimResult<&'a Vendor> {
        let candidates = self.distribution(site_id, category, exclude);
        let weights: Vec<f64> = candidates.iter().map(|(_, p)| *p).collect();

        match pick_weighted(&weights, u) {
            Some(i) => Ok(candidates[i].0),
            None if exclude.is_some() => Err(SimError::NoAlternativeVendor {
                site_id: site_id.to_string(),
                category,
            }),
            None => Err(SimError::input(format!(
                "category {} has no vendors to assign to site {}",
                category, site_id
            ))),
        }
    }

    /// Pick using one uniform draw from `rng`
    pub fn select<R: Rng + ?Sized>(
        &self,
        site_id: &str,
        category: Category,
        exclude: Option<&str>,
        rng: &mut R,
    ) -> SimResult<&'a Vendor> {
        let u: f64 = rng.random();
        self.select_with_draw(site_id, category, exclude, u)
    }
}

// ============================================================================
// TESTS
// ============================================================================
