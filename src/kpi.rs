// 📈 KPI Synthesizer - monthly days-in-A/R and denial rate per site
//
// For each (site, month):
//   value = site baseline
//         + Σ active vendor effect
//         + Σ integration bonus   (factor(q) × |effect|)
//         + seasonality           (amplitude × sin(2π × month/12))
//         + gaussian noise
//   then clamp and round to 2 decimals.
//
// Active vendors come from the Contract Ledger; the KPI rows themselves
// carry no vendor reference.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::PI;

use crate::entities::{IntegrationQuality, Panel, Vendor};
use crate::error::{SimError, SimResult};
use crate::ledger::ContractLedger;
use crate::rng::{RandomSource, Stream};
use crate::temporal::{Horizon, Month};

// ============================================================================
// CONSTANTS
// ============================================================================

pub const DAYS_AR_MIN: f64 = 15.0;
pub const DAYS_AR_MAX: f64 = 60.0;
pub const DENIAL_RATE_MIN: f64 = 0.0;
pub const DENIAL_RATE_MAX: f64 = 20.0;

const DAYS_AR_PER_TIER: f64 = 3.0;
const DENIAL_PER_TIER: f64 = 0.5;
const VENDOR_DAYS_AR_SIGMA: f64 = 0.5;
const VENDOR_DENIAL_SIGMA: f64 = 0.1;

const SEASON_DAYS_AR_AMPLITUDE: f64 = 2.0;
const SEASON_DENIAL_AMPLITUDE: f64 = 0.3;
const MONTHLY_DAYS_AR_SIGMA: f64 = 1.5;
const MONTHLY_DENIAL_SIGMA: f64 = 0.3;

// ============================================================================
// TYPES
// ============================================================================

/// Per-vendor causal effect, fixed for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VendorEffect {
    pub days_ar_effect: f64,
    pub denial_rate_effect: f64,
}

/// Per-site KPI level before any vendor effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteBaseline {
    pub baseline_days_ar: f64,
    pub baseline_denial_rate: f64,
}

/// One row of `kpis.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiRecord {
    pub site_id: String,
    pub month: Month,
    pub days_ar: f64,
    pub denial_rate: f64,
}

// ============================================================================
// FORMULAS
// ============================================================================

/// Noise-free effect: tier 1 → +1, tier 2 → 0, tier 3 → −1 steps,
/// scaled by the category's weight
pub fn expected_vendor_effect(vendor: &Vendor) -> VendorEffect {
    let tier_effect = 2.0 - vendor.tier as f64;
    let weight = vendor.category.kpi_weight();
    VendorEffect {
        days_ar_effect: tier_effect * DAYS_AR_PER_TIER * weight,
        denial_rate_effect: tier_effect * DENIAL_PER_TIER * weight,
    }
}

/// Better integration pulls a vendor's effect toward zero
pub fn integration_bonus_factor(quality: IntegrationQuality) -> f64 {
    match quality {
        IntegrationQuality::Full => -0.5,
        IntegrationQuality::Partial => -0.2,
        IntegrationQuality::Manual => 0.0,
    }
}

/// (days_ar, denial_rate) seasonal terms for a calendar month
pub fn seasonality(month: Month) -> (f64, f64) {
    let phase = (2.0 * PI * month.number() as f64 / 12.0).sin();
    (SEASON_DAYS_AR_AMPLITUDE * phase, SEASON_DENIAL_AMPLITUDE * phase)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Clamp to the realistic range, then round for output
pub fn finalize(days_ar: f64, denial_rate: f64) -> (f64, f64) {
    (
        round2(days_ar.clamp(DAYS_AR_MIN, DAYS_AR_MAX)),
        round2(denial_rate.clamp(DENIAL_RATE_MIN, DENIAL_RATE_MAX)),
    )
}

fn normal(sigma: f64) -> SimResult<Normal<f64>> {
    Normal::new(0.0, sigma).map_err(|e| SimError::Distribution(e.to_string()))
}

// ============================================================================
// KPI MODEL (per-run constants)
// ============================================================================

/// Vendor effects and site baselines, drawn once per run
#[derive(Debug, Clone, Default)]
pub struct KpiModel {
    effects: HashMap<String, VendorEffect>,
    baselines: HashMap<String, SiteBaseline>,
}

impl KpiModel {
    pub fn draw(panel: &Panel, source: &RandomSource) -> SimResult<Self> {
        let days_noise = normal(VENDOR_DAYS_AR_SIGMA)?;
        let denial_noise = normal(VENDOR_DENIAL_SIGMA)?;

        let mut effects = HashMap::with_capacity(panel.vendors().len());
        for vendor in panel.vendors() {
            let mut rng = source.substream(Stream::VendorEffect, &[vendor.vendor_id.as_str()]);
            let mean = expected_vendor_effect(vendor);
            effects.insert(
                vendor.vendor_id.clone(),
                VendorEffect {
                    days_ar_effect: mean.days_ar_effect + days_noise.sample(&mut rng),
                    denial_rate_effect: mean.denial_rate_effect + denial_noise.sample(&mut rng),
                },
            );
        }

        let mut baselines = HashMap::with_capacity(panel.sites().len());
        for site in panel.sites() {
            let mut rng = source.substream(Stream::SiteBaseline, &[site.site_id.as_str()]);
            baselines.insert(
                site.site_id.clone(),
                SiteBaseline {
                    baseline_days_ar: rng.random_range(30.0..40.0),
                    baseline_denial_rate: rng.random_range(5.0..9.0),
                },
            );
        }

        Ok(KpiModel { effects, baselines })
    }

    pub fn set_effect(&mut self, vendor_id: &str, effect: VendorEffect) {
        self.effects.insert(vendor_id.to_string(), effect);
    }

    pub fn set_baseline(&mut self, site_id: &str, baseline: SiteBaseline) {
        self.baselines.insert(site_id.to_string(), baseline);
    }

    pub fn effect(&self, vendor_id: &str) -> SimResult<&VendorEffect> {
        self.effects
            .get(vendor_id)
            .ok_or_else(|| SimError::input(format!("no KPI effect for vendor {}", vendor_id)))
    }

    pub fn baseline(&self, site_id: &str) -> SimResult<&SiteBaseline> {
        self.baselines
            .get(site_id)
            .ok_or_else(|| SimError::input(format!("no KPI baseline for site {}", site_id)))
    }
}

// ============================================================================
// KPI SYNTHESIZER
// ============================================================================

pub struct KpiSynthesizer<'a> {
    panel: &'a Panel,
    ledger: &'a ContractLedger,
    model: KpiModel,
    source: RandomSource,
    days_ar_noise: Normal<f64>,
    denial_noise: Normal<f64>,
}

impl<'a> KpiSynthesizer<'a> {
    /// Synthesizer with a freshly drawn model
    pub fn new(panel: &'a Panel, ledger: &'a ContractLedger, source: RandomSource) -> SimResult<Self> {
        let model = KpiModel::draw(panel, &source)?;
        Self::with_model(panel, ledger, model, source)
    }

    pub fn with_model(
        panel: &'a Panel,
        ledger: &'a ContractLedger,
        model: KpiModel,
        source: RandomSource,
    ) -> SimResult<Self> {
        Ok(KpiSynthesizer {
            panel,
            ledger,
            model,
            source,
            days_ar_noise: normal(MONTHLY_DAYS_AR_SIGMA)?,
            denial_noise: normal(MONTHLY_DENIAL_SIGMA)?,
        })
    }

    pub fn model(&self) -> &KpiModel {
        &self.model
    }

    /// Deterministic part of a site-month: baseline + vendors + bonus + season
    pub fn expected_kpis(&self, site_id: &str, month: Month) -> SimResult<(f64, f64)> {
        let baseline = self.model.baseline(site_id)?;
        let mut days_ar = baseline.baseline_days_ar;
        let mut denial_rate = baseline.baseline_denial_rate;

        for &category in self.panel.categories() {
            let contract = self.ledger.interval_at(site_id, category, month)?;
            let effect = self.model.effect(&contract.vendor_id)?;
            let factor = integration_bonus_factor(self.panel.quality(site_id, &contract.vendor_id));

            days_ar += effect.days_ar_effect + factor * effect.days_ar_effect.abs();
            denial_rate += effect.denial_rate_effect + factor * effect.denial_rate_effect.abs();
        }

        let (season_ar, season_denial) = seasonality(month);
        Ok((days_ar + season_ar, denial_rate + season_denial))
    }

    /// Full KPI row for one site-month, noise included
    pub fn monthly_kpis(&self, site_id: &str, month: Month) -> SimResult<KpiRecord> {
        let (days_ar, denial_rate) = self.expected_kpis(site_id, month)?;

        let month_key = month.to_string();
        let mut rng = self.source.substream(Stream::KpiNoise, &[site_id, month_key.as_str()]);
        let noise_ar = self.days_ar_noise.sample(&mut rng);
        let noise_denial = self.denial_noise.sample(&mut rng);

        let (days_ar, denial_rate) = finalize(days_ar + noise_ar, denial_rate + noise_denial);
        Ok(KpiRecord {
            site_id: site_id.to_string(),
            month,
            days_ar,
            denial_rate,
        })
    }

    /// Every (site, month) row, site-major then chronological
    pub fn synthesize(&self, horizon: &Horizon) -> SimResult<Vec<KpiRecord>> {
        let months = horizon.months();
        let mut records = Vec::with_capacity(self.panel.sites().len() * months.len());
        for site in self.panel.sites() {
            for &month in &months {
                records.push(self.monthly_kpis(&site.site_id, month)?);
            }
        }
        Ok(records)
    }
}

// ============================================================================
// TESTS
// ============================================================================
