// 🔁 Switch Decision Model - monthly Bernoulli churn trial
//
//   p = monthly(base_annual) × integration_mult(q) × fatigue_mult(months)
//   monthly(r) = 1 − (1 − r)^(1/12)
//
// Poor integration raises churn; a recent switch damps it.

use rand::Rng;

use crate::entities::IntegrationQuality;

/// Default annual probability that a relationship is replaced
pub const DEFAULT_BASE_ANNUAL_RATE: f64 = 0.05;

/// Convert an annual rate to the equivalent compounded monthly rate
pub fn monthly_rate(base_annual: f64) -> f64 {
    1.0 - (1.0 - base_annual).powf(1.0 / 12.0)
}

/// Worse integration means more churn
pub fn integration_multiplier(quality: IntegrationQuality) -> f64 {
    match quality {
        IntegrationQuality::Manual => 2.0,
        IntegrationQuality::Partial => 1.3,
        IntegrationQuality::Full => 0.7,
    }
}

/// Damping after a recent change: <12 months 0.3, 12-23 months 0.7, else 1.0
pub fn fatigue_multiplier(months_since_last_change: i64) -> f64 {
    if months_since_last_change < 12 {
        0.3
    } else if months_since_last_change < 24 {
        0.7
    } else {
        1.0
    }
}

// ============================================================================
// SWITCH MODEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchModel {
    base_annual_rate: f64,
}

impl Default for SwitchModel {
    fn default() -> Self {
        SwitchModel::new(DEFAULT_BASE_ANNUAL_RATE)
    }
}

impl SwitchModel {
    pub fn new(base_annual_rate: f64) -> Self {
        SwitchModel { base_annual_rate }
    }

    pub fn base_annual_rate(&self) -> f64 {
        self.base_annual_rate
    }

    /// Monthly switch probability, clamped to at most 1.0
    pub fn probability(&self, quality: IntegrationQuality, months_since_last_change: i64) -> f64 {
        let p = monthly_rate(self.base_annual_rate)
            * integration_multiplier(quality)
            * fatigue_multiplier(months_since_last_change);
        p.min(1.0)
    }

    /// Decide against a supplied uniform draw: switch iff `u < p`
    pub fn decide(&self, quality: IntegrationQuality, months_since_last_change: i64, u: f64) -> bool {
        u < self.probability(quality, months_since_last_change)
    }

    /// One Bernoulli trial drawing a single uniform value from `rng`
    pub fn should_switch<R: Rng + ?Sized>(
        &self,
        quality: IntegrationQuality,
        months_since_last_change: i64,
        rng: &mut R,
    ) -> bool {
        let u: f64 = rng.random();
        self.decide(quality, months_since_last_change, u)
    }
}

// ============================================================================
// TESTS
// ============================================================================
