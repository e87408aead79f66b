// 🗓️ Switch Simulation - month-by-month contract evolution
//
// Month 0 seeds the ledger. Every later month, in chronological order,
// each (site, category) pair runs one switch trial against its incumbent;
// an accepted trial picks a replacement with the shared Vendor Selector
// and applies close+open atomically. Pairs never read each other's state,
// and each pair-month draws from its own keyed sub-stream.

use tracing::{info, warn};

use crate::entities::Panel;
use crate::error::{SimError, SimResult};
use crate::ledger::{ContractLedger, InitialAssignment, SwitchEvent};
use crate::rng::{RandomSource, Stream};
use crate::selector::VendorSelector;
use crate::switching::SwitchModel;
use crate::temporal::{Horizon, Month};

// ============================================================================
// INITIAL ASSIGNMENT
// ============================================================================

/// One softmax-selected vendor per (site, category), starting at `start`
pub fn assign_initial_state(
    panel: &Panel,
    start: Month,
    source: &RandomSource,
) -> SimResult<Vec<InitialAssignment>> {
    let selector = VendorSelector::new(panel);
    let mut rows = Vec::new();

    for (site, category) in panel.pairs() {
        let mut rng = source.substream(Stream::Initial, &[site.site_id.as_str(), category.as_str()]);
        let vendor = selector.select(&site.site_id, category, None, &mut rng)?;
        rows.push(InitialAssignment {
            site_id: site.site_id.clone(),
            category,
            vendor_id: vendor.vendor_id.clone(),
            contract_start_date: start,
        });
    }

    Ok(rows)
}

// ============================================================================
// OUTCOME
// ============================================================================

/// What one full pass produced
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub ledger: ContractLedger,
    pub events: Vec<SwitchEvent>,
    /// Trials that fired but had no alternative vendor
    pub suppressed: usize,
    /// Pair-months evaluated (first month excluded)
    pub evaluated: usize,
}

/// Counters for one simulated month
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthReport {
    pub evaluated: usize,
    pub switched: usize,
    pub suppressed: usize,
}

// ============================================================================
// SWITCH SIMULATOR
// ============================================================================

pub struct SwitchSimulator<'a> {
    panel: &'a Panel,
    selector: VendorSelector<'a>,
    model: SwitchModel,
    source: RandomSource,
}

impl<'a> SwitchSimulator<'a> {
    pub fn new(panel: &'a Panel, model: SwitchModel, source: RandomSource) -> Self {
        SwitchSimulator {
            panel,
            selector: VendorSelector::new(panel),
            model,
            source,
        }
    }

    /// Validate the initial-state table and seed one interval per pair
    pub fn seed_ledger(
        &self,
        initial: &[InitialAssignment],
        horizon: &Horizon,
    ) -> SimResult<ContractLedger> {
        let mut ledger = ContractLedger::new();

        for row in initial {
            self.panel.require_site(&row.site_id)?;
            let vendor = self.panel.require_vendor(&row.vendor_id)?;
            if vendor.category != row.category {
                return Err(SimError::input(format!(
                    "initial state for ({}, {}) names vendor {} from category {}",
                    row.site_id, row.category, vendor.vendor_id, vendor.category
                )));
            }
            if row.contract_start_date > horizon.start() {
                return Err(SimError::input(format!(
                    "initial contract for ({}, {}) starts {} after horizon start {}",
                    row.site_id, row.category, row.contract_start_date, horizon.start()
                )));
            }
            ledger.seed(row).map_err(|_| {
                SimError::input(format!(
                    "duplicate initial state row for ({}, {})",
                    row.site_id, row.category
                ))
            })?;
        }

        for (site, category) in self.panel.pairs() {
            if ledger.active(&site.site_id, category).is_none() {
                return Err(SimError::input(format!(
                    "initial state has no row for ({}, {})",
                    site.site_id, category
                )));
            }
        }

        Ok(ledger)
    }

    /// Evaluate every pair once for `month`, applying accepted switches
    pub fn step(
        &self,
        ledger: &mut ContractLedger,
        month: Month,
        events: &mut Vec<SwitchEvent>,
    ) -> SimResult<MonthReport> {
        let month_key = month.to_string();
        let mut report = MonthReport::default();

        for (site, category) in self.panel.pairs() {
            let site_id = site.site_id.as_str();
            let active = ledger.active(site_id, category).ok_or_else(|| {
                SimError::ledger(format!("({}, {}) has no active contract", site_id, category))
            })?;

            let quality = self.panel.quality(site_id, active.vendor_id);
            let months_since = month.months_since(active.last_change);
            let incumbent = active.vendor_id.to_string();
            report.evaluated += 1;

            let mut rng = self
                .source
                .substream(Stream::Switch, &[site_id, category.as_str(), month_key.as_str()]);
            if !self.model.should_switch(quality, months_since, &mut rng) {
                continue;
            }

            match self.selector.select(site_id, category, Some(&incumbent), &mut rng) {
                Ok(vendor) => {
                    events.push(ledger.switch(site_id, category, &vendor.vendor_id, month)?);
                    report.switched += 1;
                }
                Err(e) if e.is_recoverable() => {
                    warn!(site_id, %category, %month, "switch suppressed: no alternative vendor");
                    report.suppressed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }

    /// Seed, then walk every month after the first in order
    pub fn run(&self, initial: &[InitialAssignment], horizon: &Horizon) -> SimResult<SimulationOutcome> {
        let mut ledger = self.seed_ledger(initial, horizon)?;
        let mut events = Vec::new();
        let mut evaluated = 0;
        let mut suppressed = 0;

        for month in horizon.months().into_iter().skip(1) {
            let report = self.step(&mut ledger, month, &mut events)?;
            evaluated += report.evaluated;
            suppressed += report.suppressed;
        }

        ledger.verify()?;
        info!(
            pairs = ledger.pair_count(),
            switches = events.len(),
            suppressed,
            months = horizon.len(),
            "switch simulation complete"
        );

        Ok(SimulationOutcome {
            ledger,
            events,
            suppressed,
            evaluated,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
