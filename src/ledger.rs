// 📒 Contract Ledger - append-only interval history + current-state index
//
// Per (site, category) the ledger holds exactly one OPEN interval at every
// simulated month. Two structures, one owner:
// - `log`: every interval ever opened, in opening order (the output table)
// - `pairs`: authoritative index of each pair's open interval and history
//
// A switch at month M closes the open interval with end = M and opens a new
// one with start = M. Windows are half-open, so M belongs to the new vendor.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::entities::{Category, Panel};
use crate::error::{SimError, SimResult};
use crate::temporal::Month;

// ============================================================================
// TABLE ROWS
// ============================================================================

/// One row of `contracts.csv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInterval {
    pub contract_id: String,
    pub site_id: String,
    pub category: Category,
    pub vendor_id: String,

    /// Inclusive
    pub contract_start_date: Month,

    /// Exclusive; None while the contract is still active
    pub contract_end_date: Option<Month>,
}

impl ContractInterval {
    pub fn is_open(&self) -> bool {
        self.contract_end_date.is_none()
    }

    /// Was this contract active during `month`?  [start, end)
    pub fn covers(&self, month: Month) -> bool {
        self.contract_start_date <= month
            && self.contract_end_date.map_or(true, |end| month < end)
    }
}

/// One row of `initial_state.csv` - seeds a pair's first interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialAssignment {
    pub site_id: String,
    pub category: Category,
    pub vendor_id: String,
    pub contract_start_date: Month,
}

/// Sequential, zero-padded, 1-based
pub fn contract_id(index: usize) -> String {
    format!("C{:05}", index + 1)
}

// ============================================================================
// STATE
// ============================================================================

/// Active assignment of one pair, as seen by the switch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveContract<'a> {
    pub vendor_id: &'a str,
    pub start: Month,
    pub last_change: Month,
}

/// Record of an accepted switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchEvent {
    pub site_id: String,
    pub category: Category,
    pub from_vendor: String,
    pub to_vendor: String,
    pub month: Month,
}

#[derive(Debug, Clone)]
struct PairState {
    /// Indices into the log, chronological
    history: Vec<usize>,
    /// Index of the open interval
    open: usize,
    last_change: Month,
}

// ============================================================================
// CONTRACT LEDGER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ContractLedger {
    log: Vec<ContractInterval>,
    pairs: HashMap<String, HashMap<Category, PairState>>,
    pair_count: usize,
}

impl ContractLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialization transition: open a pair's first interval
    pub fn seed(&mut self, assignment: &InitialAssignment) -> SimResult<&ContractInterval> {
        if self.pair(&assignment.site_id, assignment.category).is_some() {
            return Err(SimError::ledger(format!(
                "({}, {}) seeded twice",
                assignment.site_id, assignment.category
            )));
        }

        let index = self.append(
            &assignment.site_id,
            assignment.category,
            &assignment.vendor_id,
            assignment.contract_start_date,
        );
        self.pairs
            .entry(assignment.site_id.clone())
            .or_default()
            .insert(
                assignment.category,
                PairState {
                    history: vec![index],
                    open: index,
                    last_change: assignment.contract_start_date,
                },
            );
        self.pair_count += 1;

        Ok(&self.log[index])
    }

    /// Switch transition: close the open interval at `month`, open the new one
    pub fn switch(
        &mut self,
        site_id: &str,
        category: Category,
        new_vendor: &str,
        month: Month,
    ) -> SimResult<SwitchEvent> {
        let open = self
            .pair(site_id, category)
            .map(|state| state.open)
            .ok_or_else(|| {
                SimError::ledger(format!("({}, {}) was never seeded", site_id, category))
            })?;

        let current = &self.log[open];
        if current.vendor_id == new_vendor {
            return Err(SimError::ledger(format!(
                "({}, {}) switch at {} keeps incumbent {}",
                site_id, category, month, new_vendor
            )));
        }
        if month <= current.contract_start_date {
            return Err(SimError::ledger(format!(
                "({}, {}) switch at {} does not follow open interval start {}",
                site_id, category, month, current.contract_start_date
            )));
        }
        let from_vendor = current.vendor_id.clone();

        self.log[open].contract_end_date = Some(month);
        let index = self.append(site_id, category, new_vendor, month);

        if let Some(state) = self.pair_mut(site_id, category) {
            state.history.push(index);
            state.open = index;
            state.last_change = month;
        }

        debug!(site_id, %category, from = %from_vendor, to = new_vendor, %month, "vendor switch");

        Ok(SwitchEvent {
            site_id: site_id.to_string(),
            category,
            from_vendor,
            to_vendor: new_vendor.to_string(),
            month,
        })
    }

    /// Current assignment of a pair
    pub fn active(&self, site_id: &str, category: Category) -> Option<ActiveContract<'_>> {
        self.pair(site_id, category).map(|state| {
            let interval = &self.log[state.open];
            ActiveContract {
                vendor_id: &interval.vendor_id,
                start: interval.contract_start_date,
                last_change: state.last_change,
            }
        })
    }

    /// Interval active during `month`; none or several is a consistency failure
    pub fn interval_at(
        &self,
        site_id: &str,
        category: Category,
        month: Month,
    ) -> SimResult<&ContractInterval> {
        let mut covering = self.intervals_for(site_id, category).filter(|c| c.covers(month));

        let found = covering.next().ok_or_else(|| {
            SimError::ledger(format!(
                "no contract covers ({}, {}) at {}",
                site_id, category, month
            ))
        })?;
        if let Some(other) = covering.next() {
            return Err(SimError::ledger(format!(
                "contracts {} and {} both cover ({}, {}) at {}",
                found.contract_id, other.contract_id, site_id, category, month
            )));
        }
        Ok(found)
    }

    /// History of one pair, chronological
    pub fn intervals_for<'s>(
        &'s self,
        site_id: &str,
        category: Category,
    ) -> impl Iterator<Item = &'s ContractInterval> + 's {
        self.pair(site_id, category)
            .map(|state| state.history.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&i| &self.log[i])
    }

    /// Every interval ever opened, in opening order
    pub fn history(&self) -> &[ContractInterval] {
        &self.log
    }

    pub fn into_history(self) -> Vec<ContractInterval> {
        self.log
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Number of seeded (site, category) pairs
    pub fn pair_count(&self) -> usize {
        self.pair_count
    }

    /// Every interval beyond a pair's first came from a switch
    pub fn switch_count(&self) -> usize {
        self.log.len() - self.pair_count
    }

    // ========================================================================
    // RELOAD + VERIFY
    // ========================================================================

    /// Rebuild a ledger from a contracts table, checking every invariant
    pub fn from_intervals(intervals: Vec<ContractInterval>) -> SimResult<Self> {
        let mut ids = HashSet::with_capacity(intervals.len());
        for interval in &intervals {
            if !ids.insert(interval.contract_id.as_str()) {
                return Err(SimError::input(format!(
                    "duplicate contract_id {}",
                    interval.contract_id
                )));
            }
        }

        let mut grouped: HashMap<String, HashMap<Category, Vec<usize>>> = HashMap::new();
        for (i, interval) in intervals.iter().enumerate() {
            grouped
                .entry(interval.site_id.clone())
                .or_default()
                .entry(interval.category)
                .or_default()
                .push(i);
        }

        let mut pairs: HashMap<String, HashMap<Category, PairState>> = HashMap::new();
        let mut pair_count = 0;
        for (site_id, by_category) in grouped {
            for (category, mut history) in by_category {
                history.sort_by_key(|&i| intervals[i].contract_start_date);
                let chain: Vec<&ContractInterval> = history.iter().map(|&i| &intervals[i]).collect();
                check_chain(&site_id, category, &chain)?;

                let open = history[history.len() - 1];
                let state = PairState {
                    last_change: intervals[open].contract_start_date,
                    history,
                    open,
                };
                pairs.entry(site_id.clone()).or_default().insert(category, state);
                pair_count += 1;
            }
        }

        Ok(ContractLedger {
            log: intervals,
            pairs,
            pair_count,
        })
    }

    /// Every interval names a known site and a vendor of its own category,
    /// and every panel pair has a history
    pub fn check_references(&self, panel: &Panel) -> SimResult<()> {
        for interval in &self.log {
            panel.require_site(&interval.site_id)?;
            let vendor = panel.require_vendor(&interval.vendor_id)?;
            if vendor.category != interval.category {
                return Err(SimError::input(format!(
                    "contract {} for ({}, {}) names vendor {} from category {}",
                    interval.contract_id,
                    interval.site_id,
                    interval.category,
                    vendor.vendor_id,
                    vendor.category
                )));
            }
        }

        for (site, category) in panel.pairs() {
            if self.pair(&site.site_id, category).is_none() {
                return Err(SimError::input(format!(
                    "no contracts for ({}, {})",
                    site.site_id, category
                )));
            }
        }
        Ok(())
    }

    /// Contiguity, no overlap, exactly one open interval (the last) per pair
    pub fn verify(&self) -> SimResult<()> {
        for (site_id, by_category) in &self.pairs {
            for (&category, state) in by_category {
                let chain: Vec<&ContractInterval> =
                    state.history.iter().map(|&i| &self.log[i]).collect();
                check_chain(site_id, category, &chain)?;
                if state.history.last() != Some(&state.open) {
                    return Err(SimError::ledger(format!(
                        "({}, {}) index points at a closed interval",
                        site_id, category
                    )));
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn append(&mut self, site_id: &str, category: Category, vendor_id: &str, start: Month) -> usize {
        let index = self.log.len();
        self.log.push(ContractInterval {
            contract_id: contract_id(index),
            site_id: site_id.to_string(),
            category,
            vendor_id: vendor_id.to_string(),
            contract_start_date: start,
            contract_end_date: None,
        });
        index
    }

    fn pair(&self, site_id: &str, category: Category) -> Option<&PairState> {
        self.pairs.get(site_id).and_then(|m| m.get(&category))
    }

    fn pair_mut(&mut self, site_id: &str, category: Category) -> Option<&mut PairState> {
        self.pairs.get_mut(site_id).and_then(|m| m.get_mut(&category))
    }
}

/// One pair's intervals, sorted by start: each closes where the next opens,
/// none is empty, only the last is open
fn check_chain(site_id: &str, category: Category, chain: &[&ContractInterval]) -> SimResult<()> {
    for (i, interval) in chain.iter().enumerate() {
        let is_last = i + 1 == chain.len();
        match (interval.contract_end_date, is_last) {
            (None, true) => {}
            (None, false) => {
                return Err(SimError::ledger(format!(
                    "({}, {}) has more than one open contract ({} is open but not last)",
                    site_id, category, interval.contract_id
                )));
            }
            (Some(_), true) => {
                return Err(SimError::ledger(format!(
                    "({}, {}) has no open contract (last is {})",
                    site_id, category, interval.contract_id
                )));
            }
            (Some(end), false) => {
                let next = chain[i + 1];
                if end <= interval.contract_start_date {
                    return Err(SimError::ledger(format!(
                        "contract {} ends at or before it starts",
                        interval.contract_id
                    )));
                }
                if end != next.contract_start_date {
                    return Err(SimError::ledger(format!(
                        "contract {} ends {} but {} starts {}",
                        interval.contract_id, end, next.contract_id, next.contract_start_date
                    )));
                }
            }
        }
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn m(y: i32, mo: u32) -> Month {
        Month::new(y, mo).unwrap()
    }

    fn seeded() -> ContractLedger {
        let mut ledger = ContractLedger::new();
        ledger
            .seed(&InitialAssignment {
                site_id: "S001".to_string(),
                category: Category::Rcm,
                vendor_id: "V005".to_string(),
                contract_start_date: m(2019, 1),
            })
            .unwrap();
        ledger
            .seed(&InitialAssignment {
                site_id: "S001".to_string(),
                category: Category::Lab,
                vendor_id: "V001".to_string(),
                contract_start_date: m(2019, 1),
            })
            .unwrap();
        ledger
    }

    #[test]
    fn test_seed_opens_one_interval_per_pair() {
        let ledger = seeded();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.pair_count(), 2);
        assert_eq!(ledger.switch_count(), 0);
        assert_eq!(ledger.history()[0].contract_id, "C00001");
        assert!(ledger.history().iter().all(|c| c.is_open()));

        let active = ledger.active("S001", Category::Rcm).unwrap();
        assert_eq!(active.vendor_id, "V005");
        assert_eq!(active.last_change, m(2019, 1));
    }

    #[test]
    fn test_double_seed_rejected() {
        let mut ledger = seeded();
        let err = ledger
            .seed(&InitialAssignment {
                site_id: "S001".to_string(),
                category: Category::Rcm,
                vendor_id: "V006".to_string(),
                contract_start_date: m(2019, 1),
            })
            .unwrap_err();
        assert!(matches!(err, SimError::LedgerConsistency(_)));
    }

    #[test]
    fn test_switch_closes_and_opens_atomically() {
        let mut ledger = seeded();
        let event = ledger.switch("S001", Category::Rcm, "V007", m(2020, 6)).unwrap();

        assert_eq!(event.from_vendor, "V005");
        assert_eq!(event.to_vendor, "V007");
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.switch_count(), 1);

        let history: Vec<_> = ledger.intervals_for("S001", Category::Rcm).collect();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].contract_end_date, Some(m(2020, 6)));
        assert_eq!(history[1].contract_start_date, m(2020, 6));
        assert!(history[1].is_open());
        assert_eq!(history[1].contract_id, "C00003");

        let active = ledger.active("S001", Category::Rcm).unwrap();
        assert_eq!(active.vendor_id, "V007");
        assert_eq!(active.last_change, m(2020, 6));

        // untouched pair
        assert_eq!(ledger.intervals_for("S001", Category::Lab).count(), 1);
        ledger.verify().unwrap();
    }

    #[test]
    fn test_transition_month_belongs_to_new_vendor() {
        let mut ledger = seeded();
        ledger.switch("S001", Category::Rcm, "V007", m(2020, 6)).unwrap();

        let before = ledger.interval_at("S001", Category::Rcm, m(2020, 5)).unwrap();
        let at = ledger.interval_at("S001", Category::Rcm, m(2020, 6)).unwrap();
        let after = ledger.interval_at("S001", Category::Rcm, m(2024, 12)).unwrap();
        assert_eq!(before.vendor_id, "V005");
        assert_eq!(at.vendor_id, "V007");
        assert_eq!(after.vendor_id, "V007");
    }

    #[test]
    fn test_switch_to_incumbent_rejected() {
        let mut ledger = seeded();
        let err = ledger.switch("S001", Category::Rcm, "V005", m(2020, 6)).unwrap_err();
        assert!(matches!(err, SimError::LedgerConsistency(_)));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_switch_in_seed_month_rejected() {
        let mut ledger = seeded();
        assert!(ledger.switch("S001", Category::Rcm, "V007", m(2019, 1)).is_err());
    }

    #[test]
    fn test_switch_unknown_pair_rejected() {
        let mut ledger = seeded();
        assert!(ledger.switch("S404", Category::Rcm, "V007", m(2020, 6)).is_err());
    }

    #[test]
    fn test_month_before_seed_is_uncovered() {
        let ledger = seeded();
        let err = ledger.interval_at("S001", Category::Rcm, m(2018, 12)).unwrap_err();
        assert!(err.to_string().contains("no contract covers"));
    }

    #[test]
    fn test_reload_roundtrip_preserves_state() {
        let mut ledger = seeded();
        ledger.switch("S001", Category::Rcm, "V007", m(2020, 6)).unwrap();
        ledger.switch("S001", Category::Rcm, "V006", m(2023, 1)).unwrap();

        let reloaded = ContractLedger::from_intervals(ledger.history().to_vec()).unwrap();
        assert_eq!(reloaded.history(), ledger.history());
        assert_eq!(reloaded.switch_count(), 2);
        let active = reloaded.active("S001", Category::Rcm).unwrap();
        assert_eq!(active.vendor_id, "V006");
        assert_eq!(active.last_change, m(2023, 1));
    }

    #[test]
    fn test_reload_rejects_gap() {
        let mut ledger = seeded();
        ledger.switch("S001", Category::Rcm, "V007", m(2020, 6)).unwrap();
        let mut rows = ledger.history().to_vec();
        rows[0].contract_end_date = Some(m(2020, 4));

        let err = ContractLedger::from_intervals(rows).unwrap_err();
        assert!(err.to_string().contains("ends"));
    }

    #[test]
    fn test_reload_rejects_two_open_intervals() {
        let mut ledger = seeded();
        ledger.switch("S001", Category::Rcm, "V007", m(2020, 6)).unwrap();
        let mut rows = ledger.history().to_vec();
        rows[0].contract_end_date = None;

        let err = ContractLedger::from_intervals(rows).unwrap_err();
        assert!(err.to_string().contains("more than one open"));
    }

    #[test]
    fn test_reload_rejects_fully_closed_pair() {
        let mut rows = seeded().history().to_vec();
        rows[1].contract_end_date = Some(m(2021, 1));
        assert!(ContractLedger::from_intervals(rows).is_err());
    }

    #[test]
    fn test_overlap_is_a_consistency_failure() {
        let rows = vec![
            ContractInterval {
                contract_id: "C00001".to_string(),
                site_id: "S001".to_string(),
                category: Category::Lab,
                vendor_id: "V001".to_string(),
                contract_start_date: m(2019, 1),
                contract_end_date: Some(m(2020, 1)),
            },
            ContractInterval {
                contract_id: "C00002".to_string(),
                site_id: "S001".to_string(),
                category: Category::Lab,
                vendor_id: "V002".to_string(),
                contract_start_date: m(2019, 6),
                contract_end_date: None,
            },
        ];
        assert!(ContractLedger::from_intervals(rows).is_err());
    }

    #[test]
    fn test_reload_rejects_duplicate_contract_id() {
        let mut ledger = seeded();
        ledger.switch("S001", Category::Rcm, "V007", m(2020, 6)).unwrap();
        let mut rows = ledger.history().to_vec();
        rows[2].contract_id = rows[0].contract_id.clone();

        let err = ContractLedger::from_intervals(rows).unwrap_err();
        assert!(matches!(err, SimError::InputValidation(_)));
        assert!(err.to_string().contains("C00001"));
    }

    fn lab_and_rcm_panel() -> Panel {
        use crate::entities::{IntegrationMatrix, Site, Vendor};
        use chrono::NaiveDate;

        Panel::new(
            vec![Site {
                site_id: "S001".to_string(),
                region: "South".to_string(),
                ehr_system: "Dentrix".to_string(),
                date_joined: NaiveDate::from_ymd_opt(2019, 2, 1).unwrap(),
                annual_revenue: 1_800_000,
            }],
            vec![
                Vendor::new("V001", "National Dental Labs", Category::Lab, 2),
                Vendor::new("V005", "Apex Dental Billing", Category::Rcm, 2),
                Vendor::new("V007", "Dental Billing Solutions", Category::Rcm, 1),
            ],
            IntegrationMatrix::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_references_checked_against_panel() {
        let panel = lab_and_rcm_panel();
        assert!(seeded().check_references(&panel).is_ok());

        let mut rows = seeded().history().to_vec();
        rows[0].site_id = "S999".to_string();
        let err = ContractLedger::from_intervals(rows).unwrap().check_references(&panel).unwrap_err();
        assert!(err.to_string().contains("S999"));

        let mut rows = seeded().history().to_vec();
        rows[1].vendor_id = "V999".to_string();
        let err = ContractLedger::from_intervals(rows).unwrap().check_references(&panel).unwrap_err();
        assert!(err.to_string().contains("V999"));

        let mut rows = seeded().history().to_vec();
        rows[1].vendor_id = "V005".to_string();
        let err = ContractLedger::from_intervals(rows).unwrap().check_references(&panel).unwrap_err();
        assert!(matches!(err, SimError::InputValidation(_)));
    }

    #[test]
    fn test_references_require_every_panel_pair() {
        let panel = lab_and_rcm_panel();
        let rows = vec![seeded().history()[0].clone()];
        let err = ContractLedger::from_intervals(rows).unwrap().check_references(&panel).unwrap_err();
        assert!(err.to_string().contains("Lab"));
    }
}
