// ✅ Dataset Audit - post-run checks over the generated tables
//
// Re-derives every structural guarantee from the written rows alone, so
// the same audit runs on a fresh simulation or on reloaded CSVs:
// - contracts: contiguous chains, one open interval per pair,
//   switches really change vendor, vendor category matches
// - kpis: clamped ranges, two-decimal rounding, one row per (site, month)

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

use crate::entities::{Category, Panel};
use crate::kpi::{KpiRecord, DAYS_AR_MAX, DAYS_AR_MIN, DENIAL_RATE_MAX, DENIAL_RATE_MIN};
use crate::ledger::{ContractInterval, ContractLedger};
use crate::temporal::Horizon;

// ============================================================================
// CHECK RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical, // dataset is unusable
    Warning,  // dataset is usable but suspicious
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub passed: bool,
    pub check_name: String,
    pub message: String,
    pub severity: Severity,
}

impl CheckResult {
    pub fn pass(check_name: &str, message: &str) -> Self {
        CheckResult {
            passed: true,
            check_name: check_name.to_string(),
            message: message.to_string(),
            severity: Severity::Info,
        }
    }

    pub fn fail(check_name: &str, message: &str, severity: Severity) -> Self {
        CheckResult {
            passed: false,
            check_name: check_name.to_string(),
            message: message.to_string(),
            severity,
        }
    }
}

// ============================================================================
// AUDIT REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub checks: Vec<CheckResult>,
    pub passed_count: usize,
    pub failed_count: usize,
}

impl AuditReport {
    fn from_checks(checks: Vec<CheckResult>) -> Self {
        let passed_count = checks.iter().filter(|c| c.passed).count();
        AuditReport {
            failed_count: checks.len() - passed_count,
            passed_count,
            checks,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Checks: {}/{} passed, {} critical",
            self.passed_count,
            self.checks.len(),
            self.failures()
                .filter(|c| c.severity == Severity::Critical)
                .count()
        )
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }

    pub fn has_critical_issues(&self) -> bool {
        self.failures().any(|c| c.severity == Severity::Critical)
    }

    pub fn check(&self, check_name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.check_name == check_name)
    }
}

// ============================================================================
// DATASET AUDITOR
// ============================================================================

pub struct DatasetAuditor<'a> {
    panel: &'a Panel,
    horizon: Horizon,
}

type PairKey<'r> = (&'r str, Category);

impl<'a> DatasetAuditor<'a> {
    pub fn new(panel: &'a Panel, horizon: Horizon) -> Self {
        DatasetAuditor { panel, horizon }
    }

    /// Run every check; failures are logged at warn
    pub fn audit(&self, contracts: &[ContractInterval], kpis: &[KpiRecord]) -> AuditReport {
        let chains = group_chains(contracts);

        let checks = vec![
            self.check_contiguity(contracts),
            self.check_single_open(&chains),
            self.check_switch_changes_vendor(&chains),
            self.check_vendor_category(contracts),
            self.check_horizon_coverage(&chains),
            self.check_kpi_ranges(kpis),
            self.check_kpi_rounding(kpis),
            self.check_kpi_rows(kpis),
        ];

        let report = AuditReport::from_checks(checks);
        for failure in report.failures() {
            warn!(check = %failure.check_name, severity = ?failure.severity, "{}", failure.message);
        }
        report
    }

    // ========================================================================
    // CONTRACT CHECKS
    // ========================================================================

    fn check_contiguity(&self, contracts: &[ContractInterval]) -> CheckResult {
        match ContractLedger::from_intervals(contracts.to_vec()) {
            Ok(_) => CheckResult::pass("contract_contiguity", "All contract chains are contiguous"),
            Err(e) => CheckResult::fail("contract_contiguity", &e.to_string(), Severity::Critical),
        }
    }

    fn check_single_open(&self, chains: &BTreeMap<PairKey<'_>, Vec<&ContractInterval>>) -> CheckResult {
        let mut bad = Vec::new();
        for (site, category) in self.panel.pairs() {
            let open = chains
                .get(&(site.site_id.as_str(), category))
                .map_or(0, |chain| chain.iter().filter(|c| c.is_open()).count());
            if open != 1 {
                bad.push(format!("({}, {}): {} open", site.site_id, category, open));
            }
        }

        if bad.is_empty() {
            CheckResult::pass("single_open_interval", "Every pair has exactly one open contract")
        } else {
            CheckResult::fail(
                "single_open_interval",
                &format!("{} pairs without exactly one open contract, e.g. {}", bad.len(), bad[0]),
                Severity::Critical,
            )
        }
    }

    fn check_switch_changes_vendor(
        &self,
        chains: &BTreeMap<PairKey<'_>, Vec<&ContractInterval>>,
    ) -> CheckResult {
        let repeats = chains
            .values()
            .flat_map(|chain| chain.windows(2))
            .filter(|w| w[0].vendor_id == w[1].vendor_id)
            .count();

        if repeats == 0 {
            CheckResult::pass("switch_changes_vendor", "Every switch moves to a different vendor")
        } else {
            CheckResult::fail(
                "switch_changes_vendor",
                &format!("{} switches keep the incumbent vendor", repeats),
                Severity::Critical,
            )
        }
    }

    fn check_vendor_category(&self, contracts: &[ContractInterval]) -> CheckResult {
        let mismatched: Vec<&ContractInterval> = contracts
            .iter()
            .filter(|c| {
                self.panel
                    .vendor(&c.vendor_id)
                    .map_or(true, |v| v.category != c.category)
            })
            .collect();

        match mismatched.first() {
            None => CheckResult::pass("vendor_category_match", "Contract vendors match their category"),
            Some(first) => CheckResult::fail(
                "vendor_category_match",
                &format!(
                    "{} contracts with unknown or wrong-category vendor, e.g. {} ({} in {})",
                    mismatched.len(),
                    first.contract_id,
                    first.vendor_id,
                    first.category
                ),
                Severity::Critical,
            ),
        }
    }

    fn check_horizon_coverage(
        &self,
        chains: &BTreeMap<PairKey<'_>, Vec<&ContractInterval>>,
    ) -> CheckResult {
        let late = chains
            .values()
            .filter_map(|chain| chain.first())
            .filter(|first| first.contract_start_date > self.horizon.start())
            .count();

        if late == 0 {
            CheckResult::pass("horizon_coverage", "Contracts cover the first simulated month")
        } else {
            CheckResult::fail(
                "horizon_coverage",
                &format!("{} pairs start after {}", late, self.horizon.start()),
                Severity::Warning,
            )
        }
    }

    // ========================================================================
    // KPI CHECKS
    // ========================================================================

    fn check_kpi_ranges(&self, kpis: &[KpiRecord]) -> CheckResult {
        let out_of_range = kpis
            .iter()
            .filter(|k| {
                !(DAYS_AR_MIN..=DAYS_AR_MAX).contains(&k.days_ar)
                    || !(DENIAL_RATE_MIN..=DENIAL_RATE_MAX).contains(&k.denial_rate)
            })
            .count();

        if out_of_range == 0 {
            CheckResult::pass("kpi_ranges", "All KPI values inside their clamps")
        } else {
            CheckResult::fail(
                "kpi_ranges",
                &format!("{} KPI rows outside [15, 60] / [0, 20]", out_of_range),
                Severity::Critical,
            )
        }
    }

    fn check_kpi_rounding(&self, kpis: &[KpiRecord]) -> CheckResult {
        let unrounded = kpis
            .iter()
            .filter(|k| !is_two_decimals(k.days_ar) || !is_two_decimals(k.denial_rate))
            .count();

        if unrounded == 0 {
            CheckResult::pass("kpi_rounding", "KPI values rounded to 2 decimals")
        } else {
            CheckResult::fail(
                "kpi_rounding",
                &format!("{} KPI rows carry more than 2 decimals", unrounded),
                Severity::Warning,
            )
        }
    }

    fn check_kpi_rows(&self, kpis: &[KpiRecord]) -> CheckResult {
        let expected = self.panel.sites().len() * self.horizon.len();
        let unique: HashSet<(&str, _)> = kpis.iter().map(|k| (k.site_id.as_str(), k.month)).collect();

        if kpis.len() == expected && unique.len() == expected {
            CheckResult::pass("kpi_row_count", "One KPI row per site and month")
        } else {
            CheckResult::fail(
                "kpi_row_count",
                &format!(
                    "expected {} rows, found {} ({} unique)",
                    expected,
                    kpis.len(),
                    unique.len()
                ),
                Severity::Critical,
            )
        }
    }
}

fn group_chains(contracts: &[ContractInterval]) -> BTreeMap<PairKey<'_>, Vec<&ContractInterval>> {
    let mut chains: BTreeMap<PairKey<'_>, Vec<&ContractInterval>> = BTreeMap::new();
    for c in contracts {
        chains.entry((c.site_id.as_str(), c.category)).or_default().push(c);
    }
    for chain in chains.values_mut() {
        chain.sort_by_key(|c| c.contract_start_date);
    }
    chains
}

fn is_two_decimals(value: f64) -> bool {
    ((value * 100.0).round() / 100.0 - value).abs() < 1e-9
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{IntegrationMatrix, Site, Vendor};
    use crate::ledger::contract_id;
    use crate::temporal::Month;
    use chrono::NaiveDate;

    fn m(y: i32, mo: u32) -> Month {
        Month::new(y, mo).unwrap()
    }

    fn panel() -> Panel {
        let site = Site {
            site_id: "S001".to_string(),
            region: "West".to_string(),
            ehr_system: "Curve".to_string(),
            date_joined: NaiveDate::from_ymd_opt(2019, 2, 1).unwrap(),
            annual_revenue: 1_500_000,
        };
        let vendors = vec![
            Vendor::new("V008", "Weave", Category::Telephony, 3),
            Vendor::new("V009", "Solutionreach", Category::Telephony, 2),
        ];
        Panel::new(vec![site], vendors, IntegrationMatrix::new()).unwrap()
    }

    fn horizon() -> Horizon {
        Horizon::new(m(2019, 1), m(2019, 3)).unwrap()
    }

    fn interval(i: usize, vendor: &str, start: Month, end: Option<Month>) -> ContractInterval {
        ContractInterval {
            contract_id: contract_id(i),
            site_id: "S001".to_string(),
            category: Category::Telephony,
            vendor_id: vendor.to_string(),
            contract_start_date: start,
            contract_end_date: end,
        }
    }

    fn kpi(month: Month, days_ar: f64, denial_rate: f64) -> KpiRecord {
        KpiRecord {
            site_id: "S001".to_string(),
            month,
            days_ar,
            denial_rate,
        }
    }

    fn good_kpis() -> Vec<KpiRecord> {
        vec![
            kpi(m(2019, 1), 33.1, 6.25),
            kpi(m(2019, 2), 34.0, 6.1),
            kpi(m(2019, 3), 32.77, 5.9),
        ]
    }

    #[test]
    fn test_clean_dataset_passes() {
        let panel = panel();
        let contracts = vec![
            interval(0, "V008", m(2019, 1), Some(m(2019, 2))),
            interval(1, "V009", m(2019, 2), None),
        ];
        let report = DatasetAuditor::new(&panel, horizon()).audit(&contracts, &good_kpis());

        assert_eq!(report.failed_count, 0, "{:?}", report.failures().collect::<Vec<_>>());
        assert!(!report.has_critical_issues());
        assert!(report.summary().starts_with("Checks: 8/8 passed"));
    }

    #[test]
    fn test_gap_and_repeat_are_critical() {
        let panel = panel();
        let contracts = vec![
            interval(0, "V008", m(2019, 1), Some(m(2019, 2))),
            interval(1, "V008", m(2019, 3), None),
        ];
        let report = DatasetAuditor::new(&panel, horizon()).audit(&contracts, &good_kpis());

        assert!(report.has_critical_issues());
        assert!(!report.check("contract_contiguity").unwrap().passed);
        assert!(!report.check("switch_changes_vendor").unwrap().passed);
        assert!(report.check("single_open_interval").unwrap().passed);
    }

    #[test]
    fn test_wrong_category_vendor() {
        let panel = panel();
        // V001 is a lab, not a telephony vendor
        let contracts = vec![interval(0, "V001", m(2019, 1), None)];
        let report = DatasetAuditor::new(&panel, horizon()).audit(&contracts, &good_kpis());
        assert!(!report.check("vendor_category_match").unwrap().passed);
    }

    #[test]
    fn test_late_start_is_only_a_warning() {
        let panel = panel();
        let contracts = vec![interval(0, "V008", m(2019, 2), None)];
        let report = DatasetAuditor::new(&panel, horizon()).audit(&contracts, &good_kpis());

        let check = report.check("horizon_coverage").unwrap();
        assert!(!check.passed);
        assert_eq!(check.severity, Severity::Warning);
        assert!(!report.has_critical_issues());
    }

    #[test]
    fn test_kpi_problems() {
        let panel = panel();
        let contracts = vec![interval(0, "V008", m(2019, 1), None)];
        let kpis = vec![kpi(m(2019, 1), 61.0, 6.0), kpi(m(2019, 1), 30.123, 6.0)];
        let report = DatasetAuditor::new(&panel, horizon()).audit(&contracts, &kpis);

        assert!(!report.check("kpi_ranges").unwrap().passed);
        assert!(!report.check("kpi_rounding").unwrap().passed);
        assert!(!report.check("kpi_row_count").unwrap().passed);
    }
}
