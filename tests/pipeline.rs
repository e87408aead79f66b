// End-to-end runs through the CSV pipeline

use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use vendor_panel_sim::pipeline::{run_generate, run_kpis, run_simulate};
use vendor_panel_sim::tables::{self, CONTRACTS_FILE, KPIS_FILE, SUMMARY_FILE};
use vendor_panel_sim::{Category, ContractLedger, Month, PipelineConfig};

const OUTPUT_FILES: [&str; 7] = [
    "sites.csv",
    "vendors.csv",
    "integration_matrix.csv",
    "initial_state.csv",
    "contracts.csv",
    "kpis.csv",
    "summary.json",
];

fn config(dir: &Path, seed: u64) -> PipelineConfig {
    let mut config = PipelineConfig::default().with_seed(seed);
    config.panel.n_sites = 15;
    config.simulation.end_date = NaiveDate::from_ymd_opt(2021, 6, 30).unwrap();
    config.simulation.base_annual_rate = 0.3;
    config.output_dir = dir.to_path_buf();
    config
}

fn read(dir: &Path, file: &str) -> String {
    fs::read_to_string(dir.join(file)).unwrap()
}

#[test]
fn test_generate_writes_all_files() {
    let dir = TempDir::new().unwrap();
    let report = run_generate(&config(dir.path(), 42)).unwrap();

    for file in OUTPUT_FILES {
        assert!(dir.path().join(file).exists(), "missing {}", file);
    }
    assert_eq!(report.summary.sites, 15);
    assert_eq!(report.summary.vendors, 20);
    assert_eq!(report.summary.initial_contracts, 15 * 7);
    assert_eq!(report.summary.months, 30);
    assert_eq!(report.summary.kpi_rows, 15 * 30);
    assert_eq!(report.audit.failed_count, 0);
}

#[test]
fn test_same_seed_is_byte_identical() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    run_generate(&config(a.path(), 7)).unwrap();
    run_generate(&config(b.path(), 7)).unwrap();

    for file in OUTPUT_FILES {
        assert_eq!(read(a.path(), file), read(b.path(), file), "{} differs", file);
    }
}

#[test]
fn test_different_seed_changes_output() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    run_generate(&config(a.path(), 1)).unwrap();
    run_generate(&config(b.path(), 2)).unwrap();

    assert_ne!(read(a.path(), KPIS_FILE), read(b.path(), KPIS_FILE));
}

#[test]
fn test_contracts_hold_ledger_invariants() {
    let dir = TempDir::new().unwrap();
    run_generate(&config(dir.path(), 42)).unwrap();

    let contracts = tables::load_contracts(dir.path()).unwrap();
    let panel = tables::load_panel(dir.path()).unwrap();

    // seeds come first, one per pair
    let seeds = 15 * 7;
    let start = Month::new(2019, 1).unwrap();
    assert!(contracts[..seeds].iter().all(|c| c.contract_start_date == start));
    assert!(contracts[seeds..].iter().all(|c| c.contract_start_date > start));
    assert!(contracts.len() > seeds, "no switches at rate 0.3 over 30 months");

    // switch rows are chronological
    let switch_months: Vec<Month> = contracts[seeds..].iter().map(|c| c.contract_start_date).collect();
    assert!(switch_months.windows(2).all(|w| w[0] <= w[1]));

    // ids are sequential
    for (i, c) in contracts.iter().enumerate() {
        assert_eq!(c.contract_id, format!("C{:05}", i + 1));
        assert_eq!(panel.vendor(&c.vendor_id).unwrap().category, c.category);
    }

    let ledger = ContractLedger::from_intervals(contracts).unwrap();
    assert_eq!(ledger.pair_count(), seeds);
    for month in [start, Month::new(2020, 7).unwrap(), Month::new(2021, 6).unwrap()] {
        for site in 1..=15 {
            let site_id = format!("S{:03}", site);
            for category in Category::ALL {
                assert!(ledger.interval_at(&site_id, category, month).is_ok());
            }
        }
    }
}

#[test]
fn test_kpi_table_shape() {
    let dir = TempDir::new().unwrap();
    run_generate(&config(dir.path(), 42)).unwrap();

    let text = read(dir.path(), KPIS_FILE);
    assert_eq!(text.lines().next().unwrap(), "site_id,month,days_ar,denial_rate");

    let kpis = tables::load_kpis(dir.path()).unwrap();
    let mut per_site: HashMap<&str, usize> = HashMap::new();
    for k in &kpis {
        *per_site.entry(k.site_id.as_str()).or_insert(0) += 1;
        assert!((15.0..=60.0).contains(&k.days_ar));
        assert!((0.0..=20.0).contains(&k.denial_rate));
    }
    assert_eq!(per_site.len(), 15);
    assert!(per_site.values().all(|&n| n == 30));

    // site-major, chronological within a site
    assert_eq!(kpis[0].site_id, "S001");
    assert_eq!(kpis[29].month, Month::new(2021, 6).unwrap());
    assert_eq!(kpis[30].site_id, "S002");
}

#[test]
fn test_simulate_reproduces_generate() {
    let generated = TempDir::new().unwrap();
    run_generate(&config(generated.path(), 42)).unwrap();

    let resimulated = TempDir::new().unwrap();
    run_simulate(&config(resimulated.path(), 42), generated.path()).unwrap();

    assert_eq!(read(generated.path(), CONTRACTS_FILE), read(resimulated.path(), CONTRACTS_FILE));
    assert_eq!(read(generated.path(), KPIS_FILE), read(resimulated.path(), KPIS_FILE));
}

#[test]
fn test_kpis_from_existing_contracts() {
    let generated = TempDir::new().unwrap();
    run_generate(&config(generated.path(), 42)).unwrap();

    let rerun = TempDir::new().unwrap();
    let report = run_kpis(&config(rerun.path(), 42), generated.path()).unwrap();

    assert_eq!(read(generated.path(), KPIS_FILE), read(rerun.path(), KPIS_FILE));
    assert_eq!(report.summary.kpi_rows, 15 * 30);
    assert!(rerun.path().join(SUMMARY_FILE).exists());
}

#[test]
fn test_kpis_rejects_broken_contracts() {
    let generated = TempDir::new().unwrap();
    run_generate(&config(generated.path(), 42)).unwrap();

    // duplicate an open row: repeated contract id and two open intervals
    let text = read(generated.path(), CONTRACTS_FILE);
    let mut lines: Vec<&str> = text.lines().collect();
    let open = lines.iter().position(|l| l.ends_with(',')).unwrap();
    let row = lines[open];
    lines.insert(open + 1, row);
    fs::write(generated.path().join(CONTRACTS_FILE), lines.join("\n") + "\n").unwrap();

    let rerun = TempDir::new().unwrap();
    assert!(run_kpis(&config(rerun.path(), 42), generated.path()).is_err());
}

fn rewrite_contracts(dir: &Path, edit: impl FnOnce(&mut Vec<String>)) {
    let mut lines: Vec<String> = read(dir, CONTRACTS_FILE).lines().map(str::to_string).collect();
    edit(&mut lines);
    fs::write(dir.join(CONTRACTS_FILE), lines.join("\n") + "\n").unwrap();
}

#[test]
fn test_kpis_rejects_contract_for_unknown_site() {
    let generated = TempDir::new().unwrap();
    run_generate(&config(generated.path(), 42)).unwrap();
    rewrite_contracts(generated.path(), |lines| {
        lines.push("C99999,S999,Lab,V001,2019-01-01,".to_string());
    });

    let rerun = TempDir::new().unwrap();
    let err = run_kpis(&config(rerun.path(), 42), generated.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("S999"));
    assert!(!rerun.path().join(KPIS_FILE).exists());
    assert!(!rerun.path().join(CONTRACTS_FILE).exists());
}

#[test]
fn test_kpis_rejects_contract_for_unknown_vendor() {
    let generated = TempDir::new().unwrap();
    run_generate(&config(generated.path(), 42)).unwrap();
    rewrite_contracts(generated.path(), |lines| {
        // first data row is a seed contract: C00001,S001,<category>,<vendor>,...
        let mut fields: Vec<String> = lines[1].split(',').map(str::to_string).collect();
        fields[3] = "V999".to_string();
        lines[1] = fields.join(",");
    });

    let rerun = TempDir::new().unwrap();
    let err = run_kpis(&config(rerun.path(), 42), generated.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("V999"));
    assert!(!rerun.path().join(KPIS_FILE).exists());
}

#[test]
fn test_run_id_tracks_input_tables() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    let same_size_other_panel = {
        let mut c = config(b.path(), 42);
        c.panel.seed = 43;
        c
    };
    let first = run_generate(&config(a.path(), 42)).unwrap();
    let second = run_generate(&same_size_other_panel).unwrap();
    assert_eq!(first.summary.sites, second.summary.sites);
    assert_ne!(first.summary.run_id, second.summary.run_id);

    let again = TempDir::new().unwrap();
    let rerun = run_generate(&config(again.path(), 42)).unwrap();
    assert_eq!(first.summary.run_id, rerun.summary.run_id);
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut bad = config(dir.path(), 42);
    bad.simulation.start_date = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    assert!(run_generate(&bad).is_err());

    let mut bad = config(dir.path(), 42);
    bad.panel.n_sites = 0;
    assert!(run_generate(&bad).is_err());
}
