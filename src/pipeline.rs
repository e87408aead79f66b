// 🚚 Pipeline - end-to-end runs that read and write the CSV artifacts
//
// generate: panel → initial state → switches → KPIs → audit → files
// simulate: existing panel + initial state → switches → KPIs → audit
// kpis:     existing panel + contracts → KPIs → audit
//
// All three finish with the same audit + summary step and refuse to
// report success when the audit finds a critical problem.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::PipelineConfig;
use crate::entities::Panel;
use crate::generate::generate_panel;
use crate::kpi::{KpiRecord, KpiSynthesizer};
use crate::ledger::{ContractInterval, ContractLedger, InitialAssignment};
use crate::quality::{AuditReport, DatasetAuditor};
use crate::rng::RandomSource;
use crate::simulation::{assign_initial_state, SwitchSimulator};
use crate::summary::RunSummary;
use crate::switching::SwitchModel;
use crate::tables::{self, CONTRACTS_FILE, INITIAL_STATE_FILE, KPIS_FILE, SUMMARY_FILE};
use crate::temporal::Horizon;

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub output_dir: PathBuf,
    pub summary: RunSummary,
    pub audit: AuditReport,
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Synthesize a panel from scratch and run everything on it
pub fn run_generate(config: &PipelineConfig) -> Result<PipelineReport> {
    config.validate()?;
    let horizon = config.simulation.horizon()?;
    let out = prepare_output(&config.output_dir)?;

    let panel = generate_panel(
        config.panel.n_sites,
        config.simulation.start_date,
        &RandomSource::new(config.panel.seed),
    )?;
    tables::write_panel(&out, &panel)?;

    let source = RandomSource::new(config.simulation.seed);
    let initial = assign_initial_state(&panel, horizon.start(), &source)?;
    info!(rows = initial.len(), "initial state assigned");
    tables::write_table(&out.join(INITIAL_STATE_FILE), &initial)?;

    simulate_and_finish(config, &out, &panel, &initial, horizon)
}

/// Run the switch simulation on panel tables already on disk
pub fn run_simulate(config: &PipelineConfig, input: &Path) -> Result<PipelineReport> {
    config.simulation.validate()?;
    let horizon = config.simulation.horizon()?;

    let panel = tables::load_panel(input)?;
    let initial = tables::load_initial_state(input)?;
    info!(
        sites = panel.sites().len(),
        vendors = panel.vendors().len(),
        initial = initial.len(),
        input = %input.display(),
        "panel loaded"
    );

    let out = prepare_output(&config.output_dir)?;
    if out != input {
        tables::write_panel(&out, &panel)?;
        tables::write_table(&out.join(INITIAL_STATE_FILE), &initial)?;
    }

    simulate_and_finish(config, &out, &panel, &initial, horizon)
}

/// Regenerate KPIs from an existing contracts table
pub fn run_kpis(config: &PipelineConfig, input: &Path) -> Result<PipelineReport> {
    config.simulation.validate()?;
    let horizon = config.simulation.horizon()?;

    let panel = tables::load_panel(input)?;
    let contracts = tables::load_contracts(input)?;
    let ledger = ContractLedger::from_intervals(contracts)
        .with_context(|| format!("Invalid {} in {}", CONTRACTS_FILE, input.display()))?;
    ledger
        .check_references(&panel)
        .with_context(|| format!("{} does not match the panel in {}", CONTRACTS_FILE, input.display()))?;
    info!(contracts = ledger.len(), switches = ledger.switch_count(), "contracts loaded");

    let out = prepare_output(&config.output_dir)?;
    if out != input {
        tables::write_panel(&out, &panel)?;
        tables::write_table(&out.join(CONTRACTS_FILE), ledger.history())?;
    }

    let kpis = synthesize_kpis(config, &panel, &ledger, &horizon)?;
    tables::write_table(&out.join(KPIS_FILE), &kpis)?;

    // suppressed trials are not recorded in contracts.csv
    finish(config, &out, &panel, ledger.history(), &kpis, 0, horizon)
}

// ============================================================================
// STAGES
// ============================================================================

fn prepare_output(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    Ok(dir.to_path_buf())
}

fn simulate_and_finish(
    config: &PipelineConfig,
    out: &Path,
    panel: &Panel,
    initial: &[InitialAssignment],
    horizon: Horizon,
) -> Result<PipelineReport> {
    let simulator = SwitchSimulator::new(
        panel,
        SwitchModel::new(config.simulation.base_annual_rate),
        RandomSource::new(config.simulation.seed),
    );
    let outcome = simulator.run(initial, &horizon)?;
    tables::write_table(&out.join(CONTRACTS_FILE), outcome.ledger.history())?;

    let kpis = synthesize_kpis(config, panel, &outcome.ledger, &horizon)?;
    tables::write_table(&out.join(KPIS_FILE), &kpis)?;

    finish(
        config,
        out,
        panel,
        outcome.ledger.history(),
        &kpis,
        outcome.suppressed,
        horizon,
    )
}

fn synthesize_kpis(
    config: &PipelineConfig,
    panel: &Panel,
    ledger: &ContractLedger,
    horizon: &Horizon,
) -> Result<Vec<KpiRecord>> {
    let synthesizer = KpiSynthesizer::new(panel, ledger, RandomSource::new(config.simulation.seed))?;
    let kpis = synthesizer.synthesize(horizon)?;
    info!(rows = kpis.len(), "kpis synthesized");
    Ok(kpis)
}

fn finish(
    config: &PipelineConfig,
    out: &Path,
    panel: &Panel,
    contracts: &[ContractInterval],
    kpis: &[KpiRecord],
    suppressed: usize,
    horizon: Horizon,
) -> Result<PipelineReport> {
    let audit = DatasetAuditor::new(panel, horizon).audit(contracts, kpis);
    info!("{}", audit.summary());
    if audit.has_critical_issues() {
        let failed: Vec<&str> = audit.failures().map(|c| c.check_name.as_str()).collect();
        bail!("Dataset audit failed: {}", failed.join(", "));
    }

    let summary = RunSummary::build(
        &config.simulation,
        &horizon,
        panel,
        contracts,
        kpis,
        suppressed,
        &audit,
    );
    summary.write_json(&out.join(SUMMARY_FILE))?;
    info!(
        run_id = %summary.run_id,
        switches = summary.total_switches,
        annual_rate = summary.annual_switch_rate,
        output = %out.display(),
        "run complete"
    );

    Ok(PipelineReport {
        output_dir: out.to_path_buf(),
        summary,
        audit,
    })
}
