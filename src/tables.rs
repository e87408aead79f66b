// 🗂️ Tables - CSV in, CSV out
//
// Every artifact is a flat CSV whose columns are the serde field names of
// its row type. Loading goes through one generic reader so each file
// reports its own name on failure.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::entities::{IntegrationMatrix, IntegrationScore, Panel, Site, Vendor};
use crate::kpi::KpiRecord;
use crate::ledger::{ContractInterval, InitialAssignment};

// ============================================================================
// FILE NAMES
// ============================================================================

pub const SITES_FILE: &str = "sites.csv";
pub const VENDORS_FILE: &str = "vendors.csv";
pub const INTEGRATION_FILE: &str = "integration_matrix.csv";
pub const INITIAL_STATE_FILE: &str = "initial_state.csv";
pub const CONTRACTS_FILE: &str = "contracts.csv";
pub const KPIS_FILE: &str = "kpis.csv";
pub const SUMMARY_FILE: &str = "summary.json";

// ============================================================================
// GENERIC READ / WRITE
// ============================================================================

/// Deserialize every row of a headed CSV file
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        // +2: header row and 1-based lines
        let row: T = result
            .with_context(|| format!("Failed to parse {} line {}", path.display(), line + 2))?;
        rows.push(row);
    }

    Ok(rows)
}

/// Write rows with a header derived from the row type
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
    }
    wtr.flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;

    Ok(())
}

// ============================================================================
// PANEL TABLES
// ============================================================================

/// Matrix rows in panel order (site-major, catalog order)
pub fn integration_rows(panel: &Panel) -> Vec<IntegrationScore> {
    let mut rows = Vec::with_capacity(panel.integration().len());
    for site in panel.sites() {
        for vendor in panel.vendors() {
            if let Some(q) = panel.integration().get(&site.site_id, &vendor.vendor_id) {
                rows.push(IntegrationScore {
                    site_id: site.site_id.clone(),
                    vendor_id: vendor.vendor_id.clone(),
                    integration_quality: q,
                });
            }
        }
    }
    rows
}

/// sites.csv + vendors.csv + integration_matrix.csv
pub fn write_panel(dir: &Path, panel: &Panel) -> Result<()> {
    write_table(&dir.join(SITES_FILE), panel.sites())?;
    write_table(&dir.join(VENDORS_FILE), panel.vendors())?;
    write_table(&dir.join(INTEGRATION_FILE), &integration_rows(panel))?;
    Ok(())
}

/// Read and validate the three panel tables from `dir`
pub fn load_panel(dir: &Path) -> Result<Panel> {
    let sites: Vec<Site> = read_table(&dir.join(SITES_FILE))?;
    let vendors: Vec<Vendor> = read_table(&dir.join(VENDORS_FILE))?;
    let scores: Vec<IntegrationScore> = read_table(&dir.join(INTEGRATION_FILE))?;

    let matrix = IntegrationMatrix::from_scores(&scores)
        .with_context(|| format!("Invalid {}", INTEGRATION_FILE))?;

    Panel::new(sites, vendors, matrix)
        .with_context(|| format!("Invalid panel in {}", dir.display()))
}

pub fn load_initial_state(dir: &Path) -> Result<Vec<InitialAssignment>> {
    read_table(&dir.join(INITIAL_STATE_FILE))
}

pub fn load_contracts(dir: &Path) -> Result<Vec<ContractInterval>> {
    read_table(&dir.join(CONTRACTS_FILE))
}

pub fn load_kpis(dir: &Path) -> Result<Vec<KpiRecord>> {
    read_table(&dir.join(KPIS_FILE))
}

// ============================================================================
// TESTS
// ============================================================================
