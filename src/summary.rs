// 📊 Run Summary - headline numbers for one pipeline run (summary.json)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::config::SimulationConfig;
use crate::entities::{Category, Panel};
use crate::kpi::{round2, KpiRecord};
use crate::ledger::ContractInterval;
use crate::quality::AuditReport;
use crate::tables::integration_rows;
use crate::temporal::Horizon;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Same parameters and same input tables, same id
    pub run_id: Uuid,
    /// SHA-256 over sites, vendors, integration scores and contracts
    pub input_fingerprint: String,
    pub seed: u64,
    pub start_month: String,
    pub end_month: String,
    pub months: usize,
    pub base_annual_rate: f64,

    pub sites: usize,
    pub vendors: usize,
    pub integration_scores: usize,
    pub contract_rows: usize,
    pub kpi_rows: usize,

    pub initial_contracts: usize,
    pub total_switches: usize,
    pub suppressed_switches: usize,
    /// switches / initial contracts / years
    pub annual_switch_rate: f64,
    pub switches_by_category: BTreeMap<String, usize>,

    pub mean_days_ar: f64,
    pub mean_denial_rate: f64,

    pub audit: String,
}

/// Hash of every row the run read or wrote for its panel and contracts
pub fn input_fingerprint(panel: &Panel, contracts: &[ContractInterval]) -> String {
    let mut hasher = Sha256::new();
    for s in panel.sites() {
        hasher.update(format!(
            "site|{}|{}|{}|{}|{}\n",
            s.site_id, s.region, s.ehr_system, s.date_joined, s.annual_revenue
        ));
    }
    for v in panel.vendors() {
        hasher.update(format!(
            "vendor|{}|{}|{}|{}|{}\n",
            v.vendor_id, v.name, v.category, v.tier, v.monthly_price_per_site
        ));
    }
    for row in integration_rows(panel) {
        hasher.update(format!(
            "integration|{}|{}|{}\n",
            row.site_id, row.vendor_id, row.integration_quality
        ));
    }
    for c in contracts {
        let end = c.contract_end_date.map(|m| m.to_string()).unwrap_or_default();
        hasher.update(format!(
            "contract|{}|{}|{}|{}|{}|{}\n",
            c.contract_id, c.site_id, c.category, c.vendor_id, c.contract_start_date, end
        ));
    }
    format!("{:x}", hasher.finalize())
}

/// Deterministic id derived from the run parameters and the input fingerprint
pub fn run_id(config: &SimulationConfig, fingerprint: &str) -> Uuid {
    let name = format!(
        "vendor-panel-sim;seed={};start={};end={};rate={};input={}",
        config.seed, config.start_date, config.end_date, config.base_annual_rate, fingerprint
    );
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

impl RunSummary {
    /// Everything is recomputed from the tables themselves
    pub fn build(
        config: &SimulationConfig,
        horizon: &Horizon,
        panel: &Panel,
        contracts: &[ContractInterval],
        kpis: &[KpiRecord],
        suppressed_switches: usize,
        audit: &AuditReport,
    ) -> Self {
        let mut chain_lengths: HashMap<(&str, Category), usize> = HashMap::new();
        for c in contracts {
            *chain_lengths.entry((c.site_id.as_str(), c.category)).or_insert(0) += 1;
        }

        let mut switches_by_category: BTreeMap<String, usize> = panel
            .categories()
            .iter()
            .map(|c| (c.to_string(), 0))
            .collect();
        for (&(_, category), &len) in &chain_lengths {
            *switches_by_category.entry(category.to_string()).or_insert(0) += len - 1;
        }

        let initial_contracts = chain_lengths.len();
        let total_switches = contracts.len() - initial_contracts;
        let annual_switch_rate = if initial_contracts == 0 {
            0.0
        } else {
            total_switches as f64 / initial_contracts as f64 / horizon.years()
        };

        let (mean_days_ar, mean_denial_rate) = if kpis.is_empty() {
            (0.0, 0.0)
        } else {
            let n = kpis.len() as f64;
            (
                round2(kpis.iter().map(|k| k.days_ar).sum::<f64>() / n),
                round2(kpis.iter().map(|k| k.denial_rate).sum::<f64>() / n),
            )
        };

        let input_fingerprint = input_fingerprint(panel, contracts);
        RunSummary {
            run_id: run_id(config, &input_fingerprint),
            input_fingerprint,
            seed: config.seed,
            start_month: horizon.start().to_string(),
            end_month: horizon.end().to_string(),
            months: horizon.len(),
            base_annual_rate: config.base_annual_rate,
            sites: panel.sites().len(),
            vendors: panel.vendors().len(),
            integration_scores: panel.integration().len(),
            contract_rows: contracts.len(),
            kpi_rows: kpis.len(),
            initial_contracts,
            total_switches,
            suppressed_switches,
            annual_switch_rate,
            switches_by_category,
            mean_days_ar,
            mean_denial_rate,
            audit: audit.summary(),
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run summary")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
