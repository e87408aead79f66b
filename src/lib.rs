// Vendor Panel Simulator - Core Library
// Exposes all modules for use in the CLI and tests

pub mod entities;       // Sites, vendors, categories, integration, panel
pub mod error;          // SimError
pub mod temporal;       // Month + Horizon
pub mod rng;            // Keyed random sub-streams
pub mod selector;       // Softmax vendor choice
pub mod switching;      // Monthly switch probability
pub mod ledger;         // Contract interval history
pub mod simulation;     // Month-by-month switch loop
pub mod kpi;            // Days A/R + denial rate synthesis
pub mod generate;       // Synthetic panel
pub mod tables;         // CSV read/write
pub mod config;         // Run parameters
pub mod quality;        // Dataset audit
pub mod summary;        // summary.json
pub mod pipeline;       // End-to-end runs

// Re-export commonly used types
pub use entities::{
    Category, IntegrationMatrix, IntegrationQuality, IntegrationScore,
    Panel, Site, Vendor, vendor_catalog,
};
pub use error::{SimError, SimResult};
pub use temporal::{Horizon, Month};
pub use rng::{RandomSource, Stream};
pub use selector::VendorSelector;
pub use switching::SwitchModel;
pub use ledger::{ContractInterval, ContractLedger, InitialAssignment, SwitchEvent};
pub use simulation::{assign_initial_state, SimulationOutcome, SwitchSimulator};
pub use kpi::{KpiModel, KpiRecord, KpiSynthesizer};
pub use generate::generate_panel;
pub use config::{PanelConfig, PipelineConfig, SimulationConfig};
pub use quality::{AuditReport, CheckResult, DatasetAuditor, Severity};
pub use summary::RunSummary;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
