use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use vendor_panel_sim::pipeline::{run_generate, run_kpis, run_simulate, PipelineReport};
use vendor_panel_sim::{PipelineConfig, VERSION};

/// Vendor switching panel simulator for dental practice sites
#[derive(Parser)]
#[command(name = "vendor-panel-sim")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a panel and run the full simulation
    Generate {
        /// Number of sites in the synthetic panel
        #[arg(long)]
        n_sites: Option<usize>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Simulate switches + KPIs on existing panel tables
    Simulate {
        /// Directory holding sites, vendors, integration_matrix and initial_state CSVs
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Regenerate KPIs from an existing contracts.csv
    Kpis {
        /// Directory holding the panel tables and contracts.csv
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// JSON config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Random seed (panel and simulation)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// First simulated month (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last simulated month, inclusive (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Annual switch rate before multipliers
    #[arg(long)]
    base_rate: Option<f64>,
}

impl RunArgs {
    fn into_config(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(start) = self.start {
            config.simulation.start_date = start;
        }
        if let Some(end) = self.end {
            config.simulation.end_date = end;
        }
        if let Some(rate) = self.base_rate {
            config.simulation.base_annual_rate = rate;
        }

        Ok(config)
    }
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("warn")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Generate { n_sites, run } => run.into_config().and_then(|mut config| {
            if let Some(n) = n_sites {
                config.panel.n_sites = n;
            }
            run_generate(&config)
        }),
        Commands::Simulate { input, run } => {
            run.into_config().and_then(|config| run_simulate(&config, &input))
        }
        Commands::Kpis { input, run } => {
            run.into_config().and_then(|config| run_kpis(&config, &input))
        }
    };

    match result {
        Ok(report) => {
            if !cli.quiet {
                print_report(&report);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_report(report: &PipelineReport) {
    let s = &report.summary;

    println!("\n🦷 Vendor Panel Simulator v{}", VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🆔 Run:      {}", s.run_id);
    println!("🗓️  Horizon:  {} → {} ({} months)", s.start_month, s.end_month, s.months);
    println!("🎲 Seed:     {}", s.seed);

    println!("\n📦 Panel");
    println!("   Sites:               {}", s.sites);
    println!("   Vendors:             {}", s.vendors);
    println!("   Integration scores:  {}", s.integration_scores);

    println!("\n🔁 Switching");
    println!("   Initial contracts:   {}", s.initial_contracts);
    println!("   Switches:            {}", s.total_switches);
    println!("   Suppressed:          {}", s.suppressed_switches);
    println!("   Annual switch rate:  {:.2}%", s.annual_switch_rate * 100.0);
    for (category, n) in &s.switches_by_category {
        println!("     {:<15} {}", category, n);
    }

    println!("\n📈 KPIs");
    println!("   Rows:                {}", s.kpi_rows);
    println!("   Mean days A/R:       {:.2}", s.mean_days_ar);
    println!("   Mean denial rate:    {:.2}%", s.mean_denial_rate);

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ {}", s.audit);
    println!("📂 Output: {}", report.output_dir.display());
}
