// 🏭 Panel Generator - synthetic sites, vendor catalog, integration matrix
//
// Static tabular synthesis feeding the simulation core:
// 1. Sites: region, EHR, join date, revenue
// 2. Vendors: fixed catalog (see entities::vendor)
// 3. Integration: rule-based per category, probabilistic for RCM

use chrono::{Days, NaiveDate};
use rand::Rng;
use rand_distr::{Distribution, LogNormal};
use tracing::info;

use crate::entities::site::site_id;
use crate::entities::{
    vendor_catalog, Category, IntegrationMatrix, IntegrationQuality, Panel, Site, Vendor,
};
use crate::error::{SimError, SimResult};
use crate::rng::{pick_weighted, RandomSource, Stream};

// ============================================================================
// SITE DISTRIBUTIONS
// ============================================================================

/// US dental practice density by region
pub const REGIONS: [(&str, f64); 4] = [
    ("Northeast", 0.25),
    ("South", 0.35),
    ("West", 0.20),
    ("Midwest", 0.20),
];

/// EHR market shares
pub const EHR_SYSTEMS: [(&str, f64); 5] = [
    ("Dentrix", 0.35),
    ("OpenDental", 0.25),
    ("Eaglesoft", 0.20),
    ("Curve", 0.10),
    ("Other", 0.10),
];

/// Join dates fall within the first year of the panel
const JOIN_WINDOW_DAYS: f64 = 364.0;

const REVENUE_LOG_MEAN: f64 = 14.5;
const REVENUE_LOG_SIGMA: f64 = 0.3;

/// EHRs with mature RCM integrations
const MAJOR_EHRS: [&str; 4] = ["Dentrix", "OpenDental", "Eaglesoft", "Denticon"];

fn pick_label<R: Rng + ?Sized>(table: &[(&'static str, f64)], rng: &mut R) -> &'static str {
    let weights: Vec<f64> = table.iter().map(|(_, w)| *w).collect();
    let u: f64 = rng.random();
    let i = pick_weighted(&weights, u).unwrap_or(table.len() - 1);
    table[i].0
}

// ============================================================================
// SITES
// ============================================================================

/// `n_sites` practices joining during the year starting at `panel_start`
pub fn generate_sites(
    n_sites: usize,
    panel_start: NaiveDate,
    source: &RandomSource,
) -> SimResult<Vec<Site>> {
    let revenue = LogNormal::new(REVENUE_LOG_MEAN, REVENUE_LOG_SIGMA)
        .map_err(|e| SimError::Distribution(e.to_string()))?;

    let mut sites = Vec::with_capacity(n_sites);
    for i in 0..n_sites {
        let id = site_id(i);
        let mut rng = source.substream(Stream::Sites, &[id.as_str()]);

        let region = pick_label(&REGIONS, &mut rng);
        let ehr_system = pick_label(&EHR_SYSTEMS, &mut rng);

        let offset = rng.random_range(0.0..JOIN_WINDOW_DAYS).floor() as u64;
        let date_joined = panel_start.checked_add_days(Days::new(offset)).ok_or_else(|| {
            SimError::InvalidConfig(format!("join date overflow from {}", panel_start))
        })?;

        let annual_revenue = (revenue.sample(&mut rng) / 1000.0).round() as u64 * 1000;

        sites.push(Site {
            site_id: id,
            region: region.to_string(),
            ehr_system: ehr_system.to_string(),
            date_joined,
            annual_revenue,
        });
    }

    Ok(sites)
}

// ============================================================================
// INTEGRATION RULES
// ============================================================================

/// Categories whose integration does not depend on chance
fn fixed_integration(category: Category, vendor_id: &str, ehr: &str) -> Option<IntegrationQuality> {
    use IntegrationQuality::*;

    match category {
        // STL file upload
        Category::Lab => Some(Partial),
        // call pop needs the API
        Category::Telephony => Some(Full),
        Category::Scheduling if vendor_id == "V012" && ehr == "Denticon" => Some(Manual),
        Category::Scheduling => Some(Full),
        Category::Supplies => Some(Partial),
        _ => None,
    }
}

/// IT MSPs integrate fully with the EHRs they own or monitor
fn it_msp_integration(vendor_id: &str, ehr: &str) -> IntegrationQuality {
    match vendor_id {
        "V016" if matches!(ehr, "Dentrix" | "Dentrix Ascend" | "Dentrix Enterprise") => {
            IntegrationQuality::Full
        }
        "V017" if matches!(ehr, "Dentrix" | "OpenDental" | "Eaglesoft" | "Curve") => {
            IntegrationQuality::Full
        }
        _ => IntegrationQuality::Partial,
    }
}

fn clearinghouse_integration(vendor_id: &str, ehr: &str) -> IntegrationQuality {
    match vendor_id {
        "V014" if matches!(ehr, "OpenDental" | "Eaglesoft" | "Curve" | "Denticon") => {
            IntegrationQuality::Full
        }
        // attachments only
        _ => IntegrationQuality::Partial,
    }
}

/// Tier-1 RCM on a major EHR: 80% full / 15% partial / 5% manual;
/// everyone else 40 / 30 / 30
fn rcm_integration(tier: u8, ehr: &str, u: f64) -> IntegrationQuality {
    let (full, partial) = if tier == 1 && MAJOR_EHRS.contains(&ehr) {
        (0.80, 0.95)
    } else {
        (0.40, 0.70)
    };

    if u < full {
        IntegrationQuality::Full
    } else if u < partial {
        IntegrationQuality::Partial
    } else {
        IntegrationQuality::Manual
    }
}

/// Integration quality for one (site, vendor) pair
pub fn integration_quality(
    site: &Site,
    vendor: &Vendor,
    source: &RandomSource,
) -> IntegrationQuality {
    let ehr = site.ehr_system.as_str();
    if let Some(fixed) = fixed_integration(vendor.category, &vendor.vendor_id, ehr) {
        return fixed;
    }

    match vendor.category {
        Category::ItMsp => it_msp_integration(&vendor.vendor_id, ehr),
        Category::Clearinghouse => clearinghouse_integration(&vendor.vendor_id, ehr),
        Category::Rcm => {
            let mut rng = source.substream(
                Stream::Integration,
                &[site.site_id.as_str(), vendor.vendor_id.as_str()],
            );
            rcm_integration(vendor.tier, ehr, rng.random())
        }
        _ => IntegrationQuality::Partial,
    }
}

/// Full site × vendor matrix
pub fn generate_integration_matrix(
    sites: &[Site],
    vendors: &[Vendor],
    source: &RandomSource,
) -> IntegrationMatrix {
    let mut matrix = IntegrationMatrix::new();
    for site in sites {
        for vendor in vendors {
            matrix.insert(
                &site.site_id,
                &vendor.vendor_id,
                integration_quality(site, vendor, source),
            );
        }
    }
    matrix
}

// ============================================================================
// PANEL
// ============================================================================

/// Sites + catalog + integration, validated into a Panel
pub fn generate_panel(
    n_sites: usize,
    panel_start: NaiveDate,
    source: &RandomSource,
) -> SimResult<Panel> {
    let sites = generate_sites(n_sites, panel_start, source)?;
    let vendors = vendor_catalog();
    let matrix = generate_integration_matrix(&sites, &vendors, source);

    info!(
        sites = sites.len(),
        vendors = vendors.len(),
        integration_pairs = matrix.len(),
        "panel generated"
    );

    Panel::new(sites, vendors, matrix)
}

// ============================================================================
// TESTS
// ============================================================================
