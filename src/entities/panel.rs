// 📋 Panel - read-only bundle of sites, vendors and integration scores
//
// Every component borrows the panel; nothing mutates it after construction.
// Construction is where malformed or dangling input rows get rejected.

use std::collections::HashMap;

use super::{Category, IntegrationMatrix, IntegrationQuality, Site, Vendor};
use crate::error::{SimError, SimResult};

// ============================================================================
// PANEL
// ============================================================================

#[derive(Debug, Clone)]
pub struct Panel {
    sites: Vec<Site>,
    vendors: Vec<Vendor>,
    integration: IntegrationMatrix,

    site_index: HashMap<String, usize>,
    vendor_index: HashMap<String, usize>,

    /// Categories in first-appearance order of the vendor table
    categories: Vec<Category>,
}

impl Panel {
    /// Validate and index the three panel tables
    pub fn new(
        sites: Vec<Site>,
        vendors: Vec<Vendor>,
        integration: IntegrationMatrix,
    ) -> SimResult<Self> {
        let mut site_index = HashMap::with_capacity(sites.len());
        for (i, site) in sites.iter().enumerate() {
            site.validate()?;
            if site_index.insert(site.site_id.clone(), i).is_some() {
                return Err(SimError::input(format!("duplicate site_id {}", site.site_id)));
            }
        }

        let mut vendor_index = HashMap::with_capacity(vendors.len());
        let mut categories = Vec::new();
        for (i, vendor) in vendors.iter().enumerate() {
            vendor.validate()?;
            if vendor_index.insert(vendor.vendor_id.clone(), i).is_some() {
                return Err(SimError::input(format!(
                    "duplicate vendor_id {}",
                    vendor.vendor_id
                )));
            }
            if !categories.contains(&vendor.category) {
                categories.push(vendor.category);
            }
        }

        for (site_id, vendor_id, _) in integration.pairs() {
            if !site_index.contains_key(site_id) {
                return Err(SimError::input(format!(
                    "integration score references unknown site {}",
                    site_id
                )));
            }
            if !vendor_index.contains_key(vendor_id) {
                return Err(SimError::input(format!(
                    "integration score references unknown vendor {}",
                    vendor_id
                )));
            }
        }

        Ok(Panel {
            sites,
            vendors,
            integration,
            site_index,
            vendor_index,
            categories,
        })
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn vendors(&self) -> &[Vendor] {
        &self.vendors
    }

    pub fn integration(&self) -> &IntegrationMatrix {
        &self.integration
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn site(&self, site_id: &str) -> Option<&Site> {
        self.site_index.get(site_id).map(|&i| &self.sites[i])
    }

    pub fn vendor(&self, vendor_id: &str) -> Option<&Vendor> {
        self.vendor_index.get(vendor_id).map(|&i| &self.vendors[i])
    }

    /// Vendor lookup for ids coming from another table
    pub fn require_vendor(&self, vendor_id: &str) -> SimResult<&Vendor> {
        self.vendor(vendor_id)
            .ok_or_else(|| SimError::input(format!("unknown vendor {}", vendor_id)))
    }

    pub fn require_site(&self, site_id: &str) -> SimResult<&Site> {
        self.site(site_id)
            .ok_or_else(|| SimError::input(format!("unknown site {}", site_id)))
    }

    /// Vendors of one category, in table order
    pub fn vendors_in(&self, category: Category) -> impl Iterator<Item = &Vendor> {
        self.vendors.iter().filter(move |v| v.category == category)
    }

    /// Integration quality with the manual default
    pub fn quality(&self, site_id: &str, vendor_id: &str) -> IntegrationQuality {
        self.integration.quality(site_id, vendor_id)
    }

    /// (site, category) pairs in canonical iteration order
    pub fn pairs(&self) -> impl Iterator<Item = (&Site, Category)> {
        self.sites
            .iter()
            .flat_map(move |site| self.categories.iter().map(move |&c| (site, c)))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn site(id: &str) -> Site {
        Site {
            site_id: id.to_string(),
            region: "South".to_string(),
            ehr_system: "Dentrix".to_string(),
            date_joined: NaiveDate::from_ymd_opt(2019, 2, 1).unwrap(),
            annual_revenue: 2_000_000,
        }
    }

    #[test]
    fn test_panel_indexes_and_categories() {
        let vendors = vec![
            Vendor::new("V005", "Apex", Category::Rcm, 2),
            Vendor::new("V001", "NDL", Category::Lab, 2),
            Vendor::new("V006", "EOS", Category::Rcm, 3),
        ];
        let panel = Panel::new(vec![site("S001"), site("S002")], vendors, IntegrationMatrix::new())
            .unwrap();

        assert_eq!(panel.categories(), &[Category::Rcm, Category::Lab]);
        assert_eq!(panel.vendors_in(Category::Rcm).count(), 2);
        assert_eq!(panel.vendor("V001").unwrap().name, "NDL");
        assert!(panel.site("S003").is_none());
        assert_eq!(panel.pairs().count(), 4);
    }

    #[test]
    fn test_duplicate_site_rejected() {
        let err = Panel::new(vec![site("S001"), site("S001")], vec![], IntegrationMatrix::new())
            .unwrap_err();
        assert!(err.to_string().contains("S001"));
    }

    #[test]
    fn test_dangling_integration_vendor_rejected() {
        let mut matrix = IntegrationMatrix::new();
        matrix.insert("S001", "V404", IntegrationQuality::Full);
        let err = Panel::new(
            vec![site("S001")],
            vec![Vendor::new("V001", "NDL", Category::Lab, 2)],
            matrix,
        )
        .unwrap_err();
        assert!(err.to_string().contains("V404"));
    }

    #[test]
    fn test_require_vendor_names_missing_id() {
        let panel = Panel::new(vec![site("S001")], vec![], IntegrationMatrix::new()).unwrap();
        let err = panel.require_vendor("V777").unwrap_err();
        assert!(matches!(err, SimError::InputValidation(_)));
        assert!(err.to_string().contains("V777"));
    }
}
