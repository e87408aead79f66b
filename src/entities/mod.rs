// Entity Models - the static panel the simulation runs over
//
// Each entity is:
// - Immutable once generated or loaded
// - Keyed by a stable string id (S001, V001, ...)
// - Shared read-only through the Panel

pub mod category;
pub mod integration;
pub mod panel;
pub mod site;
pub mod vendor;

pub use category::Category;
pub use integration::{IntegrationMatrix, IntegrationQuality, IntegrationScore};
pub use panel::Panel;
pub use site::Site;
pub use vendor::{vendor_catalog, Vendor};
