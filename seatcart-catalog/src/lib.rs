pub mod offering;
pub mod catalog;
pub mod availability;
pub mod source;

pub use offering::{Offering, OfferingId};
pub use catalog::{parse_offerings, CatalogError, CourseCatalog};
pub use availability::{summarize_by_region, RegionAvailability};
pub use source::{load_region, CatalogSource, StaticCatalogSource};
