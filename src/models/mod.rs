//! Core data models for POI extraction and isochrones.

pub mod bbox;
pub mod feature;
pub mod isochrone;
pub mod row;

pub use bbox::BoundingBox;
pub use feature::{Feature, OsmType, SourceType};
pub use isochrone::{CumulativeIsochrone, IsochroneBand};
pub use row::NormalizedRow;
