//! isopoi - OSM points of interest and travel-time isochrones
//!
//! This library provides the extraction, normalization and isochrone logic
//! shared by the `pois` and `isochrones` binaries.

pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod http;
pub mod isochrone;
pub mod models;
pub mod normalize;
pub mod output;
pub mod overpass;
pub mod tags;

pub use error::{Error, Result};
pub use fetch::get_osm_features;
pub use models::{
    BoundingBox, CumulativeIsochrone, Feature, IsochroneBand, NormalizedRow, OsmType, SourceType,
};
pub use normalize::{normalize, Crs, NormalizeWarning, PoiTable};
pub use tags::{TagQuerySpec, TagRule};
