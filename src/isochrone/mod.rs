//! Isochrones: routing-service requests, ring differencing and the POI join.

pub mod client;
pub mod geojson;
pub mod intersect;
pub mod rings;

pub use client::{IsochroneRequest, RoutingClient, TravelOption, DEFAULT_ROUTER};
pub use self::geojson::{bands_to_geojson, decode_isochrones};
pub use intersect::{intersect, BandIndex, IntersectedRow};
pub use rings::difference_rings;
