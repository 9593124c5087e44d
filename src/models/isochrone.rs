//! Reachability polygons returned by the routing service.

use geo::MultiPolygon;

/// Everything reachable from the origin within `cutoff_sec`.
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeIsochrone {
    pub cutoff_sec: u32,
    pub polygon: MultiPolygon<f64>,
}

/// A ring of the isochrone set, disjoint from every other band.
#[derive(Debug, Clone, PartialEq)]
pub struct IsochroneBand {
    pub cutoff_sec: u32,
    pub polygon: MultiPolygon<f64>,
}

impl From<CumulativeIsochrone> for IsochroneBand {
    fn from(iso: CumulativeIsochrone) -> Self {
        Self {
            cutoff_sec: iso.cutoff_sec,
            polygon: iso.polygon,
        }
    }
}
