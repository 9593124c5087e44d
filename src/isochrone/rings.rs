//! Conversion of nested cumulative isochrones into disjoint bands.

use geo::BooleanOps;
use tracing::debug;

use crate::models::{CumulativeIsochrone, IsochroneBand};

/// Turn cumulative isochrones into rings.
///
/// With the isochrones ordered by ascending cutoff, the first band is the
/// first polygon unchanged and every later band is its polygon minus the
/// previous cumulative polygon. Input order is normalized first, so callers
/// may pass the router's response as is.
pub fn difference_rings(isochrones: &[CumulativeIsochrone]) -> Vec<IsochroneBand> {
    let mut sorted: Vec<&CumulativeIsochrone> = isochrones.iter().collect();
    sorted.sort_by_key(|iso| iso.cutoff_sec);

    let mut bands = Vec::with_capacity(sorted.len());
    let mut previous: Option<&CumulativeIsochrone> = None;
    for iso in sorted {
        let polygon = match previous {
            None => iso.polygon.clone(),
            Some(inner) => iso.polygon.difference(&inner.polygon),
        };
        debug!(
            "Band {}s: {} polygon(s)",
            iso.cutoff_sec,
            polygon.0.len()
        );
        bands.push(IsochroneBand {
            cutoff_sec: iso.cutoff_sec,
            polygon,
        });
        previous = Some(iso);
    }
    bands
}
