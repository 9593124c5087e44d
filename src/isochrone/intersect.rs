//! Spatial join of POI rows against isochrone bands.

use geo::{BoundingRect, Contains};
use rstar::{RTree, RTreeObject, AABB};
use tracing::info;

use crate::models::{IsochroneBand, NormalizedRow};

/// A POI row that falls inside a band.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectedRow {
    pub row: NormalizedRow,
    pub cutoff_sec: u32,
}

/// R-tree entry for one band
struct IndexedBand<'a> {
    band: &'a IsochroneBand,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedBand<'_> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl<'a> IndexedBand<'a> {
    fn new(band: &'a IsochroneBand) -> Option<Self> {
        let rect = band.polygon.bounding_rect()?;
        Some(Self {
            band,
            envelope: AABB::from_corners(
                [rect.min().x, rect.min().y],
                [rect.max().x, rect.max().y],
            ),
        })
    }
}

/// Bands indexed by bounding box
pub struct BandIndex<'a> {
    tree: RTree<IndexedBand<'a>>,
}

impl<'a> BandIndex<'a> {
    pub fn build(bands: &'a [IsochroneBand]) -> Self {
        let indexed: Vec<IndexedBand> = bands.iter().filter_map(IndexedBand::new).collect();
        Self {
            tree: RTree::bulk_load(indexed),
        }
    }

    /// Bands whose polygon contains `row`'s point, by ascending cutoff.
    pub fn lookup(&self, row: &NormalizedRow) -> Vec<&'a IsochroneBand> {
        let point = row.geometry;
        let query_envelope = AABB::from_point([point.x(), point.y()]);

        let mut hits: Vec<&IsochroneBand> = self
            .tree
            .locate_in_envelope_intersecting(&query_envelope)
            .filter(|ib| ib.band.polygon.contains(&point))
            .map(|ib| ib.band)
            .collect();
        hits.sort_by_key(|band| band.cutoff_sec);
        hits
    }
}

/// One output row per (POI row, band) pair where the band contains the point.
///
/// Rows and bands must share a coordinate system. Disjoint bands give each
/// point at most one match; cumulative polygons may give several.
pub fn intersect(rows: &[NormalizedRow], bands: &[IsochroneBand]) -> Vec<IntersectedRow> {
    let index = BandIndex::build(bands);

    let joined: Vec<IntersectedRow> = rows
        .iter()
        .flat_map(|row| {
            index.lookup(row).into_iter().map(move |band| IntersectedRow {
                row: row.clone(),
                cutoff_sec: band.cutoff_sec,
            })
        })
        .collect();

    info!(
        "{} of {} rows fall inside {} bands",
        joined.len(),
        rows.len(),
        bands.len()
    );
    joined
}
