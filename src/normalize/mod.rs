//! Reshape features into the long-format POI table.
//!
//! Tag keys are lower-cased into columns, geometry is projected and then
//! reduced to one point per feature, and every (feature, tag column) pair that has a
//! value becomes a [`NormalizedRow`].

pub mod crs;

use std::collections::{BTreeMap, HashSet};

use geo::Point;
use tracing::{debug, warn};

use crate::models::{Feature, NormalizedRow};
use crate::tags::TagQuerySpec;

pub use crs::{representative_point, Crs, Reprojection};

/// Column names reserved for feature identity and geometry.
pub const ID_COLUMNS: &[&str] = &["source_type", "osm_type", "osm_id", "geometry"];

/// Something that went wrong without failing the whole normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeWarning {
    /// Target CRS is not supported; geometry was left in EPSG:4326.
    ReprojectionSkipped { requested: String },
    /// One feature could not be transformed and was left out of the table.
    ProjectionFailed { feature: String, reason: String },
}

impl std::fmt::Display for NormalizeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizeWarning::ReprojectionSkipped { requested } => write!(
                f,
                "cannot reproject to '{}'; geometry left in {}",
                requested,
                Crs::Wgs84
            ),
            NormalizeWarning::ProjectionFailed { feature, reason } => {
                write!(f, "dropped {}: {}", feature, reason)
            }
        }
    }
}

/// Long-format POI table.
#[derive(Debug, Clone, PartialEq)]
pub struct PoiTable {
    /// CRS the row geometries are actually expressed in
    pub crs: Crs,
    pub rows: Vec<NormalizedRow>,
    pub warnings: Vec<NormalizeWarning>,
}

impl PoiTable {
    pub fn empty(crs: Crs) -> Self {
        Self {
            crs,
            rows: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One feature after key lower-casing and geometry reduction.
struct WideRow<'a> {
    feature: &'a Feature,
    point: Point<f64>,
    columns: BTreeMap<String, &'a str>,
}

/// Build the long-format table for `features`.
pub fn normalize(features: &[Feature], target_crs: &str, spec: &TagQuerySpec) -> PoiTable {
    let (reprojection, mut warnings) = target_reprojection(target_crs);

    let mut wide: Vec<WideRow> = Vec::with_capacity(features.len());
    for feature in features {
        let geometry = match reprojection.project(&feature.geometry) {
            Ok(geometry) => geometry,
            Err(e) => {
                let warning = NormalizeWarning::ProjectionFailed {
                    feature: feature.source_id(),
                    reason: e.to_string(),
                };
                warn!("{}", warning);
                warnings.push(warning);
                continue;
            }
        };
        let Some(point) = representative_point(&geometry) else {
            debug!("No representative point for {}", feature.source_id());
            continue;
        };
        wide.push(WideRow {
            feature,
            point,
            columns: lower_case_columns(feature),
        });
    }

    let tag_columns = select_tag_columns(&wide, spec);

    let mut rows = Vec::new();
    for column in &tag_columns {
        for row in &wide {
            if let Some(value) = row.columns.get(column) {
                rows.push(NormalizedRow {
                    source_type: row.feature.source_type,
                    osm_type: row.feature.osm_type,
                    osm_id: row.feature.osm_id,
                    geometry: row.point,
                    variable: column.clone(),
                    value: value.to_string(),
                });
            }
        }
    }

    PoiTable {
        crs: reprojection.crs(),
        rows,
        warnings,
    }
}

/// Resolve the requested CRS, falling back to WGS84 with a warning.
fn target_reprojection(target_crs: &str) -> (Reprojection, Vec<NormalizeWarning>) {
    match Crs::parse(target_crs).map(Reprojection::new) {
        Some(Ok(reprojection)) => (reprojection, Vec::new()),
        other => {
            if let Some(Err(e)) = other {
                debug!("Projection setup for {} failed: {}", target_crs, e);
            }
            let warning = NormalizeWarning::ReprojectionSkipped {
                requested: target_crs.to_string(),
            };
            warn!("{}", warning);
            (Reprojection::wgs84(), vec![warning])
        }
    }
}

/// Lower-case tag keys; when two keys collide the later one (sorted order) wins.
fn lower_case_columns(feature: &Feature) -> BTreeMap<String, &str> {
    feature
        .tags
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.as_str()))
        .collect()
}

/// Requested keys that exist as columns, or every tag column if none do.
fn select_tag_columns(wide: &[WideRow], spec: &TagQuerySpec) -> Vec<String> {
    let mut present: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for row in wide {
        for key in row.columns.keys() {
            if !ID_COLUMNS.contains(&key.as_str()) && seen.insert(key.as_str()) {
                present.push(key.clone());
            }
        }
    }

    let mut requested: Vec<String> = Vec::new();
    for key in spec.keys().map(str::to_lowercase) {
        if seen.contains(key.as_str()) && !requested.contains(&key) {
            requested.push(key);
        }
    }

    if requested.is_empty() {
        debug!(
            "None of the requested keys are present; expanding all {} tag columns",
            present.len()
        );
        present
    } else {
        requested
    }
}
