//! Long-format output rows.

use geo::Point;
use super::{OsmType, SourceType};

/// One (feature, tag) pair with the feature reduced to a single point.
///
/// `(source_type, osm_type, osm_id, variable)` is unique within a table.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub source_type: SourceType,
    pub osm_type: OsmType,
    pub osm_id: i64,
    pub geometry: Point<f64>,
    /// Lower-cased tag key
    pub variable: String,
    pub value: String,
}

impl NormalizedRow {
    /// Identity of the row within a table.
    pub fn key(&self) -> (SourceType, OsmType, i64, &str) {
        (self.source_type, self.osm_type, self.osm_id, &self.variable)
    }
}
