//! Raw features produced by the PBF parser or the Overpass client.

use std::collections::BTreeMap;

use geo::Geometry;
use serde::{Deserialize, Serialize};

/// Type of OSM object a feature was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsmType {
    Node,
    Way,
    Relation,
}

impl std::fmt::Display for OsmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OsmType::Node => write!(f, "node"),
            OsmType::Way => write!(f, "way"),
            OsmType::Relation => write!(f, "relation"),
        }
    }
}

/// Geometric kind of a feature. Multi-part relations collapse into `Area`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Point,
    Line,
    Area,
}

impl SourceType {
    /// Derive the kind from an assembled geometry.
    pub fn of(geometry: &Geometry<f64>) -> Self {
        match geometry {
            Geometry::Point(_) | Geometry::MultiPoint(_) => SourceType::Point,
            Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => {
                SourceType::Line
            }
            _ => SourceType::Area,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Point => write!(f, "point"),
            SourceType::Line => write!(f, "line"),
            SourceType::Area => write!(f, "area"),
        }
    }
}

/// A matched map feature in geographic (EPSG:4326) coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub osm_type: OsmType,
    pub osm_id: i64,
    pub source_type: SourceType,
    pub geometry: Geometry<f64>,
    /// Full tag mapping as found on the source object
    pub tags: BTreeMap<String, String>,
}

impl Feature {
    pub fn new(
        osm_type: OsmType,
        osm_id: i64,
        geometry: Geometry<f64>,
        tags: BTreeMap<String, String>,
    ) -> Self {
        Self {
            osm_type,
            osm_id,
            source_type: SourceType::of(&geometry),
            geometry,
            tags,
        }
    }

    /// "{osm_type}/{osm_id}"
    pub fn source_id(&self) -> String {
        format!("{}/{}", self.osm_type, self.osm_id)
    }
}
