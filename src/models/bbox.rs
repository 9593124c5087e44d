//! Geographic bounding box.

use std::str::FromStr;

use geo::{Coord, Geometry, Intersects, Rect};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Rectangle in geographic degrees, `(west, south, east, north)`.
///
/// Serialized as `[west, south, east, north]`; deserializing runs the same
/// validation as [`BoundingBox::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Create a validated bounding box.
    ///
    /// Inverted boxes (`west > east` or `south > north`) and non-finite
    /// bounds are rejected rather than producing silently empty results.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        if ![west, south, east, north].iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidBoundingBox(
                "all four bounds must be finite numbers".to_string(),
            ));
        }
        if west > east {
            return Err(Error::InvalidBoundingBox(format!(
                "west ({}) is greater than east ({})",
                west, east
            )));
        }
        if south > north {
            return Err(Error::InvalidBoundingBox(format!(
                "south ({}) is greater than north ({})",
                south, north
            )));
        }
        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }

    /// Build from a slice that must hold exactly `(west, south, east, north)`.
    pub fn from_slice(bounds: &[f64]) -> Result<Self> {
        match bounds {
            [west, south, east, north] => Self::new(*west, *south, *east, *north),
            _ => Err(Error::InvalidBoundingBox(format!(
                "expected exactly 4 elements (west, south, east, north), got {}",
                bounds.len()
            ))),
        }
    }

    /// Closed-interval containment test.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.south <= lat && lat <= self.north && self.west <= lon && lon <= self.east
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.west,
                y: self.south,
            },
            Coord {
                x: self.east,
                y: self.north,
            },
        )
    }

    /// Whether a geometry touches or overlaps the box.
    pub fn intersects(&self, geometry: &Geometry<f64>) -> bool {
        match geometry {
            Geometry::Point(p) => self.contains(p.x(), p.y()),
            other => other.intersects(&self.to_rect()),
        }
    }
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = Error;

    fn try_from([west, south, east, north]: [f64; 4]) -> Result<Self> {
        Self::new(west, south, east, north)
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.west, bbox.south, bbox.east, bbox.north]
    }
}

impl FromStr for BoundingBox {
    type Err = Error;

    /// Parse `"west,south,east,north"`.
    fn from_str(s: &str) -> Result<Self> {
        let bounds = s
            .split(',')
            .map(|part| {
                part.trim().parse::<f64>().map_err(|_| {
                    Error::InvalidBoundingBox(format!("'{}' is not a number", part.trim()))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        Self::from_slice(&bounds)
    }
}
