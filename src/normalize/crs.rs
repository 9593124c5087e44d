//! Coordinate reference systems supported for output.
//!
//! All geometry enters the crate in WGS84 longitude/latitude. Web Mercator is
//! computed with the spherical formulas used by slippy-map tiles; every other
//! EPSG code with a known PROJ definition goes through `proj4rs`.

use std::f64::consts::PI;
use std::str::FromStr;

use geo::{Centroid, Contains, Coord, Geometry, InteriorPoint, MapCoords, Point};
use proj4rs::proj::Proj;

use crate::error::{Error, Result};

const EARTH_RADIUS_M: f64 = 6_378_137.0;
/// Latitude at which Web Mercator becomes square.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

const WGS84_PROJ: &str = "+proj=longlat +datum=WGS84 +no_defs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// EPSG:4326
    Wgs84,
    /// EPSG:3857
    WebMercator,
    /// Any other EPSG code with a PROJ definition in [`proj_definition`]
    Epsg(u32),
}

impl Crs {
    /// Recognize an EPSG code or common alias. Case-insensitive.
    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_uppercase();
        match code.as_str() {
            "WGS84" | "CRS84" | "OGC:CRS84" => return Some(Crs::Wgs84),
            "LV95" => return Some(Crs::Epsg(2056)),
            "LV03" => return Some(Crs::Epsg(21781)),
            _ => {}
        }
        let epsg: u32 = code.strip_prefix("EPSG:")?.trim().parse().ok()?;
        match epsg {
            4326 => Some(Crs::Wgs84),
            3857 | 900913 | 102100 => Some(Crs::WebMercator),
            other => proj_definition(other).map(|_| Crs::Epsg(other)),
        }
    }

    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::WebMercator => 3857,
            Crs::Epsg(code) => *code,
        }
    }

    pub fn code(&self) -> String {
        format!("EPSG:{}", self.epsg())
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl FromStr for Crs {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Crs::parse(s).ok_or_else(|| Error::InvalidRequest(format!("unsupported CRS '{}'", s)))
    }
}

/// PROJ string for the projected systems this crate can reproject into.
pub fn proj_definition(epsg: u32) -> Option<String> {
    let def = match epsg {
        // CH1903+ / LV95 and CH1903 / LV03
        2056 => "+proj=somerc +lat_0=46.9524055555556 +lon_0=7.43958333333333 +k_0=1 \
                 +x_0=2600000 +y_0=1200000 +ellps=bessel \
                 +towgs84=674.374,15.056,405.346,0,0,0,0 +units=m +no_defs"
            .to_string(),
        21781 => "+proj=somerc +lat_0=46.9524055555556 +lon_0=7.43958333333333 +k_0=1 \
                  +x_0=600000 +y_0=200000 +ellps=bessel \
                  +towgs84=674.374,15.056,405.346,0,0,0,0 +units=m +no_defs"
            .to_string(),
        // RGF93 / Lambert-93
        2154 => "+proj=lcc +lat_0=46.5 +lon_0=3 +lat_1=49 +lat_2=44 +x_0=700000 \
                 +y_0=6600000 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs"
            .to_string(),
        // ETRS89 / LAEA Europe
        3035 => "+proj=laea +lat_0=52 +lon_0=10 +x_0=4321000 +y_0=3210000 +ellps=GRS80 \
                 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs"
            .to_string(),
        // OSGB36 / British National Grid
        27700 => "+proj=tmerc +lat_0=49 +lon_0=-2 +k_0=0.9996012717 +x_0=400000 \
                  +y_0=-100000 +ellps=airy \
                  +towgs84=446.448,-125.157,542.06,0.15,0.247,0.842,-20.489 +units=m +no_defs"
            .to_string(),
        // ETRS89 / UTM zones 28N-38N
        25828..=25838 => format!(
            "+proj=utm +zone={} +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
            epsg - 25800
        ),
        // WGS 84 / UTM north and south
        32601..=32660 => format!(
            "+proj=utm +zone={} +datum=WGS84 +units=m +no_defs",
            epsg - 32600
        ),
        32701..=32760 => format!(
            "+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs",
            epsg - 32700
        ),
        _ => return None,
    };
    Some(def)
}

enum Transform {
    Identity,
    WebMercator,
    Proj { src: Proj, dst: Proj },
}

/// Projects WGS84 geometry into a target [`Crs`].
pub struct Reprojection {
    crs: Crs,
    transform: Transform,
}

impl Reprojection {
    pub fn new(crs: Crs) -> Result<Self> {
        let transform = match crs {
            Crs::Wgs84 => Transform::Identity,
            Crs::WebMercator => Transform::WebMercator,
            Crs::Epsg(code) => {
                let def = proj_definition(code).ok_or_else(|| {
                    Error::InvalidRequest(format!("no projection definition for EPSG:{}", code))
                })?;
                Transform::Proj {
                    src: Proj::from_proj_string(WGS84_PROJ).map_err(projection_error)?,
                    dst: Proj::from_proj_string(&def).map_err(projection_error)?,
                }
            }
        };
        Ok(Self { crs, transform })
    }

    /// No-op reprojection used when the requested CRS cannot be honored.
    pub fn wgs84() -> Self {
        Self {
            crs: Crs::Wgs84,
            transform: Transform::Identity,
        }
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Project a WGS84 coordinate into the target system.
    pub fn project_coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        match &self.transform {
            Transform::Identity => Ok(coord),
            Transform::WebMercator => {
                let lat = coord.y.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
                Ok(Coord {
                    x: coord.x.to_radians() * EARTH_RADIUS_M,
                    y: (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS_M,
                })
            }
            Transform::Proj { src, dst } => {
                // proj4rs takes geographic input in radians
                let mut point = (coord.x.to_radians(), coord.y.to_radians(), 0.0);
                proj4rs::transform::transform(src, dst, &mut point).map_err(projection_error)?;
                Ok(Coord {
                    x: point.0,
                    y: point.1,
                })
            }
        }
    }

    /// Project any WGS84 geometry into the target system.
    pub fn project<G>(&self, geometry: &G) -> Result<G>
    where
        G: MapCoords<f64, f64, Output = G>,
    {
        geometry.try_map_coords(|c| self.project_coord(c))
    }
}

fn projection_error<E: std::fmt::Display>(err: E) -> Error {
    Error::Projection(err.to_string())
}

/// Reduce a geometry to one point.
///
/// Lines use their centroid. Areas use their centroid when it falls inside the
/// shape and an interior point otherwise (e.g. for U-shaped buildings).
pub fn representative_point(geometry: &Geometry<f64>) -> Option<Point<f64>> {
    match geometry {
        Geometry::Point(p) => Some(*p),
        Geometry::Polygon(poly) => {
            let centroid = poly.centroid()?;
            if poly.contains(&centroid) {
                Some(centroid)
            } else {
                poly.interior_point()
            }
        }
        Geometry::MultiPolygon(mp) => {
            let centroid = mp.centroid()?;
            if mp.contains(&centroid) {
                Some(centroid)
            } else {
                mp.interior_point()
            }
        }
        other => other.centroid(),
    }
}
