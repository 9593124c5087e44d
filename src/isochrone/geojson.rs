//! GeoJSON encoding of isochrones.

use std::str::FromStr;

use geo::{MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, Value};

use crate::error::{Error, Result};
use crate::models::{CumulativeIsochrone, IsochroneBand};

/// `time` may arrive as a number or a numeric string.
fn cutoff(feature: &Feature) -> Result<u32> {
    let time = feature.property("time");
    let seconds = match time {
        Some(JsonValue::Number(n)) => n.as_f64(),
        Some(JsonValue::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match seconds {
        Some(s) if s.is_finite() && s >= 0.0 && s <= u32::MAX as f64 => Ok(s.round() as u32),
        _ => Err(Error::MalformedResponse(format!(
            "isochrone feature without a usable time: {:?}",
            time
        ))),
    }
}

fn reachable_area(geometry: Option<&Geometry>) -> Result<MultiPolygon<f64>> {
    let Some(geometry) = geometry else {
        // Empty reachability, e.g. an origin off the street network.
        return Ok(MultiPolygon::new(vec![]));
    };
    match &geometry.value {
        Value::Polygon(_) => {
            let polygon = Polygon::<f64>::try_from(geometry.value.clone())?;
            Ok(MultiPolygon::new(vec![polygon]))
        }
        Value::MultiPolygon(_) => Ok(MultiPolygon::<f64>::try_from(geometry.value.clone())?),
        _ => Err(Error::MalformedResponse(
            "isochrone geometry is not a polygon".into(),
        )),
    }
}

/// Decode a router's isochrone FeatureCollection, one entry per feature.
pub fn decode_isochrones(body: &str) -> Result<Vec<CumulativeIsochrone>> {
    let GeoJson::FeatureCollection(collection) = GeoJson::from_str(body)? else {
        return Err(Error::MalformedResponse(
            "isochrone response is not a FeatureCollection".into(),
        ));
    };

    collection
        .features
        .iter()
        .map(|feature| {
            Ok(CumulativeIsochrone {
                cutoff_sec: cutoff(feature)?,
                polygon: reachable_area(feature.geometry.as_ref())?,
            })
        })
        .collect()
}

/// Encode bands as a FeatureCollection with a `time` property per feature.
pub fn bands_to_geojson(bands: &[IsochroneBand]) -> FeatureCollection {
    let features = bands
        .iter()
        .map(|band| {
            let mut properties = JsonObject::new();
            properties.insert("time".to_string(), JsonValue::from(band.cutoff_sec));
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::from(&band.polygon))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
