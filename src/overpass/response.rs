//! Decoding of Overpass `out geom` JSON.

use std::collections::{BTreeMap, HashMap};

use geo::{Coord, Geometry, Point};
use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::extract::assemble::{
    first_success, is_area_relation, is_valid, RelationRings, RELATION_STRATEGIES, WAY_STRATEGIES,
};
use crate::models::{BoundingBox, Feature, OsmType};
use crate::tags::TagQuerySpec;

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Element {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    Way {
        id: i64,
        #[serde(default)]
        geometry: Vec<Option<LatLon>>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    Relation {
        id: i64,
        #[serde(default)]
        members: Vec<Member>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Member {
    #[serde(rename = "type")]
    member_type: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    geometry: Vec<Option<LatLon>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct LatLon {
    lat: f64,
    lon: f64,
}

/// `None` if any vertex is missing (cropped or unresolved).
fn coords(points: &[Option<LatLon>]) -> Option<Vec<Coord<f64>>> {
    points
        .iter()
        .map(|p| p.map(|p| Coord { x: p.lon, y: p.lat }))
        .collect()
}

/// Turn an Overpass JSON body into features, applying the same tag,
/// geometry and bounding-box rules as the local extract path.
pub fn decode_features(
    body: &str,
    bbox: &BoundingBox,
    spec: &TagQuerySpec,
) -> Result<Vec<Feature>> {
    let response: OverpassResponse = serde_json::from_str(body)?;

    let features = response
        .elements
        .into_iter()
        .filter_map(|element| decode_element(element, bbox, spec))
        .collect();
    Ok(features)
}

fn decode_element(element: Element, bbox: &BoundingBox, spec: &TagQuerySpec) -> Option<Feature> {
    let (osm_type, id, geometry, tags) = match element {
        Element::Node { id, lat, lon, tags } => {
            if !spec.feature_matches(&tags) || !bbox.contains(lon, lat) {
                return None;
            }
            (OsmType::Node, id, Geometry::Point(Point::new(lon, lat)), tags)
        }
        Element::Way { id, geometry, tags } => {
            if !spec.feature_matches(&tags) {
                return None;
            }
            let coords = coords(&geometry)?;
            let geometry = first_success(WAY_STRATEGIES, coords.as_slice())?;
            (OsmType::Way, id, geometry, tags)
        }
        Element::Relation { id, members, tags } => {
            if !spec.feature_matches(&tags) {
                return None;
            }
            if !is_area_relation(tags.get("type").map(String::as_str)) {
                return None;
            }
            let mut rings = RelationRings::default();
            for member in members.iter().filter(|m| m.member_type == "way") {
                rings.push(&member.role, coords(&member.geometry)?);
            }
            let geometry = first_success(RELATION_STRATEGIES, &rings)?;
            (OsmType::Relation, id, geometry, tags)
        }
        Element::Other => return None,
    };

    if !is_valid(&geometry) || !bbox.intersects(&geometry) {
        debug!("Dropping {}/{}: invalid or outside bounding box", osm_type, id);
        return None;
    }

    let tags: BTreeMap<String, String> = tags.into_iter().collect();
    Some(Feature::new(osm_type, id, geometry, tags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceType;
    use crate::tags::TagRule;

    const BODY: &str = r#"{
      "version": 0.6,
      "elements": [
        {"type": "node", "id": 1, "lat": 46.20, "lon": 6.14,
         "tags": {"amenity": "school"}},
        {"type": "node", "id": 2, "lat": 46.30, "lon": 6.14,
         "tags": {"amenity": "school"}},
        {"type": "way", "id": 10,
         "bounds": {"minlat": 46.2, "minlon": 6.14, "maxlat": 46.201, "maxlon": 6.141},
         "nodes": [100, 101, 102, 103, 100],
         "geometry": [
           {"lat": 46.200, "lon": 6.140}, {"lat": 46.200, "lon": 6.141},
           {"lat": 46.201, "lon": 6.141}, {"lat": 46.201, "lon": 6.140},
           {"lat": 46.200, "lon": 6.140}],
         "tags": {"amenity": "hospital", "building": "yes"}},
        {"type": "way", "id": 11,
         "geometry": [{"lat": 46.2, "lon": 6.14}, null],
         "tags": {"amenity": "school"}},
        {"type": "relation", "id": 20,
         "members": [
           {"type": "way", "ref": 1, "role": "outer",
            "geometry": [{"lat": 46.206, "lon": 6.146}, {"lat": 46.206, "lon": 6.148},
                         {"lat": 46.208, "lon": 6.148}]},
           {"type": "way", "ref": 2, "role": "outer",
            "geometry": [{"lat": 46.208, "lon": 6.148}, {"lat": 46.208, "lon": 6.146},
                         {"lat": 46.206, "lon": 6.146}]},
           {"type": "node", "ref": 3, "role": "label", "lat": 46.207, "lon": 6.147}
         ],
         "tags": {"type": "multipolygon", "amenity": "school"}},
        {"type": "area", "id": 3600000001}
      ]
    }"#;

    #[test]
    fn test_decode_mixed_elements() {
        let bbox = BoundingBox::new(6.13, 46.19, 6.15, 46.21).unwrap();
        let spec = TagQuerySpec::new().with("amenity", TagRule::one_of(["school", "hospital"]));
        let features = decode_features(BODY, &bbox, &spec).unwrap();

        let summary: Vec<(OsmType, i64, SourceType)> = features
            .iter()
            .map(|f| (f.osm_type, f.osm_id, f.source_type))
            .collect();
        assert_eq!(
            summary,
            vec![
                (OsmType::Node, 1, SourceType::Point),
                (OsmType::Way, 10, SourceType::Area),
                (OsmType::Relation, 20, SourceType::Area),
            ]
        );
        assert_eq!(features[1].tags["building"], "yes");
    }

    #[test]
    fn test_malformed_body_is_an_error() {
        let bbox = BoundingBox::new(6.13, 46.19, 6.15, 46.21).unwrap();
        assert!(decode_features("<html>busy</html>", &bbox, &TagQuerySpec::new()).is_err());
    }
}
