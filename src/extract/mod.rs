//! Feature extraction from a local OSM PBF extract.
//!
//! After the location pre-pass, the extract is read once more from the start
//! and every decoded object goes through [`Classifier::classify`], which either
//! yields a [`Feature`] or skips the object. Output order is encounter order.

pub mod assemble;
pub mod locations;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use geo::{Geometry, Point};
use osmpbfreader::{Node, OsmId, OsmObj, OsmPbfReader, Relation, Way};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{BoundingBox, Feature, OsmType};
use crate::tags::TagQuerySpec;

use assemble::{
    first_success, is_area_relation, is_valid, RelationRings, RELATION_STRATEGIES, WAY_STRATEGIES,
};
pub use locations::LocationIndex;

/// Turns decoded OSM objects into features.
pub struct Classifier<'a> {
    bbox: &'a BoundingBox,
    spec: &'a TagQuerySpec,
    locations: &'a LocationIndex,
}

impl<'a> Classifier<'a> {
    pub fn new(
        bbox: &'a BoundingBox,
        spec: &'a TagQuerySpec,
        locations: &'a LocationIndex,
    ) -> Self {
        Self {
            bbox,
            spec,
            locations,
        }
    }

    pub fn classify(&self, obj: &OsmObj) -> Option<Feature> {
        match obj {
            OsmObj::Node(node) => self.classify_node(node),
            OsmObj::Way(way) => self.classify_way(way),
            OsmObj::Relation(rel) => self.classify_relation(rel),
        }
    }

    fn classify_node(&self, node: &Node) -> Option<Feature> {
        if !self.spec.feature_matches(&node.tags) {
            return None;
        }
        let (lon, lat) = (node.lon(), node.lat());
        if !self.bbox.contains(lon, lat) {
            return None;
        }
        Some(Feature::new(
            OsmType::Node,
            node.id.0,
            Geometry::Point(Point::new(lon, lat)),
            tag_map(&node.tags),
        ))
    }

    fn classify_way(&self, way: &Way) -> Option<Feature> {
        if !self.spec.feature_matches(&way.tags) {
            return None;
        }
        let Some(coords) = self.locations.resolve_nodes(&way.nodes) else {
            debug!("Way {} has unresolved node locations", way.id.0);
            return None;
        };
        let geometry = first_success(WAY_STRATEGIES, coords.as_slice())?;
        self.accept(OsmType::Way, way.id.0, geometry, &way.tags)
    }

    fn classify_relation(&self, rel: &Relation) -> Option<Feature> {
        if !self.spec.feature_matches(&rel.tags) {
            return None;
        }
        if !is_area_relation(rel.tags.get("type").map(|v| v.as_str())) {
            return None;
        }

        let mut rings = RelationRings::default();
        for member in &rel.refs {
            if let OsmId::Way(way_id) = member.member {
                let Some(coords) = self.locations.resolve_way(way_id) else {
                    debug!("Relation {} references unresolved way {}", rel.id.0, way_id.0);
                    return None;
                };
                rings.push(member.role.as_str(), coords);
            }
        }

        let geometry = first_success(RELATION_STRATEGIES, &rings)?;
        self.accept(OsmType::Relation, rel.id.0, geometry, &rel.tags)
    }

    fn accept(
        &self,
        osm_type: OsmType,
        osm_id: i64,
        geometry: Geometry<f64>,
        tags: &osmpbfreader::Tags,
    ) -> Option<Feature> {
        if !is_valid(&geometry) {
            debug!("Dropping invalid geometry for {}/{}", osm_type, osm_id);
            return None;
        }
        if !self.bbox.intersects(&geometry) {
            return None;
        }
        Some(Feature::new(osm_type, osm_id, geometry, tag_map(tags)))
    }
}

fn tag_map(tags: &osmpbfreader::Tags) -> BTreeMap<String, String> {
    tags.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Extract matching features from a PBF file.
pub fn extract_features(
    path: &Path,
    bbox: &BoundingBox,
    spec: &TagQuerySpec,
) -> Result<Vec<Feature>> {
    extract_features_with_progress(path, bbox, spec, || {})
}

/// Like [`extract_features`], calling `on_object` for every object of the final pass.
pub fn extract_features_with_progress<F: FnMut()>(
    path: &Path,
    bbox: &BoundingBox,
    spec: &TagQuerySpec,
    on_object: F,
) -> Result<Vec<Feature>> {
    info!("Extracting features from {}", path.display());
    let file = File::open(path)?;
    let mut reader = OsmPbfReader::new(BufReader::new(file));
    extract_from_reader(&mut reader, bbox, spec, on_object)
}

pub fn extract_from_reader<R: Read + Seek, F: FnMut()>(
    reader: &mut OsmPbfReader<R>,
    bbox: &BoundingBox,
    spec: &TagQuerySpec,
    mut on_object: F,
) -> Result<Vec<Feature>> {
    let locations = LocationIndex::build(reader, spec)?;
    let classifier = Classifier::new(bbox, spec, &locations);

    reader.rewind()?;
    let mut features = Vec::new();
    for obj in reader.iter() {
        on_object();
        let obj = obj?;
        features.extend(classifier.classify(&obj));
    }

    info!("Matched {} features", features.len());
    Ok(features)
}

/// Extract from objects already decoded into memory.
pub fn extract_from_objects(
    objects: &[OsmObj],
    bbox: &BoundingBox,
    spec: &TagQuerySpec,
) -> Result<Vec<Feature>> {
    let locations = LocationIndex::from_objects(objects, spec)?;
    let classifier = Classifier::new(bbox, spec, &locations);
    Ok(objects
        .iter()
        .filter_map(|obj| classifier.classify(obj))
        .collect())
}
