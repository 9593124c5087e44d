//! Location resolution for way and relation geometry.
//!
//! Ways only carry node references, so before any way or relation can be
//! turned into a geometry the coordinates of the referenced nodes have to be
//! collected. Only objects whose tags pass the query spec (and the member
//! ways of matching relations) are resolved; node coordinates are kept in a
//! temporary sled store so large extracts do not have to fit in memory.

use geo::Coord;
use hashbrown::{HashMap, HashSet};
use osmpbfreader::{NodeId, OsmId, OsmObj, OsmPbfReader, WayId};
use sled::Db;
use std::io::{Read, Seek};
use tempfile::{Builder, TempDir};
use tracing::info;

use crate::error::Result;
use crate::tags::TagQuerySpec;

/// Node coordinates and way node lists for the objects of interest.
pub struct LocationIndex {
    node_db: Db,
    way_nodes: HashMap<WayId, Vec<NodeId>>,
    _dir: TempDir,
}

impl LocationIndex {
    /// Scan a PBF extract (three passes) and resolve everything the spec needs.
    /// Scan errors abort the build; a truncated extract never yields a partial index.
    pub fn build<R: Read + Seek>(
        reader: &mut OsmPbfReader<R>,
        spec: &TagQuerySpec,
    ) -> Result<Self> {
        let mut builder = LocationIndexBuilder::new(spec)?;

        info!("Pass 1/3: Identifying matching relations...");
        reader.rewind()?;
        for obj in reader.iter() {
            let obj = obj?;
            builder.scan_relation(&obj);
        }

        info!("Pass 2/3: Identifying ways...");
        reader.rewind()?;
        for obj in reader.iter() {
            let obj = obj?;
            builder.scan_way(&obj);
        }

        info!("Pass 3/3: Storing node coordinates...");
        reader.rewind()?;
        for obj in reader.iter() {
            let obj = obj?;
            builder.store_node(&obj)?;
        }

        builder.finish()
    }

    /// Same three passes over objects already in memory.
    pub fn from_objects(objects: &[OsmObj], spec: &TagQuerySpec) -> Result<Self> {
        let mut builder = LocationIndexBuilder::new(spec)?;
        objects.iter().for_each(|obj| builder.scan_relation(obj));
        objects.iter().for_each(|obj| builder.scan_way(obj));
        for obj in objects {
            builder.store_node(obj)?;
        }
        builder.finish()
    }

    pub fn node(&self, id: NodeId) -> Option<Coord<f64>> {
        match self.node_db.get(id.0.to_be_bytes()) {
            Ok(Some(bytes)) if bytes.len() == 16 => {
                let mut lon = [0u8; 8];
                let mut lat = [0u8; 8];
                lon.copy_from_slice(&bytes[0..8]);
                lat.copy_from_slice(&bytes[8..16]);
                Some(Coord {
                    x: f64::from_be_bytes(lon),
                    y: f64::from_be_bytes(lat),
                })
            }
            _ => None,
        }
    }

    /// Coordinates of every node of a way, or `None` if any location is missing.
    pub fn resolve_nodes(&self, nodes: &[NodeId]) -> Option<Vec<Coord<f64>>> {
        nodes.iter().map(|id| self.node(*id)).collect()
    }

    /// Resolved coordinates of a way that was recorded during the scan.
    pub fn resolve_way(&self, way_id: WayId) -> Option<Vec<Coord<f64>>> {
        let nodes = self.way_nodes.get(&way_id)?;
        self.resolve_nodes(nodes)
    }

}

struct LocationIndexBuilder<'a> {
    spec: &'a TagQuerySpec,
    needed_ways: HashSet<WayId>,
    needed_nodes: HashSet<NodeId>,
    way_nodes: HashMap<WayId, Vec<NodeId>>,
    node_db: Db,
    dir: TempDir,
    stored: usize,
}

impl<'a> LocationIndexBuilder<'a> {
    fn new(spec: &'a TagQuerySpec) -> Result<Self> {
        let dir = Builder::new().prefix("isopoi-nodes-").tempdir()?;
        let node_db = sled::open(dir.path())?;
        Ok(Self {
            spec,
            needed_ways: HashSet::new(),
            needed_nodes: HashSet::new(),
            way_nodes: HashMap::new(),
            node_db,
            dir,
            stored: 0,
        })
    }

    fn scan_relation(&mut self, obj: &OsmObj) {
        if let OsmObj::Relation(rel) = obj {
            if self.spec.feature_matches(&rel.tags) {
                for member in &rel.refs {
                    if let OsmId::Way(way_id) = member.member {
                        self.needed_ways.insert(way_id);
                    }
                }
            }
        }
    }

    fn scan_way(&mut self, obj: &OsmObj) {
        if let OsmObj::Way(way) = obj {
            if self.needed_ways.contains(&way.id) || self.spec.feature_matches(&way.tags) {
                self.needed_nodes.extend(way.nodes.iter().copied());
                self.way_nodes.insert(way.id, way.nodes.clone());
            }
        }
    }

    fn store_node(&mut self, obj: &OsmObj) -> Result<()> {
        if let OsmObj::Node(node) = obj {
            if self.needed_nodes.contains(&node.id) {
                let mut value = [0u8; 16];
                value[0..8].copy_from_slice(&node.lon().to_be_bytes());
                value[8..16].copy_from_slice(&node.lat().to_be_bytes());
                self.node_db.insert(node.id.0.to_be_bytes(), &value)?;
                self.stored += 1;
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<LocationIndex> {
        self.node_db.flush()?;
        info!(
            "Resolved {} ways, stored {} of {} referenced node coordinates",
            self.way_nodes.len(),
            self.stored,
            self.needed_nodes.len()
        );
        Ok(LocationIndex {
            node_db: self.node_db,
            way_nodes: self.way_nodes,
            _dir: self.dir,
        })
    }
}
