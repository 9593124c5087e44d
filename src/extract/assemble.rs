//! Geometry construction for ways and relations.
//!
//! Each object kind has an ordered list of construction strategies. They are
//! tried in sequence and the first one that yields a geometry wins; when all
//! of them fail the object is skipped.

use geo::{Contains, Coord, Geometry, LineString, MultiPolygon, Polygon, Validation};

/// Builds a geometry from some input, or gives up.
pub type Strategy<T> = fn(&T) -> Option<Geometry<f64>>;

/// Ways: closed ring first, then an open line.
pub const WAY_STRATEGIES: &[Strategy<[Coord<f64>]>] = &[way_polygon, way_linestring];

/// Relations: multipolygon only.
pub const RELATION_STRATEGIES: &[Strategy<RelationRings>] = &[relation_multipolygon];

/// Run strategies in order until one succeeds.
pub fn first_success<T: ?Sized>(strategies: &[Strategy<T>], input: &T) -> Option<Geometry<f64>> {
    strategies.iter().find_map(|build| build(input))
}

/// Member way coordinates of a relation, split by role.
#[derive(Debug, Clone, Default)]
pub struct RelationRings {
    pub outer: Vec<Vec<Coord<f64>>>,
    pub inner: Vec<Vec<Coord<f64>>>,
}

impl RelationRings {
    pub fn push(&mut self, role: &str, coords: Vec<Coord<f64>>) {
        match role {
            "inner" => self.inner.push(coords),
            _ => self.outer.push(coords),
        }
    }
}

/// Whether a relation describes an area.
pub fn is_area_relation(type_tag: Option<&str>) -> bool {
    matches!(type_tag, Some("multipolygon") | Some("boundary"))
}

fn is_closed(coords: &[Coord<f64>]) -> bool {
    coords.len() >= 4 && coords.first() == coords.last()
}

pub fn way_polygon(coords: &[Coord<f64>]) -> Option<Geometry<f64>> {
    if !is_closed(coords) {
        return None;
    }
    Some(Geometry::Polygon(Polygon::new(
        LineString::new(coords.to_vec()),
        vec![],
    )))
}

pub fn way_linestring(coords: &[Coord<f64>]) -> Option<Geometry<f64>> {
    if coords.len() < 2 {
        return None;
    }
    Some(Geometry::LineString(LineString::new(coords.to_vec())))
}

pub fn relation_multipolygon(rings: &RelationRings) -> Option<Geometry<f64>> {
    let outers = assemble_rings(rings.outer.clone())?;
    if outers.is_empty() {
        return None;
    }
    let inners = assemble_rings(rings.inner.clone())?;

    let mut polygons: Vec<Polygon<f64>> = outers
        .into_iter()
        .map(|ring| Polygon::new(ring, vec![]))
        .collect();

    for inner in inners {
        let hole = Polygon::new(inner.clone(), vec![]);
        let owner = polygons.iter_mut().find(|outer| outer.contains(&hole))?;
        owner.interiors_push(inner);
    }

    Some(Geometry::MultiPolygon(MultiPolygon::new(polygons)))
}

/// Join way segments end to end into closed rings.
///
/// Returns `None` if any chain cannot be closed.
pub fn assemble_rings(segments: Vec<Vec<Coord<f64>>>) -> Option<Vec<LineString<f64>>> {
    let mut result = Vec::new();
    let mut remaining: Vec<Vec<Coord<f64>>> =
        segments.into_iter().filter(|s| !s.is_empty()).collect();

    while !remaining.is_empty() {
        let mut current = remaining.remove(0);

        loop {
            if current.len() >= 2 && current.first() == current.last() {
                break;
            }

            let start = current.first().copied();
            let end = current.last().copied();

            let position = remaining.iter().position(|seg| {
                let (s, e) = (seg.first().copied(), seg.last().copied());
                end == s || end == e || start == e || start == s
            })?;
            let mut seg = remaining.remove(position);

            if end == seg.first().copied() {
                seg.remove(0);
                current.extend(seg);
            } else if end == seg.last().copied() {
                seg.reverse();
                seg.remove(0);
                current.extend(seg);
            } else if start == seg.last().copied() {
                seg.pop();
                seg.extend(current);
                current = seg;
            } else {
                seg.reverse();
                seg.pop();
                seg.extend(current);
                current = seg;
            }
        }

        if current.len() < 4 {
            return None;
        }
        result.push(LineString::new(current));
    }

    Some(result)
}

/// Simple-feature validity check applied before a geometry is emitted.
pub fn is_valid(geometry: &Geometry<f64>) -> bool {
    geometry.is_valid()
}
