//! Overpass QL generation.

use crate::models::BoundingBox;
use crate::tags::{TagQuerySpec, TagRule};

/// Build an Overpass QL union with one `nwr` statement per requested key.
///
/// Overpass bounding boxes are `(south, west, north, east)`.
pub fn build_query(bbox: &BoundingBox, spec: &TagQuerySpec) -> String {
    let area = format!("({},{},{},{})", bbox.south, bbox.west, bbox.north, bbox.east);

    let mut statements: Vec<String> = spec
        .iter()
        .map(|(key, rule)| format!("  nwr{}{};", filter(key, rule), area))
        .collect();
    if statements.is_empty() {
        statements.push(format!("  nwr{};", area));
    }

    format!(
        "[out:json][timeout:180];\n(\n{}\n);\nout geom;",
        statements.join("\n")
    )
}

fn filter(key: &str, rule: &TagRule) -> String {
    let key = quote(key);
    match rule {
        TagRule::Any => format!("[{}]", key),
        TagRule::Exact(value) => format!("[{}={}]", key, quote(value)),
        TagRule::OneOf(values) => {
            let alternatives: Vec<String> = values.iter().map(|v| regex::escape(v)).collect();
            format!("[{}~{}]", key, quote(&format!("^({})$", alternatives.join("|"))))
        }
    }
}

/// QL string literal
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
