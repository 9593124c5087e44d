//! CSV export of POI tables and joined rows.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::isochrone::IntersectedRow;
use crate::models::{NormalizedRow, OsmType, SourceType};

const TABLE_COLUMNS: &[&str] = &[
    "source_type",
    "osm_type",
    "osm_id",
    "x",
    "y",
    "variable",
    "value",
];
const JOINED_COLUMNS: &[&str] = &[
    "source_type",
    "osm_type",
    "osm_id",
    "x",
    "y",
    "variable",
    "value",
    "cutoff_sec",
];

#[derive(Debug, Serialize)]
struct PoiRecord<'a> {
    source_type: SourceType,
    osm_type: OsmType,
    osm_id: i64,
    x: f64,
    y: f64,
    variable: &'a str,
    value: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cutoff_sec: Option<u32>,
}

impl<'a> PoiRecord<'a> {
    fn new(row: &'a NormalizedRow, cutoff_sec: Option<u32>) -> Self {
        Self {
            source_type: row.source_type,
            osm_type: row.osm_type,
            osm_id: row.osm_id,
            x: row.geometry.x(),
            y: row.geometry.y(),
            variable: &row.variable,
            value: &row.value,
            cutoff_sec,
        }
    }
}

/// The header is written up front so an empty result still names its columns.
fn write_records<'a, W, I>(writer: W, columns: &[&str], records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = PoiRecord<'a>>,
{
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(columns)?;
    for record in records {
        csv.serialize(record)?;
    }
    csv.flush()?;
    Ok(())
}

/// `source_type,osm_type,osm_id,x,y,variable,value`
pub fn write_table<W: Write>(writer: W, rows: &[NormalizedRow]) -> Result<()> {
    write_records(
        writer,
        TABLE_COLUMNS,
        rows.iter().map(|row| PoiRecord::new(row, None)),
    )
}

/// Same columns as [`write_table`] plus `cutoff_sec`.
pub fn write_joined<W: Write>(writer: W, rows: &[IntersectedRow]) -> Result<()> {
    write_records(
        writer,
        JOINED_COLUMNS,
        rows.iter()
            .map(|joined| PoiRecord::new(&joined.row, Some(joined.cutoff_sec))),
    )
}

pub fn write_table_to_path(path: &Path, rows: &[NormalizedRow]) -> Result<()> {
    write_table(std::fs::File::create(path)?, rows)
}

pub fn write_joined_to_path(path: &Path, rows: &[IntersectedRow]) -> Result<()> {
    write_joined(std::fs::File::create(path)?, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;

    fn row() -> NormalizedRow {
        NormalizedRow {
            source_type: SourceType::Area,
            osm_type: OsmType::Way,
            osm_id: 42,
            geometry: Point::new(6.5, 46.25),
            variable: "amenity".to_string(),
            value: "school, primary".to_string(),
        }
    }

    #[test]
    fn test_table_columns() {
        let mut buf = Vec::new();
        write_table(&mut buf, &[row()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "source_type,osm_type,osm_id,x,y,variable,value");
        assert_eq!(lines[1], "area,way,42,6.5,46.25,amenity,\"school, primary\"");
    }

    #[test]
    fn test_joined_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("joined.csv");
        let joined = IntersectedRow {
            row: row(),
            cutoff_sec: 600,
        };
        write_joined_to_path(&path, &[joined]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "source_type,osm_type,osm_id,x,y,variable,value,cutoff_sec");
        assert!(lines[1].ends_with(",600"));
    }

    #[test]
    fn test_empty_results_keep_header() {
        let mut table = Vec::new();
        write_table(&mut table, &[]).unwrap();
        assert_eq!(
            String::from_utf8(table).unwrap(),
            "source_type,osm_type,osm_id,x,y,variable,value\n"
        );

        let mut joined = Vec::new();
        write_joined(&mut joined, &[]).unwrap();
        assert_eq!(
            String::from_utf8(joined).unwrap(),
            "source_type,osm_type,osm_id,x,y,variable,value,cutoff_sec\n"
        );
    }
}
