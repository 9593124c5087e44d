//! POI retrieval: local PBF extract when one is available, Overpass otherwise.

use std::path::Path;

use tracing::{info, warn};

use crate::error::Result;
use crate::extract::extract_features_with_progress;
use crate::http::HttpClient;
use crate::models::{BoundingBox, Feature};
use crate::normalize::{normalize, PoiTable};
use crate::overpass::OverpassClient;
use crate::tags::TagQuerySpec;

/// Where features come from.
pub enum FeatureSource<'a, H> {
    Pbf(&'a Path),
    Overpass(&'a OverpassClient<H>),
}

impl<'a, H: HttpClient> FeatureSource<'a, H> {
    /// Prefer `pbf` when it names an existing file, falling back to `remote`.
    pub fn choose(pbf: Option<&'a Path>, remote: &'a OverpassClient<H>) -> Self {
        match pbf {
            Some(path) if path.is_file() => FeatureSource::Pbf(path),
            Some(path) => {
                warn!(
                    "Extract {} not found, falling back to Overpass",
                    path.display()
                );
                FeatureSource::Overpass(remote)
            }
            None => FeatureSource::Overpass(remote),
        }
    }

    pub fn fetch<F: FnMut()>(
        &self,
        bbox: &BoundingBox,
        spec: &TagQuerySpec,
        on_object: F,
    ) -> Result<Vec<Feature>> {
        match self {
            FeatureSource::Pbf(path) => {
                extract_features_with_progress(path, bbox, spec, on_object)
            }
            FeatureSource::Overpass(client) => client.fetch_features(bbox, spec),
        }
    }
}

/// Fetch POIs inside `bounds` (`[west, south, east, north]`) and return the
/// long-format table in `crs`.
///
/// The bounds are validated before any file or network access.
pub fn get_osm_features<H: HttpClient>(
    bounds: &[f64],
    spec: &TagQuerySpec,
    crs: &str,
    pbf: Option<&Path>,
    remote: &OverpassClient<H>,
) -> Result<PoiTable> {
    let bbox = BoundingBox::from_slice(bounds)?;
    let features = FeatureSource::choose(pbf, remote).fetch(&bbox, spec, || {})?;
    Ok(build_table(&features, crs, spec))
}

/// Normalize `features`, logging the outcome.
pub fn build_table(features: &[Feature], crs: &str, spec: &TagQuerySpec) -> PoiTable {
    let table = normalize(features, crs, spec);
    info!(
        "{} features produced {} rows in {}",
        features.len(),
        table.len(),
        table.crs
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::http::mock::MockHttp;
    use crate::normalize::Crs;
    use crate::overpass::DEFAULT_OVERPASS_URL;
    use crate::tags::TagRule;

    const BODY: &str = r#"{"elements": [
        {"type": "node", "id": 1, "lat": 46.2, "lon": 6.14, "tags": {"amenity": "school"}},
        {"type": "node", "id": 2, "lat": 46.201, "lon": 6.141, "tags": {"amenity": "hospital"}}
    ]}"#;

    fn spec() -> TagQuerySpec {
        TagQuerySpec::new().with("amenity", TagRule::one_of(["school", "hospital"]))
    }

    #[test]
    fn test_invalid_bounds_fail_before_io() {
        let http = MockHttp::new().route("/interpreter", 200, BODY);
        let remote = OverpassClient::new(&http, DEFAULT_OVERPASS_URL);

        let err = get_osm_features(&[6.13, 46.19, 6.15], &spec(), "EPSG:4326", None, &remote)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBoundingBox(_)));
        assert_eq!(http.request_count(), 0);
    }

    #[test]
    fn test_missing_extract_falls_back_to_overpass() {
        let http = MockHttp::new().route("/interpreter", 200, BODY);
        let remote = OverpassClient::new(&http, DEFAULT_OVERPASS_URL);
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.osm.pbf");

        let table = get_osm_features(
            &[6.13, 46.19, 6.15, 46.21],
            &spec(),
            "EPSG:3857",
            Some(missing.as_path()),
            &remote,
        )
        .unwrap();
        assert_eq!(http.request_count(), 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.crs, Crs::WebMercator);
    }

    #[test]
    fn test_empty_result_keeps_requested_crs() {
        let http = MockHttp::new().route("/interpreter", 200, r#"{"elements": []}"#);
        let remote = OverpassClient::new(&http, DEFAULT_OVERPASS_URL);
        let table =
            get_osm_features(&[6.13, 46.19, 6.15, 46.21], &spec(), "EPSG:4326", None, &remote)
                .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.crs, Crs::Wgs84);
    }

    #[test]
    fn test_local_extract_end_to_end() {
        let http = MockHttp::new().route("/interpreter", 200, BODY);
        let remote = OverpassClient::new(&http, DEFAULT_OVERPASS_URL);
        let extract = Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/geneva.osm.pbf");

        let table = get_osm_features(
            &[6.13, 46.19, 6.15, 46.21],
            &spec(),
            "EPSG:4326",
            Some(extract.as_path()),
            &remote,
        )
        .unwrap();

        assert_eq!(http.request_count(), 0);
        assert_eq!(table.len(), 5);
        assert!(table.rows.iter().all(|r| r.variable == "amenity"));
        let schools = table.rows.iter().filter(|r| r.value == "school").count();
        assert_eq!(schools, 3);
    }
}
