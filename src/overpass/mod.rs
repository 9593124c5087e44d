//! Remote feature query against an Overpass API endpoint.
//!
//! Used when no local extract is available. The tag spec is translated into
//! an Overpass QL union and the `out geom` response is assembled into the same
//! [`Feature`]s the PBF path produces.

mod query;
mod response;

use tracing::info;

use crate::error::Result;
use crate::http::HttpClient;
use crate::models::{BoundingBox, Feature};
use crate::tags::TagQuerySpec;

pub use query::build_query;
pub use response::decode_features;

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Overpass API client
pub struct OverpassClient<H> {
    http: H,
    url: String,
}

impl<H: HttpClient> OverpassClient<H> {
    pub fn new(http: H, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    /// Fetch every object matching `spec` inside `bbox`.
    pub fn fetch_features(&self, bbox: &BoundingBox, spec: &TagQuerySpec) -> Result<Vec<Feature>> {
        let ql = build_query(bbox, spec);
        info!("Querying Overpass at {}", self.url);

        let body = self
            .http
            .get(&self.url, &[("data".to_string(), ql)], &[])?
            .into_success()?;

        let features = decode_features(&body, bbox, spec)?;
        info!("Overpass returned {} matching features", features.len());
        Ok(features)
    }
}
