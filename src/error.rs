//! Error taxonomy shared by the extraction and isochrone paths.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Bounding box rejected before any I/O.
    #[error("invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid tag rule for key '{key}': {reason}")]
    InvalidTagSpec { key: String, reason: String },

    /// Requested travel mode is not advertised by the routing server.
    #[error("unsupported travel mode '{requested}'; available modes: {available:?}")]
    UnsupportedMode {
        requested: String,
        available: Vec<String>,
    },

    /// Non-2xx response, surfaced verbatim.
    #[error("upstream request failed: {status} - {body}")]
    Upstream { status: u16, body: String },

    /// Coordinate transformation rejected by `proj4rs`.
    #[error("projection failed: {0}")]
    Projection(String),

    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PBF decode error: {0}")]
    Pbf(#[from] osmpbfreader::Error),

    #[error("location store error: {0}")]
    Store(#[from] sled::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),
}
