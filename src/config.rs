//! TOML configuration for service endpoints and output defaults.
//!
//! ```toml
//! [routing]
//! base_url = "http://localhost:8080/otp"
//! router = "default"
//! api_key = "..."
//!
//! [overpass]
//! url = "https://overpass-api.de/api/interpreter"
//!
//! [output]
//! crs = "EPSG:3857"
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::isochrone::DEFAULT_ROUTER;
use crate::overpass::DEFAULT_OVERPASS_URL;

pub const DEFAULT_CRS: &str = "EPSG:3857";

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub routing: RoutingConfig,
    pub overpass: OverpassConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RoutingConfig {
    pub base_url: Option<String>,
    pub router: String,
    pub api_key: Option<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            router: DEFAULT_ROUTER.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct OverpassConfig {
    pub url: String,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OVERPASS_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub crs: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            crs: DEFAULT_CRS.to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path` if given, defaults otherwise.
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.routing.router, "default");
        assert_eq!(config.overpass.url, DEFAULT_OVERPASS_URL);
        assert_eq!(config.output.crs, "EPSG:3857");
        assert!(config.routing.base_url.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml(
            r#"
            [routing]
            base_url = "http://localhost:8080/otp"
            api_key = "secret"

            [output]
            crs = "EPSG:4326"
            "#,
        )
        .unwrap();
        assert_eq!(config.routing.base_url.as_deref(), Some("http://localhost:8080/otp"));
        assert_eq!(config.routing.router, "default");
        assert_eq!(config.routing.api_key.as_deref(), Some("secret"));
        assert_eq!(config.output.crs, "EPSG:4326");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[overpass]\nurl = \"http://localhost/api/interpreter\"").unwrap();
        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.overpass.url, "http://localhost/api/interpreter");
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        assert!(matches!(
            Config::from_toml("[routing\n"),
            Err(crate::error::Error::Config(_))
        ));
    }
}
