use std::collections::HashMap;
use std::str::FromStr;

use thiserror::Error;

/// Data-residency region that decides which ingestion host receives events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServerZone {
    #[default]
    Us,
    Eu,
}

impl FromStr for ServerZone {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "US" => Ok(Self::Us),
            "EU" => Ok(Self::Eu),
            _ => Err(ConfigError::InvalidServerZone(s.to_owned())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("api_key is required but not set")]
    ApiKeyMissing,

    #[error("server_zone has invalid value: {0} (expected \"US\" or \"EU\")")]
    InvalidServerZone(String),

    #[error("{0} has invalid value: {1} (expected \"true\" or \"false\")")]
    InvalidBool(String, String),

    #[error("{0} has invalid value: {1}")]
    InvalidNumeric(String, String),
}

/// Upload settings owned by the SDK. Read-only to the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    /// Overrides the zone/batch host selection when set and non-empty.
    pub server_url: Option<String>,
    pub server_zone: ServerZone,
    pub use_batch: bool,
    pub min_id_length: Option<u32>,
}

impl Config {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            server_url: None,
            server_zone: ServerZone::default(),
            use_batch: false,
            min_id_length: None,
        }
    }

    /// Build a config from the SDK's key/value settings.
    pub fn parse(settings: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let api_key = parse_api_key(settings)?;
        let server_url = settings
            .get("server_url")
            .filter(|s| !s.is_empty())
            .cloned();
        let server_zone = match settings.get("server_zone") {
            Some(val) => val.parse()?,
            None => ServerZone::default(),
        };
        let use_batch = parse_bool(settings, "use_batch", false)?;
        let min_id_length = parse_optional_u32(settings, "min_id_length")?;

        Ok(Self {
            api_key,
            server_url,
            server_zone,
            use_batch,
            min_id_length,
        })
    }
}

fn parse_api_key(settings: &HashMap<String, String>) -> Result<String, ConfigError> {
    settings
        .get("api_key")
        .filter(|s| !s.is_empty())
        .cloned()
        .ok_or(ConfigError::ApiKeyMissing)
}

fn parse_bool(
    settings: &HashMap<String, String>,
    name: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match settings.get(name).map(|s| s.as_str()) {
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(ConfigError::InvalidBool(name.to_owned(), other.to_owned())),
        None => Ok(default),
    }
}

fn parse_optional_u32(
    settings: &HashMap<String, String>,
    name: &str,
) -> Result<Option<u32>, ConfigError> {
    match settings.get(name) {
        Some(val) => val
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumeric(name.to_owned(), val.clone())),
        None => Ok(None),
    }
}
