use crate::config::{Config, ServerZone};

/// Which ingestion API receives the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Per-event HTTP API.
    Default,
    /// Bulk delivery API.
    Batch,
}

impl Endpoint {
    pub fn from_batch_mode(use_batch: bool) -> Self {
        if use_batch { Self::Batch } else { Self::Default }
    }
}

pub const DEFAULT_API_HOST: &str = "https://api2.amplitude.com/2/httpapi";
pub const BATCH_API_HOST: &str = "https://api2.amplitude.com/batch";
pub const EU_DEFAULT_API_HOST: &str = "https://api.eu.amplitude.com/2/httpapi";
pub const EU_BATCH_API_HOST: &str = "https://api.eu.amplitude.com/batch";

pub fn host(zone: ServerZone, endpoint: Endpoint) -> &'static str {
    match (zone, endpoint) {
        (ServerZone::Us, Endpoint::Default) => DEFAULT_API_HOST,
        (ServerZone::Us, Endpoint::Batch) => BATCH_API_HOST,
        (ServerZone::Eu, Endpoint::Default) => EU_DEFAULT_API_HOST,
        (ServerZone::Eu, Endpoint::Batch) => EU_BATCH_API_HOST,
    }
}

/// The upload URL for `config`: an explicit non-empty `server_url` wins,
/// otherwise the host for its zone and batch mode.
pub fn resolve(config: &Config) -> &str {
    match config.server_url.as_deref() {
        Some(url) if !url.is_empty() => url,
        _ => host(config.server_zone, Endpoint::from_batch_mode(config.use_batch)),
    }
}
