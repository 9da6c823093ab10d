//! Upload transport and on-disk event buffer for the analytics SDK.
//!
//! [`Uploader`] POSTs one serialized event batch to the ingestion endpoint and
//! reports the outcome. [`OutputFile`] is the append-only file the SDK's event
//! queue writes batches to before they are uploaded. The two are independent;
//! batching, retry, and scheduling belong to the caller.

pub mod config;
pub mod endpoint;
pub mod keep_alive;
pub mod output_file;
pub mod transport;
pub mod uploader;

#[cfg(test)]
mod testing;

pub use config::{Config, ConfigError, ServerZone};
pub use endpoint::Endpoint;
pub use keep_alive::{BackgroundTasks, KeepAlive, NoBackgroundTasks};
pub use output_file::{FileError, OutputFile, SkipReason, WriteOutcome};
pub use transport::{HttpTransport, Transport, TransportResponse, UploadRequest};
pub use uploader::{HttpStatus, UploadError, UploadResult, Uploader};
