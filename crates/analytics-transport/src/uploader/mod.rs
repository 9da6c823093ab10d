use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::Config;
use crate::endpoint;
use crate::keep_alive::{BackgroundTasks, KeepAlive, NoBackgroundTasks};
use crate::transport::{HttpTransport, Transport, TransportResponse, UploadRequest};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload URL is not valid: {0}")]
    InvalidUrl(String),

    #[error("ingestion endpoint responded with HTTP {status}")]
    Http { status: u16, body: Option<Bytes> },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upload was cancelled before it completed")]
    Cancelled,

    #[error("no tokio runtime to run the upload on")]
    NoRuntime,
}

impl UploadError {
    /// HTTP status carried by the error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Statuses the upload pipeline reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum HttpStatus {
    Success = 200,
    BadRequest = 400,
    Timeout = 408,
    PayloadTooLarge = 413,
    TooManyRequests = 429,
    Failed = 500,
}

impl HttpStatus {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            200 => Some(Self::Success),
            400 => Some(Self::BadRequest),
            408 => Some(Self::Timeout),
            413 => Some(Self::PayloadTooLarge),
            429 => Some(Self::TooManyRequests),
            500 => Some(Self::Failed),
            _ => None,
        }
    }
}

pub type UploadResult = Result<u16, UploadError>;

/// Sends serialized event batches to the ingestion endpoint.
pub struct Uploader<T = HttpTransport> {
    config: Arc<Config>,
    transport: Arc<T>,
    background: Arc<dyn BackgroundTasks>,
    clock: fn() -> DateTime<Utc>,
}

impl Uploader<HttpTransport> {
    pub fn new(config: Config) -> Result<Self, UploadError> {
        Ok(Self::with_transport(config, HttpTransport::new()?))
    }
}

impl<T: Transport> Uploader<T> {
    pub fn with_transport(config: Config, transport: T) -> Self {
        Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            background: Arc::new(NoBackgroundTasks),
            clock: Utc::now,
        }
    }

    pub fn with_background_tasks(mut self, tasks: impl BackgroundTasks + 'static) -> Self {
        self.background = Arc::new(tasks);
        self
    }

    /// Source of `client_upload_time`.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn url(&self) -> &str {
        endpoint::resolve(&self.config)
    }

    pub fn request(&self, events: &str) -> Result<UploadRequest, UploadError> {
        let raw = self.url();
        let url = Url::parse(raw).map_err(|_| UploadError::InvalidUrl(raw.to_owned()))?;
        Ok(UploadRequest::json(url, self.request_body(events)))
    }

    /// `events` must already be a serialized JSON array; it is spliced into
    /// the payload as-is.
    pub fn request_body(&self, events: &str) -> String {
        let upload_time = (self.clock)().to_rfc3339_opts(SecondsFormat::Millis, true);

        let mut body = format!(
            r#"{{"api_key":"{}","client_upload_time":"{upload_time}","events":{events}"#,
            self.config.api_key
        );
        if let Some(min_id_length) = self.config.min_id_length {
            body.push_str(&format!(r#","options":{{"min_id_length":{min_id_length}}}"#));
        }
        body.push('}');
        body
    }

    /// Build and send one batch, returning the success status code.
    pub async fn send(&self, events: &str) -> UploadResult {
        let _keep_alive = KeepAlive::acquire(self.background.as_ref());
        let request = self.request(events)?;
        dispatch(self.transport.as_ref(), request).await
    }

    /// Start sending one batch in the background.
    ///
    /// `completion` is called exactly once. If the request cannot be built it
    /// is called before this returns, with an HTTP 500 failure, and `None` is
    /// returned. Otherwise the send runs on the tokio runtime and the task
    /// handle is returned; aborting it completes with
    /// [`UploadError::Cancelled`]. Called outside a tokio runtime, it
    /// completes with [`UploadError::NoRuntime`] and returns `None`.
    pub fn upload<F>(&self, events: &str, completion: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce(UploadResult) + Send + 'static,
    {
        let keep_alive = KeepAlive::acquire(self.background.as_ref());

        let request = match self.request(events) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "failed to build upload request");
                completion(Err(UploadError::Http {
                    status: HttpStatus::Failed.code(),
                    body: None,
                }));
                drop(keep_alive);
                return None;
            }
        };

        let Ok(runtime) = Handle::try_current() else {
            warn!("upload started outside a tokio runtime");
            completion(Err(UploadError::NoRuntime));
            drop(keep_alive);
            return None;
        };

        let transport = Arc::clone(&self.transport);
        let completion = Completion::new(completion);

        Some(runtime.spawn(async move {
            let keep_alive = keep_alive;
            let result = dispatch(transport.as_ref(), request).await;
            completion.finish(result);
            drop(keep_alive);
        }))
    }
}

async fn dispatch<T: Transport>(transport: &T, request: UploadRequest) -> UploadResult {
    debug!(url = %request.url, bytes = request.body.len(), "sending upload request");

    let response = transport
        .send(request)
        .await
        .inspect_err(|e| error!(error = %e, "upload request failed"))?;

    classify(response)
}

fn classify(response: TransportResponse) -> UploadResult {
    match response.status {
        status @ 1..=299 => {
            debug!(status, "upload accepted");
            Ok(status)
        }
        status => {
            warn!(status, "upload rejected");
            let body = (!response.body.is_empty()).then_some(response.body);
            Err(UploadError::Http { status, body })
        }
    }
}

/// Delivers the upload outcome exactly once. Dropped unfinished (the task
/// was aborted), it reports [`UploadError::Cancelled`].
struct Completion<F: FnOnce(UploadResult)> {
    callback: Option<F>,
}

impl<F: FnOnce(UploadResult)> Completion<F> {
    fn new(callback: F) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    fn finish(mut self, result: UploadResult) {
        if let Some(callback) = self.callback.take() {
            callback(result);
        }
    }
}

impl<F: FnOnce(UploadResult)> Drop for Completion<F> {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback(Err(UploadError::Cancelled));
        }
    }
}
