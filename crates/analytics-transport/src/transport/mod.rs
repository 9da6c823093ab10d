use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use url::Url;

use crate::uploader::UploadError;

/// Fixed per-request timeout. Not configurable.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
const ACCEPT_JSON: &str = "application/json";

/// A single upload, built per call and consumed by the transport.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub timeout: Duration,
    pub body: Bytes,
}

impl UploadRequest {
    pub fn json(url: Url, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));

        Self {
            method: Method::POST,
            url,
            headers,
            timeout: REQUEST_TIMEOUT,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

pub trait Transport: Send + Sync + 'static {
    /// Execute `request`. Only transport-level failures are errors; any
    /// HTTP status comes back as a response.
    fn send(
        &self,
        request: UploadRequest,
    ) -> impl Future<Output = Result<TransportResponse, UploadError>> + Send + '_;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, UploadError> {
        // Already installed by the host is fine.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let client = Client::builder().pool_max_idle_per_host(2).build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: UploadRequest) -> Result<TransportResponse, UploadError> {
        let resp = self
            .client
            .request(request.method, request.url)
            .headers(request.headers)
            .timeout(request.timeout)
            .body(request.body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        Ok(TransportResponse { status, body })
    }
}
