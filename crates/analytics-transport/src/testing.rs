use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::keep_alive::{BackgroundTasks, Release};
use crate::transport::{HttpTransport, Transport, TransportResponse, UploadRequest};
use crate::uploader::UploadError;

pub const FIXED_UPLOAD_TIME: &str = "2022-10-28T12:00:00.123Z";

pub fn fixed_clock() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(FIXED_UPLOAD_TIME)
        .unwrap()
        .with_timezone(&Utc)
}

#[derive(Default)]
pub struct MockTransportState {
    pub requests: Mutex<Vec<UploadRequest>>,
}

/// Answers every request with the same status and body.
pub struct MockTransport {
    status: u16,
    body: Bytes,
    pub state: Arc<MockTransportState>,
}

impl MockTransport {
    pub fn responding(status: u16, body: &'static str) -> (Self, Arc<MockTransportState>) {
        let state = Arc::new(MockTransportState::default());
        (
            Self {
                status,
                body: Bytes::from_static(body.as_bytes()),
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: UploadRequest) -> Result<TransportResponse, UploadError> {
        self.state.requests.lock().unwrap().push(request);
        Ok(TransportResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

/// Never answers; the request stays in flight until the task is aborted.
pub struct PendingTransport;

impl Transport for PendingTransport {
    async fn send(&self, _request: UploadRequest) -> Result<TransportResponse, UploadError> {
        std::future::pending().await
    }
}

/// Sends every request to a local port nothing listens on, so each send fails
/// with a real connection error.
pub struct FailingTransport {
    inner: HttpTransport,
    url: url::Url,
}

impl FailingTransport {
    pub async fn new() -> Self {
        let port = free_port().await;
        Self {
            inner: HttpTransport::new().unwrap(),
            url: url::Url::parse(&format!("http://127.0.0.1:{port}/batch")).unwrap(),
        }
    }
}

impl Transport for FailingTransport {
    async fn send(&self, mut request: UploadRequest) -> Result<TransportResponse, UploadError> {
        request.url = self.url.clone();
        self.inner.send(request).await
    }
}

#[derive(Default)]
pub struct BackgroundTaskCounts {
    pub begun: AtomicU32,
    pub released: AtomicU32,
}

impl BackgroundTaskCounts {
    pub fn begun(&self) -> u32 {
        self.begun.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> u32 {
        self.released.load(Ordering::SeqCst)
    }
}

pub struct CountingBackgroundTasks {
    counts: Arc<BackgroundTaskCounts>,
}

impl CountingBackgroundTasks {
    pub fn new() -> (Self, Arc<BackgroundTaskCounts>) {
        let counts = Arc::new(BackgroundTaskCounts::default());
        (
            Self {
                counts: Arc::clone(&counts),
            },
            counts,
        )
    }
}

impl BackgroundTasks for CountingBackgroundTasks {
    fn begin(&self) -> Option<Release> {
        self.counts.begun.fetch_add(1, Ordering::SeqCst);
        let counts = Arc::clone(&self.counts);
        Some(Box::new(move || {
            counts.released.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

/// Bind to port 0 and return the OS-assigned port.
/// The listener is dropped, so nothing is accepting on it afterwards.
pub async fn free_port() -> u16 {
    tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Accept one HTTP request, answer it with `response`, and return the raw
/// request text (head and body).
pub async fn respond_once(listener: tokio::net::TcpListener, response: &'static [u8]) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let (mut stream, _) = listener.accept().await.unwrap();
    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];
    while !request_complete(&raw) {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..n]);
    }
    stream.write_all(response).await.unwrap();
    String::from_utf8_lossy(&raw).into_owned()
}

fn request_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some((head, body)) = text.split_once("\r\n\r\n") else {
        return false;
    };
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);
    body.len() >= content_length
}
