//! crates/fetch/src/transport.rs
//!
//! Single-attempt transfers.

use std::error::Error as _;
use std::io::Write;
use std::time::Duration;

use crate::{TransportError, TransportErrorKind};

/// Performs one GET and streams the body into `sink`.
///
/// Implementations make exactly one attempt; retrying is the fetcher's job.
pub trait Transport: Send + Sync {
    /// Downloads `url` into `sink`, returning the body length.
    fn get(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError>;
}

/// HTTP(S) transport built on the blocking `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Per-request timeout used by [`HttpTransport::new`].
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Creates a transport with [`DEFAULT_TIMEOUT`](Self::DEFAULT_TIMEOUT).
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    /// Creates a transport whose requests time out after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                TransportError::new(TransportErrorKind::InvalidRequest, error.to_string())
            })?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|error| classify(&error))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::new(
                TransportErrorKind::Status(status.as_u16()),
                format!("GET {url}"),
            ));
        }
        let mut counting = CountingWriter {
            inner: sink,
            local_error: None,
            written: 0,
        };
        match response.copy_to(&mut counting) {
            Ok(_) => Ok(counting.written),
            Err(error) => Err(counting
                .local_error
                .take()
                .map_or_else(|| classify(&error), |local| TransportError::local(&local))),
        }
    }
}

/// Maps a `reqwest` failure onto a [`TransportErrorKind`].
fn classify(error: &reqwest::Error) -> TransportError {
    let kind = if error.is_timeout() {
        TransportErrorKind::Timeout
    } else if error.is_connect() {
        if mentions_dns(error) {
            TransportErrorKind::Resolve
        } else {
            TransportErrorKind::Connect
        }
    } else if error.is_builder() {
        TransportErrorKind::InvalidRequest
    } else if let Some(status) = error.status() {
        TransportErrorKind::Status(status.as_u16())
    } else if error.is_body() || error.is_decode() {
        TransportErrorKind::Receive
    } else {
        TransportErrorKind::Send
    };
    TransportError::new(kind, error.to_string())
}

fn mentions_dns(error: &reqwest::Error) -> bool {
    let mut source = error.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if text.contains("dns") || text.contains("resolve") {
            return true;
        }
        source = inner.source();
    }
    false
}

/// Remembers local write failures so they are not mistaken for network ones.
struct CountingWriter<'a> {
    inner: &'a mut dyn Write,
    local_error: Option<std::io::Error>,
    written: u64,
}

impl Write for CountingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.inner.write(buf) {
            Ok(n) => {
                self.written += n as u64;
                Ok(n)
            }
            Err(error) => {
                let kind = error.kind();
                self.local_error = Some(error);
                Err(std::io::Error::from(kind))
            }
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
