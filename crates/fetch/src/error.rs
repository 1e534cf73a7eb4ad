use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use streams::StreamError;
use thiserror::Error;

/// Failure classes a [`Transport`](crate::Transport) reports.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransportErrorKind {
    /// The host name did not resolve.
    Resolve,
    /// No connection could be established.
    Connect,
    /// The request or response exceeded its deadline.
    Timeout,
    /// Sending the request failed after connecting.
    Send,
    /// Receiving the response body failed part way.
    Receive,
    /// The server answered with a non-success status.
    Status(u16),
    /// The URL or request could not be built.
    InvalidRequest,
    /// Storing the received bytes locally failed.
    Local,
}

impl TransportErrorKind {
    /// Returns `true` for failures worth retrying.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(
            self,
            Self::Resolve | Self::Connect | Self::Timeout | Self::Send | Self::Receive
        )
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolve => f.write_str("host resolution failed"),
            Self::Connect => f.write_str("connection failed"),
            Self::Timeout => f.write_str("timed out"),
            Self::Send => f.write_str("send failed"),
            Self::Receive => f.write_str("receive failed"),
            Self::Status(code) => write!(f, "HTTP status {code}"),
            Self::InvalidRequest => f.write_str("invalid request"),
            Self::Local => f.write_str("local write failed"),
        }
    }
}

/// A single failed transfer attempt.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    /// Creates an error of `kind` with a human readable `message`.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failure class.
    #[must_use]
    pub const fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// Returns `true` when the fetcher should try again.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    pub(crate) fn local(error: &io::Error) -> Self {
        Self::new(TransportErrorKind::Local, error.to_string())
    }
}

/// Errors raised by [`RetryingFetcher`](crate::RetryingFetcher).
#[derive(Debug, Error)]
pub enum FetchError {
    /// The destination already exists and is never overwritten.
    #[error("refusing to overwrite existing file '{}'", path.display())]
    AlreadyExists {
        /// Destination path.
        path: PathBuf,
    },
    /// The transfer failed with a non-transient error.
    #[error("download of '{url}' failed: {source}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Failure of the last attempt.
        #[source]
        source: TransportError,
    },
    /// Transient failures persisted past the retry budget.
    #[error("download of '{url}' gave up after {attempts} attempts in {elapsed:?}: {source}")]
    RetriesExhausted {
        /// Requested URL.
        url: String,
        /// Attempts made.
        attempts: u32,
        /// Time spent including sleeps.
        elapsed: Duration,
        /// Failure of the last attempt.
        #[source]
        source: TransportError,
    },
    /// Staging the download on disk failed.
    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl FetchError {
    /// Requested URL, when the error came from a transfer.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Transport { url, .. } | Self::RetriesExhausted { url, .. } => Some(url),
            Self::AlreadyExists { .. } | Self::Stream(_) => None,
        }
    }
}
