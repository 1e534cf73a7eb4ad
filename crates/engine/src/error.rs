//! Error type shared by the patch pipelines.

use std::error::Error;
use std::fmt;
use std::io;

use catalog::CatalogError;
use checksums::ChecksumError;
use delta::DeltaError;
use fetch::{FetchError, TransportErrorKind};
use matching::IndexError;
use streams::StreamError;

use crate::options::BuilderError;

/// Result type for pipeline operations.
pub type PatchResult<T> = Result<T, PatchError>;

/// Failure classes reported to callers.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PatchErrorKind {
    /// A stream was configured with a zero chunk size.
    InvalidChunkSize,
    /// A file could not be opened or created.
    StreamOpenFailed,
    /// Reading a file failed.
    StreamReadFailed,
    /// Writing or moving a file failed.
    StreamWriteFailed,
    /// A content checksum could not be produced.
    ChecksumGenerationFailed,
    /// Reconstructed content does not match its recorded checksum.
    ChecksumMismatch,
    /// A delta was malformed or could not be applied.
    DeltaApplyFailed,
    /// A source stream supplied fewer bytes than a delta needed.
    ChunkUnderrun,
    /// A resource or stored object does not exist.
    ResourceNotFound,
    /// A download failed for good.
    DownloadFailed,
    /// A catalog or patch-group document is malformed or inconsistent.
    InvalidDocument,
    /// Building a chunk index failed.
    IndexFailed,
    /// Pipeline options are invalid.
    InvalidOptions,
}

impl PatchErrorKind {
    /// Stable name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidChunkSize => "InvalidChunkSize",
            Self::StreamOpenFailed => "StreamOpenFailed",
            Self::StreamReadFailed => "StreamReadFailed",
            Self::StreamWriteFailed => "StreamWriteFailed",
            Self::ChecksumGenerationFailed => "ChecksumGenerationFailed",
            Self::ChecksumMismatch => "ChecksumMismatch",
            Self::DeltaApplyFailed => "DeltaApplyFailed",
            Self::ChunkUnderrun => "ChunkUnderrun",
            Self::ResourceNotFound => "ResourceNotFound",
            Self::DownloadFailed => "DownloadFailed",
            Self::InvalidDocument => "InvalidDocument",
            Self::IndexFailed => "IndexFailed",
            Self::InvalidOptions => "InvalidOptions",
        }
    }
}

impl fmt::Display for PatchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by the patch pipelines.
///
/// Every error has a [`PatchErrorKind`], an optional human readable detail
/// and, when it wraps a lower-level failure, a source.
#[derive(Debug)]
pub struct PatchError {
    kind: PatchErrorKind,
    detail: Option<String>,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl PatchError {
    /// Creates an error without detail.
    #[must_use]
    pub const fn new(kind: PatchErrorKind) -> Self {
        Self {
            kind,
            detail: None,
            source: None,
        }
    }

    /// Creates an error with a detail message.
    pub fn with_detail(kind: PatchErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: Some(detail.into()),
            source: None,
        }
    }

    pub(crate) fn wrap(kind: PatchErrorKind, source: impl Error + Send + Sync + 'static) -> Self {
        Self {
            kind,
            detail: Some(source.to_string()),
            source: Some(Box::new(source)),
        }
    }

    /// Prefixes the detail with `context`, typically the resource path.
    #[must_use]
    pub fn context(mut self, context: impl fmt::Display) -> Self {
        self.detail = Some(match self.detail.take() {
            Some(detail) => format!("{context}: {detail}"),
            None => context.to_string(),
        });
        self
    }

    /// Failure class.
    #[must_use]
    pub const fn kind(&self) -> PatchErrorKind {
        self.kind
    }

    /// Detail message, when one was recorded.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub(crate) fn io(kind: PatchErrorKind, path: &std::path::Path, source: io::Error) -> Self {
        let mut error = Self::wrap(kind, source);
        error.detail = error
            .detail
            .map(|detail| format!("'{}': {detail}", path.display()));
        error
    }
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {detail}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl Error for PatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}

fn stream_kind(error: &StreamError) -> PatchErrorKind {
    match error {
        StreamError::InvalidChunkSize => PatchErrorKind::InvalidChunkSize,
        StreamError::Open { source, .. } if source.kind() == io::ErrorKind::NotFound => {
            PatchErrorKind::ResourceNotFound
        }
        StreamError::Open { .. } => PatchErrorKind::StreamOpenFailed,
        StreamError::Read { .. } | StreamError::Exhausted { .. } => {
            PatchErrorKind::StreamReadFailed
        }
        StreamError::Write { .. } | StreamError::Finished { .. } | StreamError::Persist { .. } => {
            PatchErrorKind::StreamWriteFailed
        }
        StreamError::Underrun { .. } => PatchErrorKind::ChunkUnderrun,
    }
}

impl From<StreamError> for PatchError {
    fn from(error: StreamError) -> Self {
        Self::wrap(stream_kind(&error), error)
    }
}

impl From<DeltaError> for PatchError {
    fn from(error: DeltaError) -> Self {
        match error {
            DeltaError::Source(stream) => stream.into(),
            other => Self::wrap(PatchErrorKind::DeltaApplyFailed, other),
        }
    }
}

impl From<ChecksumError> for PatchError {
    fn from(error: ChecksumError) -> Self {
        Self::wrap(PatchErrorKind::ChecksumGenerationFailed, error)
    }
}

impl From<FetchError> for PatchError {
    fn from(error: FetchError) -> Self {
        let kind = match &error {
            FetchError::Transport { source, .. }
                if matches!(source.kind(), TransportErrorKind::Status(404 | 410)) =>
            {
                PatchErrorKind::ResourceNotFound
            }
            FetchError::Transport { .. } | FetchError::RetriesExhausted { .. } => {
                PatchErrorKind::DownloadFailed
            }
            FetchError::AlreadyExists { .. } => PatchErrorKind::StreamWriteFailed,
            FetchError::Stream(stream) => stream_kind(stream),
        };
        Self::wrap(kind, error)
    }
}

impl From<IndexError> for PatchError {
    fn from(error: IndexError) -> Self {
        Self::wrap(PatchErrorKind::IndexFailed, error)
    }
}

impl From<CatalogError> for PatchError {
    fn from(error: CatalogError) -> Self {
        Self::wrap(PatchErrorKind::InvalidDocument, error)
    }
}

impl From<BuilderError> for PatchError {
    fn from(error: BuilderError) -> Self {
        Self::wrap(PatchErrorKind::InvalidOptions, error)
    }
}
