//! crates/engine/src/source.rs
//!
//! Where resource bytes and patch payloads come from.

use std::path::{Component, Path, PathBuf};

use fetch::{Backoff, Clock, HttpTransport, RetryingFetcher, SystemClock, Transport};
use logging::trace_fetch;
use streams::{ByteSource, ByteStreamIn, ScopedTempFile, StreamError};
use tempfile::TempDir;

use crate::options::ApplyOptions;
use crate::{PatchError, PatchErrorKind, PatchResult};

/// Identifies one stored object.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ObjectRef<'a> {
    /// Relative path of the resource or patch chunk.
    pub relative_path: &'a str,
    /// Content address of the stored object.
    pub location: &'a str,
}

/// Supplies resource bytes or patch payloads.
///
/// Implementations decide whether an object is found by its relative path
/// or by its content address.
pub trait ResourceSource: Send + Sync {
    /// Opens `object` for chunked reading.
    fn open(&self, object: ObjectRef<'_>, chunk_size: usize) -> PatchResult<OpenedResource>;

    /// Reads `object` into memory.
    fn read(&self, object: ObjectRef<'_>) -> PatchResult<Vec<u8>>;
}

/// An object opened for reading.
///
/// Remote objects are staged in a temp file that lives as long as the value.
#[derive(Debug)]
pub struct OpenedResource {
    stream: ByteStreamIn,
    _staged: Option<ScopedTempFile>,
}

impl OpenedResource {
    /// Wraps a stream over a local file.
    #[must_use]
    pub const fn local(stream: ByteStreamIn) -> Self {
        Self {
            stream,
            _staged: None,
        }
    }

    fn staged(stream: ByteStreamIn, staged: ScopedTempFile) -> Self {
        Self {
            stream,
            _staged: Some(staged),
        }
    }

    /// Size of the object.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.stream.len()
    }

    /// Returns `true` for an empty object.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }

    /// Moves to `position`, reopening the stream first if it was exhausted.
    pub fn reposition(&mut self, position: u64) -> Result<(), StreamError> {
        reposition(&mut self.stream, position)
    }
}

impl ByteSource for OpenedResource {
    fn chunk_size(&self) -> usize {
        self.stream.chunk_size()
    }

    fn next_chunk(&mut self) -> Result<Option<&[u8]>, StreamError> {
        self.stream.next_chunk()
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>, StreamError> {
        self.stream.read(len)
    }

    fn skip(&mut self, len: u64) -> Result<(), StreamError> {
        self.stream.skip(len)
    }

    fn current_position(&self) -> u64 {
        self.stream.current_position()
    }

    fn is_finished(&self) -> bool {
        self.stream.is_finished()
    }
}

pub(crate) fn reposition(stream: &mut ByteStreamIn, position: u64) -> Result<(), StreamError> {
    if stream.is_finished() {
        stream.reopen()?;
    }
    stream.seek(position)
}

/// Joins a document-supplied relative path onto `root`.
///
/// Absolute paths, `..` components and empty paths are rejected so a
/// document can never address files outside the root.
pub fn join_relative(root: &Path, relative: &str) -> PatchResult<PathBuf> {
    let candidate = Path::new(relative);
    let mut joined = root.to_path_buf();
    let mut parts = 0usize;
    for component in candidate.components() {
        match component {
            Component::Normal(part) => {
                joined.push(part);
                parts += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(PatchError::with_detail(
                    PatchErrorKind::InvalidDocument,
                    format!("relative path '{relative}' escapes its root"),
                ));
            }
        }
    }
    if parts == 0 {
        return Err(PatchError::with_detail(
            PatchErrorKind::InvalidDocument,
            format!("relative path '{relative}' names no file"),
        ));
    }
    Ok(joined)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Addressing {
    RelativePath,
    Location,
}

/// Objects stored under a local directory.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    root: PathBuf,
    addressing: Addressing,
}

impl DirectorySource {
    /// A build tree: objects are found by relative path.
    pub fn tree(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            addressing: Addressing::RelativePath,
        }
    }

    /// A content-addressed store: objects are found by location.
    pub fn store(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            addressing: Addressing::Location,
        }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `object`.
    pub fn resolve(&self, object: ObjectRef<'_>) -> PatchResult<PathBuf> {
        let key = match self.addressing {
            Addressing::RelativePath => object.relative_path,
            Addressing::Location => object.location,
        };
        join_relative(&self.root, key)
    }
}

impl ResourceSource for DirectorySource {
    fn open(&self, object: ObjectRef<'_>, chunk_size: usize) -> PatchResult<OpenedResource> {
        let path = self.resolve(object)?;
        let stream = ByteStreamIn::open(&path, chunk_size)
            .map_err(|error| PatchError::from(error).context(object.relative_path))?;
        Ok(OpenedResource::local(stream))
    }

    fn read(&self, object: ObjectRef<'_>) -> PatchResult<Vec<u8>> {
        let path = self.resolve(object)?;
        std::fs::read(&path).map_err(|error| {
            let kind = if error.kind() == std::io::ErrorKind::NotFound {
                PatchErrorKind::ResourceNotFound
            } else {
                PatchErrorKind::StreamReadFailed
            };
            PatchError::io(kind, &path, error)
        })
    }
}

/// Objects downloaded by content address from a base URL.
///
/// Downloads go through a [`RetryingFetcher`], so transient failures are
/// retried within its budget. Opened objects are staged in a private temp
/// directory that is removed with the source.
#[derive(Debug)]
pub struct RemoteSource<T, C = SystemClock> {
    base_url: String,
    fetcher: RetryingFetcher<T, C>,
    staging: TempDir,
}

impl RemoteSource<HttpTransport> {
    /// HTTP source retrying for at most `retry_budget`.
    pub fn http(base_url: impl Into<String>, retry_budget: std::time::Duration) -> PatchResult<Self> {
        let transport = HttpTransport::new()
            .map_err(|error| PatchError::wrap(PatchErrorKind::DownloadFailed, error))?;
        let fetcher = RetryingFetcher::new(transport).backoff(Backoff::with_budget(retry_budget));
        Self::new(base_url, fetcher)
    }

    /// HTTP source using the retry budget of `options`.
    pub fn http_for(base_url: impl Into<String>, options: &ApplyOptions) -> PatchResult<Self> {
        Self::http(base_url, options.retry_budget())
    }
}

impl<T: Transport, C: Clock> RemoteSource<T, C> {
    /// Source fetching from `base_url` with `fetcher`.
    pub fn new(base_url: impl Into<String>, fetcher: RetryingFetcher<T, C>) -> PatchResult<Self> {
        let staging = tempfile::Builder::new()
            .prefix("respatch-fetch-")
            .tempdir()
            .map_err(|error| PatchError::io(PatchErrorKind::StreamOpenFailed, &std::env::temp_dir(), error))?;
        Ok(Self {
            base_url: base_url.into(),
            fetcher,
            staging,
        })
    }

    /// Source whose retries are bounded by the budget of `options`.
    pub fn configured(
        base_url: impl Into<String>,
        fetcher: RetryingFetcher<T, C>,
        options: &ApplyOptions,
    ) -> PatchResult<Self> {
        Self::new(
            base_url,
            fetcher.backoff(Backoff::with_budget(options.retry_budget())),
        )
    }

    /// URL an object is fetched from.
    #[must_use]
    pub fn url(&self, object: ObjectRef<'_>) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            object.location.trim_start_matches('/')
        )
    }

    /// The underlying fetcher.
    pub const fn fetcher(&self) -> &RetryingFetcher<T, C> {
        &self.fetcher
    }
}

impl<T: Transport, C: Clock> ResourceSource for RemoteSource<T, C> {
    fn open(&self, object: ObjectRef<'_>, chunk_size: usize) -> PatchResult<OpenedResource> {
        let url = self.url(object);
        let (staged, outcome) = self
            .fetcher
            .fetch_to_temp(&url, self.staging.path())
            .map_err(|error| PatchError::from(error).context(object.relative_path))?;
        trace_fetch!(url = %url, bytes = outcome.bytes, attempts = outcome.attempts, "staged object");
        let stream = ByteStreamIn::open(staged.path(), chunk_size)?;
        Ok(OpenedResource::staged(stream, staged))
    }

    fn read(&self, object: ObjectRef<'_>) -> PatchResult<Vec<u8>> {
        let url = self.url(object);
        let (bytes, _) = self
            .fetcher
            .fetch_to_vec(&url)
            .map_err(|error| PatchError::from(error).context(object.relative_path))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use std::sync::Mutex;

    use fetch::{ManualClock, TransportError, TransportErrorKind};

    #[test]
    fn relative_paths_stay_inside_the_root() {
        let root = Path::new("/data/build");
        assert_eq!(
            join_relative(root, "res/./ui/icon.png").expect("join"),
            Path::new("/data/build/res/ui/icon.png")
        );
        for bad in ["../etc/passwd", "/etc/passwd", "res/../../x", "", "."] {
            let err = join_relative(root, bad).expect_err(bad);
            assert_eq!(err.kind(), PatchErrorKind::InvalidDocument, "{bad}");
        }
    }

    #[test]
    fn directory_sources_pick_their_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("ab")).expect("mkdir");
        fs::write(dir.path().join("ab/ab01_ff"), b"stored").expect("write");
        fs::write(dir.path().join("plain.txt"), b"tree").expect("write");

        let object = ObjectRef {
            relative_path: "plain.txt",
            location: "ab/ab01_ff",
        };
        assert_eq!(DirectorySource::store(dir.path()).read(object).expect("store"), b"stored");
        assert_eq!(DirectorySource::tree(dir.path()).read(object).expect("tree"), b"tree");

        let mut opened = DirectorySource::tree(dir.path()).open(object, 2).expect("open");
        assert_eq!(opened.len(), 4);
        assert_eq!(opened.read(4).expect("read"), b"tree");
        opened.reposition(1).expect("reposition");
        assert_eq!(opened.read(3).expect("read"), b"ree");
    }

    #[test]
    fn missing_objects_are_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let object = ObjectRef {
            relative_path: "gone.bin",
            location: "00/gone",
        };
        let source = DirectorySource::tree(dir.path());
        assert_eq!(source.read(object).expect_err("read").kind(), PatchErrorKind::ResourceNotFound);
        let err = source.open(object, 8).expect_err("open");
        assert_eq!(err.kind(), PatchErrorKind::ResourceNotFound);
        assert!(err.to_string().contains("gone.bin"));
    }

    struct Canned {
        urls: Mutex<Vec<String>>,
        status: Option<u16>,
    }

    impl Transport for Canned {
        fn get(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
            self.urls.lock().expect("lock").push(url.to_owned());
            if let Some(status) = self.status {
                return Err(TransportError::new(TransportErrorKind::Status(status), "canned"));
            }
            sink.write_all(b"remote bytes")
                .map_err(|error| TransportError::new(TransportErrorKind::Local, error.to_string()))?;
            Ok(12)
        }
    }

    #[test]
    fn remote_objects_are_fetched_by_location() {
        let transport = Canned {
            urls: Mutex::new(Vec::new()),
            status: None,
        };
        let fetcher = RetryingFetcher::with_clock(transport, ManualClock::new());
        let source = RemoteSource::new("https://cdn.example/patches/", fetcher).expect("source");
        let object = ObjectRef {
            relative_path: "res/a.bin.0.patch",
            location: "7f/7f00aa_01",
        };

        assert_eq!(source.read(object).expect("read"), b"remote bytes");
        let mut opened = source.open(object, 4).expect("open");
        assert_eq!(opened.read(6).expect("read"), b"remote");
        assert_eq!(source.url(object), "https://cdn.example/patches/7f/7f00aa_01");
    }

    struct Unreachable;

    impl Transport for Unreachable {
        fn get(&self, url: &str, _sink: &mut dyn Write) -> Result<u64, TransportError> {
            Err(TransportError::new(TransportErrorKind::Connect, url))
        }
    }

    #[test]
    fn apply_options_bound_remote_retries() {
        let options = ApplyOptions::builder()
            .destination_root("/tmp/respatch-out")
            .retry_budget(std::time::Duration::from_secs(5))
            .build()
            .expect("options");
        let fetcher = RetryingFetcher::with_clock(Unreachable, ManualClock::new());
        let source = RemoteSource::configured("https://cdn.example", fetcher, &options).expect("source");
        assert_eq!(
            source.fetcher().retry_schedule().budget(),
            std::time::Duration::from_secs(5)
        );

        let err = source
            .read(ObjectRef {
                relative_path: "res/x",
                location: "00/x",
            })
            .expect_err("unreachable");
        assert_eq!(err.kind(), PatchErrorKind::DownloadFailed);
        let slept: std::time::Duration = source.fetcher().clock().sleeps().iter().sum();
        assert_eq!(slept, std::time::Duration::from_secs(5));
    }

    #[test]
    fn remote_not_found_maps_to_resource_not_found() {
        let transport = Canned {
            urls: Mutex::new(Vec::new()),
            status: Some(404),
        };
        let fetcher = RetryingFetcher::with_clock(transport, ManualClock::new());
        let source = RemoteSource::new("https://cdn.example", fetcher).expect("source");
        let err = source
            .read(ObjectRef {
                relative_path: "res/x",
                location: "00/x",
            })
            .expect_err("404");
        assert_eq!(err.kind(), PatchErrorKind::ResourceNotFound);
    }
}
