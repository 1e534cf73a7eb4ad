//! crates/fetch/src/fetcher.rs
//!
//! Bounded exponential-backoff downloads.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use logging::trace_fetch;
use streams::ScopedTempFile;

use crate::{Backoff, Clock, FetchError, SystemClock, Transport, TransportError};

/// Result of a successful download.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FetchOutcome {
    /// Body length in bytes.
    pub bytes: u64,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

/// Downloads remote objects, retrying transient failures with exponential
/// backoff until a time budget is spent.
///
/// Downloads to disk are staged in a temp file next to the destination and
/// moved into place only after the transfer completed. An existing
/// destination is never replaced.
#[derive(Debug)]
pub struct RetryingFetcher<T, C = SystemClock> {
    transport: T,
    clock: C,
    backoff: Backoff,
    staging_dir: Option<PathBuf>,
}

impl<T: Transport> RetryingFetcher<T> {
    /// Creates a fetcher on the wall clock with the default schedule.
    pub fn new(transport: T) -> Self {
        Self::with_clock(transport, SystemClock)
    }
}

impl<T: Transport, C: Clock> RetryingFetcher<T, C> {
    /// Creates a fetcher that measures and sleeps with `clock`.
    pub fn with_clock(transport: T, clock: C) -> Self {
        Self {
            transport,
            clock,
            backoff: Backoff::default(),
            staging_dir: None,
        }
    }

    /// Replaces the retry schedule.
    #[must_use]
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Stages downloads in `dir` instead of the destination's directory.
    #[must_use]
    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// The retry schedule in use.
    pub const fn retry_schedule(&self) -> Backoff {
        self.backoff
    }

    /// The clock used for elapsed time and sleeps.
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Downloads `url` to `destination`.
    pub fn fetch_to_file(&self, url: &str, destination: &Path) -> Result<FetchOutcome, FetchError> {
        if destination.exists() {
            return Err(FetchError::AlreadyExists {
                path: destination.to_path_buf(),
            });
        }
        let dir = self
            .staging_dir
            .as_deref()
            .or_else(|| destination.parent().filter(|p| !p.as_os_str().is_empty()))
            .unwrap_or_else(|| Path::new("."));

        let (temp, outcome) = self.fetch_to_temp(url, dir)?;
        temp.persist_noclobber(destination).map_err(|error| {
            if destination.exists() {
                FetchError::AlreadyExists {
                    path: destination.to_path_buf(),
                }
            } else {
                FetchError::Stream(error)
            }
        })?;
        trace_fetch!(url, bytes = outcome.bytes, destination = %destination.display(), "stored download");
        Ok(outcome)
    }

    /// Downloads `url` into a temp file inside `dir`.
    ///
    /// The file is deleted when the returned handle is dropped unless it is
    /// persisted first.
    pub fn fetch_to_temp(
        &self,
        url: &str,
        dir: &Path,
    ) -> Result<(ScopedTempFile, FetchOutcome), FetchError> {
        let stage = || -> Result<ScopedTempFile, FetchError> { Ok(ScopedTempFile::new_in(dir)?) };
        let download = |temp: &mut ScopedTempFile| -> Result<u64, TransportError> {
            let file = OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(temp.path())
                .map_err(|error| TransportError::local(&error))?;
            let mut writer = BufWriter::new(file);
            let bytes = self.transport.get(url, &mut writer)?;
            writer
                .flush()
                .map_err(|error| TransportError::local(&error))?;
            Ok(bytes)
        };
        self.retry(url, stage, download)
    }

    /// Downloads `url` into memory.
    pub fn fetch_to_vec(&self, url: &str) -> Result<(Vec<u8>, FetchOutcome), FetchError> {
        self.retry(
            url,
            || Ok(Vec::new()),
            |buffer: &mut Vec<u8>| self.transport.get(url, buffer),
        )
    }

    /// Runs `attempt` against a fresh target from `prepare` until it succeeds,
    /// fails permanently, or the budget is spent.
    fn retry<S, P, A>(
        &self,
        url: &str,
        mut prepare: P,
        mut attempt: A,
    ) -> Result<(S, FetchOutcome), FetchError>
    where
        P: FnMut() -> Result<S, FetchError>,
        A: FnMut(&mut S) -> Result<u64, TransportError>,
    {
        let start = self.clock.now();
        let mut attempts = 0u32;
        loop {
            let mut target = prepare()?;
            attempts += 1;
            let error = match attempt(&mut target) {
                Ok(bytes) => {
                    trace_fetch!(url, bytes, attempts, "download complete");
                    return Ok((target, FetchOutcome { bytes, attempts }));
                }
                Err(error) => error,
            };
            drop(target);

            if !error.is_transient() {
                return Err(FetchError::Transport {
                    url: url.to_owned(),
                    source: error,
                });
            }

            let elapsed = self.clock.now().saturating_duration_since(start);
            let Some(delay) = self.backoff.delay(attempts - 1, elapsed) else {
                tracing::warn!(target: logging::targets::FETCH, url, attempts, ?elapsed, %error, "giving up");
                return Err(FetchError::RetriesExhausted {
                    url: url.to_owned(),
                    attempts,
                    elapsed,
                    source: error,
                });
            };
            trace_fetch!(url, attempts, ?delay, %error, "transient failure, retrying");
            self.clock.sleep(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ManualClock, TransportErrorKind};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Fails with the queued errors, then serves `body`.
    struct Scripted {
        failures: Mutex<Vec<TransportErrorKind>>,
        body: Vec<u8>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(mut failures: Vec<TransportErrorKind>, body: &[u8]) -> Self {
            failures.reverse();
            Self {
                failures: Mutex::new(failures),
                body: body.to_vec(),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().expect("lock")
        }
    }

    impl Transport for Scripted {
        fn get(&self, _url: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
            *self.calls.lock().expect("lock") += 1;
            if let Some(kind) = self.failures.lock().expect("lock").pop() {
                sink.write_all(b"partial").expect("write");
                return Err(TransportError::new(kind, "scripted"));
            }
            sink.write_all(&self.body).expect("write");
            Ok(self.body.len() as u64)
        }
    }

    #[test]
    fn transient_failures_back_off_and_recover() {
        let transport = Scripted::new(
            vec![TransportErrorKind::Connect, TransportErrorKind::Timeout],
            b"payload",
        );
        let fetcher = RetryingFetcher::with_clock(transport, ManualClock::new());
        let (body, outcome) = fetcher.fetch_to_vec("http://cdn/a").expect("fetch");
        assert_eq!(body, b"payload");
        assert_eq!(outcome.attempts, 3);
        assert_eq!(
            fetcher.clock().sleeps(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[test]
    fn permanent_failures_are_not_retried() {
        let transport = Scripted::new(vec![TransportErrorKind::Status(404)], b"");
        let fetcher = RetryingFetcher::with_clock(transport, ManualClock::new());
        let err = fetcher.fetch_to_vec("http://cdn/missing").expect_err("404");
        assert!(matches!(err, FetchError::Transport { .. }));
        assert_eq!(err.url(), Some("http://cdn/missing"));
        assert!(fetcher.clock().sleeps().is_empty());
    }

    #[test]
    fn budget_caps_the_final_sleep() {
        let transport = Scripted::new(vec![TransportErrorKind::Receive; 10], b"never");
        let fetcher = RetryingFetcher::with_clock(transport, ManualClock::new())
            .backoff(Backoff::with_budget(Duration::from_secs(10)));
        let err = fetcher.fetch_to_vec("http://cdn/flaky").expect_err("exhausted");

        let sleeps = fetcher.clock().sleeps();
        assert_eq!(
            sleeps,
            [1, 2, 4, 3].map(Duration::from_secs).to_vec()
        );
        match err {
            FetchError::RetriesExhausted { attempts, elapsed, .. } => {
                assert_eq!(attempts, 5);
                assert_eq!(elapsed, Duration::from_secs(10));
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(fetcher.transport.calls(), 5);
    }

    #[test]
    fn file_downloads_discard_partial_attempts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let destination = dir.path().join("nested").join("object.bin");
        std::fs::create_dir_all(destination.parent().expect("parent")).expect("mkdir");

        let transport = Scripted::new(vec![TransportErrorKind::Send], b"complete body");
        let fetcher = RetryingFetcher::with_clock(transport, ManualClock::new());
        let outcome = fetcher.fetch_to_file("http://cdn/o", &destination).expect("fetch");

        assert_eq!(outcome.bytes, 13);
        assert_eq!(std::fs::read(&destination).expect("read"), b"complete body");
        let leftovers: Vec<_> = std::fs::read_dir(destination.parent().expect("parent"))
            .expect("list")
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn existing_destination_is_never_overwritten() {
        let dir = tempfile::tempdir().expect("tempdir");
        let destination = dir.path().join("object.bin");
        std::fs::write(&destination, b"original").expect("write");

        let fetcher = RetryingFetcher::with_clock(Scripted::new(vec![], b"new"), ManualClock::new());
        let err = fetcher.fetch_to_file("http://cdn/o", &destination).expect_err("exists");
        assert!(matches!(err, FetchError::AlreadyExists { .. }));
        assert_eq!(std::fs::read(&destination).expect("read"), b"original");
        assert_eq!(fetcher.transport.calls(), 0);
    }
}
