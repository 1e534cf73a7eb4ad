#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `fetch` downloads patch payloads and resource data from a CDN. A
//! [`RetryingFetcher`] makes one GET at a time through a [`Transport`] and
//! retries transient failures on an exponential [`Backoff`] schedule until
//! the retry budget is spent.
//!
//! # Design
//!
//! Time and the network are both injected. [`Clock`] supplies the current
//! instant and performs sleeps, so tests drive the schedule with a
//! [`ManualClock`] instead of waiting. [`Transport`] performs a single
//! attempt; [`HttpTransport`] is the `reqwest` implementation and classifies
//! failures into [`TransportErrorKind`]s. Only resolve, connect, timeout,
//! send and receive failures are retried.
//!
//! # Invariants
//!
//! - Delays start at one second and double, and the last sleep never runs
//!   past the budget.
//! - A destination that already exists is never overwritten; partial
//!   downloads never appear at the destination path.
//!
//! # Examples
//!
//! ```
//! use std::io::Write;
//! use fetch::{ManualClock, RetryingFetcher, Transport, TransportError};
//!
//! struct Fixed;
//!
//! impl Transport for Fixed {
//!     fn get(&self, _url: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
//!         sink.write_all(b"data").map(|()| 4).map_err(|e| {
//!             TransportError::new(fetch::TransportErrorKind::Local, e.to_string())
//!         })
//!     }
//! }
//!
//! let fetcher = RetryingFetcher::with_clock(Fixed, ManualClock::new());
//! let (body, outcome) = fetcher.fetch_to_vec("https://cdn.invalid/ab/object")?;
//! assert_eq!(body, b"data");
//! assert_eq!(outcome.attempts, 1);
//! # Ok::<(), fetch::FetchError>(())
//! ```

mod clock;
mod error;
mod fetcher;
mod transport;

pub use clock::{Backoff, Clock, ManualClock, SystemClock};
pub use error::{FetchError, TransportError, TransportErrorKind};
pub use fetcher::{FetchOutcome, RetryingFetcher};
pub use transport::{HttpTransport, Transport};
