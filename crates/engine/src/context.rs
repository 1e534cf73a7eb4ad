//! Per-operation context: verbosity plus an optional progress observer.

use std::fmt;
use std::sync::Arc;

use logging::Verbosity;

/// What happened to one resource.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ResourceOutcome {
    /// Rebuilt from patch chunks against the previous build.
    Patched,
    /// Copied whole from the previous build or the next-build source.
    Copied,
    /// The destination already held the expected content.
    UpToDate,
    /// A patch was written for the resource.
    Diffed,
    /// The resource was deleted.
    Removed,
}

/// Snapshot passed to the progress observer.
///
/// Events arrive in completion order, which is not the catalog order when
/// resources are processed in parallel; `completed` is monotonic.
#[derive(Clone, Copy, Debug)]
pub enum ProgressEvent<'a> {
    /// One resource finished.
    Resource {
        /// Resource that finished.
        relative_path: &'a str,
        /// What was done to it.
        outcome: ResourceOutcome,
        /// Resources finished so far, this one included.
        completed: usize,
        /// Resources in the operation.
        total: usize,
    },
    /// The whole operation finished.
    Finished {
        /// Resources processed.
        total: usize,
    },
}

type ProgressFn = dyn Fn(&ProgressEvent<'_>) + Send + Sync;

/// Carries the settings every pipeline call needs.
///
/// The context is passed explicitly; there is no process-wide state. It is
/// cheap to clone and shared by all workers of one operation.
#[derive(Clone, Default)]
pub struct PatchContext {
    verbosity: Verbosity,
    progress: Option<Arc<ProgressFn>>,
}

impl PatchContext {
    /// Creates a context with the given verbosity and no observer.
    #[must_use]
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            progress: None,
        }
    }

    /// Installs a progress observer.
    #[must_use]
    pub fn with_progress<F>(mut self, observer: F) -> Self
    where
        F: Fn(&ProgressEvent<'_>) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(observer));
        self
    }

    /// Verbosity requested by the caller.
    #[must_use]
    pub const fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub(crate) fn report(&self, event: &ProgressEvent<'_>) {
        if self.verbosity.reports_progress() {
            match event {
                ProgressEvent::Resource {
                    relative_path,
                    outcome,
                    completed,
                    total,
                } => tracing::info!(
                    target: logging::targets::ROOT,
                    path = relative_path,
                    ?outcome,
                    completed,
                    total,
                    "resource finished"
                ),
                ProgressEvent::Finished { total } => {
                    tracing::info!(target: logging::targets::ROOT, total, "operation finished");
                }
            }
        }
        if let Some(progress) = &self.progress {
            progress(event);
        }
    }
}

impl fmt::Debug for PatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchContext")
            .field("verbosity", &self.verbosity)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}
