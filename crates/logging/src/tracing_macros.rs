//! crates/logging/src/tracing_macros.rs
//! Convenience macros for subsystem tracing.
//!
//! Each macro forwards to the matching `tracing` macro with the subsystem's
//! target from [`crate::targets`], so filters can address subsystems by name.

/// Emit a per-resource apply trace.
///
/// # Example
/// ```ignore
/// trace_apply!(path = %relative, "resource patched");
/// ```
#[macro_export]
macro_rules! trace_apply {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: $crate::targets::APPLY, $($arg)*);
    };
}

/// Emit a patch creation trace.
///
/// # Example
/// ```ignore
/// trace_create!(offset, "stored delta chunk");
/// ```
#[macro_export]
macro_rules! trace_create {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: $crate::targets::CREATE, $($arg)*);
    };
}

/// Emit a chunk index trace.
///
/// # Example
/// ```ignore
/// trace_index!(shards = count, "chunk index built");
/// ```
#[macro_export]
macro_rules! trace_index {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: $crate::targets::INDEX, $($arg)*);
    };
}

/// Emit a delta codec trace.
///
/// # Example
/// ```ignore
/// trace_delta!(controls = n, "encoded delta");
/// ```
#[macro_export]
macro_rules! trace_delta {
    ($($arg:tt)*) => {
        ::tracing::trace!(target: $crate::targets::DELTA, $($arg)*);
    };
}

/// Emit a remote fetch trace.
///
/// # Example
/// ```ignore
/// trace_fetch!(attempt, "retrying download");
/// ```
#[macro_export]
macro_rules! trace_fetch {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: $crate::targets::FETCH, $($arg)*);
    };
}

/// Emit a deletion trace.
///
/// # Example
/// ```ignore
/// trace_delete!(path = %removed, "deleted resource");
/// ```
#[macro_export]
macro_rules! trace_delete {
    ($($arg:tt)*) => {
        ::tracing::info!(target: $crate::targets::DELETE, $($arg)*);
    };
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use crate::targets;

    #[derive(Clone, Default)]
    struct Targets(Arc<Mutex<Vec<String>>>);

    impl<S: Subscriber> Layer<S> for Targets {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0
                .lock()
                .expect("lock")
                .push(event.metadata().target().to_owned());
        }
    }

    #[test]
    fn macros_log_to_their_subsystem_targets() {
        let seen = Targets::default();
        let subscriber = tracing_subscriber::registry().with(
            seen.clone()
                .with_filter(tracing_subscriber::filter::LevelFilter::TRACE),
        );
        tracing::subscriber::with_default(subscriber, || {
            crate::trace_apply!("apply");
            crate::trace_create!(offset = 4u64, "create");
            crate::trace_index!("index");
            crate::trace_delta!("delta");
            crate::trace_fetch!(attempt = 1u32, "fetch");
            crate::trace_delete!("delete");
        });
        assert_eq!(
            *seen.0.lock().expect("lock"),
            [
                targets::APPLY,
                targets::CREATE,
                targets::INDEX,
                targets::DELTA,
                targets::FETCH,
                targets::DELETE,
            ]
        );
    }

    #[test]
    fn macros_expand_without_subscriber() {
        crate::trace_apply!("apply");
        crate::trace_delete!("delete");
    }
}
