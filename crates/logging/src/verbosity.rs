//! crates/logging/src/verbosity.rs
//! Verbosity levels and the filter directives they expand to.

use tracing::level_filters::LevelFilter;

use crate::targets;

/// How much diagnostic output a caller wants.
///
/// The value travels with each operation rather than living in a global, so
/// two operations in one process can log at different levels.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Verbosity {
    /// Warnings and errors only.
    Quiet,
    /// Per-operation summaries.
    #[default]
    Normal,
    /// Per-resource progress.
    Verbose,
    /// Everything, including per-chunk and per-index detail.
    Debug,
}

impl Verbosity {
    /// Maps a `-v` style repetition count onto a level.
    #[must_use]
    pub const fn from_level(level: u8) -> Self {
        match level {
            0 => Self::Quiet,
            1 => Self::Normal,
            2 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Most detailed level emitted for workspace targets.
    #[must_use]
    pub const fn level_filter(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::WARN,
            Self::Normal => LevelFilter::INFO,
            Self::Verbose => LevelFilter::DEBUG,
            Self::Debug => LevelFilter::TRACE,
        }
    }

    /// `EnvFilter` directives: dependencies stay at warn, workspace targets
    /// follow [`level_filter`](Self::level_filter).
    #[must_use]
    pub fn directives(self) -> String {
        let level = match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Verbose => "debug",
            Self::Debug => "trace",
        };
        format!("warn,{}={level}", targets::ROOT)
    }

    /// Returns `true` when per-resource progress should be reported.
    #[must_use]
    pub const fn reports_progress(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_saturate_at_debug() {
        assert_eq!(Verbosity::from_level(0), Verbosity::Quiet);
        assert_eq!(Verbosity::from_level(1), Verbosity::Normal);
        assert_eq!(Verbosity::from_level(2), Verbosity::Verbose);
        assert_eq!(Verbosity::from_level(3), Verbosity::Debug);
        assert_eq!(Verbosity::from_level(200), Verbosity::Debug);
    }

    #[test]
    fn directives_scope_workspace_targets() {
        assert_eq!(Verbosity::Quiet.directives(), "warn,respatch=warn");
        assert_eq!(Verbosity::Verbose.directives(), "warn,respatch=debug");
        assert_eq!(Verbosity::Debug.directives(), "warn,respatch=trace");
    }

    #[test]
    fn ordering_follows_detail() {
        assert!(Verbosity::Quiet < Verbosity::Normal);
        assert!(Verbosity::Verbose < Verbosity::Debug);
        assert!(!Verbosity::Normal.reports_progress());
        assert!(Verbosity::Verbose.reports_progress());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_lowercase_names() {
        let parsed: Verbosity = serde_json::from_str("\"verbose\"").expect("parse");
        assert_eq!(parsed, Verbosity::Verbose);
    }
}
