use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading, writing or validating documents.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Reading or writing the document file failed.
    #[error("failed to access '{}': {source}", path.display())]
    Io {
        /// Document path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The file extension names no supported encoding.
    #[error("cannot tell the document format of '{}'", path.display())]
    UnknownFormat {
        /// Document path.
        path: PathBuf,
    },
    /// YAML (de)serialisation failed.
    #[error("invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// JSON (de)serialisation failed.
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),
    /// A `Version` value is not `major.minor`.
    #[error("invalid document version '{0}'")]
    InvalidVersion(String),
    /// An entry's `Type` has no registered decoder.
    #[error("unknown entry type '{0}'")]
    UnknownType(String),
    /// An entry kind appeared where it is not allowed.
    #[error("entry of type '{kind}' is not allowed in {context}")]
    UnexpectedEntry {
        /// Entry discriminator.
        kind: &'static str,
        /// Where it was found.
        context: &'static str,
    },
    /// A field required at the document's version is absent.
    #[error("entry '{entry}' is missing required field '{field}'")]
    MissingField {
        /// Relative path of the entry, or its position when unnamed.
        entry: String,
        /// Field name as written in the document.
        field: &'static str,
    },
    /// Two resources share a relative path.
    #[error("resource '{0}' appears more than once")]
    DuplicateResource(String),
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
