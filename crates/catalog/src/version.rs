//! crates/catalog/src/version.rs
//!
//! Document versions and the fields each version carries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::CatalogError;

/// `major.minor` version stamped on every document.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DocumentVersion {
    /// Major component.
    pub major: u16,
    /// Minor component.
    pub minor: u16,
}

impl DocumentVersion {
    /// Version written by this crate.
    pub const CURRENT: Self = Self::new(0, 2);

    /// Creates a version.
    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// How `field` is treated in documents of this version.
    #[must_use]
    pub fn presence(self, field: Field) -> Presence {
        let introduced = field.introduced();
        if self < introduced {
            Presence::NotExpected
        } else if introduced.minor > self.minor {
            Presence::Optional
        } else {
            Presence::Required
        }
    }
}

impl Default for DocumentVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for DocumentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for DocumentVersion {
    type Err = CatalogError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || CatalogError::InvalidVersion(text.to_owned());
        let (major, minor) = text.trim().split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl Serialize for DocumentVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DocumentVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // An unquoted YAML `1.10` arrives as the float 1.1, losing the minor
        // version, so only string spellings are accepted.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(f64),
        }
        let text = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text,
            Raw::Number(number) => {
                return Err(serde::de::Error::custom(CatalogError::InvalidVersion(format!(
                    "{number} (versions must be quoted strings)"
                ))));
            }
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Fields whose presence depends on the document version.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Field {
    /// `CompressedSize` on every resource entry.
    CompressedSize,
    /// `SourceOffset` on binary patch entries.
    SourceOffset,
}

/// Capability table: the version that introduced each gated field.
const INTRODUCED: &[(Field, &str, DocumentVersion)] = &[
    (Field::CompressedSize, "CompressedSize", DocumentVersion::new(0, 1)),
    (Field::SourceOffset, "SourceOffset", DocumentVersion::new(0, 2)),
];

impl Field {
    /// Version that introduced the field.
    #[must_use]
    pub fn introduced(self) -> DocumentVersion {
        INTRODUCED
            .iter()
            .find(|(field, _, _)| *field == self)
            .map_or(DocumentVersion::new(0, 0), |(_, _, version)| *version)
    }

    /// Key used in documents.
    #[must_use]
    pub fn key(self) -> &'static str {
        INTRODUCED
            .iter()
            .find(|(field, _, _)| *field == self)
            .map_or("", |(_, key, _)| key)
    }
}

/// Whether a gated field must, may or cannot appear.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Presence {
    /// The document predates the field; it is neither read nor written.
    NotExpected,
    /// The field is written when known and defaulted when absent.
    Optional,
    /// The field must be present.
    Required,
}

impl Presence {
    /// Resolves a decoded value against this presence.
    pub(crate) fn resolve<T>(
        self,
        value: Option<T>,
        field: Field,
        entry: &str,
        default: impl FnOnce() -> T,
    ) -> Result<T, CatalogError> {
        match (self, value) {
            (Self::NotExpected, _) => Ok(default()),
            (_, Some(value)) => Ok(value),
            (Self::Optional, None) => Ok(default()),
            (Self::Required, None) => Err(CatalogError::MissingField {
                entry: entry.to_owned(),
                field: field.key(),
            }),
        }
    }

    /// Value to write for a field of this presence.
    pub(crate) fn emit<T>(self, value: T) -> Option<T> {
        match self {
            Self::NotExpected => None,
            Self::Optional | Self::Required => Some(value),
        }
    }
}
