//! Identifier newtypes
//!
//! Newtype wrappers keep the anonymized patient identifier and the archive
//! row key from being mixed up with raw strings (a raw patient name in
//! particular).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the anonymized identifier and the visit date in a
/// composite archive key
pub const COMPOSITE_KEY_SEPARATOR: char = '_';

/// Anonymized patient identifier
///
/// Produced by the pseudonymizer as the base64 encoding of a SHA-256 digest.
/// Values read back from the intermediate handoff are taken verbatim and are
/// not re-validated, so an identifier may be empty if the handoff line was.
///
/// # Examples
///
/// ```
/// use phi_archive::domain::ids::AnonymizedId;
///
/// let id = AnonymizedId::from("q2Fz...=".to_string());
/// assert_eq!(id.as_str(), "q2Fz...=");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnonymizedId(String);

impl AnonymizedId {
    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for AnonymizedId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for AnonymizedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AnonymizedId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Archive row key
///
/// Format: `{anonymized_id}_{visit_date}`. Two records with the same
/// anonymized identifier and visit date share a key and the later write wins.
///
/// # Examples
///
/// ```
/// use phi_archive::domain::ids::{AnonymizedId, CompositeKey};
///
/// let id = AnonymizedId::from("abc=".to_string());
/// let key = CompositeKey::compose(&id, "2015-03-01");
/// assert_eq!(key.as_str(), "abc=_2015-03-01");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeKey(String);

impl CompositeKey {
    /// Builds the key from its two parts
    pub fn compose(anonymized_id: &AnonymizedId, visit_date: &str) -> Self {
        let mut key =
            String::with_capacity(anonymized_id.as_str().len() + 1 + visit_date.len());
        key.push_str(anonymized_id.as_str());
        key.push(COMPOSITE_KEY_SEPARATOR);
        key.push_str(visit_date);
        Self(key)
    }

    /// Wraps a key read back from the archive store
    pub fn from_stored(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the key as UTF-8 bytes, the form the archive stores it in
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CompositeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
