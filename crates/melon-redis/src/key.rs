//! Logical keys and the namespace that maps them onto physical store keys

use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "Melonbot:";

/// A logical key or channel name, before namespacing
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for Key {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Prefix shared by every key and channel of one instance
///
/// All physical names go through [`Namespace::format`], so a logical key
/// maps to the same physical key for as long as the namespace lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    prefix: String,
}

impl Namespace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Build the physical name for a logical key
    pub fn format(&self, key: &Key) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Strip the namespace from a physical name
    ///
    /// Names outside the namespace are returned as-is.
    pub fn strip<'a>(&self, physical: &'a str) -> &'a str {
        physical.strip_prefix(&self.prefix).unwrap_or(physical)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}
