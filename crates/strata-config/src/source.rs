//! Configuration source contract.
//!
//! Concrete sources (files, environment, remote stores) live outside this
//! crate; the core only needs a list of raw `(path, value)` pairs and the
//! tags scoping them. [`MapSource`] is the in-memory implementation used
//! for wiring and tests.

use crate::error::ConfigError;
use crate::tag::Tags;

/// A provider of raw configuration pairs.
///
/// Implement this to feed configuration from anywhere; the core tokenizes
/// each raw path and inserts the value into a fresh tree, then merges that
/// tree by tag-set (see [`crate::tree::TreeService`]).
pub trait ConfigSource: Send + Sync {
    /// Stable name identifying this source in logs and targeted reloads.
    fn name(&self) -> String;

    /// Format identifier (`"map"`, `"properties"`, `"json"`, ...). The core
    /// is agnostic to which formats exist; it is advisory for loaders.
    fn format(&self) -> &str {
        "map"
    }

    /// Tags scoping this source; an untagged source applies everywhere.
    fn tags(&self) -> Tags {
        Tags::none()
    }

    /// Fetch the current raw pairs. Called on every load and reload.
    fn pairs(&self) -> Result<Vec<(String, String)>, ConfigError>;
}

/// An in-memory source backed by a fixed list of pairs.
#[derive(Debug, Clone)]
pub struct MapSource {
    name: String,
    tags: Tags,
    pairs: Vec<(String, String)>,
}

impl MapSource {
    /// Build an untagged source from `(path, value)` pairs.
    pub fn new<K, V>(
        name: impl Into<String>,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            tags: Tags::none(),
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Scope this source to a tag-set.
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }
}

impl ConfigSource for MapSource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn tags(&self) -> Tags {
        self.tags.clone()
    }

    fn pairs(&self) -> Result<Vec<(String, String)>, ConfigError> {
        Ok(self.pairs.clone())
    }
}
