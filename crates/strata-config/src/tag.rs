//! Opaque key/value labels scoping sources and queries to an environment.

use std::collections::BTreeSet;
use std::fmt;

/// A single label, e.g. `environment=dev`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tag {
    key: String,
    value: String,
}

impl Tag {
    /// Build a tag from an arbitrary key/value pair.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Conventional `environment=<value>` tag.
    pub fn environment(value: impl Into<String>) -> Self {
        Self::new("environment", value)
    }

    /// Conventional `profile=<value>` tag.
    pub fn profile(value: impl Into<String>) -> Self {
        Self::new("profile", value)
    }

    /// The tag key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The tag value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// An order-independent set of [`Tag`]s.
///
/// Equality, hashing, and subset checks ignore insertion order; the empty
/// set is the default scope shared by untagged sources and queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tags(BTreeSet<Tag>);

impl Tags {
    /// The empty tag-set.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a tag-set from any iterable of tags.
    pub fn of(tags: impl IntoIterator<Item = Tag>) -> Self {
        Self(tags.into_iter().collect())
    }

    /// Shorthand for a single `environment=<value>` tag.
    pub fn environment(value: impl Into<String>) -> Self {
        Self::of([Tag::environment(value)])
    }

    /// Whether every tag in `self` is also in `other`.
    pub fn is_subset_of(&self, other: &Tags) -> bool {
        self.0.is_subset(&other.0)
    }

    /// The combined tag-set of `self` and `other`.
    pub fn union(&self, other: &Tags) -> Tags {
        Self(self.0.union(&other.0).cloned().collect())
    }

    /// Number of tags in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty (the default scope).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the tags in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("{}");
        }
        let rendered = self
            .0
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{{{rendered}}}")
    }
}

impl FromIterator<Tag> for Tags {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
