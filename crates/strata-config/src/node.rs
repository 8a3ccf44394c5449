//! The configuration tree and its right-biased merge.
//!
//! A published tree is immutable; changes happen by merging into a new tree
//! and atomically swapping the published reference (see [`crate::tree`]).

use crate::lexer::Token;
use std::collections::HashMap;
use std::fmt;

/// One node of a configuration tree.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConfigNode {
    /// A scalar value. `None` means the key was present with no content,
    /// which is distinct from the key being absent entirely.
    Leaf(Option<String>),
    /// Unique keys; inserting a duplicate overwrites.
    Map(HashMap<String, ConfigNode>),
    /// Sparse sequence; `None` at an index is a declared gap (the length
    /// includes the slot but no value was supplied).
    Array(Vec<Option<ConfigNode>>),
}

/// Why navigation stopped before reaching a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigateError {
    /// A `Field` token was applied to a non-map node.
    ExpectedMap { at: String, found: &'static str },
    /// An `Index` token was applied to a non-array node.
    ExpectedArray { at: String, found: &'static str },
    /// The map had no entry for the key.
    UnknownKey { at: String, key: String },
    /// The array index was out of range or a declared gap.
    MissingIndex { at: String, index: usize },
}

impl fmt::Display for NavigateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigateError::ExpectedMap { at, found } => {
                write!(f, "expected a map at '{at}', found {found}")
            }
            NavigateError::ExpectedArray { at, found } => {
                write!(f, "expected an array at '{at}', found {found}")
            }
            NavigateError::UnknownKey { at, key } => {
                write!(f, "no key '{key}' under '{at}'")
            }
            NavigateError::MissingIndex { at, index } => {
                write!(f, "no array node at index {index} under '{at}'")
            }
        }
    }
}

impl ConfigNode {
    /// Convenience constructor for a leaf with content.
    pub fn leaf(value: impl Into<String>) -> Self {
        ConfigNode::Leaf(Some(value.into()))
    }

    /// Convenience constructor for an empty map.
    pub fn map() -> Self {
        ConfigNode::Map(HashMap::new())
    }

    /// Human-readable node kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigNode::Leaf(_) => "leaf",
            ConfigNode::Map(_) => "map",
            ConfigNode::Array(_) => "array",
        }
    }

    /// The leaf value, when this is a leaf with content.
    pub fn value(&self) -> Option<&str> {
        match self {
            ConfigNode::Leaf(value) => value.as_deref(),
            _ => None,
        }
    }

    /// Number of immediate children (map entries or declared array slots).
    pub fn size(&self) -> usize {
        match self {
            ConfigNode::Leaf(_) => 0,
            ConfigNode::Map(children) => children.len(),
            ConfigNode::Array(elements) => elements.len(),
        }
    }

    /// Walk `tokens` down from this node.
    ///
    /// Any mismatch (wrong node kind, unknown key, out-of-range or gap
    /// index) is a structured [`NavigateError`], never a panic.
    pub fn navigate(&self, tokens: &[Token]) -> Result<&ConfigNode, NavigateError> {
        let mut current = self;
        let mut at = String::new();
        for token in tokens {
            match (current, token) {
                (ConfigNode::Map(children), Token::Field(name)) => {
                    current = children.get(name).ok_or_else(|| NavigateError::UnknownKey {
                        at: at.clone(),
                        key: name.clone(),
                    })?;
                }
                (ConfigNode::Array(elements), Token::Index(index)) => {
                    current = elements
                        .get(*index)
                        .and_then(|slot| slot.as_ref())
                        .ok_or_else(|| NavigateError::MissingIndex {
                            at: at.clone(),
                            index: *index,
                        })?;
                }
                (node, Token::Field(_)) => {
                    return Err(NavigateError::ExpectedMap {
                        at,
                        found: node.kind(),
                    });
                }
                (node, Token::Index(_)) => {
                    return Err(NavigateError::ExpectedArray {
                        at,
                        found: node.kind(),
                    });
                }
            }
            push_token(&mut at, token);
        }
        Ok(current)
    }
}

fn push_token(at: &mut String, token: &Token) {
    match token {
        Token::Field(name) => {
            if !at.is_empty() {
                at.push('.');
            }
            at.push_str(name);
        }
        Token::Index(index) => {
            at.push('[');
            at.push_str(&index.to_string());
            at.push(']');
        }
    }
}

/// Merge `overlay` onto `base`, right-biased.
///
/// - leaf ⊕ leaf: the overlay's value wins entirely.
/// - map ⊕ map: key union; shared keys recurse, single-side keys pass
///   through unchanged.
/// - array ⊕ array: index-wise union up to the longer length; shared
///   indices recurse, single-side indices pass through, absent-in-both
///   stays a gap and surfaces as a missing-array-index error when read.
/// - any kind mismatch: the overlay replaces the base wholesale.
pub fn merge(base: &ConfigNode, overlay: &ConfigNode) -> ConfigNode {
    match (base, overlay) {
        (ConfigNode::Map(base_map), ConfigNode::Map(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in overlay_map {
                match merged.get(key) {
                    Some(existing) => {
                        let combined = merge(existing, value);
                        merged.insert(key.clone(), combined);
                    }
                    None => {
                        merged.insert(key.clone(), value.clone());
                    }
                }
            }
            ConfigNode::Map(merged)
        }
        (ConfigNode::Array(base_arr), ConfigNode::Array(overlay_arr)) => {
            let len = base_arr.len().max(overlay_arr.len());
            let mut merged = Vec::with_capacity(len);
            for i in 0..len {
                let b = base_arr.get(i).and_then(|slot| slot.as_ref());
                let o = overlay_arr.get(i).and_then(|slot| slot.as_ref());
                merged.push(match (b, o) {
                    (Some(b), Some(o)) => Some(merge(b, o)),
                    (Some(b), None) => Some(b.clone()),
                    (None, Some(o)) => Some(o.clone()),
                    (None, None) => None,
                });
            }
            ConfigNode::Array(merged)
        }
        // Leaf-on-leaf and every kind mismatch: overlay wins wholesale.
        (_, overlay) => overlay.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map_of(entries: &[(&str, ConfigNode)]) -> ConfigNode {
        ConfigNode::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn leaf_merge_is_right_biased() {
        let merged = merge(&ConfigNode::leaf("a"), &ConfigNode::leaf("b"));
        assert_eq!(merged, ConfigNode::leaf("b"));
        // Overlay wins even when it carries no content.
        let merged = merge(&ConfigNode::leaf("a"), &ConfigNode::Leaf(None));
        assert_eq!(merged, ConfigNode::Leaf(None));
    }

    #[test]
    fn map_merge_unions_keys() {
        let base = map_of(&[
            ("name", ConfigNode::leaf("test")),
            ("port", ConfigNode::leaf("3306")),
        ]);
        let overlay = map_of(&[
            ("name", ConfigNode::leaf("NewName")),
            ("password", ConfigNode::leaf("abc")),
        ]);
        let merged = merge(&base, &overlay);
        assert_eq!(merged.navigate(&[Token::field("name")]).unwrap().value(), Some("NewName"));
        assert_eq!(merged.navigate(&[Token::field("port")]).unwrap().value(), Some("3306"));
        assert_eq!(merged.navigate(&[Token::field("password")]).unwrap().value(), Some("abc"));
    }

    #[test]
    fn array_merge_is_index_wise_not_whole_replace() {
        let base = ConfigNode::Array(vec![
            Some(ConfigNode::leaf("John")),
            Some(ConfigNode::leaf("Steve")),
        ]);
        let overlay = ConfigNode::Array(vec![None, Some(ConfigNode::leaf("Matt"))]);
        let merged = merge(&base, &overlay);
        assert_eq!(
            merged,
            ConfigNode::Array(vec![
                Some(ConfigNode::leaf("John")),
                Some(ConfigNode::leaf("Matt")),
            ])
        );
    }

    #[test]
    fn array_merge_keeps_gaps() {
        let base = ConfigNode::Array(vec![Some(ConfigNode::leaf("a")), None, None]);
        let overlay = ConfigNode::Array(vec![None, None, Some(ConfigNode::leaf("c")), None]);
        let merged = merge(&base, &overlay);
        assert_eq!(
            merged,
            ConfigNode::Array(vec![
                Some(ConfigNode::leaf("a")),
                None,
                Some(ConfigNode::leaf("c")),
                None,
            ])
        );
    }

    #[test]
    fn kind_mismatch_replaces_wholesale() {
        let base = map_of(&[("inner", ConfigNode::leaf("x"))]);
        let overlay = ConfigNode::leaf("flat");
        assert_eq!(merge(&base, &overlay), ConfigNode::leaf("flat"));

        let base = ConfigNode::Array(vec![Some(ConfigNode::leaf("a"))]);
        let overlay = map_of(&[("k", ConfigNode::leaf("v"))]);
        assert_eq!(merge(&base, &overlay), overlay);
    }

    #[test]
    fn navigation_reports_structured_misses() {
        let tree = map_of(&[(
            "admin",
            map_of(&[(
                "user",
                ConfigNode::Array(vec![Some(ConfigNode::leaf("root")), None]),
            )]),
        )]);

        let found = tree
            .navigate(&[Token::field("admin"), Token::field("user"), Token::Index(0)])
            .unwrap();
        assert_eq!(found.value(), Some("root"));

        let err = tree
            .navigate(&[Token::field("admin"), Token::field("user"), Token::Index(1)])
            .unwrap_err();
        assert_eq!(
            err,
            NavigateError::MissingIndex {
                at: "admin.user".to_string(),
                index: 1
            }
        );

        let err = tree
            .navigate(&[Token::field("admin"), Token::Index(0)])
            .unwrap_err();
        assert!(matches!(err, NavigateError::ExpectedArray { .. }));

        let err = tree.navigate(&[Token::field("nope")]).unwrap_err();
        assert_eq!(
            err,
            NavigateError::UnknownKey {
                at: String::new(),
                key: "nope".to_string()
            }
        );
    }
}
