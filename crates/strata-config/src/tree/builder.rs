//! Builds a fresh tree from a source's raw `(path, value)` pairs.

use crate::error::ValidationError;
use crate::lexer::{PathLexer, Token};
use crate::node::ConfigNode;
use std::collections::HashMap;

/// Tokenize every raw path and insert its value into a fresh tree.
///
/// A bad pair (unparsable path, kind conflict with an earlier pair) does
/// not abort the rest of the source; it is reported as a `ValidationError`
/// and skipped.
pub fn build_tree(
    pairs: &[(String, String)],
    lexer: &PathLexer,
) -> (ConfigNode, Vec<ValidationError>) {
    let mut root = ConfigNode::Map(HashMap::new());
    let mut errors = Vec::new();

    for (raw_path, value) in pairs {
        let tokens = match lexer.tokenize(raw_path) {
            Ok(tokens) => tokens,
            Err(err) => {
                errors.push(ValidationError::decode(raw_path.clone(), err.to_string()));
                continue;
            }
        };
        if tokens.is_empty() {
            errors.push(ValidationError::decode(
                raw_path.clone(),
                "cannot assign a value to the tree root",
            ));
            continue;
        }
        if let Err(reason) = insert_at(&mut root, &tokens, value) {
            errors.push(ValidationError::decode(raw_path.clone(), reason));
        }
    }

    (root, errors)
}

/// Walk/extend the tree along `tokens` and place the leaf at the end.
/// An empty value string becomes a contentless leaf.
fn insert_at(node: &mut ConfigNode, tokens: &[Token], value: &str) -> Result<(), String> {
    let Some((head, rest)) = tokens.split_first() else {
        let content = if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        };
        // Duplicate insertion overwrites, including an earlier subtree.
        *node = ConfigNode::Leaf(content);
        return Ok(());
    };

    match head {
        Token::Field(name) => {
            let ConfigNode::Map(children) = node else {
                return Err(format!(
                    "expected a map for key '{name}', found {}",
                    node.kind()
                ));
            };
            let child = children
                .entry(name.clone())
                .or_insert_with(|| empty_for(rest));
            insert_at(child, rest, value)
        }
        Token::Index(index) => {
            let ConfigNode::Array(elements) = node else {
                return Err(format!(
                    "expected an array for index {index}, found {}",
                    node.kind()
                ));
            };
            if elements.len() <= *index {
                // Indices may be written sparsely; pad with gaps.
                elements.resize(index + 1, None);
            }
            let slot = elements[*index].get_or_insert_with(|| empty_for(rest));
            insert_at(slot, rest, value)
        }
    }
}

fn empty_for(rest: &[Token]) -> ConfigNode {
    match rest.first() {
        None => ConfigNode::Leaf(None),
        Some(Token::Field(_)) => ConfigNode::Map(HashMap::new()),
        Some(Token::Index(_)) => ConfigNode::Array(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex() -> PathLexer {
        PathLexer::default()
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn builds_nested_maps_and_arrays() {
        let (tree, errors) = build_tree(
            &pairs(&[
                ("db.name", "test"),
                ("db.hosts[0]", "alpha"),
                ("db.hosts[2]", "gamma"),
            ]),
            &lex(),
        );
        assert_eq!(errors, Vec::new());
        assert_eq!(
            tree.navigate(&lex().tokenize("db.name").unwrap()).unwrap().value(),
            Some("test")
        );
        assert_eq!(
            tree.navigate(&lex().tokenize("db.hosts[0]").unwrap()).unwrap().value(),
            Some("alpha")
        );
        // Index 1 was never referenced: a declared gap.
        let hosts = tree.navigate(&lex().tokenize("db.hosts").unwrap()).unwrap();
        assert_eq!(hosts.size(), 3);
        assert!(tree.navigate(&lex().tokenize("db.hosts[1]").unwrap()).is_err());
    }

    #[test]
    fn empty_value_is_a_contentless_leaf() {
        let (tree, errors) = build_tree(&pairs(&[("feature.flag", "")]), &lex());
        assert_eq!(errors, Vec::new());
        let node = tree.navigate(&lex().tokenize("feature.flag").unwrap()).unwrap();
        assert_eq!(node, &ConfigNode::Leaf(None));
    }

    #[test]
    fn bad_pair_is_reported_and_skipped() {
        let (tree, errors) = build_tree(
            &pairs(&[("db.port", "5432"), ("db.port[x]", "boom"), ("db.name", "test")]),
            &lex(),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "db.port[x]");
        // The rest of the source still loads.
        assert_eq!(
            tree.navigate(&lex().tokenize("db.name").unwrap()).unwrap().value(),
            Some("test")
        );
    }

    #[test]
    fn kind_conflict_is_reported() {
        let (_, errors) = build_tree(
            &pairs(&[("db.port", "5432"), ("db.port.inner", "x")]),
            &lex(),
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("expected a map"));
    }

    #[test]
    fn duplicate_insertion_overwrites() {
        let (tree, errors) = build_tree(&pairs(&[("k", "one"), ("k", "two")]), &lex());
        assert_eq!(errors, Vec::new());
        assert_eq!(
            tree.navigate(&[Token::field("k")]).unwrap().value(),
            Some("two")
        );
    }
}
