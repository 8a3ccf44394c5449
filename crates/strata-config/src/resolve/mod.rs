//! Placeholder substitution over leaf string values.
//!
//! Two sigils: eager `${key}` is resolved once when a tree is built; lazy
//! `#{key}` is resolved fresh on every read. Both nest, and both are
//! suppressed by a preceding escape character. Resolution is
//! leftmost-innermost: the innermost unescaped placeholder is resolved,
//! its literal result is substituted back, and the scan repeats until no
//! placeholders remain or the cycle guard trips.

mod transform;

use crate::error::ValidationError;
use crate::lexer::PathLexer;
use crate::node::ConfigNode;
use crate::result::ConfigResult;
use std::collections::HashMap;

/// Which placeholder family a pass resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `${key}`, resolved at tree build time.
    Eager,
    /// `#{key}`, resolved on every read.
    Lazy,
}

impl Mode {
    fn sigil(self) -> char {
        match self {
            Mode::Eager => '$',
            Mode::Lazy => '#',
        }
    }
}

/// Self-referential keys must not loop forever; a leaf that substitutes
/// more times than this is reported as a cycle.
const MAX_SUBSTITUTIONS: usize = 200;

const ESCAPE: char = '\\';

/// Looks up a plain substitution key, typically against the current tree.
pub type KeyLookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

/// Rewrites placeholders inside a single leaf string.
///
/// Plain keys are resolved through `lookup` (the tree service at the
/// current tag-set); `random:` and `dist100:` keys go through their
/// transforms. Failures accumulate; the best-effort string is still
/// produced with failed placeholders replaced by the empty string.
pub fn resolve_string(
    path: &str,
    text: &str,
    mode: Mode,
    lookup: &KeyLookup<'_>,
) -> ConfigResult<String> {
    let sigil = mode.sigil();
    let mut working = text.to_string();
    let mut errors = Vec::new();
    let mut passes = 0;

    while let Some((start, end)) = find_innermost(&working, sigil) {
        if passes >= MAX_SUBSTITUTIONS {
            errors.push(ValidationError::decode(
                path,
                format!("possible cyclic substitution while resolving '{text}'"),
            ));
            break;
        }
        passes += 1;

        let key = &working[start + sigil.len_utf8() + 1..end];
        let replacement = match transform::apply(key, path) {
            Some(mut result) => {
                errors.append(&mut result.errors);
                result.value.unwrap_or_default()
            }
            None => match lookup(key) {
                Some(value) => value,
                None => {
                    errors.push(ValidationError::decode(
                        path,
                        format!("unable to resolve substitution key '{key}'"),
                    ));
                    String::new()
                }
            },
        };
        working.replace_range(start..=end, &replacement);
    }

    let resolved = unescape(&working);
    ConfigResult {
        value: Some(resolved),
        errors,
    }
}

/// Byte range (inclusive of the sigil and the closing brace) of the
/// leftmost-innermost unescaped placeholder, if any.
fn find_innermost(text: &str, sigil: char) -> Option<(usize, usize)> {
    let mut opens: Vec<usize> = Vec::new();
    let mut escaped = false;
    let mut chars = text.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == ESCAPE {
            escaped = true;
        } else if ch == sigil {
            if matches!(chars.peek(), Some(&(_, '{'))) {
                opens.push(i);
                chars.next();
            }
        } else if ch == '}' {
            if let Some(start) = opens.pop() {
                return Some((start, i));
            }
        }
    }
    None
}

/// Whether `text` still contains an unescaped placeholder of `mode`.
pub fn contains_marker(text: &str, mode: Mode) -> bool {
    find_innermost(text, mode.sigil()).is_some()
}

/// Drop the escape character in front of a sigil, keeping everything else.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == ESCAPE {
            match chars.peek() {
                Some(&next) if next == '$' || next == '#' || next == ESCAPE => {
                    out.push(next);
                    chars.next();
                }
                _ => out.push(ch),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Outcome of the eager pass over a freshly merged tree.
pub struct ResolvedTree {
    /// The tree with every eager placeholder substituted.
    pub root: ConfigNode,
    /// Problems observed while substituting (logged, not fatal).
    pub errors: Vec<ValidationError>,
    /// Paths of leaves that still carry a lazy marker; results under
    /// these paths must never be cached.
    pub lazy_paths: Vec<String>,
}

/// Resolve every eager placeholder in `root` and record lazy-tainted paths.
///
/// Plain keys are looked up against the unresolved tree itself; a looked-up
/// value containing further placeholders is resolved as part of the outer
/// string's rescans. Escapes are preserved here and unwound by the lazy
/// read pass, so an escaped marker survives into the published tree.
pub fn resolve_tree_eager(root: &ConfigNode, lexer: &PathLexer) -> ResolvedTree {
    let lookup = |key: &str| -> Option<String> {
        let tokens = lexer.tokenize(key).ok()?;
        root.navigate(&tokens).ok()?.value().map(str::to_string)
    };

    let mut errors = Vec::new();
    let mut lazy_paths = Vec::new();
    let resolved = rewrite_leaves(root, "", &mut |path, value| {
        let rewritten = resolve_eager_only(path, value, &lookup, &mut errors);
        if contains_marker(&rewritten, Mode::Lazy) {
            lazy_paths.push(path.to_string());
        }
        rewritten
    });

    ResolvedTree {
        root: resolved,
        errors,
        lazy_paths,
    }
}

/// Eager substitution that preserves escapes for a later lazy pass.
fn resolve_eager_only(
    path: &str,
    value: &str,
    lookup: &KeyLookup<'_>,
    errors: &mut Vec<ValidationError>,
) -> String {
    let sigil = Mode::Eager.sigil();
    let mut working = value.to_string();
    let mut passes = 0;
    while let Some((start, end)) = find_innermost(&working, sigil) {
        if passes >= MAX_SUBSTITUTIONS {
            errors.push(ValidationError::decode(
                path,
                format!("possible cyclic substitution while resolving '{value}'"),
            ));
            break;
        }
        passes += 1;
        let key = &working[start + sigil.len_utf8() + 1..end];
        let replacement = match transform::apply(key, path) {
            Some(mut result) => {
                errors.append(&mut result.errors);
                result.value.unwrap_or_default()
            }
            None => match lookup(key) {
                Some(v) => v,
                None => {
                    errors.push(ValidationError::decode(
                        path,
                        format!("unable to resolve substitution key '{key}'"),
                    ));
                    String::new()
                }
            },
        };
        working.replace_range(start..=end, &replacement);
    }
    working
}

/// Resolve lazy placeholders in a node about to be decoded, producing a
/// rewritten copy when any leaf needed substitution.
pub fn resolve_node_lazy(
    node: &ConfigNode,
    base_path: &str,
    lookup: &KeyLookup<'_>,
) -> ConfigResult<ConfigNode> {
    let mut errors = Vec::new();
    let rewritten = rewrite_leaves(node, base_path, &mut |path, value| {
        if !contains_marker(value, Mode::Lazy) && !value.contains(ESCAPE) {
            return value.to_string();
        }
        let mut result = resolve_string(path, value, Mode::Lazy, lookup);
        errors.append(&mut result.errors);
        result.value.unwrap_or_else(|| value.to_string())
    });
    ConfigResult {
        value: Some(rewritten),
        errors,
    }
}

/// Structural copy of `node` with every leaf value passed through `rewrite`.
fn rewrite_leaves(
    node: &ConfigNode,
    path: &str,
    rewrite: &mut impl FnMut(&str, &str) -> String,
) -> ConfigNode {
    match node {
        ConfigNode::Leaf(Some(value)) => ConfigNode::Leaf(Some(rewrite(path, value))),
        ConfigNode::Leaf(None) => ConfigNode::Leaf(None),
        ConfigNode::Map(children) => {
            let mut rewritten = HashMap::with_capacity(children.len());
            for (key, child) in children {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                rewritten.insert(key.clone(), rewrite_leaves(child, &child_path, rewrite));
            }
            ConfigNode::Map(rewritten)
        }
        ConfigNode::Array(elements) => ConfigNode::Array(
            elements
                .iter()
                .enumerate()
                .map(|(i, slot)| {
                    slot.as_ref()
                        .map(|child| rewrite_leaves(child, &format!("{path}[{i}]"), rewrite))
                })
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn lookup_in(table: &HashMap<String, String>) -> impl Fn(&str) -> Option<String> + '_ {
        move |key| table.get(key).cloned()
    }

    #[test]
    fn plain_key_substitution() {
        let vars = table(&[("place", "world")]);
        let result = resolve_string("p", "hello ${place}", Mode::Eager, &lookup_in(&vars));
        assert_eq!(result.value.as_deref(), Some("hello world"));
        assert_eq!(result.errors, Vec::new());
    }

    #[test]
    fn escaped_placeholder_stays_literal() {
        let vars = table(&[("place", "world")]);
        let result = resolve_string("p", r"hello \${place}", Mode::Eager, &lookup_in(&vars));
        assert_eq!(result.value.as_deref(), Some("hello ${place}"));
    }

    #[test]
    fn nested_placeholders_resolve_innermost_first() {
        let vars = table(&[("variable", "place"), ("place", "world")]);
        let result = resolve_string("p", "${${variable}}", Mode::Eager, &lookup_in(&vars));
        assert_eq!(result.value.as_deref(), Some("world"));
    }

    #[test]
    fn looked_up_values_may_contain_placeholders() {
        let vars = table(&[("greeting", "hello ${place}"), ("place", "world")]);
        let result = resolve_string("p", "${greeting}!", Mode::Eager, &lookup_in(&vars));
        assert_eq!(result.value.as_deref(), Some("hello world!"));
    }

    #[test]
    fn unresolvable_key_is_an_error_with_best_effort_value() {
        let vars = table(&[]);
        let result = resolve_string("p", "x${missing}y", Mode::Eager, &lookup_in(&vars));
        assert_eq!(result.value.as_deref(), Some("xy"));
        assert!(result.errors[0].message.contains("missing"));
    }

    #[test]
    fn self_reference_trips_the_cycle_guard() {
        let vars = table(&[("loop", "${loop}")]);
        let result = resolve_string("p", "${loop}", Mode::Eager, &lookup_in(&vars));
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("cyclic"));
    }

    #[test]
    fn lazy_markers_are_ignored_by_the_eager_pass() {
        let vars = table(&[("k", "v")]);
        let result = resolve_string("p", "#{k} ${k}", Mode::Eager, &lookup_in(&vars));
        assert_eq!(result.value.as_deref(), Some("#{k} v"));
    }

    #[test]
    fn eager_tree_pass_records_lazy_paths() {
        let lexer = PathLexer::default();
        let (tree, _) = crate::tree::builder::build_tree(
            &[
                ("db.host".to_string(), "${defaults.host}".to_string()),
                ("db.token".to_string(), "#{random:int}".to_string()),
                ("defaults.host".to_string(), "localhost".to_string()),
            ],
            &lexer,
        );
        let resolved = resolve_tree_eager(&tree, &lexer);
        assert_eq!(resolved.errors, Vec::new());
        assert_eq!(resolved.lazy_paths, vec!["db.token".to_string()]);
        let host = resolved
            .root
            .navigate(&lexer.tokenize("db.host").unwrap())
            .unwrap();
        assert_eq!(host.value(), Some("localhost"));
        // The lazy leaf is untouched.
        let token = resolved
            .root
            .navigate(&lexer.tokenize("db.token").unwrap())
            .unwrap();
        assert_eq!(token.value(), Some("#{random:int}"));
    }

    #[test]
    fn lazy_node_pass_rewrites_leaves() {
        let vars = table(&[("who", "world")]);
        let node = ConfigNode::leaf("hi #{who}");
        let result = resolve_node_lazy(&node, "greet", &lookup_in(&vars));
        assert_eq!(result.value, Some(ConfigNode::leaf("hi world")));
    }
}
