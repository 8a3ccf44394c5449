//! List and set decoders.

use crate::decode::descriptor::{Shape, TypeDescriptor, TypeKind};
use crate::decode::{Decoder, DecoderContext, Priority, index_path};
use crate::error::ValidationError;
use crate::node::ConfigNode;
use crate::result::{AnyValue, ConfigResult};
use crate::tag::Tags;

/// Decodes an `Array` node (or a comma-delimited leaf) into `Vec<T>`.
pub struct ListDecoder;

/// Decodes an `Array` node (or a comma-delimited leaf) into `HashSet<T>`.
pub struct SetDecoder;

impl Decoder for ListDecoder {
    fn name(&self) -> &'static str {
        "List"
    }

    fn priority(&self) -> Priority {
        Priority::High
    }

    fn can_decode(
        &self,
        _path: &str,
        _tags: &Tags,
        _node: &ConfigNode,
        ty: &TypeDescriptor,
    ) -> bool {
        ty.kind() == TypeKind::List
    }

    fn decode(
        &self,
        path: &str,
        tags: &Tags,
        node: &ConfigNode,
        ty: &TypeDescriptor,
        ctx: &DecoderContext<'_>,
    ) -> ConfigResult<AnyValue> {
        decode_collection(path, tags, node, ty, ctx)
    }
}

impl Decoder for SetDecoder {
    fn name(&self) -> &'static str {
        "Set"
    }

    fn priority(&self) -> Priority {
        Priority::High
    }

    fn can_decode(
        &self,
        _path: &str,
        _tags: &Tags,
        _node: &ConfigNode,
        ty: &TypeDescriptor,
    ) -> bool {
        ty.kind() == TypeKind::Set
    }

    fn decode(
        &self,
        path: &str,
        tags: &Tags,
        node: &ConfigNode,
        ty: &TypeDescriptor,
        ctx: &DecoderContext<'_>,
    ) -> ConfigResult<AnyValue> {
        decode_collection(path, tags, node, ty, ctx)
    }
}

/// Shared element walk: recurse per element, keep going past failures, and
/// assemble whatever decoded.
fn decode_collection(
    path: &str,
    tags: &Tags,
    node: &ConfigNode,
    ty: &TypeDescriptor,
    ctx: &DecoderContext<'_>,
) -> ConfigResult<AnyValue> {
    let (Some(component), Some(shape)) = (ty.component(), ty.shape()) else {
        return ConfigResult::err(ValidationError::decode(
            path,
            format!("descriptor for {} carries no element shape", ty.name()),
        ));
    };
    let assemble = match shape {
        Shape::List(assemble) | Shape::Set(assemble) => assemble,
        _ => {
            return ConfigResult::err(ValidationError::decode(
                path,
                format!("descriptor for {} carries a non-collection shape", ty.name()),
            ));
        }
    };

    let mut elements = Vec::new();
    let mut errors = Vec::new();

    match node {
        ConfigNode::Array(slots) => {
            for (i, slot) in slots.iter().enumerate() {
                match slot {
                    Some(child) => decode_element(
                        &index_path(path, i),
                        tags,
                        child,
                        component,
                        ctx,
                        &mut elements,
                        &mut errors,
                    ),
                    // One error per gap; the remaining indices still decode.
                    None => errors.push(ValidationError::missing_array_index(path, i)),
                }
            }
        }
        ConfigNode::Leaf(Some(value)) => {
            for (i, token) in split_unescaped_commas(value).into_iter().enumerate() {
                let synthetic = ConfigNode::Leaf(Some(token));
                decode_element(
                    &index_path(path, i),
                    tags,
                    &synthetic,
                    component,
                    ctx,
                    &mut elements,
                    &mut errors,
                );
            }
        }
        ConfigNode::Leaf(None) => {
            return ConfigResult::err(ValidationError::missing(
                path,
                format!("no value for {}", ty.name()),
            ));
        }
        other => {
            return ConfigResult::err(ValidationError::decode(
                path,
                format!("expected an array for {}, found {}", ty.name(), other.kind()),
            ));
        }
    }

    match assemble(elements) {
        Ok(value) => ConfigResult { value: Some(value), errors },
        Err(reason) => {
            errors.push(ValidationError::decode(path, reason));
            ConfigResult::errs(errors)
        }
    }
}

fn decode_element(
    element_path: &str,
    tags: &Tags,
    node: &ConfigNode,
    component: &TypeDescriptor,
    ctx: &DecoderContext<'_>,
    elements: &mut Vec<AnyValue>,
    errors: &mut Vec<ValidationError>,
) {
    match ctx.registry.decode(element_path, tags, node, component, ctx) {
        Ok(mut result) => {
            errors.append(&mut result.errors);
            if let Some(value) = result.value {
                elements.push(value);
            }
        }
        Err(structural) => {
            errors.push(ValidationError::decode(element_path, structural.to_string()));
        }
    }
}

/// Split on unescaped commas, trimming whitespace; `\,` is a literal comma.
fn split_unescaped_commas(value: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for ch in value.chars() {
        if escaped {
            if ch != ',' {
                // The escape was not for a comma; keep it.
                current.push('\\');
            }
            current.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == ',' {
            tokens.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    if escaped {
        current.push('\\');
    }
    tokens.push(current);
    tokens.into_iter().map(|t| t.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::DecoderRegistry;
    use crate::decode::descriptor::{FromConfig, downcast};
    use crate::error::Severity;
    use crate::lexer::PathLexer;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn decode<T: FromConfig>(node: &ConfigNode) -> ConfigResult<AnyValue> {
        let registry = DecoderRegistry::with_defaults();
        let lexer = PathLexer::default();
        let ctx = DecoderContext {
            registry: &registry,
            lexer: &lexer,
            masker: None,
        };
        registry
            .decode("users", &Tags::none(), node, &T::descriptor(), &ctx)
            .unwrap()
    }

    fn array_of(values: &[Option<&str>]) -> ConfigNode {
        ConfigNode::Array(
            values
                .iter()
                .map(|v| v.map(ConfigNode::leaf))
                .collect(),
        )
    }

    #[test]
    fn decodes_arrays_elementwise() {
        let result = decode::<Vec<i64>>(&array_of(&[Some("1"), Some("2"), Some("3")]));
        assert_eq!(result.errors, Vec::new());
        assert_eq!(
            downcast::<Vec<i64>>(&result.value.unwrap()),
            Some(vec![1, 2, 3])
        );
    }

    #[test]
    fn gaps_produce_one_error_each_and_do_not_block() {
        let result = decode::<Vec<String>>(&array_of(&[
            Some("a"),
            Some("b"),
            None,
            Some("d"),
        ]));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].severity, Severity::MissingValue);
        assert!(result.errors[0].message.contains("index 2"));
        assert_eq!(
            downcast::<Vec<String>>(&result.value.unwrap()),
            Some(vec!["a".to_string(), "b".to_string(), "d".to_string()])
        );
    }

    #[test]
    fn bad_elements_accumulate_without_aborting() {
        let result = decode::<Vec<i64>>(&array_of(&[Some("1"), Some("x"), Some("3")]));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, "users[1]");
        assert_eq!(
            downcast::<Vec<i64>>(&result.value.unwrap()),
            Some(vec![1, 3])
        );
    }

    #[test]
    fn comma_delimited_leaves_split() {
        let result = decode::<Vec<String>>(&ConfigNode::leaf("red, green, blue"));
        assert_eq!(
            downcast::<Vec<String>>(&result.value.unwrap()),
            Some(vec![
                "red".to_string(),
                "green".to_string(),
                "blue".to_string()
            ])
        );
    }

    #[test]
    fn escaped_commas_are_literal() {
        let result = decode::<Vec<String>>(&ConfigNode::leaf(r"a\,b, c"));
        assert_eq!(
            downcast::<Vec<String>>(&result.value.unwrap()),
            Some(vec!["a,b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn sets_deduplicate() {
        let result = decode::<HashSet<String>>(&ConfigNode::leaf("a,b,a"));
        let set = downcast::<HashSet<String>>(&result.value.unwrap()).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("a") && set.contains("b"));
    }

    #[test]
    fn wrong_node_kind_is_an_error() {
        let result = decode::<Vec<String>>(&ConfigNode::map());
        assert!(result.value.is_none());
        assert!(result.errors[0].message.contains("expected an array"));
    }
}
