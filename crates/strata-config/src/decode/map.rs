//! Keyed-collection decoder.

use crate::decode::descriptor::{Shape, TypeDescriptor, TypeKind};
use crate::decode::{Decoder, DecoderContext, Priority, child_path};
use crate::error::ValidationError;
use crate::node::ConfigNode;
use crate::result::{AnyValue, ConfigResult};
use crate::tag::Tags;

/// Decodes a `Map` node into `HashMap<K, V>`.
///
/// Keys are decoded through the registry as scalars from synthetic leaves;
/// an unresolvable key is its own error and that entry is dropped without
/// aborting the rest of the map.
pub struct MapDecoder;

impl Decoder for MapDecoder {
    fn name(&self) -> &'static str {
        "Map"
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
        ty.kind() == TypeKind::Map
    }

    fn decode(
        &self,
        path: &str,
        tags: &Tags,
        node: &ConfigNode,
        ty: &TypeDescriptor,
        ctx: &DecoderContext<'_>,
    ) -> ConfigResult<AnyValue> {
        let [key_ty, value_ty] = ty.params() else {
            return ConfigResult::err(ValidationError::decode(
                path,
                format!("descriptor for {} needs key and value parameters", ty.name()),
            ));
        };
        let Some(Shape::Map(assemble)) = ty.shape() else {
            return ConfigResult::err(ValidationError::decode(
                path,
                format!("descriptor for {} carries no map shape", ty.name()),
            ));
        };

        let children = match node {
            ConfigNode::Map(children) => children,
            ConfigNode::Leaf(None) => {
                return ConfigResult::err(ValidationError::missing(
                    path,
                    format!("no value for {}", ty.name()),
                ));
            }
            other => {
                return ConfigResult::err(ValidationError::decode(
                    path,
                    format!("expected a map for {}, found {}", ty.name(), other.kind()),
                ));
            }
        };

        let mut entries = Vec::with_capacity(children.len());
        let mut errors = Vec::new();

        for (raw_key, child) in children {
            let entry_path = child_path(path, raw_key);
            let key_leaf = ConfigNode::leaf(raw_key.clone());
            let key = match ctx.registry.decode(&entry_path, tags, &key_leaf, key_ty, ctx) {
                Ok(mut result) => {
                    errors.append(&mut result.errors);
                    result.value
                }
                Err(structural) => {
                    errors.push(ValidationError::decode(&entry_path, structural.to_string()));
                    None
                }
            };
            // A null key drops the entry but not the rest of the map.
            let Some(key) = key else { continue };

            match ctx.registry.decode(&entry_path, tags, child, value_ty, ctx) {
                Ok(mut result) => {
                    errors.append(&mut result.errors);
                    if let Some(value) = result.value {
                        entries.push((key, value));
                    }
                }
                Err(structural) => {
                    errors.push(ValidationError::decode(&entry_path, structural.to_string()));
                }
            }
        }

        match assemble(entries) {
            Ok(value) => ConfigResult {
                value: Some(value),
                errors,
            },
            Err(reason) => {
                errors.push(ValidationError::decode(path, reason));
                ConfigResult::errs(errors)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::DecoderRegistry;
    use crate::decode::descriptor::{FromConfig, downcast};
    use crate::lexer::PathLexer;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn decode<T: FromConfig>(node: &ConfigNode) -> ConfigResult<AnyValue> {
        let registry = DecoderRegistry::with_defaults();
        let lexer = PathLexer::default();
        let ctx = DecoderContext {
            registry: &registry,
            lexer: &lexer,
            masker: None,
        };
        registry
            .decode("limits", &Tags::none(), node, &T::descriptor(), &ctx)
            .unwrap()
    }

    fn map_node(entries: &[(&str, &str)]) -> ConfigNode {
        ConfigNode::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), ConfigNode::leaf(*v)))
                .collect(),
        )
    }

    #[test]
    fn decodes_string_keyed_maps() {
        let result = decode::<HashMap<String, u32>>(&map_node(&[("cpu", "4"), ("mem", "512")]));
        assert_eq!(result.errors, Vec::new());
        let map = downcast::<HashMap<String, u32>>(&result.value.unwrap()).unwrap();
        assert_eq!(map.get("cpu"), Some(&4));
        assert_eq!(map.get("mem"), Some(&512));
    }

    #[test]
    fn typed_keys_go_through_the_registry() {
        let result = decode::<HashMap<u16, String>>(&map_node(&[("80", "http"), ("443", "https")]));
        let map = downcast::<HashMap<u16, String>>(&result.value.unwrap()).unwrap();
        assert_eq!(map.get(&443), Some(&"https".to_string()));
    }

    #[test]
    fn unresolvable_key_drops_only_that_entry() {
        let result = decode::<HashMap<u16, String>>(&map_node(&[("80", "http"), ("x", "bad")]));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, "limits.x");
        let map = downcast::<HashMap<u16, String>>(&result.value.unwrap()).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&80), Some(&"http".to_string()));
    }

    #[test]
    fn bad_values_accumulate_without_aborting() {
        let result = decode::<HashMap<String, u32>>(&map_node(&[("ok", "1"), ("bad", "zzz")]));
        assert_eq!(result.errors.len(), 1);
        let map = downcast::<HashMap<String, u32>>(&result.value.unwrap()).unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn non_map_node_is_an_error() {
        let result = decode::<HashMap<String, u32>>(&ConfigNode::leaf("nope"));
        assert!(result.value.is_none());
        assert!(result.errors[0].message.contains("expected a map"));
    }
}
