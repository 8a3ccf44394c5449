//! Capability-interface decoder.

use crate::decode::descriptor::{DefaultSupplier, Shape, TypeDescriptor, TypeKind, downcast};
use crate::decode::{Decoder, DecoderContext, Priority, child_path};
use crate::error::ValidationError;
use crate::node::ConfigNode;
use crate::result::{AnyValue, ConfigResult};
use crate::tag::Tags;
use std::collections::HashMap;

/// Dispatch table behind a decoded capability interface.
///
/// Each accessor method resolves to the value decoded at its derived
/// config key, falling back to the declared default. A method whose value
/// failed to decode and that has no default panics at call time, not at
/// decode time, so unused accessors never block a lookup.
#[derive(Clone)]
pub struct ConfigProxy {
    name: &'static str,
    path: String,
    values: HashMap<&'static str, AnyValue>,
    defaults: HashMap<&'static str, DefaultSupplier>,
}

impl ConfigProxy {
    /// Resolve one accessor call to its decoded value or default.
    ///
    /// # Panics
    ///
    /// Panics when the method has neither a decoded value nor a declared
    /// default.
    pub fn call<T: Clone + 'static>(&self, method: &str) -> T {
        let erased = self
            .values
            .get(method)
            .cloned()
            .or_else(|| self.defaults.get(method).map(|supply| supply()));
        let Some(erased) = erased else {
            panic!(
                "no value decoded for {}::{method} at '{}' and no default is declared",
                self.name, self.path
            );
        };
        match downcast::<T>(&erased) {
            Some(value) => value,
            None => panic!(
                "decoded value for {}::{method} at '{}' has the wrong type",
                self.name, self.path
            ),
        }
    }
}

impl std::fmt::Debug for ConfigProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigProxy")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("resolved", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Decodes a `Map` node into a proxy-backed interface implementation.
pub struct InterfaceDecoder;

impl Decoder for InterfaceDecoder {
    fn name(&self) -> &'static str {
        "Interface"
    }

    fn priority(&self) -> Priority {
        Priority::Low
    }

    fn can_decode(
        &self,
        _path: &str,
        _tags: &Tags,
        _node: &ConfigNode,
        ty: &TypeDescriptor,
    ) -> bool {
        ty.kind() == TypeKind::Interface
    }

    fn decode(
        &self,
        path: &str,
        tags: &Tags,
        node: &ConfigNode,
        ty: &TypeDescriptor,
        ctx: &DecoderContext<'_>,
    ) -> ConfigResult<AnyValue> {
        let Some(Shape::Interface(shape)) = ty.shape() else {
            return ConfigResult::err(ValidationError::decode(
                path,
                format!("descriptor for {} carries no interface shape", ty.name()),
            ));
        };

        let children = match node {
            ConfigNode::Map(children) => children,
            ConfigNode::Leaf(None) => {
                return ConfigResult::err(ValidationError::missing(
                    path,
                    format!("no value for {}", shape.name),
                ));
            }
            other => {
                return ConfigResult::err(ValidationError::decode(
                    path,
                    format!("expected a map for {}, found {}", shape.name, other.kind()),
                ));
            }
        };

        let mut values = HashMap::with_capacity(shape.methods.len());
        let mut defaults = HashMap::new();
        let mut errors = Vec::new();

        for method in &shape.methods {
            if let Some(default) = &method.default {
                defaults.insert(method.method, default.clone());
            }
            let method_path = child_path(path, &method.key);
            match children.get(method.key.as_str()) {
                Some(child) => {
                    match ctx
                        .registry
                        .decode(&method_path, tags, child, &method.descriptor, ctx)
                    {
                        Ok(mut result) => {
                            errors.append(&mut result.errors);
                            if let Some(value) = result.value {
                                values.insert(method.method, value);
                            }
                        }
                        Err(structural) => {
                            errors.push(ValidationError::decode(
                                &method_path,
                                structural.to_string(),
                            ));
                        }
                    }
                }
                None if method.default.is_some() => {
                    errors.push(ValidationError::missing_optional(
                        &method_path,
                        format!("no value for {}::{}; default applies", shape.name, method.method),
                    ));
                }
                // Absence only bites if the accessor is actually called.
                None => {
                    errors.push(ValidationError::missing_optional(
                        &method_path,
                        format!(
                            "no value for {}::{}; calling it will panic",
                            shape.name, method.method
                        ),
                    ));
                }
            }
        }

        let proxy = ConfigProxy {
            name: shape.name,
            path: path.to_string(),
            values,
            defaults,
        };
        ConfigResult {
            value: Some((shape.wrap)(proxy)),
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_interface;
    use crate::decode::DecoderRegistry;
    use crate::decode::descriptor::FromConfig;
    use crate::error::Severity;
    use crate::lexer::PathLexer;
    use pretty_assertions::assert_eq;

    config_interface! {
        pub trait ServerSettings => ServerSettingsHandle {
            fn get_host(&self) -> String;
            fn get_port(&self) -> u16 = 8080;
            fn is_secure(&self) -> bool = false;
        }
    }

    fn decode(node: &ConfigNode) -> ConfigResult<AnyValue> {
        let registry = DecoderRegistry::with_defaults();
        let lexer = PathLexer::default();
        let ctx = DecoderContext {
            registry: &registry,
            lexer: &lexer,
            masker: None,
        };
        registry
            .decode(
                "server",
                &Tags::none(),
                node,
                &ServerSettingsHandle::descriptor(),
                &ctx,
            )
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
    fn accessors_resolve_decoded_values() {
        let result = decode(&map_node(&[
            ("host", "example.net"),
            ("port", "9090"),
            ("secure", "true"),
        ]));
        assert_eq!(result.errors, Vec::new());
        let settings = downcast::<ServerSettingsHandle>(&result.value.unwrap()).unwrap();
        assert_eq!(settings.get_host(), "example.net");
        assert_eq!(settings.get_port(), 9090);
        assert!(settings.is_secure());
    }

    #[test]
    fn declared_defaults_cover_absence() {
        let result = decode(&map_node(&[("host", "example.net")]));
        assert_eq!(result.errors.len(), 2);
        assert!(
            result
                .errors
                .iter()
                .all(|e| e.severity == Severity::MissingOptionalValue)
        );
        let settings = downcast::<ServerSettingsHandle>(&result.value.unwrap()).unwrap();
        assert_eq!(settings.get_port(), 8080);
        assert!(!settings.is_secure());
    }

    #[test]
    #[should_panic(expected = "no value decoded for ServerSettings::get_host")]
    fn undefaulted_absence_panics_at_call_time() {
        let result = decode(&map_node(&[("port", "9090")]));
        let settings = downcast::<ServerSettingsHandle>(&result.value.unwrap()).unwrap();
        settings.get_host();
    }
}
