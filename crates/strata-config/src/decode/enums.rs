//! Simple enumeration decoder.

use crate::decode::descriptor::{Shape, TypeDescriptor, TypeKind};
use crate::decode::{Decoder, DecoderContext, Priority};
use crate::error::ValidationError;
use crate::node::ConfigNode;
use crate::result::{AnyValue, ConfigResult};
use crate::tag::Tags;

/// Decodes a leaf into a unit-variant enum by variant name.
///
/// An exact match wins; otherwise a single case-insensitive match is
/// accepted. Anything else is an ERROR listing the declared variants.
pub struct EnumDecoder;

impl Decoder for EnumDecoder {
    fn name(&self) -> &'static str {
        "Enum"
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
        ty.kind() == TypeKind::Enum
    }

    fn decode(
        &self,
        path: &str,
        _tags: &Tags,
        node: &ConfigNode,
        ty: &TypeDescriptor,
        ctx: &DecoderContext<'_>,
    ) -> ConfigResult<AnyValue> {
        let Some(Shape::Enum(shape)) = ty.shape() else {
            return ConfigResult::err(ValidationError::decode(
                path,
                format!("descriptor for {} carries no enum shape", ty.name()),
            ));
        };

        let value = match node {
            ConfigNode::Leaf(Some(value)) => value.trim(),
            ConfigNode::Leaf(None) => {
                return ConfigResult::err(ValidationError::missing(
                    path,
                    format!("no value for {}", shape.name),
                ));
            }
            other => {
                return ConfigResult::err(ValidationError::decode(
                    path,
                    format!("expected a leaf for {}, found {}", shape.name, other.kind()),
                ));
            }
        };

        let matched = shape
            .variants
            .iter()
            .copied()
            .find(|variant| *variant == value)
            .or_else(|| {
                shape
                    .variants
                    .iter()
                    .copied()
                    .find(|variant| variant.eq_ignore_ascii_case(value))
            });

        match matched.and_then(|variant| (shape.construct)(variant)) {
            Some(constructed) => ConfigResult::ok(constructed),
            None => ConfigResult::err(ValidationError::decode(
                path,
                format!(
                    "'{}' is not a variant of {}; expected one of [{}]",
                    ctx.render_value(path, value),
                    shape.name,
                    shape.variants.join(", ")
                ),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_enum;
    use crate::decode::DecoderRegistry;
    use crate::decode::descriptor::{FromConfig, downcast};
    use crate::lexer::PathLexer;
    use pretty_assertions::assert_eq;

    config_enum! {
        #[derive(Debug, PartialEq)]
        pub enum LogLevel {
            Trace,
            Info,
            Warning,
        }
    }

    fn decode(value: &str) -> ConfigResult<AnyValue> {
        let registry = DecoderRegistry::with_defaults();
        let lexer = PathLexer::default();
        let ctx = DecoderContext {
            registry: &registry,
            lexer: &lexer,
            masker: None,
        };
        let node = ConfigNode::leaf(value);
        registry
            .decode("log.level", &Tags::none(), &node, &LogLevel::descriptor(), &ctx)
            .unwrap()
    }

    #[test]
    fn matches_variant_names_exactly() {
        let result = decode("Info");
        assert_eq!(result.errors, Vec::new());
        assert_eq!(
            downcast::<LogLevel>(&result.value.unwrap()),
            Some(LogLevel::Info)
        );
    }

    #[test]
    fn falls_back_to_case_insensitive() {
        assert_eq!(
            downcast::<LogLevel>(&decode("warning").value.unwrap()),
            Some(LogLevel::Warning)
        );
        assert_eq!(
            downcast::<LogLevel>(&decode("TRACE").value.unwrap()),
            Some(LogLevel::Trace)
        );
    }

    #[test]
    fn unknown_names_list_the_variants() {
        let result = decode("verbose");
        assert!(result.value.is_none());
        assert!(result.errors[0].message.contains("Trace, Info, Warning"));
    }
}
