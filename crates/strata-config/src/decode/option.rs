//! Optional-wrapper decoder.

use crate::decode::descriptor::{Shape, TypeDescriptor, TypeKind};
use crate::decode::{Decoder, DecoderContext, Priority};
use crate::error::{Severity, ValidationError};
use crate::node::ConfigNode;
use crate::result::{AnyValue, ConfigResult};
use crate::tag::Tags;

/// Decodes `Option<T>` by delegating to the component decoder.
///
/// Absence is tolerated here: a missing value becomes `None` plus a
/// MISSING_OPTIONAL_VALUE entry, and any MISSING_VALUE the component
/// reports is demoted the same way. Every other problem passes through
/// unchanged.
pub struct OptionDecoder;

impl Decoder for OptionDecoder {
    fn name(&self) -> &'static str {
        "Option"
    }

    fn priority(&self) -> Priority {
        Priority::Highest
    }

    fn can_decode(
        &self,
        _path: &str,
        _tags: &Tags,
        _node: &ConfigNode,
        ty: &TypeDescriptor,
    ) -> bool {
        ty.kind() == TypeKind::Optional
    }

    fn decode(
        &self,
        path: &str,
        tags: &Tags,
        node: &ConfigNode,
        ty: &TypeDescriptor,
        ctx: &DecoderContext<'_>,
    ) -> ConfigResult<AnyValue> {
        let (Some(component), Some(Shape::Optional(wrap))) = (ty.component(), ty.shape()) else {
            return ConfigResult::err(ValidationError::decode(
                path,
                format!("descriptor for {} carries no optional shape", ty.name()),
            ));
        };

        let (inner, mut errors) = match node {
            ConfigNode::Leaf(None) => (
                None,
                vec![ValidationError::missing_optional(
                    path,
                    format!("no value for {}", ty.name()),
                )],
            ),
            other => match ctx.registry.decode(path, tags, other, component, ctx) {
                Ok(mut result) => {
                    for error in &mut result.errors {
                        if error.severity == Severity::MissingValue {
                            error.severity = Severity::MissingOptionalValue;
                        }
                    }
                    (result.value, result.errors)
                }
                Err(structural) => (
                    None,
                    vec![ValidationError::decode(path, structural.to_string())],
                ),
            },
        };

        match wrap(inner) {
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
