//! Product-type decoder.

use crate::decode::descriptor::{Shape, TypeDescriptor, TypeKind};
use crate::decode::{Decoder, DecoderContext, Priority, child_path};
use crate::error::ValidationError;
use crate::node::ConfigNode;
use crate::result::{AnyValue, ConfigResult};
use crate::tag::Tags;

/// Decodes a `Map` node into a record, field by field.
///
/// Every field is attempted even after earlier ones fail; a missing field
/// with a declared default (or an `Option` type) is MISSING_OPTIONAL_VALUE,
/// a missing required field is MISSING_VALUE, and the assembler fills
/// absent slots from the field defaults.
pub struct RecordDecoder;

impl Decoder for RecordDecoder {
    fn name(&self) -> &'static str {
        "Record"
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
        ty.kind() == TypeKind::Record
    }

    fn decode(
        &self,
        path: &str,
        tags: &Tags,
        node: &ConfigNode,
        ty: &TypeDescriptor,
        ctx: &DecoderContext<'_>,
    ) -> ConfigResult<AnyValue> {
        let Some(Shape::Record(shape)) = ty.shape() else {
            return ConfigResult::err(ValidationError::decode(
                path,
                format!("descriptor for {} carries no record shape", ty.name()),
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

        let mut values = Vec::with_capacity(shape.fields.len());
        let mut errors = Vec::new();

        for field in &shape.fields {
            let field_path = child_path(path, field.key);
            match children.get(field.key) {
                Some(child) => {
                    match ctx
                        .registry
                        .decode(&field_path, tags, child, &field.descriptor, ctx)
                    {
                        Ok(mut result) => {
                            errors.append(&mut result.errors);
                            values.push(result.value);
                        }
                        Err(structural) => {
                            errors
                                .push(ValidationError::decode(&field_path, structural.to_string()));
                            values.push(None);
                        }
                    }
                }
                None if field.descriptor.kind() == TypeKind::Optional => {
                    // Option fields tolerate absence through their own decoder.
                    let absent = ConfigNode::Leaf(None);
                    match ctx
                        .registry
                        .decode(&field_path, tags, &absent, &field.descriptor, ctx)
                    {
                        Ok(mut result) => {
                            errors.append(&mut result.errors);
                            values.push(result.value);
                        }
                        Err(structural) => {
                            errors
                                .push(ValidationError::decode(&field_path, structural.to_string()));
                            values.push(None);
                        }
                    }
                }
                None if field.has_default => {
                    errors.push(ValidationError::missing_optional(
                        &field_path,
                        format!("no value for field '{}'; default applies", field.key),
                    ));
                    values.push(None);
                }
                None => {
                    errors.push(ValidationError::missing(
                        &field_path,
                        format!("no value for required field '{}'", field.key),
                    ));
                    values.push(None);
                }
            }
        }

        match (shape.assemble)(values) {
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
