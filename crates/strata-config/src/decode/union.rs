//! Closed-union decoder.

use crate::decode::descriptor::{Shape, TypeDescriptor, TypeKind};
use crate::decode::{Decoder, DecoderContext, Priority};
use crate::error::{Severity, ValidationError};
use crate::node::ConfigNode;
use crate::result::{AnyValue, ConfigResult};
use crate::tag::Tags;

/// Decodes a node against every candidate variant of a closed union and
/// keeps the best structural fit.
///
/// There is no discriminator field: each variant is decoded in declaration
/// order and scored by the weighted severity of its problems plus the
/// distance between the node's field count and the variant's declared
/// field count. The lowest score wins; declaration order breaks ties.
pub struct UnionDecoder;

fn severity_weight(severity: Severity) -> usize {
    match severity {
        Severity::Error => 8,
        Severity::MissingValue => 4,
        Severity::Warn => 2,
        Severity::MissingOptionalValue => 1,
        Severity::Debug => 0,
    }
}

fn node_field_count(node: &ConfigNode) -> usize {
    match node {
        ConfigNode::Map(children) => children.len(),
        _ => 0,
    }
}

impl Decoder for UnionDecoder {
    fn name(&self) -> &'static str {
        "Union"
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
        ty.kind() == TypeKind::Union
    }

    fn decode(
        &self,
        path: &str,
        tags: &Tags,
        node: &ConfigNode,
        ty: &TypeDescriptor,
        ctx: &DecoderContext<'_>,
    ) -> ConfigResult<AnyValue> {
        let Some(Shape::Union(shape)) = ty.shape() else {
            return ConfigResult::err(ValidationError::decode(
                path,
                format!("descriptor for {} carries no union shape", ty.name()),
            ));
        };
        if shape.variants.is_empty() {
            return ConfigResult::err(ValidationError::decode(
                path,
                format!("union {} declares no variants", shape.name),
            ));
        }

        let observed_fields = node_field_count(node);
        let mut best: Option<(usize, &'static str, ConfigResult<AnyValue>)> = None;

        for variant in &shape.variants {
            let candidate = match ctx
                .registry
                .decode(path, tags, node, &variant.descriptor, ctx)
            {
                Ok(result) => result,
                Err(structural) => {
                    ConfigResult::err(ValidationError::decode(path, structural.to_string()))
                }
            };
            let score = candidate
                .errors
                .iter()
                .map(|e| severity_weight(e.severity))
                .sum::<usize>()
                + observed_fields.abs_diff(variant.field_count);

            let wrapped = match candidate.value {
                Some(payload) => match (variant.wrap)(payload) {
                    Ok(value) => ConfigResult {
                        value: Some(value),
                        errors: candidate.errors,
                    },
                    Err(reason) => {
                        let mut errors = candidate.errors;
                        errors.push(ValidationError::decode(path, reason));
                        ConfigResult::errs(errors)
                    }
                },
                None => ConfigResult::errs(candidate.errors),
            };

            // Strict "less than" keeps the earliest variant on a tie.
            if best.as_ref().is_none_or(|(s, _, _)| score < *s) {
                let done = score == 0;
                best = Some((score, variant.name, wrapped));
                if done {
                    break;
                }
            }
        }

        let Some((score, name, mut result)) = best else {
            return ConfigResult::err(ValidationError::decode(
                path,
                format!("no variant of {} could be scored", shape.name),
            ));
        };
        if score > 0 {
            result.errors.insert(
                0,
                ValidationError::new(
                    path,
                    Severity::Debug,
                    format!("selected union variant {name} with fit score {score}"),
                ),
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::DecoderRegistry;
    use crate::decode::descriptor::{FromConfig, downcast};
    use crate::lexer::PathLexer;
    use crate::{config_record, config_union};
    use pretty_assertions::assert_eq;

    config_record! {
        #[derive(Debug, PartialEq)]
        pub struct TokenAuth {
            token: String,
        }
    }

    config_record! {
        #[derive(Debug, PartialEq)]
        pub struct BasicAuth {
            username: String,
            password: String,
        }
    }

    config_union! {
        #[derive(Debug, PartialEq)]
        pub enum Auth {
            Token(TokenAuth),
            Basic(BasicAuth),
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
            .decode("auth", &Tags::none(), node, &Auth::descriptor(), &ctx)
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
    fn picks_the_variant_that_fits() {
        let result = decode(&map_node(&[("token", "abc123")]));
        assert_eq!(result.errors, Vec::new());
        assert_eq!(
            downcast::<Auth>(&result.value.unwrap()),
            Some(Auth::Token(TokenAuth {
                token: "abc123".to_string()
            }))
        );

        let result = decode(&map_node(&[("username", "ada"), ("password", "pw")]));
        assert_eq!(result.errors, Vec::new());
        assert_eq!(
            downcast::<Auth>(&result.value.unwrap()),
            Some(Auth::Basic(BasicAuth {
                username: "ada".to_string(),
                password: "pw".to_string(),
            }))
        );
    }

    #[test]
    fn imperfect_fit_keeps_the_closest_variant_and_a_debug_note() {
        // {username} scores Token at 4 (missing token) and Basic at 5
        // (missing password plus field-count distance 1), so Token wins.
        let result = decode(&map_node(&[("username", "ada")]));
        assert_eq!(result.errors[0].severity, Severity::Debug);
        assert!(result.errors.iter().any(|e| e.path == "auth.token"));
    }

    #[test]
    fn field_count_distance_breaks_severity_ties() {
        // Empty map: Token scores 4 + 1, Basic scores 8 + 2. Token wins.
        let result = decode(&ConfigNode::map());
        assert!(
            result
                .errors
                .iter()
                .any(|e| e.severity == Severity::Debug && e.message.contains("TokenAuth"))
        );
    }
}
