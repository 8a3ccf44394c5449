//! Type-directed decoding of config nodes.
//!
//! A [`Decoder`] is a capability: it claims node/type combinations through
//! `can_decode` and converts them through `decode`. The [`DecoderRegistry`]
//! holds an insertion-ordered collection of decoders and dispatches each
//! request to the highest-priority claimant. Dispatch is recursive and
//! never short-circuits on a child error: composite decoders gather every
//! child's result, concatenate the errors, and still produce a best-effort
//! value so a caller sees every defect in one pass.

pub mod collection;
pub mod descriptor;
pub mod enums;
pub mod interface;
pub mod map;
pub mod option;
pub mod record;
pub mod scalar;
pub mod union;

pub use descriptor::{
    AssembleFields, DefaultSupplier, EnumShape, FieldShape, FromConfig, InterfaceShape,
    MethodShape, RecordShape, Shape, TypeDescriptor, TypeKind, UnionShape, VariantShape,
    accessor_key, downcast,
};
pub use interface::ConfigProxy;

use crate::error::ConfigError;
use crate::ext::SecretMasker;
use crate::lexer::PathLexer;
use crate::node::ConfigNode;
use crate::result::{AnyValue, ConfigResult};
use crate::tag::Tags;
use log::debug;
use std::sync::Arc;

/// Tie-break order among decoders that claim the same request; a more
/// specific decoder registers at a higher priority than a generic one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Wins every tie.
    Highest,
    /// Above the built-in default.
    High,
    /// The built-in default.
    Medium,
    /// Below the built-in default.
    Low,
    /// Loses every tie.
    Lowest,
}

/// Bundles the collaborators a decoder needs while recursing.
pub struct DecoderContext<'a> {
    /// Handle back to the registry for recursive decode calls.
    pub registry: &'a DecoderRegistry,
    /// The active tokenizer.
    pub lexer: &'a PathLexer,
    /// Optional masking hook, used only for diagnostic rendering.
    pub masker: Option<&'a dyn SecretMasker>,
}

impl<'a> DecoderContext<'a> {
    /// Render a leaf value for an error message, masking when configured.
    pub fn render_value(&self, path: &str, value: &str) -> String {
        match self.masker {
            Some(masker) => masker.mask(path, value),
            None => value.to_string(),
        }
    }
}

/// A capability that claims and converts nodes of a matching type.
pub trait Decoder: Send + Sync {
    /// Decoder name, for logs and ambiguity diagnostics.
    fn name(&self) -> &'static str;

    /// Tie-break order among matching decoders.
    fn priority(&self) -> Priority {
        Priority::Medium
    }

    /// Whether this decoder claims the node/type combination.
    fn can_decode(&self, path: &str, tags: &Tags, node: &ConfigNode, ty: &TypeDescriptor)
    -> bool;

    /// Convert the node into a type-erased value, accumulating problems on
    /// the result instead of failing fast.
    fn decode(
        &self,
        path: &str,
        tags: &Tags,
        node: &ConfigNode,
        ty: &TypeDescriptor,
        ctx: &DecoderContext<'_>,
    ) -> ConfigResult<AnyValue>;
}

/// Insertion-ordered decoder collection with priority tie-breaking.
///
/// The registry is assembled once at construction and treated as
/// read-mostly thereafter; the facade snapshots it so a decode never races
/// a registry mutation.
pub struct DecoderRegistry {
    decoders: Vec<Arc<dyn Decoder>>,
}

impl DecoderRegistry {
    /// Registry with every built-in decoder.
    pub fn with_defaults() -> Self {
        let mut decoders: Vec<Arc<dyn Decoder>> = vec![
            Arc::new(option::OptionDecoder),
            Arc::new(collection::ListDecoder),
            Arc::new(collection::SetDecoder),
            Arc::new(map::MapDecoder),
            Arc::new(enums::EnumDecoder),
            Arc::new(union::UnionDecoder),
            Arc::new(interface::InterfaceDecoder),
            Arc::new(record::RecordDecoder),
        ];
        decoders.extend(scalar::default_scalar_decoders());
        Self { decoders }
    }

    /// Registry from an explicit decoder list; empty lists are constructor
    /// misuse.
    pub fn new(decoders: Vec<Arc<dyn Decoder>>) -> Result<Self, ConfigError> {
        if decoders.is_empty() {
            return Err(ConfigError::Construction(
                "decoder registry requires at least one decoder".to_string(),
            ));
        }
        Ok(Self { decoders })
    }

    /// Append a decoder after the built-ins (insertion order preserved).
    pub fn push(&mut self, decoder: Arc<dyn Decoder>) {
        self.decoders.push(decoder);
    }

    /// Dispatch one decode request.
    ///
    /// Filters to claiming decoders, stable-sorts by priority, and invokes
    /// the first; zero claimants is the structural `NoDecoder` failure.
    pub fn decode(
        &self,
        path: &str,
        tags: &Tags,
        node: &ConfigNode,
        ty: &TypeDescriptor,
        ctx: &DecoderContext<'_>,
    ) -> Result<ConfigResult<AnyValue>, ConfigError> {
        let mut matched: Vec<&Arc<dyn Decoder>> = self
            .decoders
            .iter()
            .filter(|decoder| decoder.can_decode(path, tags, node, ty))
            .collect();

        if matched.is_empty() {
            return Err(ConfigError::NoDecoder {
                path: path.to_string(),
                type_name: ty.name().to_string(),
            });
        }
        if matched.len() > 1 {
            // Surface ambiguous registrations; insertion order breaks the
            // remaining tie after the stable sort.
            debug!(
                "{} decoders matched type {} at '{}': [{}]",
                matched.len(),
                ty.name(),
                path,
                matched
                    .iter()
                    .map(|d| d.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            matched.sort_by_key(|decoder| decoder.priority());
        }

        Ok(matched[0].decode(path, tags, node, ty, ctx))
    }
}

/// Join a child key onto a parent path for diagnostics and recursion.
pub(crate) fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Join an array index onto a parent path.
pub(crate) fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}
