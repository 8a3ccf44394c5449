//! Layered, typed, tag-scoped configuration.
//!
//! Sources contribute flat key/value pairs that are parsed into trees and
//! merged right-biased per tag-set; lookups tokenize a dotted path,
//! substitute placeholders, and decode the reached subtree into the
//! requested Rust type, accumulating every problem instead of failing on
//! the first. Published trees are swapped copy-on-write, so reads never
//! block a reload.
//!
//! [`Strata`] is the facade; the `config_record!`, `config_union!`,
//! `config_enum!`, and `config_interface!` macros declare decodable user
//! types.

mod cache;
mod error;
mod lexer;
mod node;
mod result;
mod source;
mod strata;
mod tag;

pub mod decode;
pub mod ext;
pub mod resolve;
pub mod tree;

mod macros;

/// Structural errors and the accumulated-validation model.
pub use error::{ConfigError, ErrorPolicy, Severity, ValidationError};
/// The facade.
pub use strata::Strata;
/// Merged-tree building blocks.
pub use node::{ConfigNode, NavigateError, merge};
/// Path tokenization.
pub use lexer::{PathLexer, Token, render_path};
/// Source contracts and the in-memory source.
pub use source::{ConfigSource, MapSource};
/// Scoping labels.
pub use tag::{Tag, Tags};
/// Value-plus-errors result carrier.
pub use result::{AnyValue, ConfigResult};
/// Decoding surface: the trait, the registry, and descriptor machinery.
pub use decode::{
    AssembleFields, ConfigProxy, Decoder, DecoderContext, DecoderRegistry, DefaultSupplier,
    EnumShape, FieldShape, FromConfig, InterfaceShape, MethodShape, Priority, RecordShape, Shape,
    TypeDescriptor, TypeKind, UnionShape, VariantShape, accessor_key, downcast,
};
/// Memo cache for decoded lookups.
pub use cache::ResultCache;
/// Host collaborator hooks.
pub use ext::{ObservationRecorder, ReloadListener, ResultProcessor, SecretMasker};
