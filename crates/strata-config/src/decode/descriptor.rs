//! Explicit descriptions of decode targets.
//!
//! Rust erases generic parameters at runtime, so every decode call carries
//! a [`TypeDescriptor`]: the nominal `TypeId`, a [`TypeKind`]
//! classification, generic parameter descriptors, and a kind-specific
//! shape holding the monomorphized assembly closures built once per call
//! type. Descriptor equality and hashing ignore the shapes, so descriptors
//! can key the memo cache.

use crate::result::AnyValue;
use std::any::{Any, TypeId, type_name};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

/// Classification of a decode target; decoders dispatch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// A primitive parsed from a single leaf.
    Scalar,
    /// An ordered collection (`Vec<T>`).
    List,
    /// An unordered collection (`HashSet<T>`).
    Set,
    /// A keyed collection (`HashMap<K, V>`).
    Map,
    /// `Option<T>`; absence is tolerated.
    Optional,
    /// A product type with named fields.
    Record,
    /// A closed union of candidate record shapes (no discriminator field).
    Union,
    /// A capability interface of accessor methods.
    Interface,
    /// A simple enumeration decoded from a variant name.
    Enum,
}

/// Assembles a list/set value from decoded elements.
pub type AssembleElements =
    Arc<dyn Fn(Vec<AnyValue>) -> Result<AnyValue, String> + Send + Sync>;
/// Assembles a map value from decoded key/value pairs.
pub type AssembleEntries =
    Arc<dyn Fn(Vec<(AnyValue, AnyValue)>) -> Result<AnyValue, String> + Send + Sync>;
/// Wraps a decoded (or absent) component into an `Option<T>`.
pub type WrapOptional = Arc<dyn Fn(Option<AnyValue>) -> Result<AnyValue, String> + Send + Sync>;
/// Assembles a record from per-field values in declaration order; `None`
/// entries fall back to the field's declared default or zero value.
pub type AssembleFields =
    Arc<dyn Fn(Vec<Option<AnyValue>>) -> Result<AnyValue, String> + Send + Sync>;
/// Wraps a decoded variant value into the union type.
pub type WrapVariant = Arc<dyn Fn(AnyValue) -> Result<AnyValue, String> + Send + Sync>;
/// Supplies a default value for a missing field or accessor.
pub type DefaultSupplier = Arc<dyn Fn() -> AnyValue + Send + Sync>;

/// One named field of a record target.
#[derive(Clone)]
pub struct FieldShape {
    /// The config key the field is read from.
    pub key: &'static str,
    /// Shape of the field's own target type.
    pub descriptor: TypeDescriptor,
    /// Whether a declared default exists; a missing field then reports
    /// MISSING_OPTIONAL_VALUE instead of MISSING_VALUE.
    pub has_default: bool,
}

/// Compile-time shape of a product type.
#[derive(Clone)]
pub struct RecordShape {
    /// Type name for diagnostics.
    pub name: &'static str,
    /// Fields in declaration order.
    pub fields: Vec<FieldShape>,
    /// Builds the record from per-field values in declaration order.
    pub assemble: AssembleFields,
}

/// One candidate concrete shape of a closed union.
#[derive(Clone)]
pub struct VariantShape {
    /// Variant name for diagnostics.
    pub name: &'static str,
    /// Descriptor of the variant's payload type.
    pub descriptor: TypeDescriptor,
    /// Declared field count, used in structural scoring.
    pub field_count: usize,
    /// Lifts the decoded payload into the union type.
    pub wrap: WrapVariant,
}

/// Compile-time shape of a closed union ("sealed" type).
#[derive(Clone)]
pub struct UnionShape {
    /// Type name for diagnostics.
    pub name: &'static str,
    /// Candidate shapes, tried in declaration order.
    pub variants: Vec<VariantShape>,
}

/// One accessor method of a capability interface.
#[derive(Clone)]
pub struct MethodShape {
    /// Method name as declared, e.g. `get_port`.
    pub method: &'static str,
    /// Config key derived from the method name, e.g. `port`.
    pub key: String,
    /// Shape of the accessor's return type.
    pub descriptor: TypeDescriptor,
    /// Declared default behavior, when the method has one.
    pub default: Option<DefaultSupplier>,
}

/// Compile-time shape of a capability interface.
#[derive(Clone)]
pub struct InterfaceShape {
    /// Interface name for diagnostics.
    pub name: &'static str,
    /// Accessor methods in declaration order.
    pub methods: Vec<MethodShape>,
    /// Builds the typed proxy wrapper around the dispatch table.
    pub wrap: Arc<dyn Fn(crate::decode::interface::ConfigProxy) -> AnyValue + Send + Sync>,
}

/// Compile-time shape of a simple enumeration.
#[derive(Clone)]
pub struct EnumShape {
    /// Enum name for diagnostics.
    pub name: &'static str,
    /// Declared variant names.
    pub variants: &'static [&'static str],
    /// Builds the enum value from a matched variant name.
    pub construct: fn(&str) -> Option<AnyValue>,
}

/// Kind-specific assembly information carried by a descriptor.
#[derive(Clone)]
pub enum Shape {
    /// List assembler.
    List(AssembleElements),
    /// Set assembler.
    Set(AssembleElements),
    /// Map assembler.
    Map(AssembleEntries),
    /// Optional wrapper.
    Optional(WrapOptional),
    /// Record shape.
    Record(Arc<RecordShape>),
    /// Union shape.
    Union(Arc<UnionShape>),
    /// Interface shape.
    Interface(Arc<InterfaceShape>),
    /// Enum shape.
    Enum(Arc<EnumShape>),
}

/// A caller-supplied description of the requested target shape.
#[derive(Clone)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
    kind: TypeKind,
    params: Vec<TypeDescriptor>,
    component: Option<Box<TypeDescriptor>>,
    shape: Option<Shape>,
}

impl TypeDescriptor {
    /// Descriptor for a scalar target parsed from a single leaf.
    pub fn scalar<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind: TypeKind::Scalar,
            params: Vec::new(),
            component: None,
            shape: None,
        }
    }

    /// Descriptor for `Vec<T>`.
    pub fn list_of<T: FromConfig>() -> Self {
        Self {
            id: TypeId::of::<Vec<T>>(),
            name: type_name::<Vec<T>>(),
            kind: TypeKind::List,
            params: vec![T::descriptor()],
            component: Some(Box::new(T::descriptor())),
            shape: Some(Shape::List(Arc::new(|elements| {
                collect_elements::<T>(elements).map(|vec| Arc::new(vec) as AnyValue)
            }))),
        }
    }

    /// Descriptor for `HashSet<T>`.
    pub fn set_of<T: FromConfig + Eq + Hash>() -> Self {
        Self {
            id: TypeId::of::<HashSet<T>>(),
            name: type_name::<HashSet<T>>(),
            kind: TypeKind::Set,
            params: vec![T::descriptor()],
            component: Some(Box::new(T::descriptor())),
            shape: Some(Shape::Set(Arc::new(|elements| {
                collect_elements::<T>(elements)
                    .map(|vec| Arc::new(vec.into_iter().collect::<HashSet<T>>()) as AnyValue)
            }))),
        }
    }

    /// Descriptor for `HashMap<K, V>`.
    pub fn map_of<K, V>() -> Self
    where
        K: FromConfig + Eq + Hash,
        V: FromConfig,
    {
        Self {
            id: TypeId::of::<HashMap<K, V>>(),
            name: type_name::<HashMap<K, V>>(),
            kind: TypeKind::Map,
            params: vec![K::descriptor(), V::descriptor()],
            component: None,
            shape: Some(Shape::Map(Arc::new(|entries| {
                let mut map = HashMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = downcast::<K>(&key)
                        .ok_or_else(|| type_mismatch::<K>("map key"))?;
                    let value = downcast::<V>(&value)
                        .ok_or_else(|| type_mismatch::<V>("map value"))?;
                    map.insert(key, value);
                }
                Ok(Arc::new(map) as AnyValue)
            }))),
        }
    }

    /// Descriptor for `Option<T>`.
    pub fn optional_of<T: FromConfig>() -> Self {
        Self {
            id: TypeId::of::<Option<T>>(),
            name: type_name::<Option<T>>(),
            kind: TypeKind::Optional,
            params: vec![T::descriptor()],
            component: Some(Box::new(T::descriptor())),
            shape: Some(Shape::Optional(Arc::new(|value| match value {
                Some(value) => {
                    let inner =
                        downcast::<T>(&value).ok_or_else(|| type_mismatch::<T>("optional"))?;
                    Ok(Arc::new(Some(inner)) as AnyValue)
                }
                None => Ok(Arc::new(None::<T>) as AnyValue),
            }))),
        }
    }

    /// Descriptor for a product type with the given shape.
    pub fn record<T: Any>(shape: RecordShape) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind: TypeKind::Record,
            params: Vec::new(),
            component: None,
            shape: Some(Shape::Record(Arc::new(shape))),
        }
    }

    /// Descriptor for a closed union with the given candidates.
    pub fn union<T: Any>(shape: UnionShape) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind: TypeKind::Union,
            params: Vec::new(),
            component: None,
            shape: Some(Shape::Union(Arc::new(shape))),
        }
    }

    /// Descriptor for a capability interface.
    pub fn interface<T: Any>(shape: InterfaceShape) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind: TypeKind::Interface,
            params: Vec::new(),
            component: None,
            shape: Some(Shape::Interface(Arc::new(shape))),
        }
    }

    /// Descriptor for a simple enumeration.
    pub fn enumeration<T: Any>(shape: EnumShape) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind: TypeKind::Enum,
            params: Vec::new(),
            component: None,
            shape: Some(Shape::Enum(Arc::new(shape))),
        }
    }

    /// Nominal identity of the target type.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Target type name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Classification of the target.
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Ordered generic parameter descriptors.
    pub fn params(&self) -> &[TypeDescriptor] {
        &self.params
    }

    /// Element descriptor for list/set/optional targets.
    pub fn component(&self) -> Option<&TypeDescriptor> {
        self.component.as_deref()
    }

    /// Kind-specific shape, when the kind carries one.
    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    /// Whether this target is an ordered or unordered collection.
    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::List | TypeKind::Set)
    }

    /// Whether this target is a capability interface.
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    /// Whether this target is a simple enumeration.
    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }

    /// Whether this target is a product type.
    pub fn is_record(&self) -> bool {
        self.kind == TypeKind::Record
    }

    /// Whether this target is a closed union.
    pub fn is_union(&self) -> bool {
        self.kind == TypeKind::Union
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("params", &self.params)
            .finish()
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.params == other.params
            && self.component == other.component
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.kind.hash(state);
        self.params.hash(state);
        self.component.hash(state);
    }
}

/// Extract a typed clone out of a type-erased decoded value.
pub fn downcast<T: Clone + 'static>(value: &AnyValue) -> Option<T> {
    value.downcast_ref::<T>().cloned()
}

fn type_mismatch<T>(role: &str) -> String {
    format!("decoded {role} was not a {}", type_name::<T>())
}

fn collect_elements<T: FromConfig>(elements: Vec<AnyValue>) -> Result<Vec<T>, String> {
    elements
        .iter()
        .map(|element| downcast::<T>(element).ok_or_else(|| type_mismatch::<T>("element")))
        .collect()
}

/// Derive the config key for an accessor method: strip a `get`/`is`
/// prefix and lower-case the first remaining letter.
pub fn accessor_key(method: &str) -> String {
    let stripped = method
        .strip_prefix("get_")
        .or_else(|| method.strip_prefix("is_"))
        .or_else(|| method.strip_prefix("get"))
        .or_else(|| method.strip_prefix("is"))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(method);
    let mut chars = stripped.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Types that can describe their own decode target shape.
///
/// Scalars, collections, and `Option` are covered here; product types,
/// closed unions, enumerations, and capability interfaces get
/// implementations from the `config_record!`, `config_union!`,
/// `config_enum!`, and `config_interface!` macros.
pub trait FromConfig: Any + Clone + Send + Sync + Sized {
    /// Build the descriptor for this target type.
    fn descriptor() -> TypeDescriptor;
}

macro_rules! scalar_from_config {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromConfig for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::scalar::<$ty>()
                }
            }
        )*
    };
}

scalar_from_config!(
    String, bool, char, i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, usize, isize, f32,
    f64, Duration,
);

impl<T: FromConfig> FromConfig for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::list_of::<T>()
    }
}

impl<T: FromConfig + Eq + Hash> FromConfig for HashSet<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::set_of::<T>()
    }
}

impl<K: FromConfig + Eq + Hash, V: FromConfig> FromConfig for HashMap<K, V> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::map_of::<K, V>()
    }
}

impl<T: FromConfig> FromConfig for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::optional_of::<T>()
    }
}
