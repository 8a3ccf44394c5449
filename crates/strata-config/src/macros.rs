//! Declaration macros for decodable user types.
//!
//! Rust has no runtime reflection, so record, union, enum, and interface
//! targets declare their shape once through these macros. Each expansion
//! defines the type and a [`FromConfig`](crate::FromConfig) impl whose
//! descriptor carries the monomorphized assembly closures the built-in
//! decoders drive.

/// Declare a product type decodable from a map of fields.
///
/// Field syntax is `name: Type` or `name: Type = default_expr`. A field
/// without a declared default must implement `Default`; the zero value
/// fills the slot when decoding fails, so the caller still receives a
/// best-effort record alongside the accumulated errors.
///
/// ```
/// use strata_config::config_record;
///
/// config_record! {
///     #[derive(Debug, PartialEq)]
///     pub struct Database {
///         host: String,
///         port: u16 = 5432,
///         replica: Option<String>,
///     }
/// }
/// ```
#[macro_export]
macro_rules! config_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $fty:ty $(= $fdefault:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $fty,
            )*
        }

        impl $crate::FromConfig for $name {
            fn descriptor() -> $crate::TypeDescriptor {
                let fields = vec![
                    $(
                        $crate::FieldShape {
                            key: stringify!($field),
                            descriptor: <$fty as $crate::FromConfig>::descriptor(),
                            has_default: $crate::config_record!(@has_default $($fdefault)?),
                        },
                    )*
                ];
                let assemble: $crate::AssembleFields =
                    ::std::sync::Arc::new(|values: Vec<Option<$crate::AnyValue>>| {
                        let mut slots = values.into_iter();
                        Ok(::std::sync::Arc::new($name {
                            $(
                                $field: match slots.next().flatten() {
                                    Some(value) => {
                                        $crate::downcast::<$fty>(&value).ok_or_else(|| {
                                            format!(
                                                "decoded field '{}' was not a {}",
                                                stringify!($field),
                                                stringify!($fty)
                                            )
                                        })?
                                    }
                                    None => $crate::config_record!(@fill $fty $(, $fdefault)?),
                                },
                            )*
                        }) as $crate::AnyValue)
                    });
                $crate::TypeDescriptor::record::<$name>($crate::RecordShape {
                    name: stringify!($name),
                    fields,
                    assemble,
                })
            }
        }
    };
    (@has_default) => { false };
    (@has_default $fdefault:expr) => { true };
    (@fill $fty:ty) => { <$fty as ::std::default::Default>::default() };
    (@fill $fty:ty, $fdefault:expr) => { $fdefault };
}

/// Declare a closed union of record variants, decoded by structural fit.
///
/// There is no discriminator key in the data: the decoder scores every
/// variant against the node and keeps the closest match.
///
/// ```
/// use strata_config::{config_record, config_union};
///
/// config_record! {
///     #[derive(Debug, PartialEq)]
///     pub struct FileSink { path: String }
/// }
/// config_record! {
///     #[derive(Debug, PartialEq)]
///     pub struct NetSink { host: String, port: u16 = 514 }
/// }
/// config_union! {
///     #[derive(Debug, PartialEq)]
///     pub enum Sink {
///         File(FileSink),
///         Net(NetSink),
///     }
/// }
/// ```
#[macro_export]
macro_rules! config_union {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $variant:ident($vty:ty) ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone)]
        $vis enum $name {
            $( $variant($vty), )*
        }

        impl $crate::FromConfig for $name {
            fn descriptor() -> $crate::TypeDescriptor {
                let variants = vec![
                    $(
                        {
                            let descriptor = <$vty as $crate::FromConfig>::descriptor();
                            let field_count = match descriptor.shape() {
                                Some($crate::Shape::Record(record)) => record.fields.len(),
                                _ => 0,
                            };
                            $crate::VariantShape {
                                name: stringify!($vty),
                                descriptor,
                                field_count,
                                wrap: ::std::sync::Arc::new(|payload: $crate::AnyValue| {
                                    let inner =
                                        $crate::downcast::<$vty>(&payload).ok_or_else(|| {
                                            format!(
                                                "decoded variant was not a {}",
                                                stringify!($vty)
                                            )
                                        })?;
                                    Ok(::std::sync::Arc::new($name::$variant(inner))
                                        as $crate::AnyValue)
                                }),
                            }
                        },
                    )*
                ];
                $crate::TypeDescriptor::union::<$name>($crate::UnionShape {
                    name: stringify!($name),
                    variants,
                })
            }
        }
    };
}

/// Declare a unit-variant enumeration decoded from a variant name.
///
/// ```
/// use strata_config::config_enum;
///
/// config_enum! {
///     #[derive(Debug, PartialEq)]
///     pub enum Mode { Active, Passive, Standby }
/// }
/// ```
#[macro_export]
macro_rules! config_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $variant:ident ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone)]
        $vis enum $name {
            $( $variant, )*
        }

        impl $crate::FromConfig for $name {
            fn descriptor() -> $crate::TypeDescriptor {
                const VARIANTS: &[&str] = &[$( stringify!($variant) ),*];
                fn construct(matched: &str) -> Option<$crate::AnyValue> {
                    match matched {
                        $(
                            stringify!($variant) => Some(
                                ::std::sync::Arc::new($name::$variant) as $crate::AnyValue,
                            ),
                        )*
                        _ => None,
                    }
                }
                $crate::TypeDescriptor::enumeration::<$name>($crate::EnumShape {
                    name: stringify!($name),
                    variants: VARIANTS,
                    construct,
                })
            }
        }
    };
}

/// Declare a capability interface of accessor methods plus the proxy-backed
/// handle type that implements it.
///
/// Each method's config key is derived from its name (`get_port` reads
/// `port`, `is_secure` reads `secure`). A method may declare a default with
/// `= expr`; a method without one panics at call time when its value never
/// decoded.
///
/// ```
/// use strata_config::config_interface;
///
/// config_interface! {
///     pub trait PoolSettings => PoolSettingsHandle {
///         fn get_size(&self) -> u32 = 8;
///         fn get_name(&self) -> String;
///     }
/// }
/// ```
#[macro_export]
macro_rules! config_interface {
    (
        $(#[$meta:meta])*
        $vis:vis trait $name:ident => $handle:ident {
            $(
                $(#[$mmeta:meta])*
                fn $method:ident(&self) -> $rty:ty $(= $mdefault:expr)?;
            )*
        }
    ) => {
        $(#[$meta])*
        $vis trait $name {
            $(
                $(#[$mmeta])*
                fn $method(&self) -> $rty;
            )*
        }

        /// Proxy-backed implementation decoded from configuration.
        #[derive(Clone, Debug)]
        $vis struct $handle {
            proxy: $crate::ConfigProxy,
        }

        impl $name for $handle {
            $(
                fn $method(&self) -> $rty {
                    self.proxy.call::<$rty>(stringify!($method))
                }
            )*
        }

        impl $crate::FromConfig for $handle {
            fn descriptor() -> $crate::TypeDescriptor {
                let methods = vec![
                    $(
                        $crate::MethodShape {
                            method: stringify!($method),
                            key: $crate::accessor_key(stringify!($method)),
                            descriptor: <$rty as $crate::FromConfig>::descriptor(),
                            default: $crate::config_interface!(@default $rty $(, $mdefault)?),
                        },
                    )*
                ];
                $crate::TypeDescriptor::interface::<$handle>($crate::InterfaceShape {
                    name: stringify!($name),
                    methods,
                    wrap: ::std::sync::Arc::new(|proxy| {
                        ::std::sync::Arc::new($handle { proxy }) as $crate::AnyValue
                    }),
                })
            }
        }
    };
    (@default $rty:ty) => { ::std::option::Option::None };
    (@default $rty:ty, $mdefault:expr) => {
        ::std::option::Option::Some(::std::sync::Arc::new(|| {
            let value: $rty = $mdefault;
            ::std::sync::Arc::new(value) as $crate::AnyValue
        }) as $crate::DefaultSupplier)
    };
}

#[cfg(test)]
mod tests {
    use crate::decode::descriptor::{FromConfig, Shape, TypeKind};
    use pretty_assertions::assert_eq;

    config_record! {
        #[derive(Debug, PartialEq)]
        pub struct Retry {
            attempts: u32 = 3,
            backoff: String,
        }
    }

    config_enum! {
        #[derive(Debug, PartialEq)]
        pub enum Color { Red, Green }
    }

    #[test]
    fn record_descriptor_reflects_declared_defaults() {
        let descriptor = Retry::descriptor();
        assert_eq!(descriptor.kind(), TypeKind::Record);
        let Some(Shape::Record(shape)) = descriptor.shape() else {
            panic!("record descriptor must carry a record shape");
        };
        assert_eq!(shape.name, "Retry");
        assert_eq!(shape.fields.len(), 2);
        assert!(shape.fields[0].has_default);
        assert!(!shape.fields[1].has_default);
    }

    #[test]
    fn record_assembler_fills_missing_slots_from_defaults() {
        let descriptor = Retry::descriptor();
        let Some(Shape::Record(shape)) = descriptor.shape() else {
            panic!("record descriptor must carry a record shape");
        };
        let assembled = (shape.assemble)(vec![
            None,
            Some(std::sync::Arc::new("linear".to_string()) as crate::AnyValue),
        ])
        .unwrap();
        assert_eq!(
            crate::downcast::<Retry>(&assembled),
            Some(Retry {
                attempts: 3,
                backoff: "linear".to_string(),
            })
        );
    }

    #[test]
    fn enum_descriptor_lists_variants() {
        let descriptor = Color::descriptor();
        let Some(Shape::Enum(shape)) = descriptor.shape() else {
            panic!("enum descriptor must carry an enum shape");
        };
        assert_eq!(shape.variants, &["Red", "Green"]);
        let constructed = (shape.construct)("Green").unwrap();
        assert_eq!(crate::downcast::<Color>(&constructed), Some(Color::Green));
    }
}
