//! Leaf-to-primitive decoders.

use crate::decode::descriptor::{TypeDescriptor, TypeKind};
use crate::decode::{Decoder, DecoderContext, Priority};
use crate::error::ValidationError;
use crate::node::ConfigNode;
use crate::result::{AnyValue, ConfigResult};
use crate::tag::Tags;
use std::any::{Any, TypeId, type_name};
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Parses a leaf's string value into `T` via its `FromStr`.
///
/// A present-but-unparsable value is an ERROR; an absent value is
/// MISSING_VALUE; a non-leaf node is an ERROR.
pub struct ScalarDecoder<T> {
    _marker: PhantomData<T>,
}

impl<T> ScalarDecoder<T> {
    /// Decoder for one primitive target type.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for ScalarDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Decoder for ScalarDecoder<T>
where
    T: FromStr + Any + Send + Sync,
    T::Err: Display,
{
    fn name(&self) -> &'static str {
        type_name::<T>()
    }

    fn can_decode(
        &self,
        _path: &str,
        _tags: &Tags,
        _node: &ConfigNode,
        ty: &TypeDescriptor,
    ) -> bool {
        ty.kind() == TypeKind::Scalar && ty.id() == TypeId::of::<T>()
    }

    fn decode(
        &self,
        path: &str,
        _tags: &Tags,
        node: &ConfigNode,
        _ty: &TypeDescriptor,
        ctx: &DecoderContext<'_>,
    ) -> ConfigResult<AnyValue> {
        match node {
            ConfigNode::Leaf(Some(value)) => match value.parse::<T>() {
                Ok(parsed) => ConfigResult::ok(Arc::new(parsed) as AnyValue),
                Err(err) => ConfigResult::err(ValidationError::decode(
                    path,
                    format!(
                        "unable to parse '{}' as {}: {err}",
                        ctx.render_value(path, value),
                        type_name::<T>()
                    ),
                )),
            },
            ConfigNode::Leaf(None) => ConfigResult::err(ValidationError::missing(
                path,
                format!("no value for {}", type_name::<T>()),
            )),
            other => ConfigResult::err(ValidationError::decode(
                path,
                format!(
                    "expected a leaf for {}, found {}",
                    type_name::<T>(),
                    other.kind()
                ),
            )),
        }
    }
}

/// Parses durations written as `250ms`, `10s`, `5m`, `2h`, or a bare
/// number of seconds.
pub struct DurationDecoder;

impl Decoder for DurationDecoder {
    fn name(&self) -> &'static str {
        "Duration"
    }

    fn can_decode(
        &self,
        _path: &str,
        _tags: &Tags,
        _node: &ConfigNode,
        ty: &TypeDescriptor,
    ) -> bool {
        ty.kind() == TypeKind::Scalar && ty.id() == TypeId::of::<Duration>()
    }

    fn decode(
        &self,
        path: &str,
        _tags: &Tags,
        node: &ConfigNode,
        _ty: &TypeDescriptor,
        ctx: &DecoderContext<'_>,
    ) -> ConfigResult<AnyValue> {
        match node {
            ConfigNode::Leaf(Some(value)) => match parse_duration(value) {
                Ok(duration) => ConfigResult::ok(Arc::new(duration) as AnyValue),
                Err(reason) => ConfigResult::err(ValidationError::decode(
                    path,
                    format!(
                        "unable to parse '{}' as a duration: {reason}",
                        ctx.render_value(path, value)
                    ),
                )),
            },
            ConfigNode::Leaf(None) => {
                ConfigResult::err(ValidationError::missing(path, "no value for duration"))
            }
            other => ConfigResult::err(ValidationError::decode(
                path,
                format!("expected a leaf for a duration, found {}", other.kind()),
            )),
        }
    }
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let (number, unit) = match value.find(|c: char| c.is_ascii_alphabetic()) {
        Some(split) => value.split_at(split),
        None => (value, "s"),
    };
    let quantity: f64 = number
        .trim()
        .parse()
        .map_err(|_| format!("'{number}' is not a number"))?;
    if quantity < 0.0 {
        return Err("durations cannot be negative".to_string());
    }
    let seconds = match unit {
        "ms" => quantity / 1000.0,
        "s" => quantity,
        "m" => quantity * 60.0,
        "h" => quantity * 3600.0,
        other => return Err(format!("unknown duration unit '{other}'")),
    };
    Ok(Duration::from_secs_f64(seconds))
}

/// One decoder per built-in primitive.
pub fn default_scalar_decoders() -> Vec<Arc<dyn Decoder>> {
    vec![
        Arc::new(ScalarDecoder::<String>::new()),
        Arc::new(ScalarDecoder::<bool>::new()),
        Arc::new(ScalarDecoder::<char>::new()),
        Arc::new(ScalarDecoder::<i8>::new()),
        Arc::new(ScalarDecoder::<i16>::new()),
        Arc::new(ScalarDecoder::<i32>::new()),
        Arc::new(ScalarDecoder::<i64>::new()),
        Arc::new(ScalarDecoder::<i128>::new()),
        Arc::new(ScalarDecoder::<u8>::new()),
        Arc::new(ScalarDecoder::<u16>::new()),
        Arc::new(ScalarDecoder::<u32>::new()),
        Arc::new(ScalarDecoder::<u64>::new()),
        Arc::new(ScalarDecoder::<u128>::new()),
        Arc::new(ScalarDecoder::<usize>::new()),
        Arc::new(ScalarDecoder::<isize>::new()),
        Arc::new(ScalarDecoder::<f32>::new()),
        Arc::new(ScalarDecoder::<f64>::new()),
        Arc::new(DurationDecoder),
    ]
}
