//! The dynamic value tree produced by the generic decoder and consumed by
//! schema encoders.

use crate::ordered_map::OrderedMap;

/// A heterogeneous, dynamically-typed value.
///
/// This is the common currency between [`crate::decoder`] (which builds
/// trees of it from raw buffers) and [`crate::schema`] (which validates,
/// decodes and encodes typed values, internally represented as this same
/// tree). Integer signedness is not carried on the wire; the generic
/// decoder always produces the signed variant for a given width.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Tuple(Vec<Value>),
    Map(OrderedMap<Value>),
    /// A decoded `Date` field, always in UTC.
    Date(chrono::DateTime<chrono::Utc>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b.as_slice()),
            Value::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&OrderedMap<Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Best-effort conversion to `f64`, used by numeric schema combinators
    /// that accept either integer or float payloads.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::I8(v) => Some(*v as f64),
            Value::U8(v) => Some(*v as f64),
            Value::I16(v) => Some(*v as f64),
            Value::U16(v) => Some(*v as f64),
            Value::I32(v) => Some(*v as f64),
            Value::U32(v) => Some(*v as f64),
            Value::I64(v) => Some(*v as f64),
            Value::U64(v) => Some(*v as f64),
            Value::F32(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_int {
    ($t:ty, $variant:ident) => {
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$variant(v)
            }
        }
    };
}

impl_from_int!(i8, I8);
impl_from_int!(u8, U8);
impl_from_int!(i16, I16);
impl_from_int!(u16, U16);
impl_from_int!(i32, I32);
impl_from_int!(u32, U32);
impl_from_int!(i64, I64);
impl_from_int!(u64, U64);
impl_from_int!(f32, F32);
impl_from_int!(f64, F64);
