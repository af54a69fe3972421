//! The schema engine: a composable tree of validators/encoders/decoders
//! that interprets typed value trees against declarative constraints.
//!
//! Every schema node — primitive or composite — implements the four-method
//! [`Schema`] trait. `validate` walks a reader without materializing a
//! value; `decode` additionally builds one; `encode` is the inverse,
//! consuming a [`Value`] and appending fields to a [`Writer`]. Composite
//! nodes hold their children as `Box<dyn Schema>`, so the tree is built
//! once (typically by [`builder::SchemaBuilder`]) and reused across many
//! encode/decode calls.

mod builder;
mod chain;
mod map;
mod multicheck;
mod number;
mod primitive;
mod repeat;
mod special_string;
mod tuple;

pub use builder::{BuilderFn, SchemaBuilder};
pub use chain::{Chain, NamedChain};
pub use map::{Map, MapRepeat, MapUnordered};
pub use multicheck::MultiCheck;
pub use number::Number;
pub use primitive::{
    check_func, Bool, Bytes, Float32, Float64, Int16, Int32, Int64, Int8, Range, StringCheck,
    StringSchema,
};
pub use repeat::Repeat;
pub use special_string::{Color, Date, Email, Enum, Lang, Uri};
pub use tuple::{Tuple, TupleChild, TupleNamed};

use crate::error::CodecError;
use crate::reader::SequentialReader;
use crate::value::Value;
use crate::writer::Writer;
use std::fmt::Debug;

/// A single node in a schema tree.
///
/// Implementations must agree with each other on the *validate/decode
/// consistency* property: if `validate` succeeds on a reader, `decode`
/// must also succeed on an equivalent reader over the same bytes, and
/// vice versa.
pub trait Schema: Debug {
    /// Walk `reader`, checking structure and constraints, without
    /// building a value. Always leaves the reader's cursor advanced past
    /// whatever this schema consumed, on success or failure.
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError>;

    /// Walk `reader` and materialize a typed [`Value`].
    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError>;

    /// Consume `value` and append the corresponding fields to `writer`.
    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError>;

    /// Whether this schema accepts a null/absent value at its position.
    fn is_nullable(&self) -> bool;
}

impl Schema for Box<dyn Schema> {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        (**self).validate(reader)
    }
    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        (**self).decode(reader)
    }
    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        (**self).encode(writer, value)
    }
    fn is_nullable(&self) -> bool {
        (**self).is_nullable()
    }
}

/// Boxing helper so call sites read `schema(Int16::new(false))` instead of
/// repeating `Box::new(...) as Box<dyn Schema>`.
pub fn schema<S: Schema + 'static>(s: S) -> Box<dyn Schema> {
    Box::new(s)
}
