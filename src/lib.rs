//! A compact binary codec built on a 2-byte header table, plus a
//! composable schema layer for validating, decoding and encoding typed
//! records against it.
//!
//! A buffer is a flat array of 2-byte little-endian headers (one per
//! field, terminated by an `End` sentinel) followed by a payload. Each
//! header packs a [`TypeTag`] into its lower 3 bits and an offset into
//! its upper 13 bits; header 0's offset is the payload base, every
//! later header's offset is where that field's payload ends. Nested
//! `Tuple`/`Map` fields are themselves valid buffers in the same format,
//! sliced out of the parent's payload.
//!
//! Three ways to read or write that format, each suited to a different
//! caller:
//!
//! - [`Writer`] appends fields and [`Writer::finalize`]s them into an
//!   owned buffer.
//! - [`PositionalReader`] gives `O(1)` random access once header 0 is
//!   decoded — reach into field `i` without walking the ones before it.
//! - [`SequentialReader`] walks fields with a cursor, peeking a tag
//!   before deciding how to consume it; this is what [`decoder::decode`]
//!   and the [`schema`] engine are built on.
//!
//! [`decoder::decode`] turns a buffer into a dynamic [`Value`] tree with
//! no prior knowledge of its shape. [`schema::Schema`] goes the other
//! way: a declarative tree of typed constraints (built by hand or via
//! [`schema::SchemaBuilder`] from JSON) that validates, decodes to a
//! typed [`Value`], and encodes a [`Value`] back to the wire.

mod decoder;
mod error;
mod ordered_map;
mod pool;
mod reader;
mod schema;
mod tag;
mod utils;
mod value;
mod writer;

pub use decoder::{decode, decode_any, decode_map, decode_ordered, decode_tuple};
pub use error::{CodecError, ErrorCode, ErrorDetail, Result};
pub use ordered_map::OrderedMap;
pub use pool::BufferPool;
pub use reader::{PositionalReader, SequentialReader};
pub use tag::TypeTag;
pub use utils::{has_prefix, has_suffix, sort_keys};
pub use value::Value;
pub use writer::{MapOrder, Writer};

pub use schema::{
    check_func, schema, Bool, BuilderFn, Bytes, Chain, Color, Date, Email, Enum, Float32, Float64,
    Int16, Int32, Int64, Int8, Lang, Map, MapRepeat, MapUnordered, MultiCheck, NamedChain, Number,
    Range, Repeat, Schema, SchemaBuilder, StringCheck, StringSchema, Tuple, TupleChild, TupleNamed,
    Uri,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_scalar_round_trip() {
        let mut w = Writer::new();
        w.add_i16(12345).unwrap();
        w.add_string("gopher").unwrap();
        let buf = w.finalize().unwrap();

        let decoded = decode(&buf).unwrap();
        assert_eq!(
            decoded,
            Value::Tuple(vec![Value::I16(12345), Value::String("gopher".into())])
        );
    }

    #[test]
    fn schema_round_trip_through_the_public_api() {
        let t = Tuple::new(
            vec![
                TupleChild::Plain(schema(Int32::new(false))),
                TupleChild::Plain(schema(Bool::new(false))),
            ],
            false,
            false,
            false,
        )
        .unwrap();

        let value = Value::Tuple(vec![Value::I32(7), Value::Bool(true)]);
        let mut w = Writer::new();
        t.encode(&mut w, &value).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert_eq!(t.decode(&mut r).unwrap(), value);
    }
}
