//! Recursive decode of a buffer into a dynamic [`Value`] tree.
//!
//! This is the untyped counterpart to [`crate::schema`]: it doesn't know
//! or care what shape the data "should" be, it just walks whatever is on
//! the wire.

use crate::error::{CodecError, ErrorCode};
use crate::ordered_map::OrderedMap;
use crate::reader::SequentialReader;
use crate::tag::TypeTag;
use crate::value::Value;

const COMPONENT: &str = "GenericDecoder";

fn decode_primitive(tag: TypeTag, slice: &[u8]) -> Result<Value, CodecError> {
    match tag {
        TypeTag::Integer => match slice.len() {
            0 => Ok(Value::Null),
            1 => Ok(Value::I8(slice[0] as i8)),
            2 => Ok(Value::I16(i16::from_le_bytes([slice[0], slice[1]]))),
            4 => Ok(Value::I32(i32::from_le_bytes(slice.try_into().unwrap()))),
            8 => Ok(Value::I64(i64::from_le_bytes(slice.try_into().unwrap()))),
            n => Err(invalid_width(n)),
        },
        TypeTag::Floating => match slice.len() {
            0 => Ok(Value::Null),
            4 => Ok(Value::F32(f32::from_le_bytes(slice.try_into().unwrap()))),
            8 => Ok(Value::F64(f64::from_le_bytes(slice.try_into().unwrap()))),
            n => Err(invalid_width(n)),
        },
        TypeTag::Bool => match slice.len() {
            0 => Ok(Value::Null),
            1 => Ok(Value::Bool(slice[0] != 0)),
            n => Err(invalid_width(n)),
        },
        TypeTag::String => {
            if slice.is_empty() {
                Ok(Value::Null)
            } else {
                match std::str::from_utf8(slice) {
                    Ok(s) => Ok(Value::String(s.to_owned())),
                    Err(_) => Ok(Value::Bytes(slice.to_vec())),
                }
            }
        }
        TypeTag::End => Ok(Value::Null),
        TypeTag::ExtendedContainer => Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT)),
        TypeTag::Tuple | TypeTag::Map => {
            unreachable!("containers are dispatched before reaching decode_primitive")
        }
    }
}

fn invalid_width(actual: usize) -> CodecError {
    CodecError::new(ErrorCode::InvalidFormat, COMPONENT)
        .with_detail(crate::error::ErrorDetail::Width { expected: 0, actual: actual as u8 })
}

/// Decode a nested `Tuple` field pointed at by `reader`'s cursor into a
/// flat, ordered list of [`Value`]s.
pub fn decode_tuple(reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
    let (tag, _width) = reader.peek_type_width()?;
    if tag != TypeTag::Tuple {
        return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT));
    }
    let mut nested = reader.peek_nested()?;
    let mut items = Vec::with_capacity(nested.remaining());
    while nested.remaining() > 0 {
        items.push(decode_any(&mut nested)?);
    }
    reader.advance()?;
    Ok(Value::Tuple(items))
}

/// Decode a nested `Map` field pointed at by `reader`'s cursor. Always
/// returns an [`OrderedMap`]; `ordered` only controls whether the caller
/// promises to preserve it (kept for interface symmetry with `decode_tuple`).
pub fn decode_map(reader: &mut SequentialReader<'_>, _ordered: bool) -> Result<Value, CodecError> {
    let (tag, _width) = reader.peek_type_width()?;
    if tag != TypeTag::Map {
        return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT));
    }
    let mut nested = reader.peek_nested()?;
    if nested.remaining() % 2 != 0 {
        return Err(CodecError::new(ErrorCode::ConstraintViolated, COMPONENT));
    }
    let mut map = OrderedMap::with_capacity(nested.remaining() / 2);
    while nested.remaining() > 0 {
        let (key_bytes, key_tag) = nested.next()?;
        if key_tag != TypeTag::String {
            return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT));
        }
        let key = std::str::from_utf8(key_bytes)
            .map_err(|_| CodecError::new(ErrorCode::InvalidFormat, COMPONENT))?;
        let value = decode_any(&mut nested)?;
        map.set(key, value);
    }
    reader.advance()?;
    Ok(Value::Map(map))
}

/// Dispatch on the tag under the cursor: containers recurse, primitives
/// decode directly, the cursor is always advanced past the field.
pub fn decode_any(reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
    let (tag, _width) = reader.peek_type_width()?;
    match tag {
        TypeTag::Tuple => decode_tuple(reader),
        TypeTag::Map => decode_map(reader, true),
        _ => {
            let (payload, tag) = reader.next()?;
            decode_primitive(tag, payload)
        }
    }
}

/// Decode an entire buffer's top-level fields into a value tree.
///
/// Returns a single [`Value`] when the buffer holds exactly one top-level
/// field, otherwise a [`Value::Tuple`] of all of them.
pub fn decode(buffer: &[u8]) -> Result<Value, CodecError> {
    let mut reader = SequentialReader::new(buffer)?;
    let mut items = Vec::new();
    while reader.remaining() > 0 {
        items.push(decode_any(&mut reader)?);
    }
    if items.len() == 1 {
        Ok(items.into_iter().next().unwrap())
    } else {
        Ok(Value::Tuple(items))
    }
}

/// Identical to [`decode`]; kept as a distinct entry point for callers
/// who want to make the insertion-order guarantee explicit at the call
/// site, since the generic decoder always preserves map insertion order
/// regardless of which of the two functions is used.
pub fn decode_ordered(buffer: &[u8]) -> Result<Value, CodecError> {
    decode(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Writer;

    #[test]
    fn round_trip_primitives() {
        let mut w = Writer::new();
        w.add_i32(7).unwrap();
        w.add_string("hi").unwrap();
        w.add_bool(false).unwrap();
        let buf = w.finalize().unwrap();

        let decoded = decode(&buf).unwrap();
        assert_eq!(
            decoded,
            Value::Tuple(vec![
                Value::I32(7),
                Value::String("hi".into()),
                Value::Bool(false),
            ])
        );
    }

    #[test]
    fn nested_sorted_map_preserves_insertion_order_on_decode() {
        let mut meta_writer = Writer::new();
        meta_writer.add_string("role").unwrap();
        meta_writer.add_string("admin").unwrap();
        meta_writer.add_string("user").unwrap();
        meta_writer.add_string("alice").unwrap();
        let meta_bytes = meta_writer.finalize().unwrap();

        let mut outer_map = Writer::new();
        outer_map.add_string("meta").unwrap();
        outer_map.add_nested(crate::tag::TypeTag::Map, &meta_bytes).unwrap();
        outer_map.add_string("name").unwrap();
        outer_map.add_string("gopher").unwrap();
        let outer_map_bytes = outer_map.finalize().unwrap();

        let mut top = Writer::new();
        top.add_i16(12345).unwrap();
        top.add_nested(crate::tag::TypeTag::Map, &outer_map_bytes).unwrap();
        let buf = top.finalize().unwrap();

        let decoded = decode_ordered(&buf).unwrap();
        let Value::Tuple(items) = decoded else { panic!("expected tuple") };
        assert_eq!(items[0], Value::I16(12345));
        let Value::Map(map) = &items[1] else { panic!("expected map") };
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, vec!["meta", "name"]);
    }

    #[test]
    fn empty_tuple_decodes_empty() {
        let w = Writer::new();
        let buf = w.finalize().unwrap();
        assert_eq!(decode(&buf).unwrap(), Value::Tuple(vec![]));
    }
}
