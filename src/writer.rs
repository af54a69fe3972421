//! The append-only buffer builder.
//!
//! A [`Writer`] accumulates header entries and payload bytes separately and
//! glues them together on [`Writer::finalize`]. Finalizing rewrites the
//! first header's offset field with the payload base and appends the
//! trailing `End` sentinel, per the wire format described in the crate
//! docs.

use crate::error::{CodecError, ErrorCode};
use crate::ordered_map::OrderedMap;
use crate::tag::{encode_end, encode_header, TypeTag, MAX_OFFSET};
use crate::value::Value;

const COMPONENT: &str = "Writer";

/// How a map's fields should be ordered when written to the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapOrder {
    /// Whatever order the caller's iterator produced.
    Unordered,
    /// Lexicographically sorted by key.
    Sorted,
    /// Insertion order, as recorded by an [`OrderedMap`].
    Inserted,
}

/// Append-only builder for a single buffer.
///
/// Acquire one (directly, or from a [`crate::pool::BufferPool`]), append
/// fields, then call [`Writer::finalize`] exactly once. A `Writer` that is
/// never finalized is simply dropped; there is nothing to clean up.
#[derive(Debug, Default)]
pub struct Writer {
    payload: Vec<u8>,
    headers: Vec<u8>,
    position: u16,
}

impl Writer {
    /// Start a new, empty writer.
    pub fn new() -> Self {
        Writer {
            payload: Vec::new(),
            headers: Vec::new(),
            position: 0,
        }
    }

    /// Start a new writer with preallocated capacity for payload bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Writer {
            payload: Vec::with_capacity(capacity),
            headers: Vec::new(),
            position: 0,
        }
    }

    /// Number of fields appended so far (not counting the sentinel).
    pub fn field_count(&self) -> usize {
        self.headers.len() / 2
    }

    fn push_header(&mut self, tag: TypeTag) {
        let raw = encode_header(self.position, tag);
        self.headers.extend_from_slice(&raw.to_le_bytes());
    }

    fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let new_position = self.position as usize + bytes.len();
        if new_position > MAX_OFFSET as usize {
            log::warn!("{COMPONENT}: payload offset {new_position} exceeds 13-bit header capacity");
            return Err(CodecError::new(ErrorCode::PayloadTooLarge, COMPONENT)
                .with_position(new_position));
        }
        self.payload.extend_from_slice(bytes);
        self.position = new_position as u16;
        Ok(())
    }

    fn add_scalar(&mut self, tag: TypeTag, bytes: &[u8]) -> Result<(), CodecError> {
        self.push_header(tag);
        self.push_bytes(bytes)
    }

    /// Append a null header-only field (zero-width slot) with the given tag.
    /// Used for nullable primitives written as `None` and for [`Value::Null`].
    pub fn add_null_tagged(&mut self, tag: TypeTag) {
        self.push_header(tag);
    }

    /// Append an explicit `Null` value (decoded back as a zero-width string
    /// slot, matching the generic decoder's null tag).
    pub fn add_null(&mut self) {
        self.add_null_tagged(TypeTag::String);
    }

    pub fn add_bool(&mut self, value: bool) -> Result<(), CodecError> {
        self.add_scalar(TypeTag::Bool, &[value as u8])
    }

    pub fn add_nullable_bool(&mut self, value: Option<bool>) -> Result<(), CodecError> {
        match value {
            Some(v) => self.add_bool(v),
            None => {
                self.add_null_tagged(TypeTag::Bool);
                Ok(())
            }
        }
    }

    pub fn add_i8(&mut self, value: i8) -> Result<(), CodecError> {
        self.add_scalar(TypeTag::Integer, &value.to_le_bytes())
    }
    pub fn add_u8(&mut self, value: u8) -> Result<(), CodecError> {
        self.add_scalar(TypeTag::Integer, &value.to_le_bytes())
    }
    pub fn add_i16(&mut self, value: i16) -> Result<(), CodecError> {
        self.add_scalar(TypeTag::Integer, &value.to_le_bytes())
    }
    pub fn add_u16(&mut self, value: u16) -> Result<(), CodecError> {
        self.add_scalar(TypeTag::Integer, &value.to_le_bytes())
    }
    pub fn add_i32(&mut self, value: i32) -> Result<(), CodecError> {
        self.add_scalar(TypeTag::Integer, &value.to_le_bytes())
    }
    pub fn add_u32(&mut self, value: u32) -> Result<(), CodecError> {
        self.add_scalar(TypeTag::Integer, &value.to_le_bytes())
    }
    pub fn add_i64(&mut self, value: i64) -> Result<(), CodecError> {
        self.add_scalar(TypeTag::Integer, &value.to_le_bytes())
    }
    pub fn add_u64(&mut self, value: u64) -> Result<(), CodecError> {
        self.add_scalar(TypeTag::Integer, &value.to_le_bytes())
    }
    pub fn add_f32(&mut self, value: f32) -> Result<(), CodecError> {
        self.add_scalar(TypeTag::Floating, &value.to_le_bytes())
    }
    pub fn add_f64(&mut self, value: f64) -> Result<(), CodecError> {
        self.add_scalar(TypeTag::Floating, &value.to_le_bytes())
    }

    /// Append a nullable primitive of any scalar type.
    pub fn add_nullable<T, F>(&mut self, value: Option<T>, tag: TypeTag, write: F) -> Result<(), CodecError>
    where
        F: FnOnce(&mut Writer, T) -> Result<(), CodecError>,
    {
        match value {
            Some(v) => write(self, v),
            None => {
                self.add_null_tagged(tag);
                Ok(())
            }
        }
    }

    pub fn add_string(&mut self, value: &str) -> Result<(), CodecError> {
        self.add_scalar(TypeTag::String, value.as_bytes())
    }

    pub fn add_bytes(&mut self, value: &[u8]) -> Result<(), CodecError> {
        self.add_scalar(TypeTag::String, value)
    }

    /// Append a value whose numeric payload is chosen to be the narrowest
    /// integer width that represents it exactly, falling back to `f64`.
    pub fn add_numeric(&mut self, value: f64) -> Result<(), CodecError> {
        if value.fract() == 0.0 && value.is_finite() {
            if value >= i8::MIN as f64 && value <= i8::MAX as f64 {
                return self.add_i8(value as i8);
            }
            if value >= i16::MIN as f64 && value <= i16::MAX as f64 {
                return self.add_i16(value as i16);
            }
            if value >= i32::MIN as f64 && value <= i32::MAX as f64 {
                return self.add_i32(value as i32);
            }
            if value >= -(2f64.powi(63)) && value < 2f64.powi(63) {
                return self.add_i64(value as i64);
            }
        }
        self.add_f64(value)
    }

    /// Merge a finalized child buffer (produced by [`Writer::finalize`]) in
    /// as a nested `Map` or `Tuple` field. No absolute offsets leak across
    /// the container boundary: the child's own header table is copied
    /// verbatim, since it already encodes offsets relative to its own
    /// payload base.
    pub fn add_nested(&mut self, tag: TypeTag, child: &[u8]) -> Result<(), CodecError> {
        self.add_scalar(tag, child)
    }

    /// Open a child writer for building a nested `Tuple`. Finalize the
    /// child and pass its bytes to [`Writer::add_nested`] to splice it in.
    pub fn begin_tuple() -> Writer {
        Writer::new()
    }

    /// Open a child writer for building a nested `Map`.
    pub fn begin_map() -> Writer {
        Writer::new()
    }

    /// Append a `Tuple` field built from a slice of generic [`Value`]s.
    pub fn add_tuple(&mut self, items: &[Value]) -> Result<(), CodecError> {
        let mut child = Writer::begin_tuple();
        for item in items {
            child.add_value(item)?;
        }
        let bytes = child.finalize()?;
        self.add_nested(TypeTag::Tuple, &bytes)
    }

    /// Append a `Map` field from an iterator of `(key, value)` pairs, using
    /// the given ordering policy.
    pub fn add_map<'a, I>(&mut self, pairs: I, order: MapOrder) -> Result<(), CodecError>
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        let mut entries: Vec<(&str, &Value)> = pairs.into_iter().collect();
        if order == MapOrder::Sorted {
            entries.sort_by(|a, b| a.0.cmp(b.0));
        }
        let mut child = Writer::begin_map();
        for (key, value) in entries {
            child.add_string(key)?;
            child.add_value(value)?;
        }
        let bytes = child.finalize()?;
        self.add_nested(TypeTag::Map, &bytes)
    }

    /// Append a `Map` field from an [`OrderedMap`], preserving insertion
    /// order.
    pub fn add_ordered_map(&mut self, map: &OrderedMap<Value>) -> Result<(), CodecError> {
        let mut child = Writer::begin_map();
        for (key, value) in map.iter() {
            child.add_string(key)?;
            child.add_value(value)?;
        }
        let bytes = child.finalize()?;
        self.add_nested(TypeTag::Map, &bytes)
    }

    /// Append a generic [`Value`], dispatching to the matching typed
    /// append operation. Maps nested this way use insertion order.
    pub fn add_value(&mut self, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null => {
                self.add_null();
                Ok(())
            }
            Value::Bool(b) => self.add_bool(*b),
            Value::I8(v) => self.add_i8(*v),
            Value::U8(v) => self.add_u8(*v),
            Value::I16(v) => self.add_i16(*v),
            Value::U16(v) => self.add_u16(*v),
            Value::I32(v) => self.add_i32(*v),
            Value::U32(v) => self.add_u32(*v),
            Value::I64(v) => self.add_i64(*v),
            Value::U64(v) => self.add_u64(*v),
            Value::F32(v) => self.add_f32(*v),
            Value::F64(v) => self.add_f64(*v),
            Value::String(s) => self.add_string(s),
            Value::Bytes(b) => self.add_bytes(b),
            Value::Tuple(items) => self.add_tuple(items),
            Value::Map(map) => self.add_ordered_map(map),
            Value::Date(d) => self.add_i64(d.timestamp()),
        }
    }

    /// Finalize the buffer: append the sentinel, rewrite the first header's
    /// offset to the payload base, and concatenate headers with payload.
    ///
    /// Fails with `PayloadTooLarge` if the header table itself (including
    /// the sentinel) would push the payload base past the 13-bit limit.
    pub fn finalize(mut self) -> Result<Vec<u8>, CodecError> {
        let raw_end = encode_end(self.position);
        self.headers.extend_from_slice(&raw_end.to_le_bytes());

        let payload_base = self.headers.len();
        if payload_base > MAX_OFFSET as usize {
            log::warn!("{COMPONENT}: header table of {payload_base} bytes exceeds 13-bit header capacity");
            return Err(CodecError::new(ErrorCode::PayloadTooLarge, COMPONENT)
                .with_position(payload_base));
        }

        if self.headers.len() >= 2 {
            let (_, first_tag) = crate::tag::decode_header(u16::from_le_bytes([
                self.headers[0],
                self.headers[1],
            ]));
            let raw = encode_header(payload_base as u16, first_tag);
            self.headers[0..2].copy_from_slice(&raw.to_le_bytes());
        }

        let mut out = Vec::with_capacity(self.headers.len() + self.payload.len());
        out.extend_from_slice(&self.headers);
        out.extend_from_slice(&self.payload);
        log::trace!("{COMPONENT}: finalized {} bytes, {} fields", out.len(), payload_base / 2 - 1);
        Ok(out)
    }

    /// Like [`Writer::finalize`] but appends into a caller-supplied buffer
    /// instead of allocating a fresh one.
    pub fn finalize_into(self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let bytes = self.finalize()?;
        out.extend_from_slice(&bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tuple_is_header_plus_sentinel() {
        let w = Writer::new();
        let buf = w.finalize().unwrap();
        assert_eq!(buf.len(), 2);
        let (offset, tag) = crate::tag::decode_header(u16::from_le_bytes([buf[0], buf[1]]));
        assert_eq!(offset, 2);
        assert_eq!(tag, TypeTag::End);
    }

    #[test]
    fn primitive_sequence_matches_expected_bytes() {
        let mut w = Writer::new();
        w.add_i16(42).unwrap();
        w.add_bool(true).unwrap();
        w.add_string("go").unwrap();
        w.add_bytes(&[0xAA, 0xBB]).unwrap();
        let buf = w.finalize().unwrap();
        let expected: Vec<u8> = vec![
            0x51, 0x00, 0x15, 0x00, 0x1E, 0x00, 0x2E, 0x00, 0x38, 0x00, 0x2A, 0x00, 0x01, 0x67,
            0x6F, 0xAA, 0xBB,
        ];
        assert_eq!(buf, expected);
    }

    #[test]
    fn payload_exactly_at_limit_encodes() {
        let mut w = Writer::new();
        w.add_bytes(&vec![0u8; (MAX_OFFSET as usize) - 4]).unwrap();
        assert!(w.finalize().is_ok());
    }

    #[test]
    fn payload_over_limit_fails() {
        let mut w = Writer::new();
        let err = w.add_bytes(&vec![0u8; MAX_OFFSET as usize + 1]).unwrap_err();
        assert_eq!(err.code, ErrorCode::PayloadTooLarge);
    }
}
