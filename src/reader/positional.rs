//! `O(1)` random-access reads over a header table.

use crate::error::{CodecError, ErrorCode, ErrorDetail};
use crate::ordered_map::OrderedMap;
use crate::tag::{decode_header, TypeTag};
use crate::value::Value;

const COMPONENT: &str = "PositionalReader";

/// Borrowed, random-access view over a finalized buffer.
///
/// Decodes header 0 once at construction to learn the payload base and
/// field count; every subsequent access is a direct slice into the
/// buffer, no linear scan.
#[derive(Debug, Clone, Copy)]
pub struct PositionalReader<'a> {
    buffer: &'a [u8],
    payload_base: usize,
    header_count: usize,
}

fn read_header(buffer: &[u8], index: usize, component: &'static str) -> Result<(u16, TypeTag), CodecError> {
    let byte_offset = index * 2;
    let bytes = buffer.get(byte_offset..byte_offset + 2).ok_or_else(|| {
        CodecError::new(ErrorCode::InvalidFormat, component).with_position(byte_offset)
    })?;
    Ok(decode_header(u16::from_le_bytes([bytes[0], bytes[1]])))
}

impl<'a> PositionalReader<'a> {
    /// Wrap `buffer` for random access, decoding header 0 to learn the
    /// payload base and field count.
    pub fn new(buffer: &'a [u8]) -> Result<Self, CodecError> {
        let (offset, _tag) = read_header(buffer, 0, COMPONENT)?;
        let payload_base = offset as usize;
        if payload_base % 2 != 0 || payload_base > buffer.len() {
            return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT).with_position(payload_base));
        }
        Ok(PositionalReader {
            buffer,
            payload_base,
            header_count: payload_base / 2,
        })
    }

    /// Number of meaningful fields (excludes the sentinel).
    pub fn arg_count(&self) -> usize {
        self.header_count.saturating_sub(1)
    }

    pub fn payload_base(&self) -> usize {
        self.payload_base
    }

    pub fn raw_buffer(&self) -> &'a [u8] {
        self.buffer
    }

    /// Resolve field `pos` to its tag and absolute byte range.
    pub fn range_at(&self, pos: usize) -> Result<(TypeTag, usize, usize), CodecError> {
        if pos + 1 >= self.header_count {
            return Err(CodecError::new(ErrorCode::UnexpectedEof, COMPONENT).with_position(pos));
        }
        let (offset_pos, tag) = read_header(self.buffer, pos, COMPONENT)?;
        let (offset_next, _) = read_header(self.buffer, pos + 1, COMPONENT)?;

        let start = if pos > 0 {
            offset_pos as usize + self.payload_base
        } else {
            self.payload_base
        };
        let end = offset_next as usize + self.payload_base;

        if end > self.buffer.len() || end < start {
            return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT).with_position(end));
        }
        Ok((tag, start, end))
    }

    fn slice_at(&self, pos: usize, expected: TypeTag) -> Result<&'a [u8], CodecError> {
        let (tag, start, end) = self.range_at(pos)?;
        if tag != expected {
            return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT)
                .with_position(pos)
                .with_detail(ErrorDetail::Width { expected: expected.bits() as u8, actual: tag.bits() as u8 }));
        }
        Ok(&self.buffer[start..end])
    }

    fn int_slice(&self, pos: usize, width: u8) -> Result<&'a [u8], CodecError> {
        let slice = self.slice_at(pos, TypeTag::Integer)?;
        if slice.len() != width as usize {
            return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT)
                .with_position(pos)
                .with_detail(ErrorDetail::Width { expected: width, actual: slice.len() as u8 }));
        }
        Ok(slice)
    }

    fn nullable_int_slice(&self, pos: usize, width: u8) -> Result<Option<&'a [u8]>, CodecError> {
        let slice = self.slice_at(pos, TypeTag::Integer)?;
        if slice.is_empty() {
            return Ok(None);
        }
        if slice.len() != width as usize {
            return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT)
                .with_position(pos)
                .with_detail(ErrorDetail::Width { expected: width, actual: slice.len() as u8 }));
        }
        Ok(Some(slice))
    }

    pub fn get_bool(&self, pos: usize) -> Result<bool, CodecError> {
        let slice = self.slice_at(pos, TypeTag::Bool)?;
        if slice.len() != 1 {
            return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT)
                .with_position(pos)
                .with_detail(ErrorDetail::Width { expected: 1, actual: slice.len() as u8 }));
        }
        Ok(slice[0] != 0)
    }

    pub fn get_nullable_bool(&self, pos: usize) -> Result<Option<bool>, CodecError> {
        let slice = self.slice_at(pos, TypeTag::Bool)?;
        match slice.len() {
            0 => Ok(None),
            1 => Ok(Some(slice[0] != 0)),
            n => Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT)
                .with_position(pos)
                .with_detail(ErrorDetail::Width { expected: 1, actual: n as u8 })),
        }
    }

    pub fn get_i8(&self, pos: usize) -> Result<i8, CodecError> {
        Ok(self.int_slice(pos, 1)?[0] as i8)
    }
    pub fn get_u8(&self, pos: usize) -> Result<u8, CodecError> {
        Ok(self.int_slice(pos, 1)?[0])
    }
    pub fn get_i16(&self, pos: usize) -> Result<i16, CodecError> {
        let s = self.int_slice(pos, 2)?;
        Ok(i16::from_le_bytes([s[0], s[1]]))
    }
    pub fn get_u16(&self, pos: usize) -> Result<u16, CodecError> {
        let s = self.int_slice(pos, 2)?;
        Ok(u16::from_le_bytes([s[0], s[1]]))
    }
    pub fn get_i32(&self, pos: usize) -> Result<i32, CodecError> {
        let s = self.int_slice(pos, 4)?;
        Ok(i32::from_le_bytes(s.try_into().unwrap()))
    }
    pub fn get_u32(&self, pos: usize) -> Result<u32, CodecError> {
        let s = self.int_slice(pos, 4)?;
        Ok(u32::from_le_bytes(s.try_into().unwrap()))
    }
    pub fn get_i64(&self, pos: usize) -> Result<i64, CodecError> {
        let s = self.int_slice(pos, 8)?;
        Ok(i64::from_le_bytes(s.try_into().unwrap()))
    }
    pub fn get_u64(&self, pos: usize) -> Result<u64, CodecError> {
        let s = self.int_slice(pos, 8)?;
        Ok(u64::from_le_bytes(s.try_into().unwrap()))
    }

    pub fn get_nullable_i16(&self, pos: usize) -> Result<Option<i16>, CodecError> {
        Ok(self.nullable_int_slice(pos, 2)?.map(|s| i16::from_le_bytes([s[0], s[1]])))
    }
    pub fn get_nullable_i32(&self, pos: usize) -> Result<Option<i32>, CodecError> {
        Ok(self
            .nullable_int_slice(pos, 4)?
            .map(|s| i32::from_le_bytes(s.try_into().unwrap())))
    }
    pub fn get_nullable_i64(&self, pos: usize) -> Result<Option<i64>, CodecError> {
        Ok(self
            .nullable_int_slice(pos, 8)?
            .map(|s| i64::from_le_bytes(s.try_into().unwrap())))
    }

    pub fn get_f32(&self, pos: usize) -> Result<f32, CodecError> {
        let slice = self.slice_at(pos, TypeTag::Floating)?;
        if slice.len() != 4 {
            return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT)
                .with_position(pos)
                .with_detail(ErrorDetail::Width { expected: 4, actual: slice.len() as u8 }));
        }
        Ok(f32::from_le_bytes(slice.try_into().unwrap()))
    }

    pub fn get_f64(&self, pos: usize) -> Result<f64, CodecError> {
        let slice = self.slice_at(pos, TypeTag::Floating)?;
        if slice.len() != 8 {
            return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT)
                .with_position(pos)
                .with_detail(ErrorDetail::Width { expected: 8, actual: slice.len() as u8 }));
        }
        Ok(f64::from_le_bytes(slice.try_into().unwrap()))
    }

    pub fn get_nullable_f64(&self, pos: usize) -> Result<Option<f64>, CodecError> {
        let slice = self.slice_at(pos, TypeTag::Floating)?;
        match slice.len() {
            0 => Ok(None),
            8 => Ok(Some(f64::from_le_bytes(slice.try_into().unwrap()))),
            n => Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT)
                .with_position(pos)
                .with_detail(ErrorDetail::Width { expected: 8, actual: n as u8 })),
        }
    }

    pub fn get_string(&self, pos: usize) -> Result<&'a str, CodecError> {
        let slice = self.slice_at(pos, TypeTag::String)?;
        if slice.is_empty() {
            return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT).with_position(pos));
        }
        std::str::from_utf8(slice)
            .map_err(|_| CodecError::new(ErrorCode::InvalidFormat, COMPONENT).with_position(pos))
    }

    pub fn get_nullable_string(&self, pos: usize) -> Result<Option<&'a str>, CodecError> {
        let slice = self.slice_at(pos, TypeTag::String)?;
        if slice.is_empty() {
            return Ok(None);
        }
        Ok(Some(std::str::from_utf8(slice).map_err(|_| {
            CodecError::new(ErrorCode::InvalidFormat, COMPONENT).with_position(pos)
        })?))
    }

    pub fn get_bytes(&self, pos: usize) -> Result<&'a [u8], CodecError> {
        let slice = self.slice_at(pos, TypeTag::String)?;
        if slice.is_empty() {
            return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT).with_position(pos));
        }
        Ok(slice)
    }

    /// Scope field `pos` (which must be `Map` or `Tuple`) as a nested
    /// reader of the same format.
    pub fn get_nested(&self, pos: usize, expected: TypeTag) -> Result<PositionalReader<'a>, CodecError> {
        let (tag, start, end) = self.range_at(pos)?;
        if tag != expected {
            return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT).with_position(pos));
        }
        PositionalReader::new(&self.buffer[start..end])
    }

    /// Decode field `pos` (a `Map`) into an insertion-ordered `Value` map.
    pub fn get_map_ordered(&self, pos: usize) -> Result<OrderedMap<Value>, CodecError> {
        let mut nested = self.get_nested(pos, TypeTag::Map)?.sequential()?;
        crate::decoder::decode_map(&mut nested, true).map(|v| match v {
            Value::Map(m) => m,
            _ => unreachable!("decode_map always returns Value::Map"),
        })
    }

    /// Decode field `pos` (a `Map`) into a plain `String`-keyed map,
    /// discarding insertion order for faster iteration.
    pub fn get_map_string(&self, pos: usize) -> Result<std::collections::HashMap<String, Value>, CodecError> {
        let ordered = self.get_map_ordered(pos)?;
        Ok(ordered
            .iter()
            .map(|(k, v)| (k.to_owned(), v.clone()))
            .collect())
    }

    /// Build a [`SequentialReader`](super::SequentialReader) over this
    /// reader's full field range, starting at field 0.
    pub fn sequential(&self) -> Result<super::SequentialReader<'a>, CodecError> {
        super::SequentialReader::new(self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Writer;

    #[test]
    fn duality_with_writer() {
        let mut w = Writer::new();
        w.add_i16(42).unwrap();
        w.add_bool(true).unwrap();
        w.add_string("go").unwrap();
        w.add_bytes(&[0xAA, 0xBB]).unwrap();
        let buf = w.finalize().unwrap();

        let r = PositionalReader::new(&buf).unwrap();
        assert_eq!(r.arg_count(), 4);
        assert_eq!(r.get_i16(0).unwrap(), 42);
        assert_eq!(r.get_bool(1).unwrap(), true);
        assert_eq!(r.get_string(2).unwrap(), "go");
        assert_eq!(r.get_bytes(3).unwrap(), &[0xAA, 0xBB]);
    }

    #[test]
    fn empty_map_decodes_empty() {
        let w = Writer::new();
        let buf = w.finalize().unwrap();
        let r = PositionalReader::new(&buf).unwrap();
        assert_eq!(r.arg_count(), 0);
    }

    #[test]
    fn nullable_zero_width_is_none() {
        let mut w = Writer::new();
        w.add_nullable_bool(None).unwrap();
        w.add_nullable(Some(7i16), TypeTag::Integer, |w, v| w.add_i16(v)).unwrap();
        let buf = w.finalize().unwrap();
        let r = PositionalReader::new(&buf).unwrap();
        assert_eq!(r.get_nullable_bool(0).unwrap(), None);
        assert_eq!(r.get_nullable_i16(1).unwrap(), Some(7));
    }

    #[test]
    fn zero_width_string_and_bytes_error_on_non_nullable_getters() {
        let mut w = Writer::new();
        w.add_null();
        let buf = w.finalize().unwrap();
        let r = PositionalReader::new(&buf).unwrap();
        assert_eq!(r.get_string(0).unwrap_err().code, ErrorCode::InvalidFormat);
        assert_eq!(r.get_bytes(0).unwrap_err().code, ErrorCode::InvalidFormat);
        assert_eq!(r.get_nullable_string(0).unwrap(), None);
    }
}
