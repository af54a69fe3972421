//! Cursor-based sequential access over a header table.
//!
//! Unlike [`super::PositionalReader`], a `SequentialReader` only knows
//! about "the field under the cursor" and "the field after it" at any
//! point. That's exactly the shape the schema walker and generic decoder
//! need: peek the tag and width before deciding how to consume it, then
//! advance.

use crate::error::{CodecError, ErrorCode};
use crate::tag::{decode_header, TypeTag};

const COMPONENT: &str = "SequentialReader";

/// Cursor over a buffer's header table, advancing one field at a time.
#[derive(Debug, Clone, Copy)]
pub struct SequentialReader<'a> {
    buffer: &'a [u8],
    base: usize,
    header_count: usize,
    cursor: usize,
}

impl<'a> SequentialReader<'a> {
    /// Wrap `buffer`, positioning the cursor at field 0.
    pub fn new(buffer: &'a [u8]) -> Result<Self, CodecError> {
        if buffer.len() < 2 {
            return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT));
        }
        let (offset, _tag) = decode_header(u16::from_le_bytes([buffer[0], buffer[1]]));
        let base = offset as usize;
        if base % 2 != 0 || base > buffer.len() {
            return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT).with_position(base));
        }
        Ok(SequentialReader {
            buffer,
            base,
            header_count: base / 2,
            cursor: 0,
        })
    }

    fn header_at(&self, index: usize) -> Result<(u16, TypeTag), CodecError> {
        let byte_offset = index * 2;
        let bytes = self.buffer.get(byte_offset..byte_offset + 2).ok_or_else(|| {
            CodecError::new(ErrorCode::InvalidFormat, COMPONENT).with_position(byte_offset)
        })?;
        Ok(decode_header(u16::from_le_bytes([bytes[0], bytes[1]])))
    }

    /// Remaining field count, not counting whatever the cursor has already
    /// passed.
    pub fn remaining(&self) -> usize {
        (self.header_count - 1).saturating_sub(self.cursor)
    }

    fn current_range(&self) -> Result<(TypeTag, usize, usize), CodecError> {
        if self.cursor + 1 >= self.header_count {
            return Err(CodecError::new(ErrorCode::UnexpectedEof, COMPONENT).with_position(self.cursor));
        }
        let (offset_cur, tag) = self.header_at(self.cursor)?;
        let (offset_next, _) = self.header_at(self.cursor + 1)?;
        let start = if self.cursor > 0 {
            offset_cur as usize + self.base
        } else {
            self.base
        };
        let end = offset_next as usize + self.base;
        if end > self.buffer.len() || end < start {
            return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT).with_position(end));
        }
        Ok((tag, start, end))
    }

    /// Peek the tag and byte width of the field under the cursor without
    /// consuming it. Width may be 0 (a null primitive slot).
    pub fn peek_type_width(&self) -> Result<(TypeTag, usize), CodecError> {
        let (tag, start, end) = self.current_range()?;
        Ok((tag, end - start))
    }

    /// Raw payload slice under the cursor, without advancing.
    pub fn get_payload(&self) -> Result<&'a [u8], CodecError> {
        let (_, start, end) = self.current_range()?;
        Ok(&self.buffer[start..end])
    }

    /// Advance the cursor to the next field.
    pub fn advance(&mut self) -> Result<(), CodecError> {
        if self.cursor + 1 >= self.header_count {
            return Err(CodecError::new(ErrorCode::UnexpectedEof, COMPONENT).with_position(self.cursor));
        }
        self.cursor += 1;
        Ok(())
    }

    /// Return the current field's payload and tag, then advance.
    pub fn next(&mut self) -> Result<(&'a [u8], TypeTag), CodecError> {
        let (tag, start, end) = self.current_range()?;
        self.advance()?;
        Ok((&self.buffer[start..end], tag))
    }

    /// Scope a reader over the current field's payload, valid only for
    /// `Map`/`Tuple` tags with positive width. Does not advance; callers
    /// typically call [`SequentialReader::advance`] or
    /// [`SequentialReader::next`] afterward to skip past the container.
    pub fn peek_nested(&self) -> Result<SequentialReader<'a>, CodecError> {
        let (tag, start, end) = self.current_range()?;
        match tag {
            TypeTag::Map | TypeTag::Tuple => {}
            _ => return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT).with_position(self.cursor)),
        }
        if end <= start {
            return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT).with_position(self.cursor));
        }
        SequentialReader::new(&self.buffer[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Writer;

    #[test]
    fn walks_fields_in_order() {
        let mut w = Writer::new();
        w.add_i16(1).unwrap();
        w.add_i16(2).unwrap();
        w.add_i16(3).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();

        let mut seen = Vec::new();
        while r.remaining() > 0 {
            let (payload, tag) = r.next().unwrap();
            assert_eq!(tag, TypeTag::Integer);
            seen.push(i16::from_le_bytes([payload[0], payload[1]]));
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn advance_past_sentinel_fails() {
        let w = Writer::new();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert_eq!(r.remaining(), 0);
        assert!(r.advance().is_err());
    }

    #[test]
    fn peek_nested_scopes_into_container() {
        let mut inner = Writer::new();
        inner.add_string("hi").unwrap();
        let inner_bytes = inner.finalize().unwrap();

        let mut outer = Writer::new();
        outer.add_nested(crate::tag::TypeTag::Tuple, &inner_bytes).unwrap();
        let buf = outer.finalize().unwrap();

        let r = SequentialReader::new(&buf).unwrap();
        let mut nested = r.peek_nested().unwrap();
        let (payload, tag) = nested.next().unwrap();
        assert_eq!(tag, TypeTag::String);
        assert_eq!(payload, b"hi");
    }
}
