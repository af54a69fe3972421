//! `MultiCheck`: a fixed set of named boolean flags packed into a bitmap.

use super::Schema;
use crate::error::{CodecError, ErrorCode, ErrorDetail};
use crate::reader::SequentialReader;
use crate::tag::TypeTag;
use crate::value::Value;
use crate::writer::Writer;

const COMPONENT: &str = "MultiCheck";

/// Named-bitmap schema: each of `names` is a selectable flag, encoded as
/// one bit in a `ceil(len(names)/8)`-byte array.
#[derive(Debug, Clone)]
pub struct MultiCheck {
    pub names: Vec<String>,
}

impl MultiCheck {
    pub fn new(names: Vec<String>) -> Self {
        MultiCheck { names }
    }

    fn byte_width(&self) -> usize {
        self.names.len().div_ceil(8)
    }

    fn selected_from_bitmap(&self, bitmap: &[u8]) -> Vec<String> {
        let mut selected = Vec::new();
        for (i, name) in self.names.iter().enumerate() {
            let byte = bitmap[i / 8];
            if byte & (1 << (i % 8)) != 0 {
                selected.push(name.clone());
            }
        }
        selected
    }

    fn bitmap_from_selected(&self, selected: &[String]) -> Result<Vec<u8>, CodecError> {
        let mut bitmap = vec![0u8; self.byte_width()];
        for name in selected {
            let index = self
                .names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| CodecError::new(ErrorCode::Encode, COMPONENT).with_field(name.clone()))?;
            bitmap[index / 8] |= 1 << (index % 8);
        }
        Ok(bitmap)
    }
}

impl Schema for MultiCheck {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        let (tag, width) = reader.peek_type_width()?;
        if tag != TypeTag::String {
            return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT));
        }
        if width != self.byte_width() {
            return Err(CodecError::new(ErrorCode::ConstraintViolated, COMPONENT).with_detail(
                ErrorDetail::Width { expected: self.byte_width() as u8, actual: width as u8 },
            ));
        }
        reader.advance()
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let (payload, tag) = reader.next()?;
        if tag != TypeTag::String {
            return Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT));
        }
        if payload.len() != self.byte_width() {
            return Err(CodecError::new(ErrorCode::ConstraintViolated, COMPONENT).with_detail(
                ErrorDetail::Width { expected: self.byte_width() as u8, actual: payload.len() as u8 },
            ));
        }
        let selected = self.selected_from_bitmap(payload);
        Ok(Value::Tuple(selected.into_iter().map(Value::String).collect()))
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        let selected: Vec<String> = match value {
            Value::String(s) => vec![s.clone()],
            Value::Tuple(items) => items
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(|s| s.to_owned())
                        .ok_or_else(|| CodecError::new(ErrorCode::Encode, COMPONENT))
                })
                .collect::<Result<_, _>>()?,
            _ => return Err(CodecError::new(ErrorCode::Encode, COMPONENT)),
        };
        let bitmap = self.bitmap_from_selected(&selected)?;
        writer.add_bytes(&bitmap)
    }

    fn is_nullable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Writer;

    #[test]
    fn round_trips_single_selection() {
        let schema = MultiCheck::new(vec!["read".into(), "write".into(), "execute".into()]);
        let mut w = Writer::new();
        schema.encode(&mut w, &Value::String("write".into())).unwrap();
        let buf = w.finalize().unwrap();

        // payload is the header table (2 headers * 2 bytes = 4) + 1 byte bitmap
        let r = crate::reader::PositionalReader::new(&buf).unwrap();
        assert_eq!(r.get_bytes(0).unwrap(), &[0b0000_0010]);

        let mut reader = SequentialReader::new(&buf).unwrap();
        let decoded = schema.decode(&mut reader).unwrap();
        assert_eq!(decoded, Value::Tuple(vec![Value::String("write".into())]));
    }

    #[test]
    fn round_trips_multiple_selection() {
        let schema = MultiCheck::new(vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()]);
        let mut w = Writer::new();
        schema
            .encode(
                &mut w,
                &Value::Tuple(vec![Value::String("a".into()), Value::String("e".into())]),
            )
            .unwrap();
        let buf = w.finalize().unwrap();
        let mut reader = SequentialReader::new(&buf).unwrap();
        let decoded = schema.decode(&mut reader).unwrap();
        assert_eq!(
            decoded,
            Value::Tuple(vec![Value::String("a".into()), Value::String("e".into())])
        );
    }
}
