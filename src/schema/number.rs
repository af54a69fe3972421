//! `Number`: accepts either an integer or floating payload and performs
//! range checks in `f64`, regardless of the wire width actually used.

use super::Schema;
use crate::error::{CodecError, ErrorCode};
use crate::reader::SequentialReader;
use crate::tag::TypeTag;
use crate::value::Value;
use crate::writer::Writer;

const COMPONENT: &str = "Number";

/// A numeric schema that accepts both integer and float wire
/// representations, decoding to `f64` (or its string rendering, when
/// `decode_as_string` is set).
#[derive(Debug, Clone, Copy, Default)]
pub struct Number {
    pub decode_as_string: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub nullable: bool,
}

impl Number {
    pub fn new(nullable: bool) -> Self {
        Number { decode_as_string: false, min: None, max: None, nullable }
    }

    pub fn as_string(mut self) -> Self {
        self.decode_as_string = true;
        self
    }

    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    fn read_numeric(&self, reader: &mut SequentialReader<'_>) -> Result<Option<f64>, CodecError> {
        let (payload, tag) = reader.next()?;
        match tag {
            TypeTag::Integer => match payload.len() {
                0 => Ok(None),
                1 => Ok(Some(payload[0] as i8 as f64)),
                2 => Ok(Some(i16::from_le_bytes([payload[0], payload[1]]) as f64)),
                4 => Ok(Some(i32::from_le_bytes(payload.try_into().unwrap()) as f64)),
                8 => Ok(Some(i64::from_le_bytes(payload.try_into().unwrap()) as f64)),
                n => Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT).with_detail(
                    crate::error::ErrorDetail::Width { expected: 0, actual: n as u8 },
                )),
            },
            TypeTag::Floating => match payload.len() {
                0 => Ok(None),
                4 => Ok(Some(f32::from_le_bytes(payload.try_into().unwrap()) as f64)),
                8 => Ok(Some(f64::from_le_bytes(payload.try_into().unwrap()))),
                n => Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT).with_detail(
                    crate::error::ErrorDetail::Width { expected: 0, actual: n as u8 },
                )),
            },
            _ => Err(CodecError::new(ErrorCode::InvalidFormat, COMPONENT)),
        }
    }

    fn check_range(&self, actual: f64) -> Result<(), CodecError> {
        if self.min.is_some_and(|m| actual < m) || self.max.is_some_and(|m| actual > m) {
            return Err(CodecError::range(COMPONENT, self.min, self.max, actual));
        }
        Ok(())
    }
}

impl Schema for Number {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        match self.read_numeric(reader)? {
            Some(v) => self.check_range(v),
            None if self.nullable => Ok(()),
            None => Err(CodecError::new(ErrorCode::ConstraintViolated, COMPONENT)),
        }
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        match self.read_numeric(reader)? {
            Some(v) => {
                self.check_range(v)?;
                if self.decode_as_string {
                    Ok(Value::String(format_number(v)))
                } else {
                    Ok(Value::F64(v))
                }
            }
            None if self.nullable => Ok(Value::Null),
            None => Err(CodecError::new(ErrorCode::ConstraintViolated, COMPONENT)),
        }
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        if matches!(value, Value::Null) && self.nullable {
            writer.add_null_tagged(TypeTag::Integer);
            return Ok(());
        }
        let numeric = match value {
            Value::String(s) if self.decode_as_string => s
                .parse::<f64>()
                .map_err(|_| CodecError::new(ErrorCode::Encode, COMPONENT))?,
            other => other
                .as_f64()
                .ok_or_else(|| CodecError::new(ErrorCode::Encode, COMPONENT))?,
        };
        self.check_range(numeric)?;
        writer.add_numeric(numeric)
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Writer;

    #[test]
    fn accepts_integer_or_float_payload() {
        let schema = Number::new(false);

        let mut w = Writer::new();
        w.add_i32(7).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert_eq!(schema.decode(&mut r).unwrap(), Value::F64(7.0));

        let mut w = Writer::new();
        w.add_f64(3.5).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert_eq!(schema.decode(&mut r).unwrap(), Value::F64(3.5));
    }

    #[test]
    fn decode_as_string_renders_integral_without_fraction() {
        let schema = Number::new(false).as_string();
        let mut w = Writer::new();
        w.add_i16(42).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert_eq!(schema.decode(&mut r).unwrap(), Value::String("42".into()));
    }

    #[test]
    fn encode_picks_narrowest_width() {
        let schema = Number::new(false);
        let mut w = Writer::new();
        schema.encode(&mut w, &Value::F64(5.0)).unwrap();
        let buf = w.finalize().unwrap();
        // narrowest width for 5.0 is a single signed byte (Integer, width 1)
        let r = crate::reader::PositionalReader::new(&buf).unwrap();
        assert_eq!(r.get_i8(0).unwrap(), 5);
    }
}
