//! Primitive schema nodes: fixed-width scalars and the string/bytes
//! family, plus the generic range and string-check combinators.

use super::Schema;
use crate::error::{CodecError, ErrorCode, ErrorDetail};
use crate::reader::SequentialReader;
use crate::tag::TypeTag;
use crate::value::Value;
use crate::writer::Writer;

fn encode_mismatch(component: &'static str, value: &Value) -> CodecError {
    CodecError::new(ErrorCode::Encode, component)
        .with_detail(ErrorDetail::StringMismatch {
            expected: "matching scalar variant".into(),
            actual: format!("{value:?}"),
        })
}

/// Signed 8-bit integer primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Int8 {
    pub nullable: bool,
}

impl Int8 {
    pub fn new(nullable: bool) -> Self {
        Int8 { nullable }
    }
}

impl Schema for Int8 {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        validate_int(reader, "Int8", 1, self.nullable)
    }
    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let (payload, tag) = reader.next()?;
        check_int_tag(tag, "Int8")?;
        if payload.is_empty() {
            return null_or_err(self.nullable, "Int8");
        }
        check_width(payload.len(), 1, "Int8")?;
        Ok(Value::I8(payload[0] as i8))
    }
    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null if self.nullable => {
                writer.add_null_tagged(TypeTag::Integer);
                Ok(())
            }
            Value::I8(v) => writer.add_i8(*v),
            other => Err(encode_mismatch("Int8", other)),
        }
    }
    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Signed 16-bit integer primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Int16 {
    pub nullable: bool,
}

impl Int16 {
    pub fn new(nullable: bool) -> Self {
        Int16 { nullable }
    }

    /// Derive a range-checked schema: `min ≤ value ≤ max`. Either bound may
    /// be omitted.
    pub fn range(self, min: Option<i64>, max: Option<i64>) -> Range<Int16> {
        Range::new(self, min.map(|v| v as f64), max.map(|v| v as f64), "Int16.range")
    }
}

impl Schema for Int16 {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        validate_int(reader, "Int16", 2, self.nullable)
    }
    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let (payload, tag) = reader.next()?;
        check_int_tag(tag, "Int16")?;
        if payload.is_empty() {
            return null_or_err(self.nullable, "Int16");
        }
        check_width(payload.len(), 2, "Int16")?;
        Ok(Value::I16(i16::from_le_bytes([payload[0], payload[1]])))
    }
    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null if self.nullable => {
                writer.add_null_tagged(TypeTag::Integer);
                Ok(())
            }
            Value::I16(v) => writer.add_i16(*v),
            other => Err(encode_mismatch("Int16", other)),
        }
    }
    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Signed 32-bit integer primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Int32 {
    pub nullable: bool,
}

impl Int32 {
    pub fn new(nullable: bool) -> Self {
        Int32 { nullable }
    }

    pub fn range(self, min: Option<i64>, max: Option<i64>) -> Range<Int32> {
        Range::new(self, min.map(|v| v as f64), max.map(|v| v as f64), "Int32.range")
    }
}

impl Schema for Int32 {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        validate_int(reader, "Int32", 4, self.nullable)
    }
    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let (payload, tag) = reader.next()?;
        check_int_tag(tag, "Int32")?;
        if payload.is_empty() {
            return null_or_err(self.nullable, "Int32");
        }
        check_width(payload.len(), 4, "Int32")?;
        Ok(Value::I32(i32::from_le_bytes(payload.try_into().unwrap())))
    }
    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null if self.nullable => {
                writer.add_null_tagged(TypeTag::Integer);
                Ok(())
            }
            Value::I32(v) => writer.add_i32(*v),
            other => Err(encode_mismatch("Int32", other)),
        }
    }
    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Signed 64-bit integer primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Int64 {
    pub nullable: bool,
}

impl Int64 {
    pub fn new(nullable: bool) -> Self {
        Int64 { nullable }
    }

    pub fn range(self, min: Option<i64>, max: Option<i64>) -> Range<Int64> {
        Range::new(self, min.map(|v| v as f64), max.map(|v| v as f64), "Int64.range")
    }
}

impl Schema for Int64 {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        validate_int(reader, "Int64", 8, self.nullable)
    }
    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let (payload, tag) = reader.next()?;
        check_int_tag(tag, "Int64")?;
        if payload.is_empty() {
            return null_or_err(self.nullable, "Int64");
        }
        check_width(payload.len(), 8, "Int64")?;
        Ok(Value::I64(i64::from_le_bytes(payload.try_into().unwrap())))
    }
    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null if self.nullable => {
                writer.add_null_tagged(TypeTag::Integer);
                Ok(())
            }
            Value::I64(v) => writer.add_i64(*v),
            other => Err(encode_mismatch("Int64", other)),
        }
    }
    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// 32-bit IEEE float primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Float32 {
    pub nullable: bool,
}

impl Float32 {
    pub fn new(nullable: bool) -> Self {
        Float32 { nullable }
    }
}

impl Schema for Float32 {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        let (tag, width) = reader.peek_type_width()?;
        if tag != TypeTag::Floating {
            return Err(CodecError::new(ErrorCode::InvalidFormat, "Float32"));
        }
        if width == 0 {
            if !self.nullable {
                return Err(CodecError::new(ErrorCode::ConstraintViolated, "Float32"));
            }
        } else {
            check_width(width, 4, "Float32")?;
        }
        reader.advance()
    }
    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let (payload, tag) = reader.next()?;
        if tag != TypeTag::Floating {
            return Err(CodecError::new(ErrorCode::InvalidFormat, "Float32"));
        }
        if payload.is_empty() {
            return null_or_err(self.nullable, "Float32");
        }
        check_width(payload.len(), 4, "Float32")?;
        Ok(Value::F32(f32::from_le_bytes(payload.try_into().unwrap())))
    }
    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null if self.nullable => {
                writer.add_null_tagged(TypeTag::Floating);
                Ok(())
            }
            Value::F32(v) => writer.add_f32(*v),
            other => Err(encode_mismatch("Float32", other)),
        }
    }
    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// 64-bit IEEE float primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Float64 {
    pub nullable: bool,
}

impl Float64 {
    pub fn new(nullable: bool) -> Self {
        Float64 { nullable }
    }
}

impl Schema for Float64 {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        let (tag, width) = reader.peek_type_width()?;
        if tag != TypeTag::Floating {
            return Err(CodecError::new(ErrorCode::InvalidFormat, "Float64"));
        }
        if width == 0 {
            if !self.nullable {
                return Err(CodecError::new(ErrorCode::ConstraintViolated, "Float64"));
            }
        } else {
            check_width(width, 8, "Float64")?;
        }
        reader.advance()
    }
    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let (payload, tag) = reader.next()?;
        if tag != TypeTag::Floating {
            return Err(CodecError::new(ErrorCode::InvalidFormat, "Float64"));
        }
        if payload.is_empty() {
            return null_or_err(self.nullable, "Float64");
        }
        check_width(payload.len(), 8, "Float64")?;
        Ok(Value::F64(f64::from_le_bytes(payload.try_into().unwrap())))
    }
    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null if self.nullable => {
                writer.add_null_tagged(TypeTag::Floating);
                Ok(())
            }
            Value::F64(v) => writer.add_f64(*v),
            other => Err(encode_mismatch("Float64", other)),
        }
    }
    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Boolean primitive; zero width (null) decodes to [`Value::Null`] when
/// nullable.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bool {
    pub nullable: bool,
}

impl Bool {
    pub fn new(nullable: bool) -> Self {
        Bool { nullable }
    }
}

impl Schema for Bool {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        let (tag, width) = reader.peek_type_width()?;
        if tag != TypeTag::Bool {
            return Err(CodecError::new(ErrorCode::InvalidFormat, "Bool"));
        }
        if width == 0 && !self.nullable {
            return Err(CodecError::new(ErrorCode::ConstraintViolated, "Bool"));
        }
        if width > 1 {
            return Err(CodecError::new(ErrorCode::InvalidFormat, "Bool").with_detail(
                ErrorDetail::Width { expected: 1, actual: width as u8 },
            ));
        }
        reader.advance()
    }
    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let (payload, tag) = reader.next()?;
        if tag != TypeTag::Bool {
            return Err(CodecError::new(ErrorCode::InvalidFormat, "Bool"));
        }
        match payload.len() {
            0 => null_or_err(self.nullable, "Bool"),
            1 => Ok(Value::Bool(payload[0] != 0)),
            n => Err(CodecError::new(ErrorCode::InvalidFormat, "Bool").with_detail(
                ErrorDetail::Width { expected: 1, actual: n as u8 },
            )),
        }
    }
    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null if self.nullable => {
                writer.add_null_tagged(TypeTag::Bool);
                Ok(())
            }
            Value::Bool(v) => writer.add_bool(*v),
            other => Err(encode_mismatch("Bool", other)),
        }
    }
    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// String primitive.
///
/// `width`: negative or zero means "any length", positive means
/// "exactly this many bytes".
#[derive(Debug, Clone, Default)]
pub struct StringSchema {
    pub width: i32,
    pub nullable: bool,
    pub default_decode_value: Option<String>,
}

impl StringSchema {
    pub fn new(width: i32, nullable: bool) -> Self {
        StringSchema { width, nullable, default_decode_value: None }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default_decode_value = Some(default.into());
        self
    }

    fn exact_len(&self) -> Option<usize> {
        if self.width > 0 {
            Some(self.width as usize)
        } else {
            None
        }
    }

    pub fn match_exact(self, expected: impl Into<String>) -> StringCheck<StringSchema> {
        let expected = expected.into();
        check_func(self, ErrorCode::StringMatch, expected.clone(), move |s| s == expected)
    }

    pub fn prefix(self, prefix: impl Into<String>) -> StringCheck<StringSchema> {
        let prefix = prefix.into();
        check_func(self, ErrorCode::StringPrefix, prefix.clone(), move |s| s.starts_with(&prefix))
    }

    pub fn suffix(self, suffix: impl Into<String>) -> StringCheck<StringSchema> {
        let suffix = suffix.into();
        check_func(self, ErrorCode::StringSuffix, suffix.clone(), move |s| s.ends_with(&suffix))
    }

    pub fn pattern(self, pattern: &str) -> Result<StringCheck<StringSchema>, CodecError> {
        let re = regex::Regex::new(pattern)
            .map_err(|_| CodecError::new(ErrorCode::StringPattern, "String.pattern"))?;
        let expected = pattern.to_owned();
        Ok(check_func(self, ErrorCode::StringPattern, expected, move |s| re.is_match(s)))
    }
}

impl Schema for StringSchema {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        self.decode(reader).map(|_| ())
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let (payload, tag) = reader.next()?;
        if tag != TypeTag::String {
            return Err(CodecError::new(ErrorCode::InvalidFormat, "String"));
        }
        if payload.is_empty() {
            if let Some(default) = &self.default_decode_value {
                return Ok(Value::String(default.clone()));
            }
            return null_or_err(self.nullable, "String");
        }
        if let Some(expect_len) = self.exact_len() {
            if payload.len() != expect_len {
                return Err(CodecError::new(ErrorCode::ConstraintViolated, "String").with_detail(
                    ErrorDetail::Width { expected: expect_len as u8, actual: payload.len() as u8 },
                ));
            }
        }
        let s = std::str::from_utf8(payload)
            .map_err(|_| CodecError::new(ErrorCode::InvalidFormat, "String"))?;
        Ok(Value::String(s.to_owned()))
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null if self.nullable || self.default_decode_value.is_some() => {
                writer.add_null_tagged(TypeTag::String);
                Ok(())
            }
            Value::String(s) => {
                if let Some(expect_len) = self.exact_len() {
                    if s.len() != expect_len {
                        return Err(CodecError::new(ErrorCode::Encode, "String").with_detail(
                            ErrorDetail::Width { expected: expect_len as u8, actual: s.len() as u8 },
                        ));
                    }
                }
                writer.add_string(s)
            }
            other => Err(encode_mismatch("String", other)),
        }
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Byte-array primitive; mirrors [`StringSchema`]'s width semantics.
#[derive(Debug, Clone, Default)]
pub struct Bytes {
    pub width: i32,
    pub nullable: bool,
    pub default_decode_value: Option<Vec<u8>>,
}

impl Bytes {
    pub fn new(width: i32, nullable: bool) -> Self {
        Bytes { width, nullable, default_decode_value: None }
    }

    fn exact_len(&self) -> Option<usize> {
        if self.width > 0 {
            Some(self.width as usize)
        } else {
            None
        }
    }
}

impl Schema for Bytes {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        self.decode(reader).map(|_| ())
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let (payload, tag) = reader.next()?;
        if tag != TypeTag::String {
            return Err(CodecError::new(ErrorCode::InvalidFormat, "Bytes"));
        }
        if payload.is_empty() {
            if let Some(default) = &self.default_decode_value {
                return Ok(Value::Bytes(default.clone()));
            }
            return null_or_err(self.nullable, "Bytes");
        }
        if let Some(expect_len) = self.exact_len() {
            if payload.len() != expect_len {
                return Err(CodecError::new(ErrorCode::ConstraintViolated, "Bytes").with_detail(
                    ErrorDetail::Width { expected: expect_len as u8, actual: payload.len() as u8 },
                ));
            }
        }
        Ok(Value::Bytes(payload.to_vec()))
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null if self.nullable || self.default_decode_value.is_some() => {
                writer.add_null_tagged(TypeTag::String);
                Ok(())
            }
            Value::Bytes(b) => {
                if let Some(expect_len) = self.exact_len() {
                    if b.len() != expect_len {
                        return Err(CodecError::new(ErrorCode::Encode, "Bytes"));
                    }
                }
                writer.add_bytes(b)
            }
            other => Err(encode_mismatch("Bytes", other)),
        }
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Derived schema checking `min ≤ value ≤ max` on an inner numeric
/// schema's decoded value.
#[derive(Debug)]
pub struct Range<S: Schema> {
    inner: S,
    min: Option<f64>,
    max: Option<f64>,
    component: &'static str,
}

impl<S: Schema> Range<S> {
    pub fn new(inner: S, min: Option<f64>, max: Option<f64>, component: &'static str) -> Self {
        Range { inner, min, max, component }
    }

    fn check(&self, value: &Value) -> Result<(), CodecError> {
        let Some(actual) = value.as_f64() else {
            return Ok(()); // null: inner already validated nullability
        };
        if self.min.is_some_and(|m| actual < m) || self.max.is_some_and(|m| actual > m) {
            return Err(CodecError::range(self.component, self.min, self.max, actual));
        }
        Ok(())
    }
}

impl<S: Schema> Schema for Range<S> {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        // Needs the decoded value to range-check, so validate and decode
        // share an implementation here.
        let value = self.inner.decode(reader)?;
        self.check(&value)
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let value = self.inner.decode(reader)?;
        self.check(&value)?;
        Ok(value)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        self.check(value)?;
        self.inner.encode(writer, value)
    }

    fn is_nullable(&self) -> bool {
        self.inner.is_nullable()
    }
}

/// Derived schema checking an arbitrary string predicate on an inner
/// string-ish schema's decoded value.
pub struct StringCheck<S: Schema> {
    inner: S,
    code: ErrorCode,
    expected: String,
    predicate: Box<dyn Fn(&str) -> bool + Send + Sync>,
}

impl<S: Schema> std::fmt::Debug for StringCheck<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringCheck").field("code", &self.code).field("expected", &self.expected).finish()
    }
}

/// Generic combinator underlying `.match()`, `.prefix()`, `.suffix()` and
/// `.pattern()`: wraps `inner` with `predicate`, reporting `code` on
/// failure.
pub fn check_func<S: Schema>(
    inner: S,
    code: ErrorCode,
    expected: String,
    predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
) -> StringCheck<S> {
    StringCheck { inner, code, expected, predicate: Box::new(predicate) }
}

impl<S: Schema> StringCheck<S> {
    fn check(&self, value: &Value) -> Result<(), CodecError> {
        let Some(actual) = value.as_str() else {
            return Ok(());
        };
        if !(self.predicate)(actual) {
            return Err(CodecError::new(self.code, "String").with_detail(ErrorDetail::StringMismatch {
                expected: self.expected.clone(),
                actual: actual.to_owned(),
            }));
        }
        Ok(())
    }
}

impl<S: Schema> Schema for StringCheck<S> {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        let value = self.inner.decode(reader)?;
        self.check(&value)
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let value = self.inner.decode(reader)?;
        self.check(&value)?;
        Ok(value)
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        self.check(value)?;
        self.inner.encode(writer, value)
    }

    fn is_nullable(&self) -> bool {
        self.inner.is_nullable()
    }
}

fn validate_int(
    reader: &mut SequentialReader<'_>,
    component: &'static str,
    width: usize,
    nullable: bool,
) -> Result<(), CodecError> {
    let (tag, actual_width) = reader.peek_type_width()?;
    if tag != TypeTag::Integer {
        return Err(CodecError::new(ErrorCode::InvalidFormat, component));
    }
    if actual_width == 0 {
        if !nullable {
            return Err(CodecError::new(ErrorCode::ConstraintViolated, component));
        }
    } else {
        check_width(actual_width, width, component)?;
    }
    reader.advance()
}

fn check_int_tag(tag: TypeTag, component: &'static str) -> Result<(), CodecError> {
    if tag != TypeTag::Integer {
        return Err(CodecError::new(ErrorCode::InvalidFormat, component));
    }
    Ok(())
}

fn check_width(actual: usize, expected: usize, component: &'static str) -> Result<(), CodecError> {
    if actual != expected {
        return Err(CodecError::new(ErrorCode::InvalidFormat, component).with_detail(
            ErrorDetail::Width { expected: expected as u8, actual: actual as u8 },
        ));
    }
    Ok(())
}

fn null_or_err(nullable: bool, component: &'static str) -> Result<Value, CodecError> {
    if nullable {
        Ok(Value::Null)
    } else {
        Err(CodecError::new(ErrorCode::ConstraintViolated, component))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Writer;

    #[test]
    fn int16_range_rejects_out_of_bounds() {
        let mut w = Writer::new();
        w.add_i16(12345).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        let schema = Int16::new(false).range(Some(0), Some(100));
        let err = schema.validate(&mut r).unwrap_err();
        assert_eq!(err.code, ErrorCode::OutOfRange);
    }

    #[test]
    fn int16_range_accepts_in_bounds() {
        let mut w = Writer::new();
        w.add_i16(12345).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        let schema = Int16::new(false).range(Some(0), Some(20000));
        assert!(schema.validate(&mut r).is_ok());
    }

    #[test]
    fn string_match_combinator() {
        let mut w = Writer::new();
        w.add_string("meta").unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        let schema = StringSchema::new(0, false).match_exact("meta");
        assert!(schema.validate(&mut r).is_ok());
    }

    #[test]
    fn nullable_primitive_round_trips_null() {
        let schema = Int32::new(true);
        let mut w = Writer::new();
        schema.encode(&mut w, &Value::Null).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert_eq!(schema.decode(&mut r).unwrap(), Value::Null);
    }

    #[test]
    fn non_nullable_zero_width_errors() {
        let schema = Int32::new(false);
        let mut w = Writer::new();
        w.add_null_tagged(TypeTag::Integer);
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert!(schema.decode(&mut r).is_err());
    }
}
