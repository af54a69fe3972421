//! Specialized string/scalar schemas layered on top of the primitives:
//! `Email`, `Uri`, `Lang`, `Color`, `Date` and `Enum`.

use super::Schema;
use crate::error::{CodecError, ErrorCode, ErrorDetail};
use crate::reader::SequentialReader;
use crate::tag::TypeTag;
use crate::value::Value;
use crate::writer::Writer;
use std::sync::OnceLock;

fn color_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^#([0-9a-fA-F]{3}){1,2}$").unwrap())
}

fn read_string(
    reader: &mut SequentialReader<'_>,
    nullable: bool,
    component: &'static str,
) -> Result<Option<String>, CodecError> {
    let (payload, tag) = reader.next()?;
    if tag != TypeTag::String {
        return Err(CodecError::new(ErrorCode::InvalidFormat, component));
    }
    if payload.is_empty() {
        if nullable {
            return Ok(None);
        }
        return Err(CodecError::new(ErrorCode::ConstraintViolated, component));
    }
    let s = std::str::from_utf8(payload)
        .map_err(|_| CodecError::new(ErrorCode::InvalidFormat, component))?;
    Ok(Some(s.to_owned()))
}

/// Minimal RFC 5322 syntactic check: one `@`, non-empty local and domain
/// parts, domain contains at least one `.`.
fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty() && !domain.is_empty() && domain.contains('.') && !domain.starts_with('.')
}

/// RFC 5322 minimal syntactic email schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct Email {
    pub nullable: bool,
}

impl Email {
    pub fn new(nullable: bool) -> Self {
        Email { nullable }
    }
}

impl Schema for Email {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        self.decode(reader).map(|_| ())
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        match read_string(reader, self.nullable, "Email")? {
            None => Ok(Value::Null),
            Some(s) => {
                if !looks_like_email(&s) {
                    return Err(CodecError::new(ErrorCode::StringEmail, "Email").with_detail(
                        ErrorDetail::StringMismatch { expected: "local@domain.tld".into(), actual: s },
                    ));
                }
                Ok(Value::String(s))
            }
        }
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null if self.nullable => {
                writer.add_null_tagged(TypeTag::String);
                Ok(())
            }
            Value::String(s) => {
                if !looks_like_email(s) {
                    return Err(CodecError::new(ErrorCode::StringEmail, "Email"));
                }
                writer.add_string(s)
            }
            other => Err(CodecError::new(ErrorCode::Encode, "Email").with_detail(
                ErrorDetail::StringMismatch { expected: "string".into(), actual: format!("{other:?}") },
            )),
        }
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Accepts a string; if the scheme is missing, mentally prepends
/// `https://`. Requires a non-empty host after parsing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uri {
    pub nullable: bool,
}

impl Uri {
    pub fn new(nullable: bool) -> Self {
        Uri { nullable }
    }

    fn has_host(s: &str) -> bool {
        let with_scheme: std::borrow::Cow<str> = if s.contains("://") {
            std::borrow::Cow::Borrowed(s)
        } else {
            std::borrow::Cow::Owned(format!("https://{s}"))
        };
        let Some((_, after_scheme)) = with_scheme.split_once("://") else {
            return false;
        };
        let host = after_scheme.split(['/', '?', '#']).next().unwrap_or("");
        !host.is_empty()
    }
}

impl Schema for Uri {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        self.decode(reader).map(|_| ())
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        match read_string(reader, self.nullable, "URI")? {
            None => Ok(Value::Null),
            Some(s) => {
                if !Uri::has_host(&s) {
                    return Err(CodecError::new(ErrorCode::StringUrl, "URI"));
                }
                Ok(Value::String(s))
            }
        }
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null if self.nullable => {
                writer.add_null_tagged(TypeTag::String);
                Ok(())
            }
            Value::String(s) => {
                if !Uri::has_host(s) {
                    return Err(CodecError::new(ErrorCode::StringUrl, "URI"));
                }
                writer.add_string(s)
            }
            other => Err(CodecError::new(ErrorCode::Encode, "URI").with_detail(
                ErrorDetail::StringMismatch { expected: "string".into(), actual: format!("{other:?}") },
            )),
        }
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// A two-character base BCP-47 language code (e.g. `en`, `fr`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Lang {
    pub nullable: bool,
}

impl Lang {
    pub fn new(nullable: bool) -> Self {
        Lang { nullable }
    }

    fn is_valid(s: &str) -> bool {
        let base = s.split('-').next().unwrap_or("");
        base.len() == 2 && base.chars().all(|c| c.is_ascii_alphabetic())
    }
}

impl Schema for Lang {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        self.decode(reader).map(|_| ())
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        match read_string(reader, self.nullable, "Lang")? {
            None => Ok(Value::Null),
            Some(s) => {
                if !Lang::is_valid(&s) {
                    return Err(CodecError::new(ErrorCode::StringLang, "Lang"));
                }
                Ok(Value::String(s))
            }
        }
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null if self.nullable => {
                writer.add_null_tagged(TypeTag::String);
                Ok(())
            }
            Value::String(s) => {
                if !Lang::is_valid(s) {
                    return Err(CodecError::new(ErrorCode::StringLang, "Lang"));
                }
                writer.add_string(s)
            }
            other => Err(CodecError::new(ErrorCode::Encode, "Lang").with_detail(
                ErrorDetail::StringMismatch { expected: "string".into(), actual: format!("{other:?}") },
            )),
        }
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Hex color string matching `^#([0-9a-fA-F]{3}){1,2}$`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Color {
    pub nullable: bool,
}

impl Color {
    pub fn new(nullable: bool) -> Self {
        Color { nullable }
    }
}

impl Schema for Color {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        self.decode(reader).map(|_| ())
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        match read_string(reader, self.nullable, "Color")? {
            None => Ok(Value::Null),
            Some(s) => {
                if !color_re().is_match(&s) {
                    return Err(CodecError::new(ErrorCode::StringPattern, "Color").with_detail(
                        ErrorDetail::StringMismatch { expected: "#rgb or #rrggbb".into(), actual: s },
                    ));
                }
                Ok(Value::String(s))
            }
        }
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null if self.nullable => {
                writer.add_null_tagged(TypeTag::String);
                Ok(())
            }
            Value::String(s) => {
                if !color_re().is_match(s) {
                    return Err(CodecError::new(ErrorCode::StringPattern, "Color"));
                }
                writer.add_string(s)
            }
            other => Err(CodecError::new(ErrorCode::Encode, "Color").with_detail(
                ErrorDetail::StringMismatch { expected: "string".into(), actual: format!("{other:?}") },
            )),
        }
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// A width-8 `Integer` field interpreted as Unix seconds, bounded to
/// `[from, to]`. Decode returns a UTC `DateTime`.
#[derive(Debug, Clone)]
pub struct Date {
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub nullable: bool,
}

impl Date {
    pub fn new(from: Option<i64>, to: Option<i64>, nullable: bool) -> Self {
        Date { from, to, nullable }
    }

    fn check_range(&self, seconds: i64) -> Result<(), CodecError> {
        if self.from.is_some_and(|f| seconds < f) || self.to.is_some_and(|t| seconds > t) {
            return Err(CodecError::new(ErrorCode::DateOutOfRange, "Date").with_detail(
                ErrorDetail::Range {
                    min: self.from.map(|v| v as f64),
                    max: self.to.map(|v| v as f64),
                    actual: seconds as f64,
                },
            ));
        }
        Ok(())
    }
}

impl Schema for Date {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        let (payload, tag) = reader.next()?;
        if tag != TypeTag::Integer {
            return Err(CodecError::new(ErrorCode::InvalidFormat, "Date"));
        }
        if payload.is_empty() {
            return if self.nullable {
                Ok(())
            } else {
                Err(CodecError::new(ErrorCode::ConstraintViolated, "Date"))
            };
        }
        if payload.len() != 8 {
            return Err(CodecError::new(ErrorCode::InvalidFormat, "Date").with_detail(
                ErrorDetail::Width { expected: 8, actual: payload.len() as u8 },
            ));
        }
        let seconds = i64::from_le_bytes(payload.try_into().unwrap());
        self.check_range(seconds)
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let (payload, tag) = reader.next()?;
        if tag != TypeTag::Integer {
            return Err(CodecError::new(ErrorCode::InvalidFormat, "Date"));
        }
        if payload.is_empty() {
            return if self.nullable {
                Ok(Value::Null)
            } else {
                Err(CodecError::new(ErrorCode::ConstraintViolated, "Date"))
            };
        }
        if payload.len() != 8 {
            return Err(CodecError::new(ErrorCode::InvalidFormat, "Date").with_detail(
                ErrorDetail::Width { expected: 8, actual: payload.len() as u8 },
            ));
        }
        let seconds = i64::from_le_bytes(payload.try_into().unwrap());
        self.check_range(seconds)?;
        let dt = chrono::DateTime::<chrono::Utc>::from_timestamp(seconds, 0)
            .ok_or_else(|| CodecError::new(ErrorCode::DateOutOfRange, "Date"))?;
        Ok(Value::Date(dt))
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null if self.nullable => {
                writer.add_null_tagged(TypeTag::Integer);
                Ok(())
            }
            Value::Date(dt) => {
                let seconds = dt.timestamp();
                self.check_range(seconds)?;
                writer.add_i64(seconds)
            }
            Value::I64(seconds) => {
                self.check_range(*seconds)?;
                writer.add_i64(*seconds)
            }
            other => Err(CodecError::new(ErrorCode::Encode, "Date").with_detail(
                ErrorDetail::StringMismatch { expected: "date".into(), actual: format!("{other:?}") },
            )),
        }
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// A fixed set of names stored as a width-2 `Integer` index.
#[derive(Debug, Clone)]
pub struct Enum {
    pub names: Vec<String>,
    pub nullable: bool,
}

impl Enum {
    pub fn new(names: Vec<String>, nullable: bool) -> Self {
        Enum { names, nullable }
    }
}

impl Schema for Enum {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        let (payload, tag) = reader.next()?;
        if tag != TypeTag::Integer {
            return Err(CodecError::new(ErrorCode::InvalidFormat, "Enum"));
        }
        if payload.is_empty() {
            return if self.nullable {
                Ok(())
            } else {
                Err(CodecError::new(ErrorCode::ConstraintViolated, "Enum"))
            };
        }
        if payload.len() != 2 {
            return Err(CodecError::new(ErrorCode::InvalidFormat, "Enum").with_detail(
                ErrorDetail::Width { expected: 2, actual: payload.len() as u8 },
            ));
        }
        let index = u16::from_le_bytes([payload[0], payload[1]]) as usize;
        if index >= self.names.len() {
            return Err(CodecError::new(ErrorCode::ConstraintViolated, "Enum"));
        }
        Ok(())
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let (payload, tag) = reader.next()?;
        if tag != TypeTag::Integer {
            return Err(CodecError::new(ErrorCode::InvalidFormat, "Enum"));
        }
        if payload.is_empty() {
            return if self.nullable {
                Ok(Value::Null)
            } else {
                Err(CodecError::new(ErrorCode::ConstraintViolated, "Enum"))
            };
        }
        if payload.len() != 2 {
            return Err(CodecError::new(ErrorCode::InvalidFormat, "Enum").with_detail(
                ErrorDetail::Width { expected: 2, actual: payload.len() as u8 },
            ));
        }
        let index = u16::from_le_bytes([payload[0], payload[1]]) as usize;
        self.names
            .get(index)
            .map(|name| Value::String(name.clone()))
            .ok_or_else(|| CodecError::new(ErrorCode::ConstraintViolated, "Enum"))
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null if self.nullable => {
                writer.add_null_tagged(TypeTag::Integer);
                Ok(())
            }
            Value::String(name) => {
                let index = self
                    .names
                    .iter()
                    .position(|n| n == name)
                    .ok_or_else(|| CodecError::new(ErrorCode::Encode, "Enum").with_field(name.clone()))?;
                writer.add_u16(index as u16)
            }
            Value::I16(i) => writer.add_u16(*i as u16),
            Value::U16(i) => writer.add_u16(*i),
            other => Err(CodecError::new(ErrorCode::Encode, "Enum").with_detail(
                ErrorDetail::StringMismatch { expected: "name or index".into(), actual: format!("{other:?}") },
            )),
        }
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Writer;

    #[test]
    fn email_rejects_missing_at() {
        let schema = Email::new(false);
        let mut w = Writer::new();
        w.add_string("not-an-email").unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        let err = schema.decode(&mut r).unwrap_err();
        assert_eq!(err.code, ErrorCode::StringEmail);
    }

    #[test]
    fn uri_prepends_scheme_when_missing() {
        let schema = Uri::new(false);
        let mut w = Writer::new();
        w.add_string("example.com/path").unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert!(schema.decode(&mut r).is_ok());
    }

    #[test]
    fn color_pattern() {
        let schema = Color::new(false);
        let mut w = Writer::new();
        w.add_string("#1a2b3c").unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert!(schema.decode(&mut r).is_ok());
    }

    #[test]
    fn enum_round_trip_by_name() {
        let schema = Enum::new(vec!["red".into(), "green".into(), "blue".into()], false);
        let mut w = Writer::new();
        schema.encode(&mut w, &Value::String("green".into())).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert_eq!(schema.decode(&mut r).unwrap(), Value::String("green".into()));
    }

    #[test]
    fn date_round_trip() {
        let schema = Date::new(None, None, false);
        let mut w = Writer::new();
        schema.encode(&mut w, &Value::I64(9876543210)).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        let decoded = schema.decode(&mut r).unwrap();
        assert_eq!(decoded, Value::Date(chrono::DateTime::from_timestamp(9876543210, 0).unwrap()));
    }
}
