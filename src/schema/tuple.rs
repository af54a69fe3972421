//! `Tuple` and `TupleNamed`: positional composite schemas, with optional
//! inline splicing of a `Repeat` child's decoded elements.

use super::repeat::Repeat;
use super::Schema;
use crate::error::{CodecError, ErrorCode, ErrorDetail};
use crate::ordered_map::OrderedMap;
use crate::reader::SequentialReader;
use crate::tag::TypeTag;
use crate::value::Value;
use crate::writer::Writer;

const COMPONENT: &str = "Tuple";
const NAMED_COMPONENT: &str = "TupleNamed";

/// One slot in a [`Tuple`]/[`TupleNamed`]'s schema list.
#[derive(Debug)]
pub enum TupleChild {
    /// An ordinary child consuming exactly one wire field.
    Plain(Box<dyn Schema>),
    /// A [`Repeat`] child, consuming a variable number of wire fields.
    /// Only meaningful to splice with `flatten`; without it, its cycles
    /// are collected into a single nested [`Value::Tuple`].
    Repeated(Repeat),
}

impl From<Box<dyn Schema>> for TupleChild {
    fn from(s: Box<dyn Schema>) -> Self {
        TupleChild::Plain(s)
    }
}

impl From<Repeat> for TupleChild {
    fn from(r: Repeat) -> Self {
        TupleChild::Repeated(r)
    }
}

fn open_nested<'a>(
    reader: &mut SequentialReader<'a>,
    component: &'static str,
) -> Result<SequentialReader<'a>, CodecError> {
    let (tag, _width) = reader.peek_type_width()?;
    if tag != TypeTag::Tuple {
        return Err(CodecError::new(ErrorCode::InvalidFormat, component));
    }
    let nested = reader.peek_nested()?;
    reader.advance()?;
    Ok(nested)
}

/// Positional tuple of heterogeneous child schemas.
#[derive(Debug)]
pub struct Tuple {
    schemas: Vec<TupleChild>,
    nullable: bool,
    variable_length: bool,
    flatten: bool,
}

impl Tuple {
    pub fn new(
        schemas: Vec<TupleChild>,
        nullable: bool,
        variable_length: bool,
        flatten: bool,
    ) -> Result<Self, CodecError> {
        if flatten {
            for (i, child) in schemas.iter().enumerate() {
                let is_last = i + 1 == schemas.len();
                if let TupleChild::Repeated(r) = child {
                    if !is_last && r.max_elements().is_none() {
                        return Err(CodecError::new(ErrorCode::Encode, COMPONENT));
                    }
                }
            }
        }
        Ok(Tuple { schemas, nullable, variable_length, flatten })
    }

    fn has_repeat(&self) -> bool {
        self.schemas.iter().any(|c| matches!(c, TupleChild::Repeated(_)))
    }
}

impl Schema for Tuple {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        let mut nested = open_nested(reader, COMPONENT)?;
        if !self.variable_length && !self.has_repeat() && nested.remaining() != self.schemas.len() {
            return Err(CodecError::new(ErrorCode::ConstraintViolated, COMPONENT));
        }
        for child in &self.schemas {
            match child {
                TupleChild::Plain(s) => s.validate(&mut nested)?,
                TupleChild::Repeated(r) => r.validate_elements(&mut nested)?,
            }
        }
        Ok(())
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let mut nested = open_nested(reader, COMPONENT)?;
        if !self.variable_length && !self.has_repeat() && nested.remaining() != self.schemas.len() {
            return Err(CodecError::new(ErrorCode::ConstraintViolated, COMPONENT));
        }
        let mut items = Vec::new();
        for child in &self.schemas {
            match child {
                TupleChild::Plain(s) => items.push(s.decode(&mut nested)?),
                TupleChild::Repeated(r) => {
                    let elements = r.decode_elements(&mut nested)?;
                    if self.flatten {
                        items.extend(elements);
                    } else {
                        items.push(Value::Tuple(elements));
                    }
                }
            }
        }
        Ok(Value::Tuple(items))
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        let items = match value {
            Value::Null if self.nullable => {
                writer.add_null_tagged(TypeTag::Tuple);
                return Ok(());
            }
            Value::Tuple(items) => items,
            other => {
                return Err(CodecError::new(ErrorCode::Encode, COMPONENT).with_detail(
                    ErrorDetail::StringMismatch { expected: "tuple".into(), actual: format!("{other:?}") },
                ))
            }
        };
        let mut child = Writer::begin_tuple();
        let mut cursor = 0usize;
        for (i, schema_child) in self.schemas.iter().enumerate() {
            let is_last = i + 1 == self.schemas.len();
            match schema_child {
                TupleChild::Plain(s) => {
                    let item = items.get(cursor).ok_or_else(|| {
                        CodecError::new(ErrorCode::Encode, COMPONENT).with_position(cursor)
                    })?;
                    s.encode(&mut child, item)?;
                    cursor += 1;
                }
                TupleChild::Repeated(r) => {
                    if self.flatten {
                        let take = if is_last {
                            items.len() - cursor
                        } else {
                            r.max_elements().ok_or_else(|| CodecError::new(ErrorCode::Encode, COMPONENT))?
                        };
                        let slice = items.get(cursor..cursor + take).ok_or_else(|| {
                            CodecError::new(ErrorCode::Encode, COMPONENT).with_position(cursor)
                        })?;
                        r.encode_elements(&mut child, slice)?;
                        cursor += take;
                    } else {
                        let item = items.get(cursor).ok_or_else(|| {
                            CodecError::new(ErrorCode::Encode, COMPONENT).with_position(cursor)
                        })?;
                        let Value::Tuple(inner) = item else {
                            return Err(CodecError::new(ErrorCode::Encode, COMPONENT));
                        };
                        r.encode_elements(&mut child, inner)?;
                        cursor += 1;
                    }
                }
            }
        }
        let bytes = child.finalize()?;
        writer.add_nested(TypeTag::Tuple, &bytes)
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Like [`Tuple`] but decodes into a string-keyed map rather than a list.
#[derive(Debug)]
pub struct TupleNamed {
    schemas: Vec<TupleChild>,
    field_names: Vec<String>,
    nullable: bool,
    variable_length: bool,
    flatten: bool,
}

impl TupleNamed {
    pub fn new(
        schemas: Vec<TupleChild>,
        field_names: Vec<String>,
        nullable: bool,
        variable_length: bool,
        flatten: bool,
    ) -> Result<Self, CodecError> {
        if field_names.len() != schemas.len() {
            return Err(CodecError::new(ErrorCode::ConstraintViolated, NAMED_COMPONENT));
        }
        Ok(TupleNamed { schemas, field_names, nullable, variable_length, flatten })
    }

    fn has_repeat(&self) -> bool {
        self.schemas.iter().any(|c| matches!(c, TupleChild::Repeated(_)))
    }
}

impl Schema for TupleNamed {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        let mut nested = open_nested(reader, NAMED_COMPONENT)?;
        if !self.variable_length && !self.has_repeat() && nested.remaining() != self.schemas.len() {
            return Err(CodecError::new(ErrorCode::ConstraintViolated, NAMED_COMPONENT));
        }
        for child in &self.schemas {
            match child {
                TupleChild::Plain(s) => s.validate(&mut nested)?,
                TupleChild::Repeated(r) => r.validate_elements(&mut nested)?,
            }
        }
        Ok(())
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let mut nested = open_nested(reader, NAMED_COMPONENT)?;
        if !self.variable_length && !self.has_repeat() && nested.remaining() != self.schemas.len() {
            return Err(CodecError::new(ErrorCode::ConstraintViolated, NAMED_COMPONENT));
        }
        let mut map = OrderedMap::with_capacity(self.schemas.len());
        for (name, child) in self.field_names.iter().zip(&self.schemas) {
            match child {
                TupleChild::Plain(s) => {
                    map.set(name, s.decode(&mut nested)?);
                }
                TupleChild::Repeated(r) => {
                    let elements = r.decode_elements(&mut nested)?;
                    if self.flatten {
                        for (i, element) in elements.into_iter().enumerate() {
                            map.set(&format!("{name}_{i}"), element);
                        }
                    } else {
                        map.set(name, Value::Tuple(elements));
                    }
                }
            }
        }
        Ok(Value::Map(map))
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        let map = match value {
            Value::Null if self.nullable => {
                writer.add_null_tagged(TypeTag::Tuple);
                return Ok(());
            }
            Value::Map(map) => map,
            other => {
                return Err(CodecError::new(ErrorCode::Encode, NAMED_COMPONENT).with_detail(
                    ErrorDetail::StringMismatch { expected: "map".into(), actual: format!("{other:?}") },
                ))
            }
        };
        let mut child = Writer::begin_tuple();
        for (name, schema_child) in self.field_names.iter().zip(&self.schemas) {
            match schema_child {
                TupleChild::Plain(s) => {
                    let value = map
                        .get(name)
                        .ok_or_else(|| CodecError::missing_key(NAMED_COMPONENT, name.clone()))?;
                    s.encode(&mut child, value)?;
                }
                TupleChild::Repeated(r) => {
                    if self.flatten {
                        let mut elements = Vec::new();
                        let mut i = 0usize;
                        loop {
                            let key = format!("{name}_{i}");
                            let Some(value) = map.get(&key) else { break };
                            elements.push(value.clone());
                            i += 1;
                        }
                        if i < r.cycle_len() {
                            return Err(CodecError::missing_key(NAMED_COMPONENT, format!("{name}_{i}")));
                        }
                        r.encode_elements(&mut child, &elements)?;
                    } else {
                        let value = map
                            .get(name)
                            .ok_or_else(|| CodecError::missing_key(NAMED_COMPONENT, name.clone()))?;
                        let Value::Tuple(inner) = value else {
                            return Err(CodecError::new(ErrorCode::Encode, NAMED_COMPONENT));
                        };
                        r.encode_elements(&mut child, inner)?;
                    }
                }
            }
        }
        let bytes = child.finalize()?;
        writer.add_nested(TypeTag::Tuple, &bytes)
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{schema, Bool, Int16, Int32, StringSchema};
    use crate::writer::Writer;

    #[test]
    fn round_trips_plain_tuple() {
        let t = Tuple::new(
            vec![
                TupleChild::Plain(schema(Int16::new(false))),
                TupleChild::Plain(schema(Bool::new(false))),
                TupleChild::Plain(schema(StringSchema::new(0, false))),
            ],
            false,
            false,
            false,
        )
        .unwrap();

        let mut w = Writer::new();
        let value = Value::Tuple(vec![Value::I16(7), Value::Bool(true), Value::String("hi".into())]);
        t.encode(&mut w, &value).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert_eq!(t.decode(&mut r).unwrap(), value);
    }

    #[test]
    fn flatten_splices_repeat_elements_inline() {
        let repeat = Repeat::new(vec![schema(Int32::new(false))], 0, None);
        let t = Tuple::new(
            vec![TupleChild::Plain(schema(Bool::new(false))), TupleChild::Repeated(repeat)],
            false,
            true,
            true,
        )
        .unwrap();

        let mut w = Writer::new();
        let value = Value::Tuple(vec![Value::Bool(true), Value::I32(1), Value::I32(2), Value::I32(3)]);
        t.encode(&mut w, &value).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert_eq!(t.decode(&mut r).unwrap(), value);
    }

    #[test]
    fn named_tuple_decodes_into_map() {
        let t = TupleNamed::new(
            vec![
                TupleChild::Plain(schema(Int16::new(false))),
                TupleChild::Plain(schema(StringSchema::new(0, false))),
            ],
            vec!["age".into(), "name".into()],
            false,
            false,
            false,
        )
        .unwrap();

        let mut w = Writer::new();
        let mut map = OrderedMap::new();
        map.set("age", Value::I16(30));
        map.set("name", Value::String("ren".into()));
        let value = Value::Map(map);
        t.encode(&mut w, &value).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert_eq!(t.decode(&mut r).unwrap(), value);
    }
}
