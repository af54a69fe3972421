//! Map composite schemas: positional `Map`, name-dispatched
//! `MapUnordered`, and homogeneous `MapRepeat`.

use super::Schema;
use crate::error::{CodecError, ErrorCode, ErrorDetail};
use crate::ordered_map::OrderedMap;
use crate::reader::SequentialReader;
use crate::tag::TypeTag;
use crate::value::Value;
use crate::writer::Writer;

fn open_nested<'a>(
    reader: &mut SequentialReader<'a>,
    component: &'static str,
) -> Result<SequentialReader<'a>, CodecError> {
    let (tag, _width) = reader.peek_type_width()?;
    if tag != TypeTag::Map {
        return Err(CodecError::new(ErrorCode::InvalidFormat, component));
    }
    let nested = reader.peek_nested()?;
    reader.advance()?;
    Ok(nested)
}

fn expect_string_key(reader: &mut SequentialReader<'_>, component: &'static str) -> Result<String, CodecError> {
    let (payload, tag) = reader.next()?;
    if tag != TypeTag::String {
        return Err(CodecError::new(ErrorCode::InvalidFormat, component));
    }
    std::str::from_utf8(payload)
        .map(|s| s.to_owned())
        .map_err(|_| CodecError::new(ErrorCode::InvalidFormat, component))
}

/// Positional key/value map: `schemas` alternates key-schema, value-schema
/// in the exact order the fields appear on the wire.
#[derive(Debug)]
pub struct Map {
    schemas: Vec<Box<dyn Schema>>,
}

const MAP_COMPONENT: &str = "Map";

impl Map {
    pub fn new(schemas: Vec<Box<dyn Schema>>) -> Result<Self, CodecError> {
        if schemas.len() % 2 != 0 {
            return Err(CodecError::new(ErrorCode::ConstraintViolated, MAP_COMPONENT));
        }
        Ok(Map { schemas })
    }

    fn pairs(&self) -> std::slice::Chunks<'_, Box<dyn Schema>> {
        self.schemas.chunks(2)
    }
}

impl Schema for Map {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        let mut nested = open_nested(reader, MAP_COMPONENT)?;
        if nested.remaining() != self.schemas.len() {
            return Err(CodecError::new(ErrorCode::ConstraintViolated, MAP_COMPONENT));
        }
        for pair in self.pairs() {
            pair[0].validate(&mut nested)?;
            pair[1].validate(&mut nested)?;
        }
        Ok(())
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let mut nested = open_nested(reader, MAP_COMPONENT)?;
        if nested.remaining() != self.schemas.len() {
            return Err(CodecError::new(ErrorCode::ConstraintViolated, MAP_COMPONENT));
        }
        let mut map = OrderedMap::with_capacity(self.schemas.len() / 2);
        for pair in self.pairs() {
            let key_value = pair[0].decode(&mut nested)?;
            let key = key_value
                .as_str()
                .ok_or_else(|| CodecError::new(ErrorCode::InvalidFormat, MAP_COMPONENT))?;
            let value = pair[1].decode(&mut nested)?;
            map.set(key, value);
        }
        Ok(Value::Map(map))
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        let Value::Map(map) = value else {
            return Err(CodecError::new(ErrorCode::Encode, MAP_COMPONENT).with_detail(
                ErrorDetail::StringMismatch { expected: "map".into(), actual: format!("{value:?}") },
            ));
        };
        if map.len() * 2 != self.schemas.len() {
            return Err(CodecError::new(ErrorCode::Encode, MAP_COMPONENT));
        }
        let mut child = Writer::begin_map();
        for (pair, (key, value)) in self.pairs().zip(map.iter()) {
            pair[0].encode(&mut child, &Value::String(key.to_owned()))?;
            pair[1].encode(&mut child, value)?;
        }
        let bytes = child.finalize()?;
        writer.add_nested(TypeTag::Map, &bytes)
    }

    fn is_nullable(&self) -> bool {
        false
    }
}

const UNORDERED_COMPONENT: &str = "MapUnordered";

/// Name-dispatched map: declared fields are matched against wire keys by
/// name, in whatever order they appear on the wire; undeclared keys are
/// skipped (their values discarded but not rejected).
#[derive(Debug)]
pub struct MapUnordered {
    fields: Vec<(String, Box<dyn Schema>)>,
    optional_map: bool,
}

impl MapUnordered {
    pub fn new(fields: Vec<(String, Box<dyn Schema>)>, optional_map: bool) -> Self {
        MapUnordered { fields, optional_map }
    }

    fn schema_for(&self, name: &str) -> Option<&dyn Schema> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, s)| s.as_ref())
    }
}

impl Schema for MapUnordered {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        let mut nested = open_nested(reader, UNORDERED_COMPONENT)?;
        let mut seen = Vec::new();
        while nested.remaining() > 0 {
            let key = expect_string_key(&mut nested, UNORDERED_COMPONENT)?;
            match self.schema_for(&key) {
                Some(s) => {
                    s.validate(&mut nested)?;
                    seen.push(key);
                }
                None => {
                    crate::decoder::decode_any(&mut nested)?;
                }
            }
        }
        if !self.optional_map {
            for (name, _) in &self.fields {
                if !seen.contains(name) {
                    return Err(CodecError::missing_key(UNORDERED_COMPONENT, name.clone()));
                }
            }
        }
        Ok(())
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let mut nested = open_nested(reader, UNORDERED_COMPONENT)?;
        let mut map = OrderedMap::new();
        while nested.remaining() > 0 {
            let key = expect_string_key(&mut nested, UNORDERED_COMPONENT)?;
            match self.schema_for(&key) {
                Some(s) => {
                    let value = s.decode(&mut nested)?;
                    map.set(&key, value);
                }
                None => {
                    crate::decoder::decode_any(&mut nested)?;
                }
            }
        }
        if !self.optional_map {
            for (name, _) in &self.fields {
                if !map.contains_key(name) {
                    return Err(CodecError::missing_key(UNORDERED_COMPONENT, name.clone()));
                }
            }
        }
        Ok(Value::Map(map))
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        let Value::Map(map) = value else {
            return Err(CodecError::new(ErrorCode::Encode, UNORDERED_COMPONENT));
        };
        let mut child = Writer::begin_map();
        for (name, s) in &self.fields {
            match map.get(name) {
                Some(v) => {
                    child.add_string(name)?;
                    s.encode(&mut child, v)?;
                }
                None if self.optional_map => {}
                None => return Err(CodecError::missing_key(UNORDERED_COMPONENT, name.clone())),
            }
        }
        let bytes = child.finalize()?;
        writer.add_nested(TypeTag::Map, &bytes)
    }

    fn is_nullable(&self) -> bool {
        false
    }
}

const REPEAT_COMPONENT: &str = "MapRepeat";

/// Homogeneous `(key, value)` map bounded by an entry-count range.
#[derive(Debug)]
pub struct MapRepeat {
    key_schema: Box<dyn Schema>,
    value_schema: Box<dyn Schema>,
    min: usize,
    max: Option<usize>,
}

impl MapRepeat {
    pub fn new(key_schema: Box<dyn Schema>, value_schema: Box<dyn Schema>, min: usize, max: Option<usize>) -> Self {
        MapRepeat { key_schema, value_schema, min, max }
    }

    fn check_count(&self, n: usize) -> Result<(), CodecError> {
        if n < self.min || self.max.is_some_and(|m| n > m) {
            return Err(CodecError::new(ErrorCode::ConstraintViolated, REPEAT_COMPONENT).with_detail(
                ErrorDetail::Range { min: Some(self.min as f64), max: self.max.map(|m| m as f64), actual: n as f64 },
            ));
        }
        Ok(())
    }
}

impl Schema for MapRepeat {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        let mut nested = open_nested(reader, REPEAT_COMPONENT)?;
        let mut n = 0usize;
        while nested.remaining() > 0 {
            self.key_schema.validate(&mut nested)?;
            self.value_schema.validate(&mut nested)?;
            n += 1;
        }
        self.check_count(n)
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let mut nested = open_nested(reader, REPEAT_COMPONENT)?;
        let mut map = OrderedMap::new();
        let mut n = 0usize;
        while nested.remaining() > 0 {
            let key = self.key_schema.decode(&mut nested)?;
            let key = key
                .as_str()
                .ok_or_else(|| CodecError::new(ErrorCode::InvalidFormat, REPEAT_COMPONENT))?
                .to_owned();
            let value = self.value_schema.decode(&mut nested)?;
            map.set(&key, value);
            n += 1;
        }
        self.check_count(n)?;
        Ok(Value::Map(map))
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        let Value::Map(map) = value else {
            return Err(CodecError::new(ErrorCode::Encode, REPEAT_COMPONENT));
        };
        self.check_count(map.len())?;
        let mut child = Writer::begin_map();
        for (key, value) in map.iter() {
            self.key_schema.encode(&mut child, &Value::String(key.to_owned()))?;
            self.value_schema.encode(&mut child, value)?;
        }
        let bytes = child.finalize()?;
        writer.add_nested(TypeTag::Map, &bytes)
    }

    fn is_nullable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{schema, Bytes, StringSchema};
    use crate::writer::Writer;

    #[test]
    fn positional_map_round_trips_nested_scenario() {
        let inner = Map::new(vec![
            schema(StringSchema::new(0, false).match_exact("role")),
            schema(Bytes::new(5, false)),
            schema(StringSchema::new(0, false).match_exact("user")),
            schema(Bytes::new(5, false)),
        ])
        .unwrap();
        let outer = Map::new(vec![
            schema(StringSchema::new(0, false).match_exact("meta")),
            schema(inner),
            schema(StringSchema::new(0, false).match_exact("name")),
            schema(StringSchema::new(6, false)),
        ])
        .unwrap();

        let mut inner_map = OrderedMap::new();
        inner_map.set("role", Value::Bytes(b"admin".to_vec()));
        inner_map.set("user", Value::Bytes(b"alice".to_vec()));
        let mut outer_map = OrderedMap::new();
        outer_map.set("meta", Value::Map(inner_map));
        outer_map.set("name", Value::String("gopher".into()));
        let value = Value::Map(outer_map);

        let mut w = Writer::new();
        outer.encode(&mut w, &value).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert_eq!(outer.decode(&mut r).unwrap(), value);
    }

    #[test]
    fn map_repeat_bounds_entry_count() {
        let schema_map = MapRepeat::new(
            schema(StringSchema::new(0, false)),
            schema(crate::schema::Int32::new(false)),
            1,
            Some(3),
        );
        let mut map = OrderedMap::new();
        map.set("a", Value::I32(1));
        let value = Value::Map(map);
        let mut w = Writer::new();
        schema_map.encode(&mut w, &value).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert_eq!(schema_map.decode(&mut r).unwrap(), value);
    }

    #[test]
    fn map_unordered_requires_declared_fields_unless_optional() {
        let m = MapUnordered::new(
            vec![("name".to_owned(), schema(StringSchema::new(0, false)))],
            false,
        );
        let empty = OrderedMap::new();
        let mut w = Writer::new();
        let err = m.encode(&mut w, &Value::Map(empty)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConstraintViolated);
    }
}
