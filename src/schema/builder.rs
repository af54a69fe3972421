//! Declarative JSON → [`Schema`] construction.
//!
//! A description is a small JSON tree (see the crate docs for the exact
//! shape); [`SchemaBuilder::build`] dispatches on its `type` field to a
//! constructor, recursing into any child descriptions under `schema`.
//! Unknown `type` strings fall through to a user-registered custom
//! builder.

use super::repeat::Repeat;
use super::tuple::TupleChild;
use super::{
    schema, Bool, Bytes, Chain, Color, Date, Email, Enum, Float32, Float64, Int16, Int32, Int64, Int8, Lang, Map,
    MapRepeat, MapUnordered, MultiCheck, NamedChain, Number, Schema, StringSchema, Tuple, TupleNamed, Uri,
};
use crate::error::{CodecError, ErrorCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A custom schema constructor registered under a user-defined `type`
/// name.
pub type BuilderFn = Arc<dyn Fn(&SchemaBuilder, &serde_json::Value) -> Result<Box<dyn Schema>, CodecError> + Send + Sync>;

const COMPONENT: &str = "SchemaBuilder";

/// Builds [`Schema`] trees from declarative JSON descriptions, with a
/// registry for user-defined `type` names.
#[derive(Clone, Default)]
pub struct SchemaBuilder {
    registry: Arc<Mutex<HashMap<String, BuilderFn>>>,
}

fn field_str<'a>(desc: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    desc.get(key).and_then(|v| v.as_str())
}

fn field_bool(desc: &serde_json::Value, key: &str, default: bool) -> bool {
    desc.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
}

fn field_i64(desc: &serde_json::Value, key: &str) -> Option<i64> {
    desc.get(key).and_then(|v| v.as_i64())
}

fn field_f64(desc: &serde_json::Value, key: &str) -> Option<f64> {
    desc.get(key).and_then(|v| v.as_f64())
}

fn field_i32(desc: &serde_json::Value, key: &str, default: i32) -> i32 {
    desc.get(key).and_then(|v| v.as_i64()).map(|v| v as i32).unwrap_or(default)
}

fn string_list(desc: &serde_json::Value, key: &str) -> Result<Vec<String>, CodecError> {
    desc.get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| CodecError::new(ErrorCode::ConstraintViolated, COMPONENT).with_field(key.to_owned()))?
        .iter()
        .map(|v| {
            v.as_str()
                .map(|s| s.to_owned())
                .ok_or_else(|| CodecError::new(ErrorCode::ConstraintViolated, COMPONENT))
        })
        .collect()
}

impl SchemaBuilder {
    pub fn new() -> Self {
        SchemaBuilder { registry: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Register a constructor for a custom `type` name. Fails if `name`
    /// is already registered.
    pub fn register(&self, name: impl Into<String>, ctor: BuilderFn) -> Result<(), CodecError> {
        let name = name.into();
        let mut registry = self.registry.lock().unwrap();
        if registry.contains_key(&name) {
            return Err(CodecError::new(ErrorCode::ConstraintViolated, COMPONENT).with_field(name));
        }
        log::trace!("{COMPONENT}: registered custom type {name:?}");
        registry.insert(name, ctor);
        Ok(())
    }

    fn child(&self, desc: &serde_json::Value, key: &str) -> Result<Box<dyn Schema>, CodecError> {
        let child_desc = desc
            .get(key)
            .ok_or_else(|| CodecError::new(ErrorCode::ConstraintViolated, COMPONENT).with_field(key.to_owned()))?;
        self.build(child_desc)
    }

    fn children(&self, desc: &serde_json::Value, key: &str) -> Result<Vec<Box<dyn Schema>>, CodecError> {
        desc.get(key)
            .and_then(|v| v.as_array())
            .ok_or_else(|| CodecError::new(ErrorCode::ConstraintViolated, COMPONENT).with_field(key.to_owned()))?
            .iter()
            .map(|child_desc| self.build(child_desc))
            .collect()
    }

    fn tuple_children(&self, desc: &serde_json::Value, key: &str) -> Result<Vec<TupleChild>, CodecError> {
        desc.get(key)
            .and_then(|v| v.as_array())
            .ok_or_else(|| CodecError::new(ErrorCode::ConstraintViolated, COMPONENT).with_field(key.to_owned()))?
            .iter()
            .map(|child_desc| self.build_tuple_child(child_desc))
            .collect()
    }

    fn build_tuple_child(&self, desc: &serde_json::Value) -> Result<TupleChild, CodecError> {
        if field_str(desc, "type") == Some("repeat") {
            Ok(TupleChild::Repeated(self.build_repeat(desc)?))
        } else {
            Ok(TupleChild::Plain(self.build(desc)?))
        }
    }

    fn build_repeat(&self, desc: &serde_json::Value) -> Result<Repeat, CodecError> {
        let schemas = self.children(desc, "schema")?;
        let min = field_i64(desc, "min").unwrap_or(0).max(0) as usize;
        let max = field_i64(desc, "max").map(|v| v.max(0) as usize);
        Ok(Repeat::new(schemas, min, max))
    }

    /// Build a [`Schema`] from a JSON description, dispatching on `type`.
    pub fn build(&self, desc: &serde_json::Value) -> Result<Box<dyn Schema>, CodecError> {
        let ty = field_str(desc, "type")
            .ok_or_else(|| CodecError::new(ErrorCode::ConstraintViolated, COMPONENT).with_field("type"))?;
        let nullable = field_bool(desc, "nullable", false);
        log::debug!("{COMPONENT}: building type {ty:?}");

        match ty {
            "bool" => Ok(schema(Bool::new(nullable))),
            "int8" => Ok(schema(Int8::new(nullable))),
            "int16" => Ok(self.ranged_int16(desc, nullable)),
            "int32" => Ok(self.ranged_int32(desc, nullable)),
            "int64" => Ok(self.ranged_int64(desc, nullable)),
            "float32" => Ok(schema(Float32::new(nullable))),
            "float64" => Ok(schema(Float64::new(nullable))),
            "string" => Ok(self.build_string(desc, nullable)),
            "bytes" => Ok(schema(Bytes::new(field_i32(desc, "width", 0), nullable))),
            "email" => Ok(schema(Email::new(nullable))),
            "uri" => Ok(schema(Uri::new(nullable))),
            "lang" => Ok(schema(Lang::new(nullable))),
            "color" => Ok(schema(Color::new(nullable))),
            "date" => Ok(schema(Date::new(field_i64(desc, "date_from"), field_i64(desc, "date_to"), nullable))),
            "enum" => Ok(schema(Enum::new(string_list(desc, "names")?, nullable))),
            "multicheck" => Ok(schema(MultiCheck::new(string_list(desc, "names")?))),
            "number" => Ok(self.build_number(desc, nullable, false)),
            "numberString" => Ok(self.build_number(desc, nullable, true)),
            "any" => Ok(schema(AnySchema { nullable })),
            "tuple" => self.build_tuple(desc, nullable),
            "repeat" => Ok(schema(self.build_repeat(desc)?)),
            "map" => Ok(schema(Map::new(self.children(desc, "schema")?)?)),
            "mapUnordered" => self.build_map_unordered(desc),
            "mapRepeat" => self.build_map_repeat(desc),
            other => self.build_custom(other, desc),
        }
    }

    fn ranged_int16(&self, desc: &serde_json::Value, nullable: bool) -> Box<dyn Schema> {
        let base = Int16::new(nullable);
        match (field_i64(desc, "min"), field_i64(desc, "max")) {
            (None, None) => schema(base),
            (min, max) => schema(base.range(min, max)),
        }
    }

    fn ranged_int32(&self, desc: &serde_json::Value, nullable: bool) -> Box<dyn Schema> {
        let base = Int32::new(nullable);
        match (field_i64(desc, "min"), field_i64(desc, "max")) {
            (None, None) => schema(base),
            (min, max) => schema(base.range(min, max)),
        }
    }

    fn ranged_int64(&self, desc: &serde_json::Value, nullable: bool) -> Box<dyn Schema> {
        let base = Int64::new(nullable);
        match (field_i64(desc, "min"), field_i64(desc, "max")) {
            (None, None) => schema(base),
            (min, max) => schema(base.range(min, max)),
        }
    }

    fn build_string(&self, desc: &serde_json::Value, nullable: bool) -> Box<dyn Schema> {
        let width = field_i32(desc, "width", 0);
        let mut base = StringSchema::new(width, nullable);
        if let Some(default) = field_str(desc, "decode_default") {
            base = base.with_default(default);
        }
        if let Some(exact) = field_str(desc, "exact") {
            return Box::new(base.match_exact(exact));
        }
        if let Some(prefix) = field_str(desc, "prefix") {
            return Box::new(base.prefix(prefix));
        }
        if let Some(suffix) = field_str(desc, "suffix") {
            return Box::new(base.suffix(suffix));
        }
        if let Some(pattern) = field_str(desc, "pattern") {
            if let Ok(checked) = base.clone().pattern(pattern) {
                return Box::new(checked);
            }
        }
        Box::new(base)
    }

    fn build_number(&self, desc: &serde_json::Value, nullable: bool, as_string: bool) -> Box<dyn Schema> {
        let mut number = Number::new(nullable).range(field_f64(desc, "min"), field_f64(desc, "max"));
        if as_string {
            number = number.as_string();
        }
        schema(number)
    }

    fn build_tuple(&self, desc: &serde_json::Value, nullable: bool) -> Result<Box<dyn Schema>, CodecError> {
        let variable_length = field_bool(desc, "variable_length", false);
        let flatten = field_bool(desc, "flatten", false);
        let schemas = self.tuple_children(desc, "schema")?;
        if let Some(names) = desc.get("field_names") {
            let names: Vec<String> = names
                .as_array()
                .ok_or_else(|| CodecError::new(ErrorCode::ConstraintViolated, COMPONENT))?
                .iter()
                .map(|v| v.as_str().unwrap_or_default().to_owned())
                .collect();
            Ok(schema(TupleNamed::new(schemas, names, nullable, variable_length, flatten)?))
        } else {
            Ok(schema(Tuple::new(schemas, nullable, variable_length, flatten)?))
        }
    }

    fn build_map_unordered(&self, desc: &serde_json::Value) -> Result<Box<dyn Schema>, CodecError> {
        let optional_map = field_bool(desc, "optional_map", false);
        let fields_desc = desc
            .get("fields")
            .and_then(|v| v.as_object())
            .ok_or_else(|| CodecError::new(ErrorCode::ConstraintViolated, COMPONENT).with_field("fields"))?;
        let mut fields = Vec::with_capacity(fields_desc.len());
        for (name, child_desc) in fields_desc {
            fields.push((name.clone(), self.build(child_desc)?));
        }
        Ok(schema(MapUnordered::new(fields, optional_map)))
    }

    fn build_map_repeat(&self, desc: &serde_json::Value) -> Result<Box<dyn Schema>, CodecError> {
        let key_schema = self.child(desc, "key_schema")?;
        let value_schema = self.child(desc, "value_schema")?;
        let min = field_i64(desc, "min").unwrap_or(0).max(0) as usize;
        let max = field_i64(desc, "max").map(|v| v.max(0) as usize);
        Ok(schema(MapRepeat::new(key_schema, value_schema, min, max)))
    }

    fn build_custom(&self, name: &str, desc: &serde_json::Value) -> Result<Box<dyn Schema>, CodecError> {
        let ctor = {
            let registry = self.registry.lock().unwrap();
            registry.get(name).cloned()
        };
        match ctor {
            Some(ctor) => {
                log::trace!("{COMPONENT}: dispatching registered type {name:?}");
                ctor(self, desc)
            }
            None => {
                log::trace!("{COMPONENT}: no registered constructor for {name:?}");
                Err(CodecError::new(ErrorCode::ConstraintViolated, COMPONENT).with_field(name.to_owned()))
            }
        }
    }

    /// Build a top-level [`Chain`] from an array of field descriptions.
    pub fn build_chain(&self, descs: &[serde_json::Value]) -> Result<Chain, CodecError> {
        let schemas = descs.iter().map(|d| self.build(d)).collect::<Result<Vec<_>, _>>()?;
        Ok(Chain::new(schemas))
    }

    /// Like [`SchemaBuilder::build_chain`] but pairs each field with a
    /// name, producing a [`NamedChain`].
    pub fn build_named_chain(
        &self,
        descs: &[serde_json::Value],
        field_names: Vec<String>,
    ) -> Result<NamedChain, CodecError> {
        NamedChain::new(self.build_chain(descs)?, field_names)
    }
}

/// Passthrough schema matching the `any` builder type: decodes whatever
/// dynamic value is on the wire via the generic decoder.
#[derive(Debug, Clone, Copy)]
struct AnySchema {
    nullable: bool,
}

impl Schema for AnySchema {
    fn validate(&self, reader: &mut crate::reader::SequentialReader<'_>) -> Result<(), CodecError> {
        crate::decoder::decode_any(reader).map(|_| ())
    }

    fn decode(&self, reader: &mut crate::reader::SequentialReader<'_>) -> Result<crate::value::Value, CodecError> {
        crate::decoder::decode_any(reader)
    }

    fn encode(&self, writer: &mut crate::writer::Writer, value: &crate::value::Value) -> Result<(), CodecError> {
        writer.add_value(value)
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordered_map::OrderedMap;
    use crate::reader::SequentialReader;
    use crate::value::Value;
    use crate::writer::Writer;

    #[test]
    fn builds_primitive_from_json() {
        let builder = SchemaBuilder::new();
        let desc: serde_json::Value = serde_json::json!({ "type": "int32" });
        let schema = builder.build(&desc).unwrap();

        let mut w = Writer::new();
        w.add_i32(42).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert_eq!(schema.decode(&mut r).unwrap(), Value::I32(42));
    }

    #[test]
    fn builds_ranged_int_and_rejects_out_of_bounds() {
        let builder = SchemaBuilder::new();
        let desc: serde_json::Value = serde_json::json!({ "type": "int16", "min": 0, "max": 100 });
        let schema = builder.build(&desc).unwrap();

        let mut w = Writer::new();
        w.add_i16(500).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert!(schema.decode(&mut r).is_err());
    }

    #[test]
    fn custom_type_requires_registration() {
        let builder = SchemaBuilder::new();
        let desc: serde_json::Value = serde_json::json!({ "type": "geo_point" });
        assert!(builder.build(&desc).is_err());

        builder
            .register(
                "geo_point",
                Arc::new(|_b: &SchemaBuilder, _d: &serde_json::Value| Ok(schema(Float64::new(false)))),
            )
            .unwrap();
        assert!(builder.build(&desc).is_ok());
    }

    #[test]
    fn duplicate_registration_fails() {
        let builder = SchemaBuilder::new();
        let ctor: BuilderFn = Arc::new(|_b: &SchemaBuilder, _d: &serde_json::Value| Ok(schema(Bool::new(false))));
        builder.register("flag", ctor.clone()).unwrap();
        assert!(builder.register("flag", ctor).is_err());
    }

    #[test]
    fn builds_nested_map_from_json() {
        let builder = SchemaBuilder::new();
        let desc = serde_json::json!({
            "type": "map",
            "schema": [
                { "type": "string", "exact": "name" },
                { "type": "string" }
            ]
        });
        let schema = builder.build(&desc).unwrap();
        let mut map = OrderedMap::new();
        map.set("name", Value::String("gopher".into()));
        let value = Value::Map(map);

        let mut w = Writer::new();
        schema.encode(&mut w, &value).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert_eq!(schema.decode(&mut r).unwrap(), value);
    }
}
