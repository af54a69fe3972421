//! `Chain` and `NamedChain`: top-level positional/named schema sequences,
//! operating directly on a buffer's top-level fields (no enclosing `Tuple`
//! container).

use super::Schema;
use crate::error::CodecError;
use crate::ordered_map::OrderedMap;
use crate::reader::SequentialReader;
use crate::value::Value;
use crate::writer::Writer;

const COMPONENT: &str = "Chain";
const NAMED_COMPONENT: &str = "NamedChain";

/// A sequence of schemas applied to a buffer's top-level fields in order.
#[derive(Debug)]
pub struct Chain {
    schemas: Vec<Box<dyn Schema>>,
}

impl Chain {
    pub fn new(schemas: Vec<Box<dyn Schema>>) -> Self {
        Chain { schemas }
    }

    pub fn schemas(&self) -> &[Box<dyn Schema>] {
        &self.schemas
    }
}

impl Schema for Chain {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        for s in &self.schemas {
            if let Err(e) = s.validate(reader) {
                log::debug!("{COMPONENT}: validate failed with {:?}", e.code);
                return Err(e);
            }
        }
        Ok(())
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let mut items = Vec::with_capacity(self.schemas.len());
        for s in &self.schemas {
            match s.decode(reader) {
                Ok(v) => items.push(v),
                Err(e) => {
                    log::debug!("{COMPONENT}: decode failed with {:?}", e.code);
                    return Err(e);
                }
            }
        }
        Ok(Value::Tuple(items))
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        let Value::Tuple(items) = value else {
            log::debug!("{COMPONENT}: encode failed, expected a Tuple value");
            return Err(CodecError::new(crate::error::ErrorCode::Encode, COMPONENT));
        };
        for (s, item) in self.schemas.iter().zip(items) {
            if let Err(e) = s.encode(writer, item) {
                log::debug!("{COMPONENT}: encode failed with {:?}", e.code);
                return Err(e);
            }
        }
        Ok(())
    }

    fn is_nullable(&self) -> bool {
        false
    }
}

/// Like [`Chain`] but decodes/encodes a map keyed by `field_names[i]`
/// instead of a positional list.
#[derive(Debug)]
pub struct NamedChain {
    chain: Chain,
    field_names: Vec<String>,
}

impl NamedChain {
    pub fn new(chain: Chain, field_names: Vec<String>) -> Result<Self, CodecError> {
        if field_names.len() != chain.schemas().len() {
            return Err(CodecError::new(crate::error::ErrorCode::ConstraintViolated, NAMED_COMPONENT));
        }
        Ok(NamedChain { chain, field_names })
    }
}

impl Schema for NamedChain {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        self.chain.validate(reader)
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        let mut map = OrderedMap::with_capacity(self.field_names.len());
        for (name, s) in self.field_names.iter().zip(self.chain.schemas()) {
            match s.decode(reader) {
                Ok(v) => map.set(name, v),
                Err(e) => {
                    log::debug!("{NAMED_COMPONENT}: decode failed with {:?}", e.code);
                    return Err(e);
                }
            }
        }
        Ok(Value::Map(map))
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        let Value::Map(map) = value else {
            log::debug!("{NAMED_COMPONENT}: encode failed, expected a Map value");
            return Err(CodecError::new(crate::error::ErrorCode::Encode, NAMED_COMPONENT));
        };
        for (name, s) in self.field_names.iter().zip(self.chain.schemas()) {
            let result = match map.get(name) {
                Some(v) => s.encode(writer, v),
                None if s.is_nullable() => {
                    // Writer has no direct "write null for arbitrary tag"
                    // helper at this level; encode an explicit Null and
                    // let the child schema's null handling take it.
                    s.encode(writer, &Value::Null)
                }
                None => Err(CodecError::missing_key(NAMED_COMPONENT, name.clone())),
            };
            if let Err(e) = result {
                log::debug!("{NAMED_COMPONENT}: encode failed with {:?}", e.code);
                return Err(e);
            }
        }
        Ok(())
    }

    fn is_nullable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{schema, Bool, Float32, Int16, Int64};
    use crate::writer::Writer;

    #[test]
    fn chain_validates_and_decodes_scenario_three_prefix() {
        let chain = Chain::new(vec![
            schema(Int16::new(false).range(Some(0), Some(20000))),
            schema(Float32::new(false)),
            schema(Int64::new(false)),
            schema(Bool::new(false)),
        ]);

        let mut w = Writer::new();
        w.add_i16(12345).unwrap();
        w.add_f32(3.14).unwrap();
        w.add_i64(9876543210).unwrap();
        w.add_bool(true).unwrap();
        let buf = w.finalize().unwrap();

        let mut r = SequentialReader::new(&buf).unwrap();
        assert!(chain.validate(&mut r).is_ok());

        let mut r = SequentialReader::new(&buf).unwrap();
        let decoded = chain.decode(&mut r).unwrap();
        assert_eq!(
            decoded,
            Value::Tuple(vec![Value::I16(12345), Value::F32(3.14), Value::I64(9876543210), Value::Bool(true)])
        );
    }

    #[test]
    fn named_chain_round_trips_as_map() {
        let chain = Chain::new(vec![schema(Int16::new(false)), schema(Bool::new(false))]);
        let named = NamedChain::new(chain, vec!["age".into(), "active".into()]).unwrap();

        let mut map = OrderedMap::new();
        map.set("age", Value::I16(5));
        map.set("active", Value::Bool(false));
        let value = Value::Map(map);

        let mut w = Writer::new();
        named.encode(&mut w, &value).unwrap();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        assert_eq!(named.decode(&mut r).unwrap(), value);
    }
}
