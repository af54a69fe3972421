//! `Repeat`: cycles a fixed sequence of child schemas across as many wire
//! fields as are present, bounded by a min/max cycle count.

use super::Schema;
use crate::error::{CodecError, ErrorCode};
use crate::reader::SequentialReader;
use crate::value::Value;
use crate::writer::Writer;

const COMPONENT: &str = "Repeat";

/// Repeats `schemas` as a unit, `min..=max` times (unbounded above when
/// `max` is `None`). Each cycle consumes one wire field per schema,
/// directly off whatever reader it's given — a `Repeat` does not open its
/// own nested container, so it composes naturally as a `Chain` top-level
/// schema or as a spliced `Tuple` child.
#[derive(Debug)]
pub struct Repeat {
    schemas: Vec<Box<dyn Schema>>,
    min_cycles: usize,
    max_cycles: Option<usize>,
}

impl Repeat {
    pub fn new(schemas: Vec<Box<dyn Schema>>, min_cycles: usize, max_cycles: Option<usize>) -> Self {
        assert!(!schemas.is_empty(), "Repeat requires at least one inner schema");
        Repeat { schemas, min_cycles, max_cycles }
    }

    pub fn cycle_len(&self) -> usize {
        self.schemas.len()
    }

    pub fn max_elements(&self) -> Option<usize> {
        self.max_cycles.map(|c| c * self.cycle_len())
    }

    fn check_cycles(&self, cycles: usize) -> Result<(), CodecError> {
        if cycles < self.min_cycles || self.max_cycles.is_some_and(|m| cycles > m) {
            return Err(CodecError::new(ErrorCode::ConstraintViolated, COMPONENT).with_detail(
                crate::error::ErrorDetail::Range {
                    min: Some(self.min_cycles as f64),
                    max: self.max_cycles.map(|m| m as f64),
                    actual: cycles as f64,
                },
            ));
        }
        Ok(())
    }

    /// Validate cycles directly against `reader`, stopping when `max` is
    /// hit or the reader runs out of fields.
    pub fn validate_elements(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        let mut cycles = 0usize;
        loop {
            if self.max_cycles.is_some_and(|m| cycles >= m) {
                break;
            }
            if reader.remaining() == 0 {
                break;
            }
            for child in &self.schemas {
                child.validate(reader)?;
            }
            cycles += 1;
        }
        self.check_cycles(cycles)
    }

    /// Decode cycles directly off `reader` into a flat list.
    pub fn decode_elements(&self, reader: &mut SequentialReader<'_>) -> Result<Vec<Value>, CodecError> {
        let mut items = Vec::new();
        let mut cycles = 0usize;
        loop {
            if self.max_cycles.is_some_and(|m| cycles >= m) {
                break;
            }
            if reader.remaining() == 0 {
                break;
            }
            for child in &self.schemas {
                items.push(child.decode(reader)?);
            }
            cycles += 1;
        }
        self.check_cycles(cycles)?;
        Ok(items)
    }

    /// Encode `items` as consecutive cycles of the inner schemas.
    pub fn encode_elements(&self, writer: &mut Writer, items: &[Value]) -> Result<(), CodecError> {
        if items.len() % self.cycle_len() != 0 {
            return Err(CodecError::new(ErrorCode::Encode, COMPONENT));
        }
        let cycles = items.len() / self.cycle_len();
        self.check_cycles(cycles)?;
        for (child, value) in self.schemas.iter().cycle().zip(items) {
            child.encode(writer, value)?;
        }
        Ok(())
    }
}

impl Schema for Repeat {
    fn validate(&self, reader: &mut SequentialReader<'_>) -> Result<(), CodecError> {
        self.validate_elements(reader)
    }

    fn decode(&self, reader: &mut SequentialReader<'_>) -> Result<Value, CodecError> {
        Ok(Value::Tuple(self.decode_elements(reader)?))
    }

    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Tuple(items) => self.encode_elements(writer, items),
            other => Err(CodecError::new(ErrorCode::Encode, COMPONENT).with_detail(
                crate::error::ErrorDetail::StringMismatch {
                    expected: "tuple".into(),
                    actual: format!("{other:?}"),
                },
            )),
        }
    }

    fn is_nullable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{schema, Bool, Int16, Int32, StringSchema};
    use crate::writer::Writer;

    fn tuple_a() -> Box<dyn Schema> {
        use super::super::tuple::TupleChild;
        schema(
            super::super::Tuple::new(
                vec![
                    TupleChild::Plain(schema(Int32::new(false))),
                    TupleChild::Plain(schema(Bool::new(false))),
                    TupleChild::Plain(schema(StringSchema::new(0, false))),
                ],
                false,
                false,
                false,
            )
            .unwrap(),
        )
    }

    fn tuple_b() -> Box<dyn Schema> {
        use super::super::tuple::TupleChild;
        schema(
            super::super::Tuple::new(
                vec![
                    TupleChild::Plain(schema(Int16::new(false))),
                    TupleChild::Plain(schema(Bool::new(false))),
                    TupleChild::Plain(schema(StringSchema::new(0, false))),
                ],
                false,
                false,
                false,
            )
            .unwrap(),
        )
    }

    #[test]
    fn decodes_four_alternating_tuples() {
        let mut w = Writer::new();
        let mut t1 = Writer::begin_tuple();
        t1.add_i32(2025).unwrap();
        t1.add_bool(false).unwrap();
        t1.add_string("az").unwrap();
        w.add_nested(crate::tag::TypeTag::Tuple, &t1.finalize().unwrap()).unwrap();

        let mut t2 = Writer::begin_tuple();
        t2.add_i16(7).unwrap();
        t2.add_bool(true).unwrap();
        t2.add_string("go").unwrap();
        w.add_nested(crate::tag::TypeTag::Tuple, &t2.finalize().unwrap()).unwrap();

        let mut t3 = Writer::begin_tuple();
        t3.add_i32(111).unwrap();
        t3.add_bool(true).unwrap();
        t3.add_string("xx").unwrap();
        w.add_nested(crate::tag::TypeTag::Tuple, &t3.finalize().unwrap()).unwrap();

        let mut t4 = Writer::begin_tuple();
        t4.add_i16(222).unwrap();
        t4.add_bool(false).unwrap();
        t4.add_string("yy").unwrap();
        w.add_nested(crate::tag::TypeTag::Tuple, &t4.finalize().unwrap()).unwrap();

        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();

        let repeat = Repeat::new(vec![tuple_a(), tuple_b()], 2, Some(2));
        let decoded = repeat.decode(&mut r).unwrap();
        let Value::Tuple(items) = decoded else { panic!("expected tuple") };
        assert_eq!(items.len(), 4);
    }

    #[test]
    fn underflow_is_constraint_violated() {
        let w = Writer::new();
        let buf = w.finalize().unwrap();
        let mut r = SequentialReader::new(&buf).unwrap();
        let repeat = Repeat::new(vec![schema(Int32::new(false))], 1, None);
        let err = repeat.validate(&mut r).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConstraintViolated);
    }
}
