//! Schema-driven encoder producing compact protocol buffers.
//!
//! The encoder mirrors the reader: it walks a value tree in lockstep with
//! the schema, emitting delta-coded field headers, container envelopes, and
//! primitive encodings into a growable buffer. Entries absent from the input
//! struct are simply not written, which is how optionality is realized on
//! the wire.

use crate::{
    schema::{Field, KeySchema, Schema, StructSchema, TType},
    value::{MapKey, Value},
    varint, Error,
};
use bytes::{BufMut, Bytes, BytesMut};
use std::collections::BTreeMap;

/// Encodes a struct value under `schema` into a compact protocol buffer.
///
/// The value must be a [`Value::Struct`]; entries are located by field name,
/// and anything the schema does not mention is ignored.
pub fn encode(value: &Value, schema: &StructSchema) -> Result<Bytes, Error> {
    let Value::Struct(entries) = value else {
        return Err(Error::UnsupportedWrite {
            expected: "struct",
            found: value.type_name(),
        });
    };
    let mut encoder = Encoder::new();
    encoder.write_struct(entries, schema)?;
    Ok(encoder.buf.freeze())
}

struct Encoder {
    buf: BytesMut,
    last_field_id: i16,
}

impl Encoder {
    fn new() -> Self {
        Self {
            buf: BytesMut::new(),
            last_field_id: 0,
        }
    }

    /// Emits a field header: the packed single-byte form when the id delta
    /// fits in the high nibble, otherwise the tag followed by the absolute
    /// id as a zigzag varint.
    fn write_field_header(&mut self, ttype: TType, id: i16) {
        let delta = i32::from(id) - i32::from(self.last_field_id);
        if delta > 0 && delta < 16 {
            self.buf.put_u8(((delta as u8) << 4) | ttype as u8);
        } else {
            self.buf.put_u8(ttype as u8);
            varint::write_i16(id, &mut self.buf);
        }
        self.last_field_id = id;
    }

    fn write_struct(
        &mut self,
        entries: &BTreeMap<String, Value>,
        schema: &StructSchema,
    ) -> Result<(), Error> {
        let saved = std::mem::take(&mut self.last_field_id);
        for (name, field) in schema.fields() {
            let Some(value) = entries.get(name) else {
                continue;
            };
            self.write_field(field, value)?;
        }
        self.buf.put_u8(TType::Stop as u8);
        self.last_field_id = saved;
        Ok(())
    }

    fn write_field(&mut self, field: &Field, value: &Value) -> Result<(), Error> {
        // Booleans fold their value into the header tag.
        if let Schema::Bool = field.schema() {
            let Value::Bool(b) = value else {
                return Err(Error::UnsupportedWrite {
                    expected: "bool",
                    found: value.type_name(),
                });
            };
            let tag = if *b { TType::BoolTrue } else { TType::BoolFalse };
            self.write_field_header(tag, field.id());
            return Ok(());
        }

        self.write_field_header(field.schema().wire_type()?, field.id());
        self.write_value(field.schema(), value)
    }

    fn write_value(&mut self, schema: &Schema, value: &Value) -> Result<(), Error> {
        match (schema, value) {
            // A boolean outside a struct field has nowhere to put its value.
            (Schema::Bool, _) => return Err(Error::InvalidBooleanContext),
            (Schema::Byte, Value::Byte(v)) => self.buf.put_u8(*v as u8),
            (Schema::I16, Value::I16(v)) => varint::write_i16(*v, &mut self.buf),
            (Schema::I32, Value::I32(v)) => varint::write_i32(*v, &mut self.buf),
            (Schema::I64, Value::I64(v)) => varint::write_i64(*v, &mut self.buf),
            (Schema::Double, Value::Double(v)) => self.buf.put_f64_le(*v),
            (Schema::Float, Value::Float(v)) => self.buf.put_f32_le(*v),
            (Schema::String, Value::String(v)) => self.write_bytes(v.as_bytes()),
            (Schema::Binary, Value::Binary(v)) => self.write_bytes(v),
            (Schema::List(item), Value::List(items)) => self.write_items(item, items)?,
            (Schema::Set(item), Value::Set(items)) => self.write_items(item, items)?,
            (Schema::Map(key, value), Value::Map(entries)) => {
                self.write_map(key, value, entries)?
            }
            (Schema::Struct(shape), Value::Struct(entries)) => {
                self.write_struct(entries, shape)?
            }
            (schema, value) => {
                return Err(Error::UnsupportedWrite {
                    expected: schema.type_name(),
                    found: value.type_name(),
                })
            }
        }
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) {
        let len = u32::try_from(data.len()).expect("binary length exceeds u32::MAX");
        varint::write_u32(len, &mut self.buf);
        self.buf.put_slice(data);
    }

    /// Emits a list or set envelope followed by headerless elements. Lengths
    /// below 15 pack into the high nibble next to the element tag.
    fn write_items(&mut self, item: &Schema, items: &[Value]) -> Result<(), Error> {
        let tag = item.wire_type()?;
        let len = u32::try_from(items.len()).expect("container length exceeds u32::MAX");
        if len < 15 {
            self.buf.put_u8(((len as u8) << 4) | tag as u8);
        } else {
            self.buf.put_u8(0xF0 | tag as u8);
            varint::write_u32(len, &mut self.buf);
        }
        for value in items {
            self.write_value(item, value)?;
        }
        Ok(())
    }

    /// Emits a map envelope followed by headerless key/value pairs. An empty
    /// map collapses to a single zero byte.
    fn write_map(
        &mut self,
        key: &KeySchema,
        value: &Schema,
        entries: &BTreeMap<MapKey, Value>,
    ) -> Result<(), Error> {
        if entries.is_empty() {
            self.buf.put_u8(0);
            return Ok(());
        }
        let len = u32::try_from(entries.len()).expect("map length exceeds u32::MAX");
        varint::write_u32(len, &mut self.buf);
        self.buf
            .put_u8((key.wire_type() as u8) << 4 | value.wire_type()? as u8);
        for (k, v) in entries {
            self.write_key(key, k)?;
            self.write_value(value, v)?;
        }
        Ok(())
    }

    fn write_key(&mut self, key: &KeySchema, k: &MapKey) -> Result<(), Error> {
        match (key, k) {
            (KeySchema::String, MapKey::String(s)) => self.write_bytes(s.as_bytes()),
            (KeySchema::I16, MapKey::I16(v)) => varint::write_i16(*v, &mut self.buf),
            (KeySchema::I32, MapKey::I32(v)) => varint::write_i32(*v, &mut self.buf),
            (key, k) => {
                return Err(Error::UnsupportedWrite {
                    expected: key.type_name(),
                    found: k.type_name(),
                })
            }
        }
        Ok(())
    }
}
