//! Schema-driven decoder for compact protocol buffers.
//!
//! The decoder walks a fully-loaded buffer in lockstep with a schema: field
//! headers carry delta-coded identifiers scoped to the enclosing struct,
//! containers carry their own envelopes, and scalars use the primitive
//! encodings. Fields present on the wire but absent from the schema are
//! skipped, which is what makes old schemas forward compatible with newer
//! writers.

use crate::{
    schema::{KeySchema, Schema, StructSchema, TType},
    value::{MapKey, Value},
    varint, Error,
};
use bytes::{Buf, Bytes};
use std::collections::BTreeMap;
use tracing::debug;

/// Decodes a buffer into the value tree described by `schema`.
///
/// The buffer is consumed up to the `Stop` byte of the outermost struct;
/// trailing bytes are tolerated. A schema with no fields is rejected with
/// [`Error::EmptyStructRead`].
pub fn decode<B: Buf>(buf: B, schema: &StructSchema) -> Result<Value, Error> {
    if schema.is_empty() {
        return Err(Error::EmptyStructRead);
    }
    Decoder::new(buf).read_struct(schema)
}

/// Cursor plus the field-id state shared by schema-driven decoding, the skip
/// path, and the schema-less dump in [`crate::pretty`].
pub(crate) struct Decoder<B: Buf> {
    buf: B,
    last_field_id: i16,
}

impl<B: Buf> Decoder<B> {
    pub(crate) fn new(buf: B) -> Self {
        Self {
            buf,
            last_field_id: 0,
        }
    }

    // ---------- Primitives ----------

    fn at_least(&self, len: usize) -> Result<(), Error> {
        if self.buf.remaining() < len {
            return Err(Error::EndOfBuffer);
        }
        Ok(())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, Error> {
        self.at_least(1)?;
        Ok(self.buf.get_u8())
    }

    pub(crate) fn read_i16(&mut self) -> Result<i16, Error> {
        varint::read_i16(&mut self.buf)
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32, Error> {
        varint::read_i32(&mut self.buf)
    }

    pub(crate) fn read_i64(&mut self) -> Result<i64, Error> {
        varint::read_i64(&mut self.buf)
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64, Error> {
        self.at_least(8)?;
        Ok(self.buf.get_f64_le())
    }

    pub(crate) fn read_f32(&mut self) -> Result<f32, Error> {
        self.at_least(4)?;
        Ok(self.buf.get_f32_le())
    }

    /// Reads a varint length prefix.
    pub(crate) fn read_len(&mut self) -> Result<usize, Error> {
        Ok(varint::read_u32(&mut self.buf)? as usize)
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<Bytes, Error> {
        self.at_least(len)?;
        Ok(self.buf.copy_to_bytes(len))
    }

    pub(crate) fn read_string(&mut self) -> Result<String, Error> {
        let len = self.read_len()?;
        self.at_least(len)?;
        let mut raw = vec![0u8; len];
        self.buf.copy_to_slice(&mut raw);
        Ok(String::from_utf8(raw)?)
    }

    // ---------- Framing ----------

    /// Opens a struct frame: saves the caller's field-id state and resets it.
    /// The returned value must be handed back to [`Self::exit_struct`] once
    /// the struct's `Stop` byte has been consumed.
    pub(crate) fn enter_struct(&mut self) -> i16 {
        std::mem::take(&mut self.last_field_id)
    }

    pub(crate) fn exit_struct(&mut self, saved: i16) {
        self.last_field_id = saved;
    }

    /// Reads a field header. `None` is the `Stop` byte ending the struct.
    ///
    /// A zero delta means the absolute field id follows as a zigzag varint;
    /// otherwise the delta accumulates onto the previous id in this frame.
    pub(crate) fn read_field(&mut self) -> Result<Option<(TType, i16)>, Error> {
        let byte = self.read_u8()?;
        if byte == 0 {
            return Ok(None);
        }
        let ttype = TType::from_wire(byte & 0x0F)?;
        let delta = byte >> 4;
        let id = if delta == 0 {
            self.read_i16()?
        } else {
            self.last_field_id.wrapping_add(i16::from(delta))
        };
        self.last_field_id = id;
        Ok(Some((ttype, id)))
    }

    /// Reads a list or set envelope: element tag plus length, with lengths of
    /// 15 and above spilled into a trailing varint.
    pub(crate) fn read_list_header(&mut self) -> Result<(TType, usize), Error> {
        let byte = self.read_u8()?;
        let elem = TType::from_wire(byte & 0x0F)?;
        let mut len = (byte >> 4) as usize;
        if len == 0x0F {
            len = self.read_len()?;
        }
        Ok((elem, len))
    }

    /// Reads a map envelope. An empty map is a bare zero length with no types
    /// byte, reported here as `(0, Stop, Stop)`.
    pub(crate) fn read_map_header(&mut self) -> Result<(usize, TType, TType), Error> {
        let len = self.read_len()?;
        if len == 0 {
            return Ok((0, TType::Stop, TType::Stop));
        }
        let byte = self.read_u8()?;
        Ok((len, TType::from_wire(byte >> 4)?, TType::from_wire(byte & 0x0F)?))
    }

    // ---------- Schema-driven decoding ----------

    fn read_struct(&mut self, schema: &StructSchema) -> Result<Value, Error> {
        let saved = self.enter_struct();
        let mut entries = BTreeMap::new();
        while let Some((wire, id)) = self.read_field()? {
            let Some((name, field)) = schema.by_id(id) else {
                debug!(field = id, tag = wire.name(), "skipping unknown field");
                self.skip(wire)?;
                continue;
            };
            if !field.schema().matches(wire) {
                return Err(Error::TypeMismatch {
                    expected: field.schema().type_name(),
                    found: wire,
                });
            }
            // Boolean fields carry their value in the header tag.
            let value = match wire {
                TType::BoolTrue => Value::Bool(true),
                TType::BoolFalse => Value::Bool(false),
                _ => self.read_value(field.schema())?,
            };
            entries.insert(name.to_string(), value);
        }
        self.exit_struct(saved);
        Ok(Value::Struct(entries))
    }

    fn read_value(&mut self, schema: &Schema) -> Result<Value, Error> {
        Ok(match schema {
            Schema::Bool => return Err(Error::InvalidBooleanContext),
            Schema::Byte => Value::Byte(self.read_u8()? as i8),
            Schema::I16 => Value::I16(self.read_i16()?),
            Schema::I32 => Value::I32(self.read_i32()?),
            Schema::I64 => Value::I64(self.read_i64()?),
            Schema::Double => Value::Double(self.read_f64()?),
            Schema::Float => Value::Float(self.read_f32()?),
            Schema::String => Value::String(self.read_string()?),
            Schema::Binary => {
                let len = self.read_len()?;
                Value::Binary(self.read_bytes(len)?)
            }
            Schema::List(item) => Value::List(self.read_items(item)?),
            Schema::Set(item) => Value::Set(self.read_items(item)?),
            Schema::Map(key, value) => {
                let (len, ktag, vtag) = self.read_map_header()?;
                let mut entries = BTreeMap::new();
                if len > 0 {
                    if !key.matches(ktag) {
                        return Err(Error::TypeMismatch {
                            expected: key.type_name(),
                            found: ktag,
                        });
                    }
                    if !value.matches(vtag) {
                        return Err(Error::TypeMismatch {
                            expected: value.type_name(),
                            found: vtag,
                        });
                    }
                    for _ in 0..len {
                        let k = self.read_key(key)?;
                        let v = self.read_value(value)?;
                        entries.insert(k, v);
                    }
                }
                Value::Map(entries)
            }
            Schema::Struct(shape) => self.read_struct(shape)?,
        })
    }

    fn read_items(&mut self, item: &Schema) -> Result<Vec<Value>, Error> {
        let (elem, len) = self.read_list_header()?;
        if !item.matches(elem) {
            return Err(Error::TypeMismatch {
                expected: item.type_name(),
                found: elem,
            });
        }
        let mut items = Vec::new();
        for _ in 0..len {
            items.push(self.read_value(item)?);
        }
        Ok(items)
    }

    fn read_key(&mut self, key: &KeySchema) -> Result<MapKey, Error> {
        Ok(match key {
            KeySchema::String => MapKey::String(self.read_string()?),
            KeySchema::I16 => MapKey::I16(self.read_i16()?),
            KeySchema::I32 => MapKey::I32(self.read_i32()?),
        })
    }

    // ---------- Skip ----------

    /// Reads and discards a value of the observed wire tag. Struct skips open
    /// their own field-id frame so the delta state of the enclosing struct
    /// survives.
    fn skip(&mut self, wire: TType) -> Result<(), Error> {
        match wire {
            TType::Stop => return Err(Error::UnknownType(TType::Stop as u8)),
            // The value was folded into the field header.
            TType::BoolTrue | TType::BoolFalse => {}
            TType::Byte => {
                self.at_least(1)?;
                self.buf.advance(1);
            }
            TType::I16 | TType::I32 | TType::I64 => {
                varint::read_u64(&mut self.buf)?;
            }
            TType::Double => {
                self.at_least(8)?;
                self.buf.advance(8);
            }
            TType::Float => {
                self.at_least(4)?;
                self.buf.advance(4);
            }
            TType::Binary => {
                let len = self.read_len()?;
                self.at_least(len)?;
                self.buf.advance(len);
            }
            TType::List | TType::Set => {
                let (elem, len) = self.read_list_header()?;
                for _ in 0..len {
                    self.skip(elem)?;
                }
            }
            TType::Map => {
                let (len, ktag, vtag) = self.read_map_header()?;
                for _ in 0..len {
                    self.skip(ktag)?;
                    self.skip(vtag)?;
                }
            }
            TType::Struct => {
                let saved = self.enter_struct();
                while let Some((wire, _)) = self.read_field()? {
                    self.skip(wire)?;
                }
                self.exit_struct(saved);
            }
        }
        Ok(())
    }
}
