//! Schema-less diagnostic dump of a compact protocol buffer.
//!
//! Walks a buffer using only the wire framing (field headers, container
//! envelopes, scalar widths) and renders everything it finds, so a payload
//! can be inspected even when its schema is unknown or suspected to be
//! corrupt. Structs are numbered in the order they are encountered.

use crate::{reader::Decoder, schema::TType, Error};
use bytes::Buf;
use std::fmt::Write;

/// Renders the outermost struct of `buf` and everything beneath it.
pub fn dump<B: Buf>(buf: B) -> Result<String, Error> {
    let mut printer = Printer {
        decoder: Decoder::new(buf),
        out: String::new(),
        structs: 0,
    };
    printer.dump_struct(0)?;
    printer.out.push('\n');
    Ok(printer.out)
}

struct Printer<B: Buf> {
    decoder: Decoder<B>,
    out: String,
    structs: u32,
}

impl<B: Buf> Printer<B> {
    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str("  ");
        }
    }

    fn dump_struct(&mut self, depth: usize) -> Result<(), Error> {
        let label = self.structs;
        self.structs += 1;
        let _ = writeln!(self.out, "struct #{label} {{");

        let saved = self.decoder.enter_struct();
        while let Some((wire, id)) = self.decoder.read_field()? {
            self.indent(depth + 1);
            let _ = write!(self.out, "field {id} ({}): ", wire.name());
            self.dump_value(wire, depth + 1)?;
            self.out.push('\n');
        }
        self.decoder.exit_struct(saved);

        self.indent(depth);
        self.out.push('}');
        Ok(())
    }

    fn dump_value(&mut self, wire: TType, depth: usize) -> Result<(), Error> {
        match wire {
            TType::Stop => return Err(Error::UnknownType(TType::Stop as u8)),
            TType::BoolTrue => self.out.push_str("true"),
            TType::BoolFalse => self.out.push_str("false"),
            TType::Byte => {
                let v = self.decoder.read_u8()? as i8;
                let _ = write!(self.out, "{v}");
            }
            TType::I16 => {
                let v = self.decoder.read_i16()?;
                let _ = write!(self.out, "{v}");
            }
            TType::I32 => {
                let v = self.decoder.read_i32()?;
                let _ = write!(self.out, "{v}");
            }
            TType::I64 => {
                let v = self.decoder.read_i64()?;
                let _ = write!(self.out, "{v}");
            }
            TType::Double => {
                let v = self.decoder.read_f64()?;
                let _ = write!(self.out, "{v}");
            }
            TType::Float => {
                let v = self.decoder.read_f32()?;
                let _ = write!(self.out, "{v}");
            }
            TType::Binary => {
                let len = self.decoder.read_len()?;
                let raw = self.decoder.read_bytes(len)?;
                // Without a schema there is no string/binary distinction;
                // render text when the payload happens to be valid UTF-8.
                match std::str::from_utf8(&raw) {
                    Ok(text) => {
                        let _ = write!(self.out, "{text:?}");
                    }
                    Err(_) => {
                        self.out.push_str("0x");
                        for byte in raw.iter() {
                            let _ = write!(self.out, "{byte:02x}");
                        }
                    }
                }
            }
            TType::List | TType::Set => {
                let (elem, len) = self.decoder.read_list_header()?;
                let _ = write!(self.out, "{}<{}>[{len}] [", wire.name(), elem.name());
                for i in 0..len {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.dump_value(elem, depth)?;
                }
                self.out.push(']');
            }
            TType::Map => {
                let (len, ktag, vtag) = self.decoder.read_map_header()?;
                if len == 0 {
                    self.out.push_str("map[0] {}");
                    return Ok(());
                }
                let _ = write!(
                    self.out,
                    "map<{}, {}>[{len}] {{",
                    ktag.name(),
                    vtag.name()
                );
                for i in 0..len {
                    if i > 0 {
                        self.out.push(',');
                    }
                    self.out.push(' ');
                    self.dump_value(ktag, depth)?;
                    self.out.push_str(": ");
                    self.dump_value(vtag, depth)?;
                }
                self.out.push_str(" }");
            }
            TType::Struct => self.dump_struct(depth)?,
        }
        Ok(())
    }
}
