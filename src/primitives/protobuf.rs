//! Minimal protobuf writer
//!
//! Only what the Tron and Cosmos encoders need. Fields are written in the order
//! the caller emits them, which must be ascending field number for canonical output.

use super::varint::{read_leb128, write_leb128};
use crate::error::Result;

const WIRE_VARINT: u8 = 0;
const WIRE_LEN: u8 = 2;

#[derive(Debug, Default, Clone)]
pub struct ProtoWriter {
    buf: Vec<u8>,
}

impl ProtoWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(&mut self, field: u32, wire_type: u8) {
        write_leb128(&mut self.buf, ((field as u64) << 3) | wire_type as u64);
    }

    /// Varint field; proto3 omits zero values
    pub fn uint64(&mut self, field: u32, value: u64) -> &mut Self {
        if value != 0 {
            self.key(field, WIRE_VARINT);
            write_leb128(&mut self.buf, value);
        }
        self
    }

    /// Two's complement varint as protobuf encodes `int64`
    pub fn int64(&mut self, field: u32, value: i64) -> &mut Self {
        self.uint64(field, value as u64)
    }

    /// Length-delimited field; empty values are omitted
    pub fn bytes(&mut self, field: u32, value: &[u8]) -> &mut Self {
        if !value.is_empty() {
            self.key(field, WIRE_LEN);
            write_leb128(&mut self.buf, value.len() as u64);
            self.buf.extend_from_slice(value);
        }
        self
    }

    pub fn string(&mut self, field: u32, value: &str) -> &mut Self {
        self.bytes(field, value.as_bytes())
    }

    pub fn message(&mut self, field: u32, value: &ProtoWriter) -> &mut Self {
        self.bytes(field, &value.buf)
    }

    pub fn finish(&self) -> Vec<u8> {
        self.buf.clone()
    }
}

/// A decoded top-level field: number and raw value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtoField {
    Varint(u32, u64),
    Bytes(u32, Vec<u8>),
}

/// Split a message into fields; only varint and length-delimited wire types
pub fn read_fields(mut bytes: &[u8]) -> Result<Vec<ProtoField>> {
    let mut fields = Vec::new();
    while !bytes.is_empty() {
        let (key, used) = read_leb128(bytes)?;
        bytes = &bytes[used..];
        let field = (key >> 3) as u32;
        match (key & 0x7) as u8 {
            WIRE_VARINT => {
                let (value, used) = read_leb128(bytes)?;
                bytes = &bytes[used..];
                fields.push(ProtoField::Varint(field, value));
            }
            WIRE_LEN => {
                let (len, used) = read_leb128(bytes)?;
                bytes = &bytes[used..];
                let len = len as usize;
                if bytes.len() < len {
                    return Err("Truncated length-delimited field".into());
                }
                fields.push(ProtoField::Bytes(field, bytes[..len].to_vec()));
                bytes = &bytes[len..];
            }
            other => return Err(format!("Unsupported wire type {}", other).into()),
        }
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_encoding() {
        let mut inner = ProtoWriter::new();
        inner.uint64(1, 150);
        let mut outer = ProtoWriter::new();
        outer.string(2, "testing").message(3, &inner).uint64(4, 0);
        let bytes = outer.finish();
        assert_eq!(
            hex::encode(&bytes),
            "120774657374696e671a03089601"
        );

        let fields = read_fields(&bytes).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0], ProtoField::Bytes(2, b"testing".to_vec()));
    }

    #[test]
    fn test_negative_int64_is_ten_bytes() {
        let mut w = ProtoWriter::new();
        w.int64(1, -1);
        assert_eq!(w.finish().len(), 11);
    }
}
