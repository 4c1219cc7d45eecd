//! Numeric and byte helpers shared by every chain encoder

pub mod amount;
pub mod bytes;
pub mod checksum;
pub mod protobuf;
pub mod time;
pub mod varint;
