//! Unsigned messages and transactions, and what encoders hand to signers

pub mod message;
pub mod signing;
pub mod transaction;

pub use message::{MessageKind, MessagePayload, UnsignedMessage};
pub use signing::{
    DigestAlgorithm, Encoder, PayloadEntry, SignatureScheme, SignedPayload, SigningPayload,
};
pub use transaction::UnsignedTransaction;
