//! Signing payloads, signed payloads and the encoder trait

use crate::chain::ChainFamily;
use crate::error::{Result, WasmWalletError};
use crate::primitives::bytes::{hex_bytes, opt_hex_bytes};
use serde::{Deserialize, Serialize};

/// Hash the signer applies to a preimage before the signature primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DigestAlgorithm {
    /// The preimage is signed as is (already a hash, or the scheme hashes itself)
    None,
    Sha256,
    DoubleSha256,
    Keccak256,
    Blake2b256,
    /// BIP-340 tagged hash with tag "TapSighash"
    TapSighash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignatureScheme {
    Secp256k1Ecdsa,
    Secp256k1Schnorr,
    Ed25519,
}

/// One thing to sign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadEntry {
    #[serde(with = "hex_bytes")]
    pub preimage: Vec<u8>,
    pub digest: DigestAlgorithm,
    pub scheme: SignatureScheme,
}

impl PayloadEntry {
    pub fn new(preimage: Vec<u8>, digest: DigestAlgorithm, scheme: SignatureScheme) -> Self {
        PayloadEntry {
            preimage,
            digest,
            scheme,
        }
    }

    /// The bytes the signature primitive receives once `digest` is applied.
    /// Provided for software signers and verification; encoders never call it.
    pub fn message_digest(&self) -> Vec<u8> {
        use crate::bitcoin::hashes::{sha256, sha256d, Hash};
        use crate::bitcoin::sighash::TapSighash;
        use blake2::{digest::consts::U32, Blake2b, Digest};

        match self.digest {
            DigestAlgorithm::None => self.preimage.clone(),
            DigestAlgorithm::Sha256 => sha256::Hash::hash(&self.preimage).to_byte_array().to_vec(),
            DigestAlgorithm::DoubleSha256 => {
                sha256d::Hash::hash(&self.preimage).to_byte_array().to_vec()
            }
            DigestAlgorithm::Keccak256 => alloy_primitives::keccak256(&self.preimage).to_vec(),
            DigestAlgorithm::Blake2b256 => Blake2b::<U32>::digest(&self.preimage).to_vec(),
            DigestAlgorithm::TapSighash => TapSighash::hash(&self.preimage).to_byte_array().to_vec(),
        }
    }
}

/// What an encoder hands to the signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningPayload {
    pub chain: ChainFamily,
    /// One entry per signature the encoder expects back, in order
    pub entries: Vec<PayloadEntry>,
    /// Serialized structure the preimage was derived from, when the signer
    /// needs to inspect it (TON signing cell as a BoC)
    #[serde(default, skip_serializing_if = "Option::is_none", with = "opt_hex_bytes")]
    pub signing_message: Option<Vec<u8>>,
    /// Human-readable summary for on-device confirmation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl SigningPayload {
    pub fn new(chain: ChainFamily, entries: Vec<PayloadEntry>) -> Self {
        SigningPayload {
            chain,
            entries,
            signing_message: None,
            preview: None,
        }
    }

    pub fn single(
        chain: ChainFamily,
        preimage: Vec<u8>,
        digest: DigestAlgorithm,
        scheme: SignatureScheme,
    ) -> Self {
        Self::new(chain, vec![PayloadEntry::new(preimage, digest, scheme)])
    }

    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = Some(preview.into());
        self
    }

    pub fn with_signing_message(mut self, message: Vec<u8>) -> Self {
        self.signing_message = Some(message);
        self
    }

    /// Preimage of the only entry; errors for multi-entry payloads
    pub fn preimage(&self) -> Result<&[u8]> {
        match self.entries.as_slice() {
            [entry] => Ok(&entry.preimage),
            entries => Err(WasmWalletError::Validation(format!(
                "payload has {} entries, expected exactly one",
                entries.len()
            ))),
        }
    }
}

/// Broadcast-ready bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPayload {
    pub chain: ChainFamily,
    #[serde(with = "hex_bytes")]
    pub raw: Vec<u8>,
    pub txid: String,
}

/// Per-chain transaction encoder
///
/// Implemented by each chain's unsigned transaction type. Both operations are pure:
/// the same input always yields the same bytes.
pub trait Encoder {
    fn chain(&self) -> ChainFamily;

    /// Bytes to hash and sign, one entry per required signature
    fn build_signing_payload(&self) -> Result<SigningPayload>;

    /// Place signatures (ordered as the payload entries) and serialize for broadcast
    fn assemble_signed_payload(&self, signatures: &[Vec<u8>]) -> Result<SignedPayload>;
}

/// Check the signature count matches the payload entry count
pub(crate) fn expect_signatures(signatures: &[Vec<u8>], expected: usize) -> Result<()> {
    if signatures.len() != expected {
        return Err(WasmWalletError::Validation(format!(
            "expected {} signature(s), got {}",
            expected,
            signatures.len()
        )));
    }
    Ok(())
}

/// Check a raw signature's length against what the scheme produces
pub(crate) fn expect_signature_len(signature: &[u8], allowed: &[usize]) -> Result<()> {
    if !allowed.contains(&signature.len()) {
        return Err(WasmWalletError::Validation(format!(
            "signature must be {:?} bytes, got {}",
            allowed,
            signature.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_digest_variants() {
        let entry = PayloadEntry::new(b"abc".to_vec(), DigestAlgorithm::Sha256, SignatureScheme::Ed25519);
        assert_eq!(
            hex::encode(entry.message_digest()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );

        let entry = PayloadEntry::new(Vec::new(), DigestAlgorithm::Keccak256, SignatureScheme::Secp256k1Ecdsa);
        assert_eq!(
            hex::encode(entry.message_digest()),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_preimage_requires_single_entry() {
        let payload = SigningPayload::new(ChainFamily::Btc, Vec::new());
        assert!(payload.preimage().is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let payload = SigningPayload::single(
            ChainFamily::Tron,
            vec![0xab],
            DigestAlgorithm::Sha256,
            SignatureScheme::Secp256k1Ecdsa,
        )
        .with_preview("Send 1 TRX");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["chain"], "tron");
        assert_eq!(json["entries"][0]["preimage"], "ab");
        assert_eq!(json["entries"][0]["digest"], "sha256");
        assert_eq!(json["preview"], "Send 1 TRX");
        assert!(json.get("signingMessage").is_none());
    }
}
