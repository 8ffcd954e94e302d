//! Address derivation and composite signature assembly.

use crate::error::Error;
use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};

/// Claim name used as the domain-separation tag for address seeds.
const ADDRESS_SEED_CLAIM: &[u8] = b"sub";

/// Authenticator flag marking zklogin-derived material on the wire.
const ZKLOGIN_FLAG: u8 = 0x05;

/// Opaque proof artifact produced by the external proving service. Carried
/// through unchanged; validators downstream check it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZkProof(pub serde_json::Value);

fn blake2b256(input: &[u8]) -> [u8; 32] {
    let hash = blake2b_simd::Params::new().hash_length(32).hash(input);
    let mut out = [0u8; 32];
    out.copy_from_slice(hash.as_bytes());
    out
}

/// Length-framed concatenation so adjacent variable-width fields cannot
/// alias each other.
fn framed(fields: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for field in fields {
        out.extend_from_slice(&(field.len() as u64).to_be_bytes());
        out.extend_from_slice(field);
    }
    out
}

/// Derive the on-chain address for an identity.
///
/// Pure and deterministic: the same (salt, subject, audience) always yields
/// the same address, which is what lets a user log in repeatedly and land on
/// the same account.
#[must_use]
pub fn derive_address(salt: &str, subject: &str, audience: &str) -> String {
    let seed = blake2b256(&framed(&[
        ADDRESS_SEED_CLAIM,
        salt.as_bytes(),
        subject.as_bytes(),
        audience.as_bytes(),
    ]));

    let mut tagged = Vec::with_capacity(1 + seed.len());
    tagged.push(ZKLOGIN_FLAG);
    tagged.extend_from_slice(&seed);

    format!("0x{}", hex::encode(blake2b256(&tagged)))
}

/// The three pieces a network validator needs to accept a zklogin
/// transaction.
#[derive(Debug, Clone)]
pub struct CompositeSignature {
    pub proof: ZkProof,
    pub max_epoch: u64,
    pub ephemeral_signature: Vec<u8>,
}

impl CompositeSignature {
    /// Encode to the wire form: base64 of flag || framed proof JSON ||
    /// big-endian max epoch || framed ephemeral signature. Proof contents
    /// are not validated here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] when the proof cannot be serialized.
    pub fn encode(&self) -> Result<String, Error> {
        let proof_bytes =
            serde_json::to_vec(&self.proof).map_err(|err| Error::Signing(err.to_string()))?;

        let mut bytes = vec![ZKLOGIN_FLAG];
        bytes.extend_from_slice(&framed(&[&proof_bytes]));
        bytes.extend_from_slice(&self.max_epoch.to_be_bytes());
        bytes.extend_from_slice(&framed(&[&self.ephemeral_signature]));

        Ok(Base64::encode_string(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn address_is_deterministic() {
        let first = derive_address("salt", "user123", "client-123");
        let second = derive_address("salt", "user123", "client-123");
        assert_eq!(first, second);
        assert!(first.starts_with("0x"));
        assert_eq!(first.len(), 2 + 64);
    }

    #[test]
    fn address_changes_with_any_input() {
        let base = derive_address("salt", "user123", "client-123");
        assert_ne!(base, derive_address("other", "user123", "client-123"));
        assert_ne!(base, derive_address("salt", "user456", "client-123"));
        assert_ne!(base, derive_address("salt", "user123", "client-456"));
    }

    #[test]
    fn framing_prevents_field_aliasing() {
        // Same concatenated bytes, different field boundaries.
        assert_ne!(
            derive_address("ab", "c", "aud"),
            derive_address("a", "bc", "aud")
        );
    }

    #[test]
    fn composite_signature_encodes_all_fields() -> Result<(), Error> {
        let signature = CompositeSignature {
            proof: ZkProof(json!({"a": "1", "b": "2"})),
            max_epoch: 110,
            ephemeral_signature: vec![9u8; 64],
        };
        let encoded = signature.encode()?;
        assert!(!encoded.is_empty());

        // Different epoch bound, different wire bytes.
        let other = CompositeSignature {
            max_epoch: 111,
            ..signature
        };
        assert_ne!(encoded, other.encode()?);
        Ok(())
    }
}
