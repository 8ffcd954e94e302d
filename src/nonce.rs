//! Nonce derivation strategies.
//!
//! The nonce commits the OAuth request to {ephemeral public key, validity
//! window, session randomness}. Which hash backs the commitment is a
//! configuration-time choice, not a runtime branch: callers inject one
//! [`NonceDerivation`] implementation and every session derives through it.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};

/// Bytes of the hash kept for the nonce before base64url encoding.
const NONCE_LENGTH: usize = 20;

pub trait NonceDerivation: Send + Sync {
    /// Derive a deterministic nonce from the commitment triple.
    fn derive(&self, extended_public_key: &[u8], max_epoch: u64, randomness: &[u8; 32]) -> String;
}

/// Canonical byte encoding of the commitment triple shared by both
/// strategies: extended public key, big-endian max epoch, randomness.
fn canonical_input(extended_public_key: &[u8], max_epoch: u64, randomness: &[u8; 32]) -> Vec<u8> {
    let mut input = Vec::with_capacity(extended_public_key.len() + 8 + randomness.len());
    input.extend_from_slice(extended_public_key);
    input.extend_from_slice(&max_epoch.to_be_bytes());
    input.extend_from_slice(randomness);
    input
}

/// Default strategy: Blake2b-256 over the canonical encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardNonce;

impl NonceDerivation for StandardNonce {
    fn derive(&self, extended_public_key: &[u8], max_epoch: u64, randomness: &[u8; 32]) -> String {
        let input = canonical_input(extended_public_key, max_epoch, randomness);
        let hash = blake2b_simd::Params::new()
            .hash_length(32)
            .hash(&input);
        Base64UrlUnpadded::encode_string(&hash.as_bytes()[..NONCE_LENGTH])
    }
}

/// Fallback strategy for builds where the standard derivation is not
/// available: SHA-256 over the same canonical encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Nonce;

impl NonceDerivation for Sha256Nonce {
    fn derive(&self, extended_public_key: &[u8], max_epoch: u64, randomness: &[u8; 32]) -> String {
        use sha2::{Digest, Sha256};
        let input = canonical_input(extended_public_key, max_epoch, randomness);
        let hash = Sha256::digest(&input);
        Base64UrlUnpadded::encode_string(&hash[..NONCE_LENGTH])
    }
}

/// Draw fresh session randomness from the OS generator.
#[must_use]
pub fn generate_randomness() -> [u8; 32] {
    let mut randomness = [0u8; 32];
    OsRng.fill_bytes(&mut randomness);
    randomness
}
