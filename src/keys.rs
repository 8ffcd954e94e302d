//! Ephemeral signing keys.
//!
//! A keypair lives for a single login session: it is bound into the nonce at
//! prepare time and signs the transaction payload at the end of the flow.

use crate::error::Error;
use ed25519_dalek::Signer as _;
use rand::rngs::OsRng;
use std::fmt;
use std::str::FromStr;

/// Scheme flag prepended to the public key in its extended encoding.
const FLAG_ED25519: u8 = 0x00;
const FLAG_SECP256K1: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    Ed25519,
    Secp256k1,
}

impl SignatureScheme {
    #[must_use]
    pub const fn flag(self) -> u8 {
        match self {
            Self::Ed25519 => FLAG_ED25519,
            Self::Secp256k1 => FLAG_SECP256K1,
        }
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519 => write!(f, "EdDSA-25519"),
            Self::Secp256k1 => write!(f, "ECDSA-secp256k1"),
        }
    }
}

impl FromStr for SignatureScheme {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "eddsa-25519" | "ed25519" => Ok(Self::Ed25519),
            "ecdsa-secp256k1" | "secp256k1" => Ok(Self::Secp256k1),
            _ => Err(Error::UnsupportedScheme(value.to_string())),
        }
    }
}

/// A session-scoped keypair. The private half never leaves this type.
pub enum EphemeralKeyPair {
    Ed25519(ed25519_dalek::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
}

impl EphemeralKeyPair {
    #[must_use]
    pub fn generate(scheme: SignatureScheme) -> Self {
        match scheme {
            SignatureScheme::Ed25519 => {
                Self::Ed25519(ed25519_dalek::SigningKey::generate(&mut OsRng))
            }
            SignatureScheme::Secp256k1 => {
                Self::Secp256k1(k256::ecdsa::SigningKey::random(&mut OsRng))
            }
        }
    }

    #[must_use]
    pub const fn scheme(&self) -> SignatureScheme {
        match self {
            Self::Ed25519(_) => SignatureScheme::Ed25519,
            Self::Secp256k1(_) => SignatureScheme::Secp256k1,
        }
    }

    #[must_use]
    pub fn public_key_bytes(&self) -> Vec<u8> {
        match self {
            Self::Ed25519(key) => key.verifying_key().to_bytes().to_vec(),
            Self::Secp256k1(key) => key
                .verifying_key()
                .to_encoded_point(true)
                .as_bytes()
                .to_vec(),
        }
    }

    /// Scheme-tagged public key, the form bound into the nonce.
    #[must_use]
    pub fn extended_public_key(&self) -> Vec<u8> {
        let mut extended = Vec::with_capacity(34);
        extended.push(self.scheme().flag());
        extended.extend_from_slice(&self.public_key_bytes());
        extended
    }

    /// Sign a transaction payload with the ephemeral private key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] when the underlying scheme fails to
    /// produce a signature.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Error> {
        match self {
            Self::Ed25519(key) => Ok(key.sign(message).to_bytes().to_vec()),
            Self::Secp256k1(key) => {
                let signature: k256::ecdsa::Signature = key
                    .try_sign(message)
                    .map_err(|err| Error::Signing(err.to_string()))?;
                Ok(signature.to_vec())
            }
        }
    }
}

// Keep key material out of debug output.
impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("scheme", &self.scheme())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_scheme_names() -> Result<(), Error> {
        assert_eq!(
            "EdDSA-25519".parse::<SignatureScheme>()?,
            SignatureScheme::Ed25519
        );
        assert_eq!(
            "ECDSA-secp256k1".parse::<SignatureScheme>()?,
            SignatureScheme::Secp256k1
        );
        assert_eq!(
            "ed25519".parse::<SignatureScheme>()?,
            SignatureScheme::Ed25519
        );
        Ok(())
    }

    #[test]
    fn rejects_unknown_scheme() {
        let result = "RSA".parse::<SignatureScheme>();
        assert!(matches!(result, Err(Error::UnsupportedScheme(name)) if name == "RSA"));
    }

    #[test]
    fn extended_public_key_is_flag_tagged() {
        let ed = EphemeralKeyPair::generate(SignatureScheme::Ed25519);
        let extended = ed.extended_public_key();
        assert_eq!(extended[0], 0x00);
        assert_eq!(extended.len(), 33); // flag + 32-byte ed25519 key

        let secp = EphemeralKeyPair::generate(SignatureScheme::Secp256k1);
        let extended = secp.extended_public_key();
        assert_eq!(extended[0], 0x01);
        assert_eq!(extended.len(), 34); // flag + 33-byte compressed point
    }

    #[test]
    fn signs_with_both_schemes() -> Result<(), Error> {
        for scheme in [SignatureScheme::Ed25519, SignatureScheme::Secp256k1] {
            let key = EphemeralKeyPair::generate(scheme);
            let signature = key.sign(b"payload")?;
            assert!(!signature.is_empty());
        }
        Ok(())
    }

    #[test]
    fn debug_output_hides_private_key() {
        let key = EphemeralKeyPair::generate(SignatureScheme::Ed25519);
        let rendered = format!("{key:?}");
        assert!(rendered.contains("Ed25519"));
        assert!(!rendered.contains("SigningKey"));
    }
}
