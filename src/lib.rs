//! zkLogin session orchestration.
//!
//! Drives a login attempt from ephemeral key generation through OAuth nonce
//! binding, JWT validation, salt lookup, address derivation, and composite
//! signature assembly. Proof generation, the ledger client, and the
//! surrounding HTTP surface are external collaborators.

pub mod address;
pub mod cli;
pub mod epoch;
pub mod error;
pub mod jwt;
pub mod keys;
pub mod nonce;
pub mod provider;
pub mod repository;
pub mod salt;
pub mod session;

pub use address::{derive_address, CompositeSignature, ZkProof};
pub use epoch::{EpochProvider, EpochSource, FixedEpochProvider, HttpEpochProvider};
pub use error::Error;
pub use keys::{EphemeralKeyPair, SignatureScheme};
pub use nonce::{NonceDerivation, Sha256Nonce, StandardNonce};
pub use provider::{build_authorization_url, OAuthFlow, OAuthProvider, ProviderRegistry};
pub use repository::{MemorySessionRepository, SessionRepository};
pub use salt::{FixedSaltStore, MemorySaltStore, PgSaltStore, SaltStats, SaltStore};
pub use session::{FlowConfig, PreparedAuth, Session, SessionSnapshot, SessionState, ZkLoginFlow};
