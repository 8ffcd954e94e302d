//! The zkLogin session state machine.
//!
//! A session walks a strict forward order:
//!
//! ```text
//! Created -> KeysGenerated -> PreparedForAuth -> JwtProcessed -> ReadyToSign -> Signed
//! ```
//!
//! [`ZkLoginFlow`] owns the collaborators (salt store, epoch provider, nonce
//! strategy) and drives one transition per call, threading each step's
//! outputs into the next. Calling a step out of order fails with
//! [`Error::Precondition`] naming the missing prior step; the session is
//! left untouched.

use crate::address::{derive_address, CompositeSignature, ZkProof};
use crate::epoch::{EpochProvider, EpochSource};
use crate::error::Error;
use crate::jwt::{self, JwtClaims};
use crate::keys::{EphemeralKeyPair, SignatureScheme};
use crate::nonce::{generate_randomness, NonceDerivation};
use crate::provider::{build_authorization_url, OAuthFlow, ProviderRegistry};
use crate::salt::SaltStore;
use secrecy::{ExposeSecret, SecretBox};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Created,
    KeysGenerated,
    PreparedForAuth,
    JwtProcessed,
    ReadyToSign,
    Signed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "Created",
            Self::KeysGenerated => "KeysGenerated",
            Self::PreparedForAuth => "PreparedForAuth",
            Self::JwtProcessed => "JwtProcessed",
            Self::ReadyToSign => "ReadyToSign",
            Self::Signed => "Signed",
        };
        write!(f, "{name}")
    }
}

/// One login attempt. Mutated in place as each step completes; dropped (or
/// evicted from the repository) when the caller is done with it.
pub struct Session {
    id: Uuid,
    state: SessionState,
    keypair: Option<EphemeralKeyPair>,
    randomness: Option<SecretBox<[u8; 32]>>,
    nonce: Option<String>,
    current_epoch: Option<u64>,
    max_epoch: Option<u64>,
    epoch_source: Option<EpochSource>,
    jwt: Option<String>,
    claims: Option<JwtClaims>,
    subject: Option<String>,
    salt: Option<String>,
    address: Option<String>,
    proof: Option<ZkProof>,
    composite_signature: Option<String>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Created,
            keypair: None,
            randomness: None,
            nonce: None,
            current_epoch: None,
            max_epoch: None,
            epoch_source: None,
            jwt: None,
            claims: None,
            subject: None,
            salt: None,
            address: None,
            proof: None,
            composite_signature: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    #[must_use]
    pub const fn max_epoch(&self) -> Option<u64> {
        self.max_epoch
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    #[must_use]
    pub fn salt(&self) -> Option<&str> {
        self.salt.as_deref()
    }

    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    #[must_use]
    pub fn claims(&self) -> Option<&JwtClaims> {
        self.claims.as_ref()
    }

    #[must_use]
    pub fn composite_signature(&self) -> Option<&str> {
        self.composite_signature.as_deref()
    }

    /// Read-only view of which fields are populated. Never exposes the
    /// ephemeral private key or the session randomness.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            state: self.state,
            scheme: self.keypair.as_ref().map(EphemeralKeyPair::scheme),
            nonce: self.nonce.clone(),
            current_epoch: self.current_epoch,
            max_epoch: self.max_epoch,
            epoch_source: self.epoch_source,
            subject: self.subject.clone(),
            address: self.address.clone(),
            has_salt: self.salt.is_some(),
            has_proof: self.proof.is_some(),
            has_signature: self.composite_signature.is_some(),
        }
    }

    fn require_state(
        &self,
        operation: &'static str,
        required: SessionState,
    ) -> Result<(), Error> {
        if self.state == required {
            Ok(())
        } else {
            Err(Error::Precondition {
                operation,
                required,
                actual: self.state,
            })
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Redacted session view for callers and logs.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub state: SessionState,
    pub scheme: Option<SignatureScheme>,
    pub nonce: Option<String>,
    pub current_epoch: Option<u64>,
    pub max_epoch: Option<u64>,
    pub epoch_source: Option<EpochSource>,
    pub subject: Option<String>,
    pub address: Option<String>,
    pub has_salt: bool,
    pub has_proof: bool,
    pub has_signature: bool,
}

/// Outputs of the prepare step the caller needs to start the OAuth dance.
#[derive(Debug, Clone)]
pub struct PreparedAuth {
    pub authorization_url: Url,
    pub nonce: String,
    pub max_epoch: u64,
    pub epoch_source: EpochSource,
}

/// Flow-level configuration: which provider, which OAuth flow, and the
/// epoch validity window.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub provider: String,
    pub client_id: String,
    pub redirect_url: String,
    pub flow: OAuthFlow,
    pub epoch_window: u64,
    /// Substituted when the epoch fetch fails; recorded as
    /// [`EpochSource::Fallback`] on the session.
    pub fallback_epoch: u64,
}

/// Orchestrates sessions through the zkLogin pipeline.
pub struct ZkLoginFlow {
    config: FlowConfig,
    registry: ProviderRegistry,
    salt_store: Arc<dyn SaltStore>,
    epoch_provider: Arc<dyn EpochProvider>,
    nonce_derivation: Arc<dyn NonceDerivation>,
}

impl ZkLoginFlow {
    #[must_use]
    pub fn new(
        config: FlowConfig,
        salt_store: Arc<dyn SaltStore>,
        epoch_provider: Arc<dyn EpochProvider>,
        nonce_derivation: Arc<dyn NonceDerivation>,
    ) -> Self {
        Self {
            config,
            registry: ProviderRegistry::new(),
            salt_store,
            epoch_provider,
            nonce_derivation,
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// `Created -> KeysGenerated`: generate the session's ephemeral keypair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedScheme`] for unknown scheme names (the
    /// session stays in `Created` with no key material) and
    /// [`Error::Precondition`] when called out of order.
    pub fn generate_keys(&self, session: &mut Session, scheme: &str) -> Result<(), Error> {
        session.require_state("generate_keys", SessionState::Created)?;
        let scheme: SignatureScheme = scheme.parse()?;

        session.keypair = Some(EphemeralKeyPair::generate(scheme));
        session.state = SessionState::KeysGenerated;
        debug!(session = %session.id, %scheme, "ephemeral keypair generated");
        Ok(())
    }

    /// `KeysGenerated -> PreparedForAuth`: draw randomness, fix the epoch
    /// window, derive the nonce, and build the authorization URL.
    ///
    /// A failed epoch fetch is recovered locally with the configured
    /// fallback epoch and logged as a warning; the substitution is visible
    /// through [`PreparedAuth::epoch_source`] and the session snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] when keys have not been generated and
    /// [`Error::MissingConfig`] when the provider configuration is
    /// incomplete.
    pub async fn prepare(&self, session: &mut Session) -> Result<PreparedAuth, Error> {
        session.require_state("prepare", SessionState::KeysGenerated)?;
        let provider = self.registry.get(&self.config.provider)?;
        let keypair = session
            .keypair
            .as_ref()
            .ok_or(Error::MissingConfig("ephemeral keypair"))?;

        let (current_epoch, epoch_source) = match self.epoch_provider.current_epoch().await {
            Ok(epoch) => (epoch, EpochSource::Network),
            Err(err) => {
                warn!(
                    session = %session.id,
                    fallback = self.config.fallback_epoch,
                    "epoch fetch failed, using fallback: {err}"
                );
                (self.config.fallback_epoch, EpochSource::Fallback)
            }
        };
        // The epoch is network-supplied; saturate instead of trusting it
        // not to overflow the window.
        let max_epoch = current_epoch.saturating_add(self.config.epoch_window);

        let randomness = generate_randomness();
        let nonce =
            self.nonce_derivation
                .derive(&keypair.extended_public_key(), max_epoch, &randomness);

        let authorization_url = build_authorization_url(
            provider,
            &self.config.client_id,
            &self.config.redirect_url,
            self.config.flow,
            match self.config.flow {
                OAuthFlow::Implicit => Some(&nonce),
                OAuthFlow::AuthorizationCode => None,
            },
        )?;

        session.randomness = Some(SecretBox::new(Box::new(randomness)));
        session.nonce = Some(nonce.clone());
        session.current_epoch = Some(current_epoch);
        session.max_epoch = Some(max_epoch);
        session.epoch_source = Some(epoch_source);
        session.state = SessionState::PreparedForAuth;
        debug!(session = %session.id, max_epoch, "session prepared for auth");

        Ok(PreparedAuth {
            authorization_url,
            nonce,
            max_epoch,
            epoch_source,
        })
    }

    /// `PreparedForAuth -> JwtProcessed`: validate the token, check its
    /// nonce against the session's, resolve the salt, and derive the
    /// address. Returns the derived address.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedToken`] for structural problems,
    /// [`Error::NonceMismatch`] when the token was issued for a different
    /// session, [`Error::MissingClaim`] when `nonce` or `sub` is absent,
    /// [`Error::Storage`] when the salt lookup fails, and
    /// [`Error::Precondition`] when called before `prepare`.
    pub async fn process_token(
        &self,
        session: &mut Session,
        token: &str,
    ) -> Result<String, Error> {
        session.require_state("process_token", SessionState::PreparedForAuth)?;
        let expected_nonce = session
            .nonce
            .clone()
            .ok_or(Error::MissingConfig("session nonce"))?;

        if !jwt::is_well_formed(token) {
            return Err(Error::MalformedToken(
                "token does not have 3 segments".to_string(),
            ));
        }
        let decoded = jwt::decode(token)?;

        let found_nonce = decoded
            .claims
            .nonce
            .clone()
            .ok_or(Error::MissingClaim("nonce"))?;
        if found_nonce != expected_nonce {
            return Err(Error::NonceMismatch {
                expected: expected_nonce,
                found: found_nonce,
            });
        }

        let subject = decoded
            .claims
            .sub
            .clone()
            .ok_or(Error::MissingClaim("sub"))?;

        let salt = self
            .salt_store
            .get_or_create(&subject, &self.config.provider)
            .await?;
        let address = derive_address(&salt, &subject, &decoded.claims.aud);

        session.jwt = Some(token.to_string());
        session.subject = Some(subject);
        session.claims = Some(decoded.claims);
        session.salt = Some(salt);
        session.address = Some(address.clone());
        session.state = SessionState::JwtProcessed;
        debug!(session = %session.id, %address, "token processed");

        Ok(address)
    }

    /// `JwtProcessed -> ReadyToSign`: record the externally produced proof.
    /// No validation happens here; validators downstream check the proof.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] when the token has not been
    /// processed.
    pub fn attach_proof(&self, session: &mut Session, proof: ZkProof) -> Result<(), Error> {
        session.require_state("attach_proof", SessionState::JwtProcessed)?;
        session.proof = Some(proof);
        session.state = SessionState::ReadyToSign;
        debug!(session = %session.id, "proof attached");
        Ok(())
    }

    /// `ReadyToSign -> Signed`: sign the transaction payload with the
    /// ephemeral key and assemble the composite signature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] when the ephemeral signature or the wire
    /// encoding fails, and [`Error::Precondition`] when no proof has been
    /// attached.
    pub fn assemble_signature(
        &self,
        session: &mut Session,
        transaction_payload: &[u8],
    ) -> Result<String, Error> {
        session.require_state("assemble_signature", SessionState::ReadyToSign)?;
        let keypair = session
            .keypair
            .as_ref()
            .ok_or_else(|| Error::Signing("no ephemeral keypair".to_string()))?;
        let proof = session
            .proof
            .clone()
            .ok_or_else(|| Error::Signing("no proof attached".to_string()))?;
        let max_epoch = session
            .max_epoch
            .ok_or_else(|| Error::Signing("no max epoch".to_string()))?;

        let ephemeral_signature = keypair.sign(transaction_payload)?;
        let composite = CompositeSignature {
            proof,
            max_epoch,
            ephemeral_signature,
        };
        let encoded = composite.encode()?;

        session.composite_signature = Some(encoded.clone());
        session.state = SessionState::Signed;
        debug!(session = %session.id, "composite signature assembled");

        Ok(encoded)
    }

    /// Exposes the session randomness for debugging. Deliberately named so
    /// the call site reads as an opt-in.
    #[must_use]
    pub fn debug_expose_randomness(session: &Session) -> Option<[u8; 32]> {
        session
            .randomness
            .as_ref()
            .map(|secret| *secret.expose_secret())
    }
}
