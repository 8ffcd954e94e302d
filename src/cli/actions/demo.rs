//! Drives the whole pipeline in-process: useful for checking provider
//! configuration and eyeballing the derived address without a browser or a
//! proving service on the other end.

use crate::address::ZkProof;
use crate::cli::actions::Action;
use crate::epoch::{EpochProvider, FixedEpochProvider, HttpEpochProvider};
use crate::jwt::{self, JwtClaims, JwtHeader};
use crate::nonce::StandardNonce;
use crate::provider::OAuthFlow;
use crate::salt::{FixedSaltStore, MemorySaltStore, SaltStore};
use crate::session::{FlowConfig, Session, ZkLoginFlow};
use anyhow::{anyhow, Result};
use serde_json::json;
use std::sync::Arc;
use url::Url;

/// Handle the demo action
///
/// # Errors
///
/// Returns an error when the configuration is invalid or any pipeline step
/// fails.
pub async fn handle(action: Action) -> Result<()> {
    let Action::Demo {
        provider,
        client_id,
        redirect_url,
        flow,
        scheme,
        subject,
        epoch_url,
        epoch_window,
        fallback_epoch,
        fixed_salt,
    } = action;

    let oauth_flow = match flow.as_str() {
        "implicit" => OAuthFlow::Implicit,
        "code" => OAuthFlow::AuthorizationCode,
        other => return Err(anyhow!("unknown flow: {other}")),
    };

    let salt_store: Arc<dyn SaltStore> = match fixed_salt {
        Some(salt) => Arc::new(FixedSaltStore::new(salt)),
        None => Arc::new(MemorySaltStore::new()),
    };

    let epoch_provider: Arc<dyn EpochProvider> = match epoch_url {
        Some(url) => Arc::new(HttpEpochProvider::new(Url::parse(&url)?)?),
        None => Arc::new(FixedEpochProvider(fallback_epoch)),
    };

    let config = FlowConfig {
        provider,
        client_id: client_id.clone(),
        redirect_url,
        flow: oauth_flow,
        epoch_window,
        fallback_epoch,
    };
    let zklogin = ZkLoginFlow::new(config, salt_store.clone(), epoch_provider, Arc::new(StandardNonce));

    let mut session = Session::new();
    zklogin.generate_keys(&mut session, &scheme)?;

    let prepared = zklogin.prepare(&mut session).await?;
    println!("authorization url: {}", prepared.authorization_url);
    println!("nonce:             {}", prepared.nonce);
    println!("max epoch:         {}", prepared.max_epoch);

    // Stand-in for the OAuth redirect: a token carrying the session nonce.
    let token = jwt::encode_unsigned(
        &JwtHeader {
            alg: "RS256".to_string(),
            typ: Some("JWT".to_string()),
            kid: None,
        },
        &JwtClaims {
            iss: "https://accounts.google.com".to_string(),
            aud: client_id,
            sub: Some(subject),
            exp: 0,
            iat: 0,
            nonce: Some(prepared.nonce.clone()),
            email: None,
            name: None,
            picture: None,
        },
    )?;

    let address = zklogin.process_token(&mut session, &token).await?;
    println!("derived address:   {address}");

    // Stand-in for the external proving service.
    let proof = ZkProof(json!({
        "pi_a": "0", "pi_b": "0", "pi_c": "0",
    }));
    zklogin.attach_proof(&mut session, proof)?;
    let signature = zklogin.assemble_signature(&mut session, b"demo transaction")?;
    println!("composite sig:     {signature}");

    let stats = salt_store.stats().await?;
    println!(
        "salt store:        {} record(s), {} provider(s)",
        stats.count, stats.distinct_providers
    );
    println!("session state:     {}", session.state());

    Ok(())
}
