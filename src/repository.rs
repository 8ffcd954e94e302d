//! Session storage collaborator.
//!
//! Sessions live outside the state machine so callers can park one between
//! the OAuth redirect leaving the process and the token coming back.
//! Ownership moves through take/put: a caller takes the session, drives a
//! step, and puts it back.

use crate::session::Session;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store a session, replacing any previous one with the same id.
    async fn put(&self, session: Session);

    /// Remove and return the session, if present.
    async fn take(&self, id: Uuid) -> Option<Session>;

    /// Drop sessions whose validity window has elapsed. Returns how many
    /// were evicted. Sessions that never reached the prepare step have no
    /// max epoch and are kept.
    async fn evict_expired(&self, current_epoch: u64) -> usize;
}

#[derive(Default)]
pub struct MemorySessionRepository {
    sessions: Mutex<HashMap<Uuid, Session>>,
}

impl MemorySessionRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn put(&self, session: Session) {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(session.id(), session);
    }

    async fn take(&self, id: Uuid) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(&id)
    }

    async fn evict_expired(&self, current_epoch: u64) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, session| {
            session
                .max_epoch()
                .is_none_or(|max_epoch| max_epoch >= current_epoch)
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, current_epoch, "evicted expired sessions");
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epoch::FixedEpochProvider;
    use crate::error::Error;
    use crate::nonce::StandardNonce;
    use crate::provider::OAuthFlow;
    use crate::salt::MemorySaltStore;
    use crate::session::{FlowConfig, SessionState, ZkLoginFlow};
    use std::sync::Arc;

    fn flow(epoch: u64) -> ZkLoginFlow {
        ZkLoginFlow::new(
            FlowConfig {
                provider: "google".to_string(),
                client_id: "client-123".to_string(),
                redirect_url: "http://localhost:3000/callback".to_string(),
                flow: OAuthFlow::Implicit,
                epoch_window: 10,
                fallback_epoch: 100,
            },
            Arc::new(MemorySaltStore::new()),
            Arc::new(FixedEpochProvider(epoch)),
            Arc::new(StandardNonce),
        )
    }

    #[tokio::test]
    async fn take_returns_stored_session_once() {
        let repo = MemorySessionRepository::new();
        let session = Session::new();
        let id = session.id();

        repo.put(session).await;
        let taken = repo.take(id).await.expect("session stored");
        assert_eq!(taken.id(), id);
        assert!(repo.take(id).await.is_none());
    }

    #[tokio::test]
    async fn take_put_round_trip_preserves_progress() -> Result<(), Error> {
        let repo = MemorySessionRepository::new();
        let flow = flow(100);

        let mut session = Session::new();
        flow.generate_keys(&mut session, "ed25519")?;
        let id = session.id();
        repo.put(session).await;

        let mut session = repo.take(id).await.expect("session stored");
        assert_eq!(session.state(), SessionState::KeysGenerated);
        flow.prepare(&mut session).await?;
        assert_eq!(session.state(), SessionState::PreparedForAuth);
        Ok(())
    }

    #[tokio::test]
    async fn eviction_drops_only_elapsed_windows() -> Result<(), Error> {
        let repo = MemorySessionRepository::new();
        let flow = flow(100);

        // Prepared session: max epoch 110.
        let mut prepared = Session::new();
        flow.generate_keys(&mut prepared, "ed25519")?;
        flow.prepare(&mut prepared).await?;
        let prepared_id = prepared.id();

        // Fresh session: no max epoch yet, never evicted.
        let fresh = Session::new();
        let fresh_id = fresh.id();

        repo.put(prepared).await;
        repo.put(fresh).await;

        assert_eq!(repo.evict_expired(110).await, 0);
        assert_eq!(repo.evict_expired(111).await, 1);
        assert!(repo.take(prepared_id).await.is_none());
        assert!(repo.take(fresh_id).await.is_some());
        Ok(())
    }
}
