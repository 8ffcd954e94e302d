//! Per-identity salt persistence.
//!
//! A salt pins the (subject, provider) pair to one derived address for the
//! lifetime of the record. Losing or regenerating a salt silently changes a
//! user's address, so stores must propagate storage failures instead of
//! fabricating a value.
//!
//! Three interchangeable implementations, selected by configuration:
//! [`PgSaltStore`] for production, [`MemorySaltStore`] for tests and the
//! demo flow, [`FixedSaltStore`] for single-tenant setups without a
//! database.

use crate::error::Error;
use async_trait::async_trait;
use rand::{rngs::OsRng, RngCore};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Salt width in bytes; encoded as 64 hex characters.
const SALT_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaltStats {
    pub count: u64,
    pub distinct_providers: u64,
}

#[async_trait]
pub trait SaltStore: Send + Sync {
    /// Return the stored salt for the pair, creating one on first use.
    /// Idempotent: the same pair always yields the same salt until an
    /// explicit update or delete.
    async fn get_or_create(&self, subject: &str, provider: &str) -> Result<String, Error>;

    /// Replace the salt for an existing pair. Returns true when a record
    /// changed.
    async fn update(&self, subject: &str, provider: &str, new_salt: &str) -> Result<bool, Error>;

    /// Remove the pair's salt. Returns true when a record existed.
    async fn delete(&self, subject: &str, provider: &str) -> Result<bool, Error>;

    async fn stats(&self) -> Result<SaltStats, Error>;
}

fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Postgres-backed store.
///
/// Expected schema:
///
/// ```sql
/// CREATE TABLE user_salts (
///     subject    TEXT NOT NULL,
///     provider   TEXT NOT NULL,
///     salt       TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (subject, provider)
/// );
/// ```
#[derive(Clone)]
pub struct PgSaltStore {
    pool: PgPool,
}

impl PgSaltStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SaltStore for PgSaltStore {
    async fn get_or_create(&self, subject: &str, provider: &str) -> Result<String, Error> {
        // Single-statement insert-or-fetch: the no-op DO UPDATE lets
        // RETURNING yield the existing salt, so two concurrent calls for the
        // same pair cannot create two different salts.
        let row = sqlx::query(
            r"
            INSERT INTO user_salts (subject, provider, salt)
            VALUES ($1, $2, $3)
            ON CONFLICT (subject, provider) DO UPDATE SET salt = user_salts.salt
            RETURNING salt
            ",
        )
        .bind(subject)
        .bind(provider)
        .bind(generate_salt())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("salt"))
    }

    async fn update(&self, subject: &str, provider: &str, new_salt: &str) -> Result<bool, Error> {
        let result = sqlx::query(
            r"
            UPDATE user_salts SET salt = $3, updated_at = NOW()
            WHERE subject = $1 AND provider = $2
            ",
        )
        .bind(subject)
        .bind(provider)
        .bind(new_salt)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, subject: &str, provider: &str) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM user_salts WHERE subject = $1 AND provider = $2")
            .bind(subject)
            .bind(provider)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn stats(&self) -> Result<SaltStats, Error> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count, COUNT(DISTINCT provider) AS providers FROM user_salts",
        )
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.get("count");
        let providers: i64 = row.get("providers");
        Ok(SaltStats {
            count: count.unsigned_abs(),
            distinct_providers: providers.unsigned_abs(),
        })
    }
}

/// In-memory store for tests and local development. The single mutex
/// serializes check-then-act on the pair key.
#[derive(Default)]
pub struct MemorySaltStore {
    records: Mutex<HashMap<(String, String), String>>,
}

impl MemorySaltStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SaltStore for MemorySaltStore {
    async fn get_or_create(&self, subject: &str, provider: &str) -> Result<String, Error> {
        let mut records = self.records.lock().await;
        let salt = records
            .entry((subject.to_string(), provider.to_string()))
            .or_insert_with(|| {
                debug!(subject, provider, "creating salt");
                generate_salt()
            });
        Ok(salt.clone())
    }

    async fn update(&self, subject: &str, provider: &str, new_salt: &str) -> Result<bool, Error> {
        let mut records = self.records.lock().await;
        match records.get_mut(&(subject.to_string(), provider.to_string())) {
            Some(salt) => {
                *salt = new_salt.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, subject: &str, provider: &str) -> Result<bool, Error> {
        let mut records = self.records.lock().await;
        Ok(records
            .remove(&(subject.to_string(), provider.to_string()))
            .is_some())
    }

    async fn stats(&self) -> Result<SaltStats, Error> {
        let records = self.records.lock().await;
        let mut providers: Vec<&str> = records.keys().map(|(_, p)| p.as_str()).collect();
        providers.sort_unstable();
        providers.dedup();
        Ok(SaltStats {
            count: records.len() as u64,
            distinct_providers: providers.len() as u64,
        })
    }
}

/// Constant-salt store for deployments that opt out of persistence. Every
/// identity shares the configured salt; update and delete are no-ops.
pub struct FixedSaltStore {
    salt: String,
}

impl FixedSaltStore {
    #[must_use]
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }
}

#[async_trait]
impl SaltStore for FixedSaltStore {
    async fn get_or_create(&self, _subject: &str, _provider: &str) -> Result<String, Error> {
        Ok(self.salt.clone())
    }

    async fn update(&self, subject: &str, provider: &str, _new_salt: &str) -> Result<bool, Error> {
        warn!(subject, provider, "fixed salt store ignores updates");
        Ok(false)
    }

    async fn delete(&self, subject: &str, provider: &str) -> Result<bool, Error> {
        warn!(subject, provider, "fixed salt store ignores deletes");
        Ok(false)
    }

    async fn stats(&self) -> Result<SaltStats, Error> {
        Ok(SaltStats {
            count: 1,
            distinct_providers: 0,
        })
    }
}
