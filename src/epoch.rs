//! Current-epoch lookup.

use crate::error::Error;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Bounded timeout for the epoch fetch; a hung endpoint is treated like a
/// failed one.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a session's current epoch came from. Fallback values are recorded
/// on the session so callers can see the validity window may be stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochSource {
    Network,
    Fallback,
}

#[async_trait]
pub trait EpochProvider: Send + Sync {
    /// Fetch the network's current epoch.
    async fn current_epoch(&self) -> Result<u64, Error>;
}

/// Fetches the epoch from a JSON endpoint shaped `{"epoch": <number>}`.
pub struct HttpEpochProvider {
    client: Client,
    endpoint: Url,
}

impl HttpEpochProvider {
    /// # Errors
    ///
    /// Returns [`Error::EpochFetch`] when the HTTP client cannot be built.
    pub fn new(endpoint: Url) -> Result<Self, Error> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|err| Error::EpochFetch(err.to_string()))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl EpochProvider for HttpEpochProvider {
    async fn current_epoch(&self) -> Result<u64, Error> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|err| Error::EpochFetch(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::EpochFetch(format!(
                "{} - {}",
                self.endpoint,
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| Error::EpochFetch(err.to_string()))?;

        let epoch = body["epoch"]
            .as_u64()
            .ok_or_else(|| Error::EpochFetch("no epoch field in response".to_string()))?;

        debug!(epoch, "fetched current epoch");

        Ok(epoch)
    }
}

/// Constant epoch, for tests and offline runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedEpochProvider(pub u64);

#[async_trait]
impl EpochProvider for FixedEpochProvider {
    async fn current_epoch(&self) -> Result<u64, Error> {
        Ok(self.0)
    }
}

/// Always fails; exercises the fallback path in tests.
#[cfg(test)]
pub(crate) struct FailingEpochProvider;

#[cfg(test)]
#[async_trait]
impl EpochProvider for FailingEpochProvider {
    async fn current_epoch(&self) -> Result<u64, Error> {
        Err(Error::EpochFetch("unreachable endpoint".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_provider_returns_value() -> Result<(), Error> {
        assert_eq!(FixedEpochProvider(100).current_epoch().await?, 100);
        Ok(())
    }

    #[tokio::test]
    async fn failing_provider_reports_fetch_error() {
        let result = FailingEpochProvider.current_epoch().await;
        assert!(matches!(result, Err(Error::EpochFetch(_))));
    }
}
