//! OAuth identity provider descriptors and authorization URL building.

use crate::error::Error;
use std::collections::HashMap;
use url::Url;

/// Which OAuth response the authorization request asks for. The implicit
/// flow returns the token on the redirect and carries the nonce; the code
/// flow returns a code to exchange and omits the nonce, per provider
/// requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthFlow {
    Implicit,
    AuthorizationCode,
}

/// One identity provider's OAuth endpoint descriptor. Opaque to the session
/// core beyond URL construction.
#[derive(Debug, Clone)]
pub struct OAuthProvider {
    pub name: String,
    pub authorization_endpoint: Url,
    pub scopes: String,
}

impl OAuthProvider {
    /// Google's OpenID Connect authorization endpoint.
    ///
    /// # Panics
    ///
    /// Never: the endpoint literal is a valid URL.
    #[must_use]
    pub fn google() -> Self {
        Self {
            name: "google".to_string(),
            authorization_endpoint: Url::parse("https://accounts.google.com/o/oauth2/v2/auth")
                .expect("static url"),
            scopes: "openid email profile".to_string(),
        }
    }
}

/// Provider registry keyed by name, seeded with Google.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, OAuthProvider>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        let google = OAuthProvider::google();
        let mut providers = HashMap::new();
        providers.insert(google.name.clone(), google);
        Self { providers }
    }
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: OAuthProvider) {
        self.providers.insert(provider.name.clone(), provider);
    }

    /// # Errors
    ///
    /// Returns [`Error::MissingConfig`] when no provider is registered
    /// under the name.
    pub fn get(&self, name: &str) -> Result<&OAuthProvider, Error> {
        self.providers
            .get(name)
            .ok_or(Error::MissingConfig("provider"))
    }
}

/// Build the provider authorization request URL.
///
/// # Errors
///
/// Returns [`Error::MissingConfig`] when the client id or redirect URL is
/// empty, or when the implicit flow is requested without a nonce.
pub fn build_authorization_url(
    provider: &OAuthProvider,
    client_id: &str,
    redirect_url: &str,
    flow: OAuthFlow,
    nonce: Option<&str>,
) -> Result<Url, Error> {
    if client_id.is_empty() {
        return Err(Error::MissingConfig("client id"));
    }
    if redirect_url.is_empty() {
        return Err(Error::MissingConfig("redirect url"));
    }

    let mut url = provider.authorization_endpoint.clone();
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_url)
            .append_pair("scope", &provider.scopes);

        match flow {
            OAuthFlow::Implicit => {
                let nonce = nonce.ok_or(Error::MissingConfig("nonce"))?;
                query
                    .append_pair("response_type", "id_token")
                    .append_pair("nonce", nonce);
            }
            OAuthFlow::AuthorizationCode => {
                query.append_pair("response_type", "code");
            }
        }
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_google() -> Result<(), Error> {
        let registry = ProviderRegistry::new();
        let provider = registry.get("google")?;
        assert_eq!(provider.name, "google");
        assert!(matches!(
            registry.get("github"),
            Err(Error::MissingConfig("provider"))
        ));
        Ok(())
    }

    #[test]
    fn implicit_flow_carries_nonce() -> Result<(), Error> {
        let url = build_authorization_url(
            &OAuthProvider::google(),
            "client-123",
            "http://localhost:3000/callback",
            OAuthFlow::Implicit,
            Some("nonce-abc"),
        )?;

        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(query.contains(&("response_type".to_string(), "id_token".to_string())));
        assert!(query.contains(&("nonce".to_string(), "nonce-abc".to_string())));
        assert!(query.contains(&("client_id".to_string(), "client-123".to_string())));
        Ok(())
    }

    #[test]
    fn code_flow_omits_nonce() -> Result<(), Error> {
        let url = build_authorization_url(
            &OAuthProvider::google(),
            "client-123",
            "http://localhost:3000/callback",
            OAuthFlow::AuthorizationCode,
            None,
        )?;

        assert!(url.query().is_some_and(|q| q.contains("response_type=code")));
        assert!(!url.query().is_some_and(|q| q.contains("nonce=")));
        Ok(())
    }

    #[test]
    fn missing_config_is_named() {
        let provider = OAuthProvider::google();
        let result =
            build_authorization_url(&provider, "", "http://cb", OAuthFlow::Implicit, Some("n"));
        assert!(matches!(result, Err(Error::MissingConfig("client id"))));

        let result =
            build_authorization_url(&provider, "id", "", OAuthFlow::Implicit, Some("n"));
        assert!(matches!(result, Err(Error::MissingConfig("redirect url"))));

        let result = build_authorization_url(&provider, "id", "http://cb", OAuthFlow::Implicit, None);
        assert!(matches!(result, Err(Error::MissingConfig("nonce"))));
    }
}
