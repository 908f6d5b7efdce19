//! Collaborator implementations wired in at startup.
//!
//! Authentication and profile lookup are injected into [`AppState`] as trait
//! objects; these are the concrete implementations the binary constructs from
//! its environment. The absent profile service is represented by
//! [`NullProfileLookup`], not by probing at request time.
//!
//! [`AppState`]: crate::AppState
//! [`NullProfileLookup`]: refnote_core::NullProfileLookup

use async_trait::async_trait;
use axum::http::HeaderMap;
use tracing::{debug, warn};

use refnote_core::{Authenticator, ProfileLookup, Result, UserProfile};

/// Authenticates by reading a trusted identity header.
///
/// Intended for deployments behind a reverse proxy or gateway that validates
/// the session and forwards the user ID in a header (default `x-user-id`).
/// A missing or empty header means unauthenticated.
#[derive(Debug, Clone)]
pub struct HeaderAuthenticator {
    header_name: String,
}

impl HeaderAuthenticator {
    pub fn new(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
        }
    }
}

#[async_trait]
impl Authenticator for HeaderAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<String>> {
        let value = headers
            .get(&self.header_name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from);
        Ok(value)
    }
}

/// Resolves author profiles from an external HTTP service.
///
/// Issues `GET {base_url}/{author_id}` and expects a [`UserProfile`] JSON
/// body. Any non-success status resolves to `None` so callers fall back to
/// the placeholder author.
#[derive(Debug, Clone)]
pub struct HttpProfileLookup {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProfileLookup {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ProfileLookup for HttpProfileLookup {
    async fn lookup(&self, author_id: &str) -> Result<Option<UserProfile>> {
        let url = format!("{}/{}", self.base_url, author_id);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            debug!(
                author_id = %author_id,
                status = %response.status(),
                "profile lookup returned non-success status"
            );
            return Ok(None);
        }

        match response.json::<UserProfile>().await {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                warn!(author_id = %author_id, error = %e, "profile response failed to parse");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn test_header_authenticator_reads_configured_header() {
        let auth = HeaderAuthenticator::new("x-user-id");
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("user-42"));

        let got = auth.authenticate(&headers).await.unwrap();
        assert_eq!(got, Some("user-42".to_string()));
    }

    #[tokio::test]
    async fn test_header_authenticator_missing_header_is_anonymous() {
        let auth = HeaderAuthenticator::new("x-user-id");
        let headers = HeaderMap::new();
        assert!(auth.authenticate(&headers).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_header_authenticator_rejects_blank_value() {
        let auth = HeaderAuthenticator::new("x-user-id");
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("   "));
        assert!(auth.authenticate(&headers).await.unwrap().is_none());
    }

    #[test]
    fn test_http_profile_lookup_trims_trailing_slash() {
        let lookup = HttpProfileLookup::new("http://profiles.local/api/users/");
        assert_eq!(lookup.base_url, "http://profiles.local/api/users");
    }
}
