//! Credential sourcing for upstream calls.
//!
//! Every fetch asks a [`TokenSource`] for the token of the repository owner
//! before the first request goes out.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use ureq::Agent;
use url::Url;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("no token configured")]
    Missing,

    #[error("token service request failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("token service responded with HTTP {0}")]
    Status(u16),

    #[error("token service returned an empty token")]
    Empty,
}

pub trait TokenSource: Send + Sync {
    fn token_for(&self, owner: &str) -> Result<String, TokenError>;
}

/// Hands out the same token for every owner.
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenSource for StaticTokenSource {
    fn token_for(&self, _owner: &str) -> Result<String, TokenError> {
        if self.token.is_empty() {
            return Err(TokenError::Missing);
        }
        Ok(self.token.clone())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: String,
}

/// Asks a token-issuing service for a per-owner token:
/// `GET {base}/tokens/{owner}` answering `{"token": "..."}`.
pub struct HttpTokenSource {
    agent: Agent,
    base_url: Url,
}

impl HttpTokenSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase);
        }

        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self { agent, base_url })
    }

    fn token_url(&self, owner: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["tokens", owner]);
        }
        url
    }
}

impl TokenSource for HttpTokenSource {
    fn token_for(&self, owner: &str) -> Result<String, TokenError> {
        let url = self.token_url(owner);
        let mut response = self
            .agent
            .get(url.as_str())
            .header("Accept", "application/json")
            .call()?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(TokenError::Status(status));
        }

        let body: TokenResponse = response.body_mut().read_json()?;
        if body.token.is_empty() {
            return Err(TokenError::Empty);
        }
        Ok(body.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn static_source_rejects_empty_token() {
        assert!(matches!(
            StaticTokenSource::new("").token_for("octocat"),
            Err(TokenError::Missing)
        ));
        assert_eq!(
            StaticTokenSource::new("t0k3n").token_for("octocat").unwrap(),
            "t0k3n"
        );
    }

    #[tokio::test]
    async fn http_source_fetches_owner_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/tokens/user1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "token1"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let source = HttpTokenSource::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
        assert_eq!(source.token_for("user1").unwrap(), "token1");
    }

    #[tokio::test]
    async fn http_source_reports_failures() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/tokens/unknown"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tokens/blank"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&mock_server)
            .await;

        let source = HttpTokenSource::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
        assert!(matches!(
            source.token_for("unknown"),
            Err(TokenError::Status(404))
        ));
        assert!(matches!(source.token_for("blank"), Err(TokenError::Empty)));
    }

    #[test]
    fn http_source_rejects_non_base_urls() {
        assert!(HttpTokenSource::new("mailto:tokens@example.com", Duration::from_secs(1)).is_err());
        assert!(HttpTokenSource::new("not a url", Duration::from_secs(1)).is_err());
    }
}
