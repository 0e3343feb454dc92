use chrono::{DateTime, Utc};
use thiserror::Error;

use super::token::TokenError;

/// Errors that abort a collaborator fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GitHub API request rate limit reached{}", reset_hint(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("no such repository: {0}")]
    RepositoryNotFound(String),

    #[error("unable to get token to init API client for {owner}: {source}")]
    Token {
        owner: String,
        #[source]
        source: TokenError,
    },

    #[error("unusable next page link: {0}")]
    InvalidNextLink(String),

    #[error("pagination did not finish within {limit} pages")]
    PageLimitExceeded { limit: u32 },

    #[error("invalid GitHub API URL: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },
}

pub(crate) fn reset_hint(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(", resets at {}", at.to_rfc3339()),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
