use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use ureq::http::Response;
use ureq::{Agent, Body};
use url::Url;

use super::error::{FetchError, Result};
use super::pagination::parse_link_header;
use super::token::TokenSource;
use super::CollaboratorSource;
use crate::types::{split_repository_name, Collaborator, Permissions};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const MAX_PAGE_SIZE: u32 = 100;

/// Collaborator entry as returned by `GET /repos/{owner}/{repo}/collaborators`.
/// GitHub occasionally sends `null` entries, or entries whose fields are
/// missing or `null` for anonymized accounts.
#[derive(Debug, Deserialize)]
struct RemoteCollaborator {
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    permissions: Option<Permissions>,
}

impl RemoteCollaborator {
    fn into_collaborator(self) -> Option<Collaborator> {
        let login = self.login.filter(|login| !login.is_empty())?;
        Some(Collaborator::new(
            self.id.unwrap_or_default(),
            login,
            self.permissions.unwrap_or_default(),
        ))
    }
}

pub struct GitHubClient {
    agent: Agent,
    base_url: Url,
    tokens: Box<dyn TokenSource>,
    page_size: u32,
    max_pages: u32,
}

impl GitHubClient {
    pub fn new(
        base_url: &str,
        tokens: Box<dyn TokenSource>,
        page_size: u32,
        max_pages: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::BaseUrl(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }

        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            agent,
            base_url,
            tokens,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            max_pages: max_pages.max(1),
        })
    }

    fn collaborators_url(&self, owner: &str, name: &str, page: u32) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["repos", owner, name, "collaborators"]);
        }
        url.query_pairs_mut()
            .append_pair("per_page", &self.page_size.to_string())
            .append_pair("page", &page.to_string());
        url
    }

    fn get(&self, url: &Url, token: &str) -> Result<Response<Body>> {
        let response = self
            .agent
            .get(url.as_str())
            .header("Authorization", &format!("Bearer {}", token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", "collaborators")
            .call()?;
        Ok(response)
    }

    /// Resolves a `rel="next"` target. It must point at the configured API
    /// origin, since the bearer token is sent along.
    fn next_url(&self, raw: &str) -> Result<Url> {
        let url = Url::parse(raw).map_err(|_| FetchError::InvalidNextLink(raw.to_string()))?;
        if url.origin() != self.base_url.origin() {
            return Err(FetchError::InvalidNextLink(raw.to_string()));
        }
        Ok(url)
    }

    fn check_response(&self, full_name: &str, mut response: Response<Body>) -> Result<Response<Body>> {
        let status = response.status().as_u16();

        if (200..300).contains(&status) {
            return Ok(response);
        }

        if (status == 403 || status == 429) && is_rate_limited(&response) {
            return Err(FetchError::RateLimited {
                reset_at: rate_limit_reset(&response),
            });
        }

        if status == 404 {
            return Err(FetchError::RepositoryNotFound(full_name.to_string()));
        }

        let body = response
            .body_mut()
            .read_to_string()
            .unwrap_or_else(|_| String::new());

        let message = match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(value) => value
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or(&body)
                .to_string(),
            Err(_) if body.is_empty() => format!("HTTP {}", status),
            Err(_) => body,
        };

        Err(FetchError::Api { status, message })
    }
}

fn header_str<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

fn is_rate_limited(response: &Response<Body>) -> bool {
    header_str(response, "x-ratelimit-remaining") == Some("0")
        || response.headers().contains_key("retry-after")
}

fn rate_limit_reset(response: &Response<Body>) -> Option<DateTime<Utc>> {
    header_str(response, "x-ratelimit-reset")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
}

impl CollaboratorSource for GitHubClient {
    fn fetch_collaborators(&self, full_name: &str) -> Result<Vec<Collaborator>> {
        let (owner, name) = split_repository_name(full_name);
        if owner.is_empty() || name.is_empty() {
            return Err(FetchError::RepositoryNotFound(full_name.to_string()));
        }

        let token = self
            .tokens
            .token_for(owner)
            .map_err(|source| FetchError::Token {
                owner: owner.to_string(),
                source,
            })?;

        let mut collaborators = Vec::new();
        let mut url = self.collaborators_url(owner, name, 1);
        let mut fetched_pages = 0;

        loop {
            log::debug!("GET {}", url);

            let response = self.get(&url, &token)?;
            let mut response = self.check_response(full_name, response)?;
            fetched_pages += 1;

            let links = header_str(&response, "link")
                .map(parse_link_header)
                .unwrap_or_default();
            if let Some(last) = links.last_page {
                log::debug!("{}: page {} of {}", full_name, fetched_pages, last);
            }

            let entries: Vec<Option<RemoteCollaborator>> = response.body_mut().read_json()?;
            collaborators.extend(
                entries
                    .into_iter()
                    .flatten()
                    .filter_map(RemoteCollaborator::into_collaborator),
            );

            match links.next {
                Some(next) if fetched_pages >= self.max_pages => {
                    log::warn!(
                        "{}: next page {} beyond limit of {} pages",
                        full_name,
                        next,
                        self.max_pages
                    );
                    return Err(FetchError::PageLimitExceeded {
                        limit: self.max_pages,
                    });
                }
                Some(next) => url = self.next_url(&next)?,
                None => break,
            }
        }

        log::debug!(
            "{}: fetched {} collaborators in {} pages",
            full_name,
            collaborators.len(),
            fetched_pages
        );
        Ok(collaborators)
    }
}
