//! Upstream collaborator lookup against the GitHub REST API.

mod client;
mod error;
mod pagination;
mod token;

pub use client::{GitHubClient, DEFAULT_API_URL};
pub(crate) use error::reset_hint;
pub use error::{FetchError, Result};
pub use token::{HttpTokenSource, StaticTokenSource, TokenSource};

use crate::types::Collaborator;

/// Anything that can list the collaborators of a repository identified by its
/// full name. The result is complete: either every page or an error.
pub trait CollaboratorSource: Send + Sync {
    fn fetch_collaborators(&self, full_name: &str) -> Result<Vec<Collaborator>>;
}
