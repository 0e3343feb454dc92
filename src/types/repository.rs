use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Splits `owner/name` at the first separator.
///
/// Malformed input (no separator, or a separator at either end) yields a pair
/// of empty strings instead of an error.
pub fn split_repository_name(full_name: &str) -> (&str, &str) {
    match full_name.find('/') {
        Some(sep) if sep > 0 && sep < full_name.len() - 1 => {
            (&full_name[..sep], &full_name[sep + 1..])
        }
        _ => ("", ""),
    }
}

/// A validated `owner/name` pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RepositoryName {
    owner: String,
    name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRepositoryName(pub String);

impl fmt::Display for InvalidRepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid repository full name {:?}, expected <owner>/<name>", self.0)
    }
}

impl std::error::Error for InvalidRepositoryName {}

impl RepositoryName {
    pub fn full_name(&self) -> String {
        self.to_string()
    }
}

impl FromStr for RepositoryName {
    type Err = InvalidRepositoryName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match split_repository_name(s) {
            ("", "") => Err(InvalidRepositoryName(s.to_string())),
            (owner, name) => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
        }
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A tracked upstream repository row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Repository {
    #[serde(skip)]
    pub id: i64,
    pub full_name: String,
    pub tracked: bool,
}
