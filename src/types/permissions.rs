use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Access flags granted to a collaborator, keyed by permission name
/// (`pull`, `push`, `admin`, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(BTreeMap<String, bool>);

impl Permissions {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<bool> {
        self.0.get(name).copied()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encodes the mapping for the `accounts.permissions` column.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }

    /// Decodes the `accounts.permissions` column. An empty column reads as no flags.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw).map(Self)
    }
}

impl From<BTreeMap<String, bool>> for Permissions {
    fn from(value: BTreeMap<String, bool>) -> Self {
        Self(value)
    }
}

impl<const N: usize> From<[(&str, bool); N]> for Permissions {
    fn from(value: [(&str, bool); N]) -> Self {
        Self(
            value
                .into_iter()
                .map(|(name, granted)| (name.to_string(), granted))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_column_is_a_plain_object() {
        let perms = Permissions::from([("pull", true), ("push", false), ("admin", false)]);
        let encoded = perms.to_json().unwrap();
        assert_eq!(encoded, r#"{"admin":false,"pull":true,"push":false}"#);
        assert_eq!(Permissions::from_json(&encoded).unwrap(), perms);
    }

    #[test]
    fn empty_column_decodes_to_no_flags() {
        assert!(Permissions::from_json("").unwrap().is_empty());
        assert!(Permissions::from_json("{}").unwrap().is_empty());
    }

    #[test]
    fn malformed_column_is_an_error() {
        assert!(Permissions::from_json("[true]").is_err());
        assert!(Permissions::from_json(r#"{"pull":"yes"}"#).is_err());
    }

    #[test]
    fn serde_is_transparent() {
        let perms: Permissions = serde_json::from_str(r#"{"pull":true}"#).unwrap();
        assert_eq!(perms.get("pull"), Some(true));
        assert_eq!(perms.get("admin"), None);
        assert_eq!(serde_json::to_string(&perms).unwrap(), r#"{"pull":true}"#);
    }
}
