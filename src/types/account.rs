use serde::{Deserialize, Serialize};

use super::Permissions;

/// A collaborator as described by upstream or by an administrative payload.
/// Carries no local identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub uid: i64,
    pub login: String,
    #[serde(default)]
    pub permissions: Permissions,
}

impl Collaborator {
    pub fn new(uid: i64, login: impl Into<String>, permissions: Permissions) -> Self {
        Self {
            uid,
            login: login.into(),
            permissions,
        }
    }
}

/// A stored account row. `id` is assigned by the store and never changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(skip)]
    pub id: i64,
    pub uid: i64,
    pub login: String,
    pub permissions: Permissions,
}
