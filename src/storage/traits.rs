use crate::types::{Account, Collaborator, Repository};

use super::error::Result;

/// Queries available on any execution handle: a plain connection or an open
/// transaction.
pub trait StoreRead {
    fn find_repository(&self, full_name: &str) -> Result<Option<Repository>>;

    fn list_tracked_repositories(&self) -> Result<Vec<Repository>>;

    fn find_account_by_login(&self, login: &str) -> Result<Option<Account>>;

    /// Accounts linked to the repository, in link order. Unknown repositories
    /// have no accounts.
    fn list_accounts(&self, full_name: &str) -> Result<Vec<Account>>;

    fn list_linked_account_ids(&self, repository_id: i64) -> Result<Vec<i64>>;
}

/// Statements that mutate the identity store. Only transactions implement it.
pub trait StoreWrite {
    /// Inserts the repository if absent and returns the stored row either way.
    fn ensure_repository(&self, full_name: &str) -> Result<Repository>;

    fn set_repository_tracked(&self, full_name: &str, tracked: bool) -> Result<usize>;

    /// Inserts a new account row and returns its id. Fails on a duplicate login.
    fn insert_account(&self, collaborator: &Collaborator) -> Result<i64>;

    /// Overwrites uid, login and permissions of the row with `account.id`.
    fn update_account(&self, account: &Account) -> Result<usize>;

    /// Links an account to a repository. Returns false if the link already existed.
    fn link_account(&self, account_id: i64, repository_id: i64) -> Result<bool>;

    fn unlink_account(&self, account_id: i64, repository_id: i64) -> Result<usize>;

    /// Removes the single link between `login` and `full_name`, if any.
    fn disconnect_account(&self, full_name: &str, login: &str) -> Result<usize>;
}

/// A write transaction. Dropping it without `commit` rolls everything back.
pub trait StoreTx: StoreRead + StoreWrite {
    fn commit(self) -> Result<()>;
}

pub trait Store: StoreRead {
    type Tx: StoreTx;

    fn begin_tx(&self) -> Result<Self::Tx>;
}
