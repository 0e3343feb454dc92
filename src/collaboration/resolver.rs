use crate::storage::{Result, StoreRead, StoreWrite};
use crate::types::Collaborator;

/// Returns the id of the account with `collaborator.login`, creating the row
/// from the payload if no such login is stored yet.
///
/// An existing row wins: its uid and permissions are left untouched. Calling
/// this repeatedly for the same login inside one transaction yields the same id.
pub fn resolve_account<W>(store: &W, collaborator: &Collaborator) -> Result<i64>
where
    W: StoreRead + StoreWrite + ?Sized,
{
    if let Some(account) = store.find_account_by_login(&collaborator.login)? {
        return Ok(account.id);
    }

    let id = store.insert_account(collaborator)?;
    log::debug!("created account {} (id={})", collaborator.login, id);
    Ok(id)
}
