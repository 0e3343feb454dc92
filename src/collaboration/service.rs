use super::error::{Result, ServiceError};
use super::reconcile::{synchronize, SyncOptions, SyncReport};
use super::resolver::resolve_account;
use crate::github::CollaboratorSource;
use crate::storage::{Store, StoreRead, StoreTx, StoreWrite};
use crate::types::{Account, Collaborator, InvalidRepositoryName, Repository, RepositoryName};

/// Entry point for every collaborator operation. Holds no state of its own
/// besides the store handle, the upstream source and the sync options.
pub struct CollaborationService<S, F> {
    store: S,
    source: F,
    options: SyncOptions,
}

impl<S, F> CollaborationService<S, F>
where
    S: Store,
    F: CollaboratorSource,
{
    pub fn new(store: S, source: F, options: SyncOptions) -> Self {
        Self {
            store,
            source,
            options,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers a repository. Registering it again is a no-op.
    pub fn create_repository(&self, full_name: &str) -> Result<Repository> {
        let name = parse_name(full_name)?;

        let tx = self.store.begin_tx()?;
        let repository = tx.ensure_repository(&name.full_name())?;
        tx.commit()?;
        Ok(repository)
    }

    pub fn list_accounts(&self, full_name: &str) -> Result<Vec<Account>> {
        let name = parse_name(full_name)?;
        Ok(self.store.list_accounts(&name.full_name())?)
    }

    /// Links the account described by `collaborator` to the repository,
    /// creating the account and the repository as needed.
    pub fn add_account(&self, full_name: &str, collaborator: &Collaborator) -> Result<Account> {
        let name = parse_name(full_name)?;
        check_login(&collaborator.login)?;

        let tx = self.store.begin_tx()?;
        let repository = tx.ensure_repository(&name.full_name())?;
        let account_id = resolve_account(&tx, collaborator)?;
        if tx.link_account(account_id, repository.id)? {
            log::info!("{}: linked {}", repository.full_name, collaborator.login);
        }
        let account = tx
            .find_account_by_login(&collaborator.login)?
            .ok_or_else(|| ServiceError::UnknownAccount(collaborator.login.clone()))?;
        tx.commit()?;
        Ok(account)
    }

    /// Overwrites uid and permissions of the account with `collaborator.login`.
    pub fn edit_account(&self, full_name: &str, collaborator: &Collaborator) -> Result<Account> {
        parse_name(full_name)?;
        check_login(&collaborator.login)?;

        let tx = self.store.begin_tx()?;
        let mut account = tx
            .find_account_by_login(&collaborator.login)?
            .ok_or_else(|| ServiceError::UnknownAccount(collaborator.login.clone()))?;
        account.uid = collaborator.uid;
        account.permissions = collaborator.permissions.clone();
        tx.update_account(&account)?;
        tx.commit()?;
        Ok(account)
    }

    /// Removes the link between `login` and the repository. Returns whether a
    /// link existed. The account row and its other links stay.
    pub fn disconnect_account(&self, full_name: &str, login: &str) -> Result<bool> {
        let name = parse_name(full_name)?;
        check_login(login)?;

        let tx = self.store.begin_tx()?;
        let removed = tx.disconnect_account(&name.full_name(), login)?;
        tx.commit()?;

        if removed > 0 {
            log::info!("{}: disconnected {}", name, login);
        }
        Ok(removed > 0)
    }

    pub fn synchronize(&self, full_name: &str) -> Result<SyncReport> {
        let name = parse_name(full_name)?;
        synchronize(&self.store, &self.source, &name.full_name(), self.options)
    }

    pub fn set_tracked(&self, full_name: &str, tracked: bool) -> Result<()> {
        let name = parse_name(full_name)?;

        let full_name = name.full_name();

        let tx = self.store.begin_tx()?;
        if tx.find_repository(&full_name)?.is_none() {
            return Err(ServiceError::UnknownRepository(full_name));
        }
        tx.set_repository_tracked(&full_name, tracked)?;
        tx.commit()?;
        Ok(())
    }

    pub fn list_tracked(&self) -> Result<Vec<Repository>> {
        Ok(self.store.list_tracked_repositories()?)
    }

    /// Synchronizes every tracked repository in name order. A failing
    /// repository does not stop the others.
    pub fn synchronize_tracked(&self) -> Result<Vec<(String, Result<SyncReport>)>> {
        let repositories = self.list_tracked()?;

        let outcomes = repositories
            .into_iter()
            .map(|repository| {
                let outcome = self.synchronize(&repository.full_name);
                if let Err(err) = &outcome {
                    log::error!("{}: synchronization failed: {}", repository.full_name, err);
                }
                (repository.full_name, outcome)
            })
            .collect();

        Ok(outcomes)
    }
}

fn parse_name(full_name: &str) -> Result<RepositoryName> {
    full_name
        .parse()
        .map_err(|err: InvalidRepositoryName| ServiceError::Validation(err.to_string()))
}

fn check_login(login: &str) -> Result<()> {
    if login.trim().is_empty() {
        return Err(ServiceError::Validation("login must not be empty".into()));
    }
    Ok(())
}
