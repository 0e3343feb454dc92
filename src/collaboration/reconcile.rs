use std::collections::HashSet;

use serde::Serialize;

use super::error::Result;
use super::resolver::resolve_account;
use crate::github::CollaboratorSource;
use crate::storage::{Store, StoreTx};
use crate::types::Collaborator;

#[derive(Clone, Copy, Debug, Default)]
pub struct SyncOptions {
    /// Remove links to accounts that are no longer collaborators upstream.
    /// Off by default: only explicit disconnects remove links.
    pub prune: bool,
}

/// Outcome of one synchronization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub repository: String,
    pub fetched: usize,
    pub linked: usize,
    pub pruned: usize,
}

/// Makes the stored collaborator set of `full_name` match upstream.
///
/// The upstream list is fetched before any transaction opens. Every write
/// then happens in a single transaction that is only committed when all
/// collaborators were applied.
#[tracing::instrument(level = "debug", skip(store, source))]
pub fn synchronize<S, F>(
    store: &S,
    source: &F,
    full_name: &str,
    options: SyncOptions,
) -> Result<SyncReport>
where
    S: Store,
    F: CollaboratorSource + ?Sized,
{
    log::info!("🔄 Synchronizing collaborators of {}", full_name);

    let collaborators = source.fetch_collaborators(full_name)?;
    log::info!(
        "{}: {} collaborators fetched",
        full_name,
        collaborators.len()
    );

    let tx = store.begin_tx()?;
    let report = apply(&tx, full_name, &collaborators, options)?;
    tx.commit()?;

    log::info!(
        "✅ {}: committed ({} new links, {} pruned)",
        report.repository,
        report.linked,
        report.pruned
    );
    Ok(report)
}

fn apply<T: StoreTx>(
    tx: &T,
    full_name: &str,
    collaborators: &[Collaborator],
    options: SyncOptions,
) -> Result<SyncReport> {
    let repository = tx.ensure_repository(full_name)?;

    let mut report = SyncReport {
        repository: repository.full_name.clone(),
        fetched: collaborators.len(),
        ..SyncReport::default()
    };

    let mut present = HashSet::with_capacity(collaborators.len());
    for collaborator in collaborators {
        let account_id = resolve_account(tx, collaborator)?;
        if tx.link_account(account_id, repository.id)? {
            report.linked += 1;
        }
        present.insert(account_id);
    }

    if options.prune {
        for account_id in tx.list_linked_account_ids(repository.id)? {
            if !present.contains(&account_id) {
                report.pruned += tx.unlink_account(account_id, repository.id)?;
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaboration::test_support::{temp_storage, FixtureSource};
    use crate::collaboration::ServiceError;
    use crate::github::FetchError;
    use crate::storage::{SqliteStorage, StoreRead};
    use crate::types::Permissions;
    use rusqlite::Connection;

    fn collaborator(uid: i64, login: &str) -> Collaborator {
        Collaborator::new(uid, login, Permissions::from([("pull", true)]))
    }

    fn count(storage: &SqliteStorage, sql: &str) -> i64 {
        let conn = Connection::open(&storage.path).unwrap();
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    fn logins(storage: &SqliteStorage, full_name: &str) -> Vec<String> {
        storage
            .list_accounts(full_name)
            .unwrap()
            .into_iter()
            .map(|account| account.login)
            .collect()
    }

    #[test]
    fn creates_repository_accounts_and_links() {
        let (_dir, storage) = temp_storage();
        let source = FixtureSource::new().with(
            "octo/widgets",
            vec![collaborator(1, "alice"), collaborator(2, "bob")],
        );

        let report =
            synchronize(&storage, &source, "octo/widgets", SyncOptions::default()).unwrap();

        assert_eq!(
            report,
            SyncReport {
                repository: "octo/widgets".into(),
                fetched: 2,
                linked: 2,
                pruned: 0,
            }
        );
        assert!(storage.find_repository("octo/widgets").unwrap().is_some());
        assert_eq!(logins(&storage, "octo/widgets"), vec!["alice", "bob"]);
    }

    #[test]
    fn second_run_changes_nothing() {
        let (_dir, storage) = temp_storage();
        let source = FixtureSource::new().with(
            "octo/widgets",
            vec![collaborator(1, "alice"), collaborator(2, "bob")],
        );

        synchronize(&storage, &source, "octo/widgets", SyncOptions::default()).unwrap();
        let report =
            synchronize(&storage, &source, "octo/widgets", SyncOptions::default()).unwrap();

        assert_eq!(report.linked, 0);
        assert_eq!(count(&storage, "SELECT COUNT(*) FROM accounts"), 2);
        assert_eq!(count(&storage, "SELECT COUNT(*) FROM collaboration"), 2);
        assert_eq!(count(&storage, "SELECT COUNT(*) FROM repositories"), 1);
    }

    #[test]
    fn duplicate_login_in_one_fetch_yields_one_account() {
        let (_dir, storage) = temp_storage();
        let source = FixtureSource::new().with(
            "octo/widgets",
            vec![collaborator(1, "alice"), collaborator(1, "alice")],
        );

        let report =
            synchronize(&storage, &source, "octo/widgets", SyncOptions::default()).unwrap();

        assert_eq!(report.linked, 1);
        assert_eq!(
            count(&storage, "SELECT COUNT(*) FROM accounts WHERE login = 'alice'"),
            1
        );
    }

    #[test]
    fn accounts_are_shared_across_repositories() {
        let (_dir, storage) = temp_storage();
        let source = FixtureSource::new()
            .with("octo/a", vec![collaborator(1, "octocat")])
            .with("octo/b", vec![collaborator(1, "octocat")]);

        synchronize(&storage, &source, "octo/a", SyncOptions::default()).unwrap();
        synchronize(&storage, &source, "octo/b", SyncOptions::default()).unwrap();

        assert_eq!(count(&storage, "SELECT COUNT(*) FROM accounts"), 1);
        assert_eq!(count(&storage, "SELECT COUNT(*) FROM collaboration"), 2);
    }

    #[test]
    fn failure_midway_leaves_no_links() {
        let (_dir, storage) = temp_storage();
        {
            let conn = Connection::open(&storage.path).unwrap();
            conn.execute_batch(
                "CREATE TRIGGER fail_on_boom BEFORE INSERT ON accounts
                 WHEN NEW.login = 'boom'
                 BEGIN SELECT RAISE(ABORT, 'simulated failure'); END;",
            )
            .unwrap();
        }
        let source = FixtureSource::new().with(
            "octo/widgets",
            vec![
                collaborator(1, "alice"),
                collaborator(2, "bob"),
                collaborator(3, "boom"),
                collaborator(4, "dave"),
            ],
        );

        let err =
            synchronize(&storage, &source, "octo/widgets", SyncOptions::default()).unwrap_err();

        assert!(err.to_string().contains("create account"));
        assert_eq!(count(&storage, "SELECT COUNT(*) FROM collaboration"), 0);
        assert_eq!(count(&storage, "SELECT COUNT(*) FROM accounts"), 0);
        assert!(storage.find_repository("octo/widgets").unwrap().is_none());
    }

    #[test]
    fn fetch_failure_touches_nothing() {
        let (_dir, storage) = temp_storage();
        let source = FixtureSource::new().failing(
            "octo/widgets",
            FetchError::RateLimited { reset_at: None },
        );

        let err =
            synchronize(&storage, &source, "octo/widgets", SyncOptions::default()).unwrap_err();

        assert!(matches!(err, ServiceError::RateLimited { .. }));
        assert_eq!(count(&storage, "SELECT COUNT(*) FROM repositories"), 0);
    }

    #[test]
    fn stale_links_survive_without_prune() {
        let (_dir, storage) = temp_storage();
        let before = FixtureSource::new().with(
            "octo/widgets",
            vec![collaborator(1, "alice"), collaborator(2, "bob")],
        );
        let after = FixtureSource::new().with("octo/widgets", vec![collaborator(1, "alice")]);

        synchronize(&storage, &before, "octo/widgets", SyncOptions::default()).unwrap();
        let report =
            synchronize(&storage, &after, "octo/widgets", SyncOptions::default()).unwrap();

        assert_eq!(report.pruned, 0);
        assert_eq!(logins(&storage, "octo/widgets"), vec!["alice", "bob"]);
    }

    #[test]
    fn prune_removes_only_this_repositorys_stale_links() {
        let (_dir, storage) = temp_storage();
        let before = FixtureSource::new()
            .with(
                "octo/widgets",
                vec![collaborator(1, "alice"), collaborator(2, "bob")],
            )
            .with("octo/gadgets", vec![collaborator(2, "bob")]);
        let after = FixtureSource::new().with("octo/widgets", vec![collaborator(1, "alice")]);

        synchronize(&storage, &before, "octo/widgets", SyncOptions::default()).unwrap();
        synchronize(&storage, &before, "octo/gadgets", SyncOptions::default()).unwrap();
        let report =
            synchronize(&storage, &after, "octo/widgets", SyncOptions { prune: true }).unwrap();

        assert_eq!(report.pruned, 1);
        assert_eq!(logins(&storage, "octo/widgets"), vec!["alice"]);
        assert_eq!(logins(&storage, "octo/gadgets"), vec!["bob"]);
        assert!(storage.find_account_by_login("bob").unwrap().is_some());
    }
}
