use std::path::Path;

use rusqlite::{params, types::Type, Connection, OptionalExtension};

use crate::types::{Account, Collaborator, Permissions, Repository};

use super::{
    error::{OpContext, Result, StoreError},
    traits::{Store, StoreRead, StoreTx, StoreWrite},
};

const DB_SCHEMA_VERSION: i64 = 1;

#[derive(Clone)]
pub struct SqliteStorage {
    pub path: String,
}

pub struct SqliteTx {
    conn: Connection,
    committed: bool,
}

impl StoreTx for SqliteTx {
    fn commit(mut self) -> Result<()> {
        self.conn.execute("COMMIT", []).op("commit transaction")?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for SqliteTx {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(err) = self.conn.execute("ROLLBACK", []) {
                log::warn!("rollback failed: {}", err);
            }
        }
    }
}

fn map_repository_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Repository> {
    let tracked: i64 = row.get(2)?;
    Ok(Repository {
        id: row.get(0)?,
        full_name: row.get(1)?,
        tracked: tracked != 0,
    })
}

fn map_account_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    let raw: String = row.get(3)?;
    let permissions = Permissions::from_json(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(err)))?;
    Ok(Account {
        id: row.get(0)?,
        uid: row.get(1)?,
        login: row.get(2)?,
        permissions,
    })
}

fn encode_permissions(permissions: &Permissions) -> rusqlite::Result<String> {
    permissions
        .to_json()
        .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))
}

fn db_find_repository(conn: &Connection, full_name: &str) -> rusqlite::Result<Option<Repository>> {
    conn.query_row(
        "SELECT id, full_name, tracked FROM repositories WHERE full_name = ?1",
        params![full_name],
        map_repository_row,
    )
    .optional()
}

fn db_list_tracked_repositories(conn: &Connection) -> rusqlite::Result<Vec<Repository>> {
    let mut stmt = conn.prepare(
        "SELECT id, full_name, tracked FROM repositories WHERE tracked = 1 ORDER BY full_name",
    )?;
    let rows = stmt
        .query_map([], map_repository_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_find_account_by_login(conn: &Connection, login: &str) -> rusqlite::Result<Option<Account>> {
    conn.query_row(
        "SELECT id, uid, login, permissions FROM accounts WHERE login = ?1",
        params![login],
        map_account_row,
    )
    .optional()
}

fn db_list_accounts(conn: &Connection, full_name: &str) -> rusqlite::Result<Vec<Account>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT accounts.id, accounts.uid, accounts.login, accounts.permissions
        FROM accounts
        INNER JOIN collaboration ON accounts.id = collaboration.account_id
        INNER JOIN repositories ON collaboration.repository_id = repositories.id
        WHERE repositories.full_name = ?1
        ORDER BY collaboration.rowid
        "#,
    )?;
    let rows = stmt
        .query_map(params![full_name], map_account_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_list_linked_account_ids(conn: &Connection, repository_id: i64) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT account_id FROM collaboration WHERE repository_id = ?1 ORDER BY rowid",
    )?;
    let ids = stmt
        .query_map(params![repository_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids)
}

fn db_insert_repository(conn: &Connection, full_name: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO repositories (full_name) VALUES (?1) ON CONFLICT(full_name) DO NOTHING",
        params![full_name],
    )
}

fn db_set_repository_tracked(
    conn: &Connection,
    full_name: &str,
    tracked: bool,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE repositories SET tracked = ?2 WHERE full_name = ?1",
        params![full_name, tracked as i64],
    )
}

fn db_insert_account(conn: &Connection, collaborator: &Collaborator) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO accounts (uid, login, permissions) VALUES (?1, ?2, ?3)",
        params![
            collaborator.uid,
            collaborator.login,
            encode_permissions(&collaborator.permissions)?
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn db_update_account(conn: &Connection, account: &Account) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE accounts SET uid = ?2, login = ?3, permissions = ?4 WHERE id = ?1",
        params![
            account.id,
            account.uid,
            account.login,
            encode_permissions(&account.permissions)?
        ],
    )
}

fn db_link_account(conn: &Connection, account_id: i64, repository_id: i64) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        r#"
        INSERT INTO collaboration (account_id, repository_id) VALUES (?1, ?2)
        ON CONFLICT(account_id, repository_id) DO NOTHING
        "#,
        params![account_id, repository_id],
    )?;
    Ok(inserted == 1)
}

fn db_unlink_account(
    conn: &Connection,
    account_id: i64,
    repository_id: i64,
) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM collaboration WHERE account_id = ?1 AND repository_id = ?2",
        params![account_id, repository_id],
    )
}

fn db_disconnect_account(conn: &Connection, full_name: &str, login: &str) -> rusqlite::Result<usize> {
    conn.execute(
        r#"
        DELETE FROM collaboration
        WHERE account_id = (SELECT id FROM accounts WHERE login = ?2)
          AND repository_id = (SELECT id FROM repositories WHERE full_name = ?1)
        "#,
        params![full_name, login],
    )
}

fn open_conn(path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_millis(500))?;
    Ok(conn)
}

impl StoreRead for SqliteTx {
    fn find_repository(&self, full_name: &str) -> Result<Option<Repository>> {
        db_find_repository(&self.conn, full_name).op("load repository")
    }

    fn list_tracked_repositories(&self) -> Result<Vec<Repository>> {
        db_list_tracked_repositories(&self.conn).op("list tracked repositories")
    }

    fn find_account_by_login(&self, login: &str) -> Result<Option<Account>> {
        db_find_account_by_login(&self.conn, login).op("look up account")
    }

    fn list_accounts(&self, full_name: &str) -> Result<Vec<Account>> {
        db_list_accounts(&self.conn, full_name).op("list accounts")
    }

    fn list_linked_account_ids(&self, repository_id: i64) -> Result<Vec<i64>> {
        db_list_linked_account_ids(&self.conn, repository_id).op("list collaborations")
    }
}

impl StoreWrite for SqliteTx {
    fn ensure_repository(&self, full_name: &str) -> Result<Repository> {
        db_insert_repository(&self.conn, full_name).op("create repository")?;
        db_find_repository(&self.conn, full_name)
            .op("load repository")?
            .ok_or(StoreError::Sqlite {
                op: "load repository",
                source: rusqlite::Error::QueryReturnedNoRows,
            })
    }

    fn set_repository_tracked(&self, full_name: &str, tracked: bool) -> Result<usize> {
        db_set_repository_tracked(&self.conn, full_name, tracked).op("update repository")
    }

    fn insert_account(&self, collaborator: &Collaborator) -> Result<i64> {
        db_insert_account(&self.conn, collaborator).op("create account")
    }

    fn update_account(&self, account: &Account) -> Result<usize> {
        db_update_account(&self.conn, account).op("update account")
    }

    fn link_account(&self, account_id: i64, repository_id: i64) -> Result<bool> {
        db_link_account(&self.conn, account_id, repository_id).op("create collaboration")
    }

    fn unlink_account(&self, account_id: i64, repository_id: i64) -> Result<usize> {
        db_unlink_account(&self.conn, account_id, repository_id).op("delete collaboration")
    }

    fn disconnect_account(&self, full_name: &str, login: &str) -> Result<usize> {
        db_disconnect_account(&self.conn, full_name, login).op("delete collaboration")
    }
}

impl Store for SqliteStorage {
    type Tx = SqliteTx;

    fn begin_tx(&self) -> Result<Self::Tx> {
        let conn = self.with_conn(Ok)?;
        conn.execute("BEGIN IMMEDIATE", []).op("begin transaction")?;

        Ok(SqliteTx {
            conn,
            committed: false,
        })
    }
}

impl SqliteStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_string_lossy().to_string(),
        }
    }

    pub fn reset_all(&self) -> Result<()> {
        if !std::path::Path::new(&self.path).exists() {
            return Ok(());
        }
        std::fs::remove_file(&self.path)?;
        Ok(())
    }

    pub fn init(&self) -> Result<()> {
        self.with_conn(|_conn| Ok(()))?;
        Ok(())
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Connection) -> Result<T>,
    {
        let conn = open_conn(&self.path).op("open database")?;
        Self::migrate(&conn)?;
        f(conn)
    }

    fn migrate(conn: &Connection) -> Result<()> {
        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .op("read schema version")?;

        if version == DB_SCHEMA_VERSION {
            return Ok(());
        }

        if version != 0 {
            return Err(StoreError::SchemaMismatch {
                found: version,
                expected: DB_SCHEMA_VERSION,
            });
        }

        log::info!(
            "SQLite schema migration: {} -> {}",
            version,
            DB_SCHEMA_VERSION
        );

        conn.execute_batch(
            r#"
            CREATE TABLE repositories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name TEXT NOT NULL UNIQUE,
                tracked INTEGER NOT NULL DEFAULT 1
            );
            CREATE TABLE accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uid INTEGER NOT NULL,
                login TEXT NOT NULL UNIQUE CHECK (length(login) > 0),
                permissions TEXT NOT NULL DEFAULT '{}'
            );
            CREATE TABLE collaboration (
                account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                repository_id INTEGER NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
                UNIQUE (account_id, repository_id)
            );
            CREATE INDEX collaboration_repository_idx ON collaboration(repository_id);
            "#,
        )
        .op("migrate schema")?;
        conn.pragma_update(None, "user_version", DB_SCHEMA_VERSION)
            .op("migrate schema")?;
        Ok(())
    }
}

impl StoreRead for SqliteStorage {
    fn find_repository(&self, full_name: &str) -> Result<Option<Repository>> {
        self.with_conn(|conn| db_find_repository(&conn, full_name).op("load repository"))
    }

    fn list_tracked_repositories(&self) -> Result<Vec<Repository>> {
        self.with_conn(|conn| db_list_tracked_repositories(&conn).op("list tracked repositories"))
    }

    fn find_account_by_login(&self, login: &str) -> Result<Option<Account>> {
        self.with_conn(|conn| db_find_account_by_login(&conn, login).op("look up account"))
    }

    fn list_accounts(&self, full_name: &str) -> Result<Vec<Account>> {
        self.with_conn(|conn| db_list_accounts(&conn, full_name).op("list accounts"))
    }

    fn list_linked_account_ids(&self, repository_id: i64) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            db_list_linked_account_ids(&conn, repository_id).op("list collaborations")
        })
    }
}
