//! SQLite-backed term storage.
//!
//! [`TermStore`] owns nothing but the database path. Every operation opens a
//! fresh [`Connection`] on Tokio's blocking pool, runs its statements and
//! drops the connection before returning, so no connection or transaction
//! outlives a call. Writes go through a [`rusqlite::Transaction`], which rolls
//! back when dropped without `commit()`, so an early `?` return leaves the
//! table untouched. Writers take the lock up front (`BEGIN IMMEDIATE`) so
//! contention is resolved by the busy timeout rather than a failed upgrade.
//!
//! ## Schema
//!
//! ```sql
//! CREATE TABLE terms(
//!   keyword TEXT PRIMARY KEY,
//!   title TEXT NOT NULL,
//!   description TEXT NOT NULL
//! );
//! ```

mod error;

pub use error::StorageError;

use glossary_tonic_core::{
    proto::Term,
    types::{DEFAULT_PAGE_LIMIT, SEED_TERMS},
};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// How long a connection waits on a locked database before failing with
/// `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS terms(
  keyword TEXT PRIMARY KEY,
  title TEXT NOT NULL,
  description TEXT NOT NULL
);
"#;

const SEED_SQL: &str =
    "INSERT OR IGNORE INTO terms(keyword, title, description) VALUES (?1, ?2, ?3)";

const SELECT_TERM_SQL: &str = "SELECT keyword, title, description FROM terms WHERE keyword = ?1";

const SELECT_PAGE_SQL: &str =
    "SELECT keyword, title, description FROM terms ORDER BY keyword LIMIT ?1 OFFSET ?2";

const COUNT_SQL: &str = "SELECT COUNT(*) FROM terms";

const UPSERT_SQL: &str =
    "INSERT OR REPLACE INTO terms(keyword, title, description) VALUES (?1, ?2, ?3)";

/// One window of the glossary in keyword order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermPage {
    pub terms: Vec<Term>,
    /// Number of rows in the whole table, not just this page.
    pub total: u32,
}

/// Handle to the glossary database file.
///
/// Cloning is cheap; clones refer to the same file.
#[derive(Debug, Clone)]
pub struct TermStore {
    db_path: Arc<PathBuf>,
}

impl TermStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Arc::new(db_path.into()),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Creates the `terms` table if needed and inserts any missing seed terms.
    ///
    /// Existing rows are never modified, so this runs on every start. Returns
    /// how many seed terms were inserted.
    pub async fn initialize(&self) -> Result<usize, StorageError> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        self.with_connection(|conn| {
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;

            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute_batch(INIT_SQL)?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(SEED_SQL)?;
                for seed in &SEED_TERMS {
                    inserted += stmt.execute(params![seed.keyword, seed.title, seed.description])?;
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
        .await
    }

    /// Looks up a term by exact keyword. A miss is `Ok(None)`.
    pub async fn fetch_term(&self, keyword: &str) -> Result<Option<Term>, StorageError> {
        let keyword = keyword.to_owned();
        self.with_connection(move |conn| {
            let term = conn
                .query_row(SELECT_TERM_SQL, params![keyword], read_term)
                .optional()?;
            Ok(term)
        })
        .await
    }

    /// Returns up to `limit` terms after skipping `offset`, ordered by keyword.
    ///
    /// A `limit` of zero selects [`DEFAULT_PAGE_LIMIT`] and a negative `limit`
    /// returns every row from `offset` on. A negative `offset` counts as zero.
    /// The page and the total are read in one transaction and therefore agree
    /// with each other.
    pub async fn list_terms(&self, limit: i64, offset: i64) -> Result<TermPage, StorageError> {
        let limit = if limit == 0 {
            i64::from(DEFAULT_PAGE_LIMIT)
        } else {
            limit
        };
        let offset = offset.max(0);
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            let terms = {
                let mut stmt = tx.prepare(SELECT_PAGE_SQL)?;
                stmt.query_map(params![limit, offset], read_term)?
                    .collect::<Result<Vec<_>, _>>()?
            };
            let total: u32 = tx.query_row(COUNT_SQL, [], |row| row.get(0))?;
            tx.commit()?;
            Ok(TermPage { terms, total })
        })
        .await
    }

    /// Inserts `term`, replacing every column of an existing row with the same
    /// keyword.
    ///
    /// Returns `true` once committed; failures are errors, never `false`.
    pub async fn upsert_term(&self, term: Term) -> Result<bool, StorageError> {
        self.with_connection(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                UPSERT_SQL,
                params![term.keyword, term.title, term.description],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
    }

    /// Runs `op` on the blocking pool with a connection scoped to the call.
    async fn with_connection<F, T>(&self, op: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let db_path = Arc::clone(&self.db_path);
        tokio::task::spawn_blocking(move || {
            let mut conn = Connection::open(db_path.as_path())?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            op(&mut conn)
        })
        .await?
    }
}

fn read_term(row: &Row<'_>) -> rusqlite::Result<Term> {
    Ok(Term {
        keyword: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
    })
}
