//! SQLite-backed metadata store and label index

use std::ops::Bound;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use rusqlite_migration::{M, Migrations};

use super::keys::listing_start;
use super::traits::{KeyPage, LabelIndex, MetadataStore};

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: key-value tables
        M::up(
            r#"
            -- Message metadata records keyed by <mailbox>:<message>
            CREATE TABLE message_metadata (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL
            ) WITHOUT ROWID;

            -- Label index entries keyed by <mailbox>:<label>:<message>
            CREATE TABLE label_index (
                key TEXT PRIMARY KEY
            ) WITHOUT ROWID;
            "#,
        ),
    ])
}

/// SQLite storage for the metadata records and the label index.
///
/// Both tables use the default BINARY collation, so key order matches
/// byte order, the same order the in-memory index uses.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path`
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {:?}", db_path))?;
        Self::init(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        // WAL lets readers proceed during writes; NORMAL sync is safe with WAL
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl MetadataStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT value FROM message_metadata WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("Failed to read metadata {}", key))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO message_metadata (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .with_context(|| format!("Failed to write metadata {}", key))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM message_metadata WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl LabelIndex for SqliteStore {
    fn put(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO label_index (key) VALUES (?1)",
            params![key],
        )
        .with_context(|| format!("Failed to write index entry {}", key))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM label_index WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn list(
        &self,
        prefix: Option<&str>,
        start_after: Option<&str>,
        limit: usize,
    ) -> Result<KeyPage> {
        let conn = self.conn.lock().unwrap();
        // One extra row tells us whether another page exists
        let fetch = i64::try_from(limit.saturating_add(1)).unwrap_or(i64::MAX);

        let rows: Vec<String> = match listing_start(prefix, start_after) {
            Bound::Included(start) => {
                let mut stmt = conn.prepare_cached(
                    "SELECT key FROM label_index WHERE key >= ?1 ORDER BY key LIMIT ?2",
                )?;
                stmt.query_map(params![start, fetch], |row| row.get(0))?
                    .collect::<rusqlite::Result<_>>()?
            }
            Bound::Excluded(start) => {
                let mut stmt = conn.prepare_cached(
                    "SELECT key FROM label_index WHERE key > ?1 ORDER BY key LIMIT ?2",
                )?;
                stmt.query_map(params![start, fetch], |row| row.get(0))?
                    .collect::<rusqlite::Result<_>>()?
            }
            Bound::Unbounded => {
                let mut stmt =
                    conn.prepare_cached("SELECT key FROM label_index ORDER BY key LIMIT ?1")?;
                stmt.query_map(params![fetch], |row| row.get(0))?
                    .collect::<rusqlite::Result<_>>()?
            }
        };

        // Prefix matches are contiguous in key order, stop at the first miss
        let mut keys: Vec<String> = rows
            .into_iter()
            .take_while(|key| prefix.is_none_or(|p| key.starts_with(p)))
            .collect();

        let more = keys.len() > limit;
        keys.truncate(limit);
        Ok(KeyPage { keys, more })
    }
}
