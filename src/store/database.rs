//! SQLite implementation of the clipboard store

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::{checked_index, ClipboardItem, ClipboardRecord, ClipboardStore, StoreError};

const SCHEMA_VERSION: u32 = 1;

/// SQLite database wrapper holding every clipboard record
///
/// Each mutating call runs inside a single transaction while the connection
/// lock is held, so read-modify-write cycles on one code never interleave.
/// Transactions begin IMMEDIATE so writers on other connections wait out
/// the busy timeout instead of failing on lock upgrade.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`
    pub async fn open(path: &Path, busy_timeout_ms: u64) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        info!("Opened clipboard database at {}", path.display());

        Self::from_connection(conn, busy_timeout_ms).await
    }

    /// Volatile database, mostly for tests
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, 0).await
    }

    async fn from_connection(conn: Connection, busy_timeout_ms: u64) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;

        let version = get_schema_version(&conn)?;
        if version == 0 {
            create_schema(&conn)?;
        } else if version > SCHEMA_VERSION {
            return Err(StoreError::Backend(format!(
                "database schema v{} is newer than supported v{}",
                version, SCHEMA_VERSION
            )));
        }

        Ok(())
    }
}

fn get_schema_version(conn: &Connection) -> Result<u32, StoreError> {
    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<u32> = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    Ok(version.unwrap_or(0))
}

fn create_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER DEFAULT (strftime('%s', 'now'))
        );

        CREATE TABLE IF NOT EXISTS clipboards (
            code TEXT PRIMARY KEY NOT NULL,
            is_private INTEGER NOT NULL DEFAULT 0,
            passcode_hash TEXT,
            created_at INTEGER NOT NULL,
            CHECK ((is_private = 1 AND passcode_hash IS NOT NULL)
                OR (is_private = 0 AND passcode_hash IS NULL))
        );

        CREATE TABLE IF NOT EXISTS clipboard_items (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            clipboard_code TEXT NOT NULL REFERENCES clipboards(code) ON DELETE CASCADE,
            title TEXT NOT NULL,
            text TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_items_code_seq ON clipboard_items(clipboard_code, seq);
        ",
    )?;

    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?)",
        params![SCHEMA_VERSION],
    )?;

    debug!("Created clipboard schema v{}", SCHEMA_VERSION);
    Ok(())
}

fn record_exists(conn: &Connection, code: &str) -> Result<bool, StoreError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM clipboards WHERE code = ?)",
        params![code],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn require_record(conn: &Connection, code: &str) -> Result<(), StoreError> {
    if record_exists(conn, code)? {
        Ok(())
    } else {
        Err(StoreError::NotFound(code.to_string()))
    }
}

fn insert_item(conn: &Connection, code: &str, item: &ClipboardItem) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO clipboard_items (uuid, clipboard_code, title, text) VALUES (?, ?, ?, ?)",
        params![item.id.to_string(), code, &item.title, &item.text],
    )?;
    Ok(())
}

fn load_items(conn: &Connection, code: &str) -> Result<Vec<ClipboardItem>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT uuid, title, text FROM clipboard_items
         WHERE clipboard_code = ?
         ORDER BY seq ASC",
    )?;

    let rows = stmt
        .query_map(params![code], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<(String, String, String)>, _>>()?;

    rows.into_iter()
        .map(|(uuid, title, text)| {
            let id = Uuid::parse_str(&uuid)
                .map_err(|e| StoreError::Backend(format!("corrupt item id {}: {}", uuid, e)))?;
            Ok(ClipboardItem { id, title, text })
        })
        .collect()
}

fn row_to_header(row: &Row) -> rusqlite::Result<(String, bool, Option<String>, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

#[async_trait]
impl ClipboardStore for SqliteStore {
    async fn find(&self, code: &str) -> Result<Option<ClipboardRecord>, StoreError> {
        let conn = self.conn.lock().await;

        let header = conn
            .query_row(
                "SELECT code, is_private, passcode_hash, created_at FROM clipboards WHERE code = ?",
                params![code],
                row_to_header,
            )
            .optional()?;

        let Some((code, is_private, passcode_hash, created_at)) = header else {
            return Ok(None);
        };

        let items = load_items(&conn, &code)?;
        let created_at = DateTime::<Utc>::from_timestamp(created_at, 0).unwrap_or_default();

        Ok(Some(ClipboardRecord {
            code,
            is_private,
            passcode_hash,
            items,
            created_at,
        }))
    }

    async fn insert(&self, record: &ClipboardRecord) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let inserted = tx.execute(
            "INSERT INTO clipboards (code, is_private, passcode_hash, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(code) DO NOTHING",
            params![
                &record.code,
                record.is_private,
                &record.passcode_hash,
                record.created_at.timestamp(),
            ],
        )?;

        if inserted == 0 {
            return Err(StoreError::AlreadyExists(record.code.clone()));
        }

        for item in &record.items {
            insert_item(&tx, &record.code, item)?;
        }

        tx.commit()?;
        Ok(())
    }

    async fn save(&self, record: &ClipboardRecord) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        require_record(&tx, &record.code)?;
        tx.execute(
            "DELETE FROM clipboard_items WHERE clipboard_code = ?",
            params![&record.code],
        )?;
        for item in &record.items {
            insert_item(&tx, &record.code, item)?;
        }

        tx.commit()?;
        Ok(())
    }

    async fn append_item(
        &self,
        code: &str,
        item: &ClipboardItem,
    ) -> Result<Vec<ClipboardItem>, StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        require_record(&tx, code)?;
        insert_item(&tx, code, item)?;
        let items = load_items(&tx, code)?;

        tx.commit()?;
        Ok(items)
    }

    async fn remove_item_at(
        &self,
        code: &str,
        index: i64,
    ) -> Result<Vec<ClipboardItem>, StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        require_record(&tx, code)?;
        let len: i64 = tx.query_row(
            "SELECT COUNT(*) FROM clipboard_items WHERE clipboard_code = ?",
            params![code],
            |row| row.get(0),
        )?;
        let offset = checked_index(index, len as usize)?;

        let seq: i64 = tx.query_row(
            "SELECT seq FROM clipboard_items
             WHERE clipboard_code = ?
             ORDER BY seq ASC
             LIMIT 1 OFFSET ?",
            params![code, offset as i64],
            |row| row.get(0),
        )?;
        tx.execute("DELETE FROM clipboard_items WHERE seq = ?", params![seq])?;
        let items = load_items(&tx, code)?;

        tx.commit()?;
        Ok(items)
    }

    async fn remove_item_by_id(
        &self,
        code: &str,
        id: Uuid,
    ) -> Result<Vec<ClipboardItem>, StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        require_record(&tx, code)?;
        let removed = tx.execute(
            "DELETE FROM clipboard_items WHERE clipboard_code = ? AND uuid = ?",
            params![code, id.to_string()],
        )?;
        if removed == 0 {
            return Err(StoreError::ItemNotFound(id));
        }
        let items = load_items(&tx, code)?;

        tx.commit()?;
        Ok(items)
    }
}
