//! Persistence of clipboard records
//!
//! One [`ClipboardRecord`] exists per code. Mutations go through atomic
//! per-record primitives so two writers appending to the same clipboard never
//! lose each other's items.

pub mod database;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{StorageBackend, StorageConfig};

pub use database::SqliteStore;
pub use memory::MemoryStore;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this code already exists
    #[error("Clipboard '{0}' already exists")]
    AlreadyExists(String),

    /// No record with this code
    #[error("Clipboard '{0}' not found")]
    NotFound(String),

    /// Positional removal outside the current item range
    #[error("Item index {index} out of range for {len} items")]
    IndexOutOfRange { index: i64, len: usize },

    /// No item with this id in the record
    #[error("Item {0} not found")]
    ItemNotFound(Uuid),

    /// Anything the backend itself reports
    #[error("Storage backend failure: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// A single `{title, text}` snippet stored under a clipboard code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardItem {
    /// Stable identifier assigned when the item is appended
    pub id: Uuid,
    pub title: String,
    pub text: String,
}

impl ClipboardItem {
    /// Create an item with a freshly generated id
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            text: text.into(),
        }
    }
}

/// The persisted unit: one clipboard code and its ordered items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardRecord {
    /// Primary key, case-sensitive, immutable after creation
    pub code: String,
    /// Set once at creation
    pub is_private: bool,
    /// Argon2 PHC string; `Some` if and only if `is_private`
    pub passcode_hash: Option<String>,
    /// Insertion order, oldest first
    pub items: Vec<ClipboardItem>,
    pub created_at: DateTime<Utc>,
}

impl ClipboardRecord {
    /// A new, empty public record
    pub fn public(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            is_private: false,
            passcode_hash: None,
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// A new, empty private record guarded by `passcode_hash`
    pub fn private(code: impl Into<String>, passcode_hash: String) -> Self {
        Self {
            code: code.into(),
            is_private: true,
            passcode_hash: Some(passcode_hash),
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Durable storage of clipboard records keyed by code
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClipboardStore: Send + Sync {
    /// Look up a record by its code
    async fn find(&self, code: &str) -> Result<Option<ClipboardRecord>, StoreError>;

    /// Persist a new record; `StoreError::AlreadyExists` if the code is taken
    async fn insert(&self, record: &ClipboardRecord) -> Result<(), StoreError>;

    /// Overwrite the items of an existing record (last write wins)
    async fn save(&self, record: &ClipboardRecord) -> Result<(), StoreError>;

    /// Append an item and return the full updated sequence
    async fn append_item(
        &self,
        code: &str,
        item: &ClipboardItem,
    ) -> Result<Vec<ClipboardItem>, StoreError>;

    /// Remove the item currently at `index` and return the updated sequence
    async fn remove_item_at(
        &self,
        code: &str,
        index: i64,
    ) -> Result<Vec<ClipboardItem>, StoreError>;

    /// Remove the item with the given id and return the updated sequence
    async fn remove_item_by_id(
        &self,
        code: &str,
        id: Uuid,
    ) -> Result<Vec<ClipboardItem>, StoreError>;
}

/// Open the store selected by configuration
pub async fn open(config: &StorageConfig) -> Result<Arc<dyn ClipboardStore>, StoreError> {
    match config.backend {
        StorageBackend::Sqlite => {
            let store = SqliteStore::open(&config.database, config.busy_timeout_ms).await?;
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

/// Resolve a possibly negative index against `len`
pub(crate) fn checked_index(index: i64, len: usize) -> Result<usize, StoreError> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or(StoreError::IndexOutOfRange { index, len })
}
