//! Clipboard access control and item management
//!
//! [`ClipboardService`] decides whether a code is being created or joined,
//! gates every read and mutation of a private clipboard behind its passcode,
//! and keeps the item sequence in insertion order. Access control is a
//! per-call predicate; there are no sessions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::passcode::{PasscodeError, PasscodeHasher};
use crate::store::{ClipboardItem, ClipboardRecord, ClipboardStore, StoreError};

/// Errors surfaced by clipboard operations
///
/// The `Display` text is what clients get to see, so backend detail stays in
/// the source chain and the logs.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Unknown clipboard code
    #[error("Clipboard not found")]
    NotFound(String),

    /// Private clipboard accessed without a passcode
    #[error("Passcode required")]
    PasscodeRequired,

    /// Passcode supplied for a public clipboard
    #[error("This clipboard is public and does not take a passcode")]
    PasscodeNotApplicable,

    /// Passcode does not match
    #[error("Invalid passcode")]
    InvalidPasscode,

    /// Item title or text missing
    #[error("{0}")]
    InvalidItem(String),

    /// Item index outside the current sequence
    #[error("Item index {index} is out of range for {len} items")]
    IndexOutOfRange { index: i64, len: usize },

    /// No item with this id
    #[error("Item not found")]
    ItemNotFound(Uuid),

    /// Opaque persistence failure
    #[error("Internal Server Error")]
    Storage(#[source] StoreError),

    /// Passcode hashing failure
    #[error("Internal Server Error")]
    Passcode(#[source] PasscodeError),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(code) => ServiceError::NotFound(code),
            StoreError::IndexOutOfRange { index, len } => {
                ServiceError::IndexOutOfRange { index, len }
            }
            StoreError::ItemNotFound(id) => ServiceError::ItemNotFound(id),
            other => {
                error!("Clipboard storage failure: {}", other);
                ServiceError::Storage(other)
            }
        }
    }
}

impl From<PasscodeError> for ServiceError {
    fn from(e: PasscodeError) -> Self {
        error!("Passcode hashing failure: {}", e);
        ServiceError::Passcode(e)
    }
}

/// Outcome of [`ClipboardService::go_or_create`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoOutcome {
    /// `true` when this call created the clipboard
    pub created: bool,
}

/// Item payload as submitted by a client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
}

impl NewItem {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

/// Non-secret facts about a clipboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipboardSummary {
    pub code: String,
    pub is_private: bool,
    pub item_count: usize,
    pub created_at: DateTime<Utc>,
}

/// The four clipboard operations plus deletion by stable id
#[derive(Clone)]
pub struct ClipboardService {
    store: Arc<dyn ClipboardStore>,
    hasher: PasscodeHasher,
}

impl ClipboardService {
    pub fn new(store: Arc<dyn ClipboardStore>, hasher: PasscodeHasher) -> Self {
        Self { store, hasher }
    }

    /// Create the clipboard for `code`, or authenticate against an existing one
    pub async fn go_or_create(
        &self,
        code: &str,
        is_private: bool,
        passcode: Option<&str>,
    ) -> Result<GoOutcome, ServiceError> {
        validate_code(code)?;
        let passcode = supplied(passcode);

        if is_private && passcode.is_none() {
            return Err(ServiceError::Validation(
                "Passcode is required for a private clipboard".to_string(),
            ));
        }

        if let Some(record) = self.store.find(code).await? {
            return self.authenticate(&record, passcode).await;
        }

        // A passcode sent along with a new public code is dropped
        let record = match passcode {
            Some(passcode) if is_private => {
                ClipboardRecord::private(code, self.hasher.hash(passcode).await?)
            }
            _ => ClipboardRecord::public(code),
        };

        match self.store.insert(&record).await {
            Ok(()) => {
                info!("Created {} clipboard '{}'", visibility(is_private), code);
                Ok(GoOutcome { created: true })
            }
            Err(StoreError::AlreadyExists(_)) => {
                debug!("Clipboard '{}' was created concurrently, authenticating", code);
                let record = self.load(code).await?;
                self.authenticate(&record, passcode).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Items of `code` in stored order, oldest first
    pub async fn list_items(
        &self,
        code: &str,
        passcode: Option<&str>,
    ) -> Result<Vec<ClipboardItem>, ServiceError> {
        validate_code(code)?;
        let record = self.load(code).await?;
        self.authorize(&record, supplied(passcode)).await?;

        debug!("Listed {} items of '{}'", record.items.len(), code);
        Ok(record.items)
    }

    /// Append an item and return the updated sequence
    pub async fn add_item(
        &self,
        code: &str,
        item: NewItem,
        passcode: Option<&str>,
    ) -> Result<Vec<ClipboardItem>, ServiceError> {
        validate_code(code)?;
        validate_item(&item)?;
        let record = self.load(code).await?;
        self.authorize(&record, supplied(passcode)).await?;

        let item = ClipboardItem::new(item.title, item.text);
        let items = self.store.append_item(code, &item).await?;

        info!("Added item {} to '{}' ({} items)", item.id, code, items.len());
        Ok(items)
    }

    /// Remove the item at `index` and return the updated sequence
    ///
    /// The index refers to the sequence as the caller last read it; the range
    /// is checked again atomically by the store at removal time.
    pub async fn delete_item(
        &self,
        code: &str,
        index: i64,
        passcode: Option<&str>,
    ) -> Result<Vec<ClipboardItem>, ServiceError> {
        validate_code(code)?;
        let record = self.load(code).await?;
        self.authorize(&record, supplied(passcode)).await?;

        let len = record.items.len();
        if index < 0 || index as u64 >= len as u64 {
            return Err(ServiceError::IndexOutOfRange { index, len });
        }

        let items = self.store.remove_item_at(code, index).await?;

        info!("Deleted item at index {} of '{}' ({} items)", index, code, items.len());
        Ok(items)
    }

    /// Remove the item with stable id `id` and return the updated sequence
    pub async fn delete_item_by_id(
        &self,
        code: &str,
        id: Uuid,
        passcode: Option<&str>,
    ) -> Result<Vec<ClipboardItem>, ServiceError> {
        validate_code(code)?;
        let record = self.load(code).await?;
        self.authorize(&record, supplied(passcode)).await?;

        let items = self.store.remove_item_by_id(code, id).await?;

        info!("Deleted item {} of '{}' ({} items)", id, code, items.len());
        Ok(items)
    }

    /// Existence, visibility and size of a clipboard, without its items
    pub async fn summary(&self, code: &str) -> Result<ClipboardSummary, ServiceError> {
        validate_code(code)?;
        let record = self.load(code).await?;
        Ok(ClipboardSummary {
            code: record.code,
            is_private: record.is_private,
            item_count: record.items.len(),
            created_at: record.created_at,
        })
    }

    async fn load(&self, code: &str) -> Result<ClipboardRecord, ServiceError> {
        self.store
            .find(code)
            .await?
            .ok_or_else(|| ServiceError::NotFound(code.to_string()))
    }

    /// Access rule shared by list, add and delete
    async fn authorize(
        &self,
        record: &ClipboardRecord,
        passcode: Option<&str>,
    ) -> Result<(), ServiceError> {
        if !record.is_private {
            return Ok(());
        }

        let passcode = passcode.ok_or(ServiceError::PasscodeRequired)?;
        let stored = record.passcode_hash.as_deref().ok_or_else(|| {
            ServiceError::from(StoreError::Backend(format!(
                "private clipboard '{}' has no passcode hash",
                record.code
            )))
        })?;

        if self.hasher.verify(passcode, stored).await? {
            Ok(())
        } else {
            warn!("Rejected passcode for clipboard '{}'", record.code);
            Err(ServiceError::InvalidPasscode)
        }
    }

    /// Branches of "go" for a clipboard that already exists
    async fn authenticate(
        &self,
        record: &ClipboardRecord,
        passcode: Option<&str>,
    ) -> Result<GoOutcome, ServiceError> {
        if !record.is_private && passcode.is_some() {
            return Err(ServiceError::PasscodeNotApplicable);
        }
        self.authorize(record, passcode).await?;

        debug!("Authenticated clipboard '{}'", record.code);
        Ok(GoOutcome { created: false })
    }
}

/// Empty passcodes count as absent
fn supplied(passcode: Option<&str>) -> Option<&str> {
    passcode.filter(|p| !p.is_empty())
}

fn validate_code(code: &str) -> Result<(), ServiceError> {
    if code.trim().is_empty() {
        return Err(ServiceError::Validation("Code is required".to_string()));
    }
    Ok(())
}

fn validate_item(item: &NewItem) -> Result<(), ServiceError> {
    if item.title.is_empty() || item.text.is_empty() {
        return Err(ServiceError::InvalidItem(
            "Item title and text are required".to_string(),
        ));
    }
    Ok(())
}

fn visibility(is_private: bool) -> &'static str {
    if is_private {
        "private"
    } else {
        "public"
    }
}
