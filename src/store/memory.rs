//! In-process clipboard store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{checked_index, ClipboardItem, ClipboardRecord, ClipboardStore, StoreError};

/// Volatile store backed by a map; each mutation holds the write lock
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, ClipboardRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ClipboardStore for MemoryStore {
    async fn find(&self, code: &str) -> Result<Option<ClipboardRecord>, StoreError> {
        Ok(self.records.read().await.get(code).cloned())
    }

    async fn insert(&self, record: &ClipboardRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.code) {
            return Err(StoreError::AlreadyExists(record.code.clone()));
        }
        records.insert(record.code.clone(), record.clone());
        Ok(())
    }

    async fn save(&self, record: &ClipboardRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(&record.code)
            .ok_or_else(|| StoreError::NotFound(record.code.clone()))?;
        stored.items = record.items.clone();
        Ok(())
    }

    async fn append_item(
        &self,
        code: &str,
        item: &ClipboardItem,
    ) -> Result<Vec<ClipboardItem>, StoreError> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(code)
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;
        stored.items.push(item.clone());
        Ok(stored.items.clone())
    }

    async fn remove_item_at(
        &self,
        code: &str,
        index: i64,
    ) -> Result<Vec<ClipboardItem>, StoreError> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(code)
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;
        let index = checked_index(index, stored.items.len())?;
        stored.items.remove(index);
        Ok(stored.items.clone())
    }

    async fn remove_item_by_id(
        &self,
        code: &str,
        id: Uuid,
    ) -> Result<Vec<ClipboardItem>, StoreError> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(code)
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;
        let position = stored
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or(StoreError::ItemNotFound(id))?;
        stored.items.remove(position);
        Ok(stored.items.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_insert_rejects_duplicate_code() {
        let store = MemoryStore::new();
        store.insert(&ClipboardRecord::public("demo")).await.unwrap();

        let err = store
            .insert(&ClipboardRecord::public("demo"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(code) if code == "demo"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_codes_are_case_sensitive() {
        let store = MemoryStore::new();
        store.insert(&ClipboardRecord::public("Demo")).await.unwrap();
        store.insert(&ClipboardRecord::public("demo")).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_all_kept() {
        let store = Arc::new(MemoryStore::new());
        store.insert(&ClipboardRecord::public("demo")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .append_item("demo", &ClipboardItem::new(format!("t{}", i), "x"))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let record = store.find("demo").await.unwrap().unwrap();
        assert_eq!(record.items.len(), 20);
    }

    #[tokio::test]
    async fn test_save_replaces_items() {
        let store = MemoryStore::new();
        let mut record = ClipboardRecord::public("demo");
        store.insert(&record).await.unwrap();

        record.items.push(ClipboardItem::new("a", "1"));
        store.save(&record).await.unwrap();

        let stored = store.find("demo").await.unwrap().unwrap();
        assert_eq!(stored.items, record.items);

        let missing = ClipboardRecord::public("missing");
        assert!(matches!(
            store.save(&missing).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
