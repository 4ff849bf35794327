//! In-memory realm store

use async_trait::async_trait;
use realm_core::store::select_loadable;
use realm_core::{RealmRow, RealmStore, StoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// MemoryStore keeps realm rows in process, for embedding and tests
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<RealmRow>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new(rows: Vec<RealmRow>) -> Self {
        Self {
            rows: RwLock::new(rows),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Replace every row
    pub async fn replace(&self, rows: Vec<RealmRow>) {
        *self.rows.write().await = rows;
    }

    /// Insert a row or overwrite the row with the same id
    pub async fn upsert(&self, row: RealmRow) {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|existing| existing.id == row.id) {
            Some(existing) => *existing = row,
            None => rows.push(row),
        }
    }

    /// Remove a row by id, returning it if present
    pub async fn remove(&self, id: u32) -> Option<RealmRow> {
        let mut rows = self.rows.write().await;
        let index = rows.iter().position(|row| row.id == id)?;
        Some(rows.remove(index))
    }

    /// Make subsequent loads fail, as if the database went away
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl RealmStore for MemoryStore {
    async fn load_realms(&self) -> Result<Vec<RealmRow>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store marked unavailable".to_string()));
        }

        let rows = select_loadable(self.rows.read().await.iter().cloned());
        debug!("Loaded {} realm rows from memory", rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::row;
    use realm_core::{ProtocolEra, RealmFlags, RealmRegistry};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_load_filters_invalid_and_sorts() {
        let mut mismatched = row(3, "Mismatch", "12340");
        mismatched.realmflags = 0x01;
        let store = MemoryStore::new(vec![
            row(1, "Zeta", "12340"),
            mismatched,
            row(2, "Alpha", "8606"),
        ]);

        let rows = store.load_realms().await.unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[tokio::test]
    async fn test_upsert_and_remove() {
        let store = MemoryStore::default();
        store.upsert(row(1, "First", "5875")).await;
        store.upsert(row(1, "Renamed", "5875")).await;
        store.upsert(row(2, "Second", "5875")).await;

        let rows = store.load_realms().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Renamed");

        assert_eq!(store.remove(2).await.map(|r| r.name), Some("Second".to_string()));
        assert!(store.remove(2).await.is_none());
        assert_eq!(store.load_realms().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = MemoryStore::new(vec![row(1, "Any", "5875")]);
        store.set_unavailable(true);
        assert!(matches!(
            store.load_realms().await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_registry_over_memory_store() {
        let mut offline = row(2, "Offline", "12340");
        offline.realmflags = 0xFE;
        let store = Arc::new(MemoryStore::new(vec![row(1, "Online", "12340"), offline]));
        let registry = RealmRegistry::initialize(store.clone(), 0).await.unwrap();

        assert_eq!(registry.build_to_era(12340), ProtocolEra::WrathOfTheLichKing);
        assert_eq!(registry.count_for_build(12340), 2);
        // offline realms are still listed, the client greys them out
        let offline = registry.realm("Offline").unwrap();
        assert!(offline.flags.contains(RealmFlags::OFFLINE));
        assert_eq!(offline.flags.bits(), 0x66);

        store.remove(1).await;
        store.set_unavailable(true);
        assert!(registry.reload().await.is_err());
        assert_eq!(registry.count_for_build(12340), 2);

        store.set_unavailable(false);
        registry.reload().await.unwrap();
        assert_eq!(registry.count_for_build(12340), 1);
    }
}
