//! Persisted favourites store
//!
//! Session-wide set of favourited coin ids. Membership toggling is the only
//! mutation; every mutation is written through to storage and broadcast to
//! subscribers. The in-memory set is the source of truth for the running
//! session: a failed persistence write is reported but never rolls the
//! toggle back.

use crate::{
    constants::FAVOURITES_STORAGE_KEY,
    error::StorageError,
    storage::KeyValueStorage,
    types::DashboardEvent,
};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Buffered events per subscriber before lagging
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Store of favourited coin identifiers
pub struct FavouritesStore {
    storage: Arc<dyn KeyValueStorage>,
    favourites: RwLock<HashSet<String>>,
    events: broadcast::Sender<DashboardEvent>,
}

impl FavouritesStore {
    /// Creates a store rehydrated from persisted storage
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self::with_event_sender(storage, events)
    }

    /// Creates a store that publishes onto an existing event channel
    pub fn with_event_sender(
        storage: Arc<dyn KeyValueStorage>,
        events: broadcast::Sender<DashboardEvent>,
    ) -> Self {
        let favourites = Self::rehydrate(storage.as_ref());
        Self {
            storage,
            favourites: RwLock::new(favourites),
            events,
        }
    }

    /// Loads the persisted id list; missing or corrupt data yields the
    /// empty set.
    fn rehydrate(storage: &dyn KeyValueStorage) -> HashSet<String> {
        let Some(stored) = storage.get(FAVOURITES_STORAGE_KEY) else {
            return HashSet::new();
        };
        match serde_json::from_str::<Vec<String>>(&stored) {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding corrupt favourites entry");
                HashSet::new()
            }
        }
    }

    /// Flips membership for `id`, persists, and notifies subscribers.
    ///
    /// Returns whether the coin is favourited after the toggle. A storage
    /// write failure surfaces as `Err`, but the in-memory toggle and the
    /// notification still happen.
    pub fn toggle(&self, id: &str) -> Result<bool, StorageError> {
        let favourited = {
            let mut favourites = self.favourites.write().unwrap();
            if favourites.remove(id) {
                false
            } else {
                favourites.insert(id.to_string());
                true
            }
        };

        let persisted = self.persist();
        if let Err(e) = &persisted {
            tracing::warn!(coin_id = id, error = %e, "Failed to persist favourites");
        }

        let _ = self.events.send(DashboardEvent::FavouritesChanged {
            id: Uuid::new_v4(),
            coin_id: id.to_string(),
            favourited,
            timestamp: chrono::Utc::now(),
        });

        persisted.map(|_| favourited)
    }

    /// Whether `id` is currently favourited
    pub fn is_favourite(&self, id: &str) -> bool {
        self.favourites.read().unwrap().contains(id)
    }

    /// Snapshot of the current favourites set
    pub fn list(&self) -> HashSet<String> {
        self.favourites.read().unwrap().clone()
    }

    /// Subscribes to favourites change events
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    /// Writes the current set to storage as a sorted JSON array.
    ///
    /// Sorting keeps the persisted bytes deterministic for a given set.
    fn persist(&self) -> Result<(), StorageError> {
        let mut ids: Vec<String> = self.favourites.read().unwrap().iter().cloned().collect();
        ids.sort();
        let encoded = serde_json::to_string(&ids)?;
        self.storage.set(FAVOURITES_STORAGE_KEY, &encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn toggle_twice_restores_membership_and_persisted_bytes() {
        let storage = Arc::new(MemoryStorage::new());
        let store = FavouritesStore::new(storage.clone());

        store.toggle("solana").unwrap();
        let before = storage.get(FAVOURITES_STORAGE_KEY);

        store.toggle("bitcoin").unwrap();
        assert!(store.is_favourite("bitcoin"));

        store.toggle("bitcoin").unwrap();
        assert!(!store.is_favourite("bitcoin"));
        assert_eq!(storage.get(FAVOURITES_STORAGE_KEY), before);
    }

    #[test]
    fn favourites_survive_a_reload_from_the_same_storage() {
        let storage = Arc::new(MemoryStorage::new());

        let store = FavouritesStore::new(storage.clone());
        store.toggle("bitcoin").unwrap();
        drop(store);

        let reloaded = FavouritesStore::new(storage);
        assert!(reloaded.is_favourite("bitcoin"));
        assert_eq!(reloaded.list().len(), 1);
    }

    #[test]
    fn corrupt_persisted_value_yields_empty_set() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(FAVOURITES_STORAGE_KEY, "{ not an array").unwrap();

        let store = FavouritesStore::new(storage);
        assert!(store.list().is_empty());
    }

    #[tokio::test]
    async fn toggle_notifies_subscribers() {
        let store = FavouritesStore::new(Arc::new(MemoryStorage::new()));
        let mut events = store.subscribe();

        store.toggle("dogecoin").unwrap();

        match events.recv().await.unwrap() {
            DashboardEvent::FavouritesChanged {
                coin_id,
                favourited,
                ..
            } => {
                assert_eq!(coin_id, "dogecoin");
                assert!(favourited);
            }
            other => panic!("Unexpected event: {}", other),
        }
    }

    #[test]
    fn write_failure_keeps_the_in_memory_toggle() {
        struct FailingStorage;

        impl KeyValueStorage for FailingStorage {
            fn get(&self, _key: &str) -> Option<String> {
                None
            }
            fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
                Err(StorageError::Io(std::io::Error::other("quota exceeded")))
            }
            fn remove(&self, _key: &str) -> Result<(), StorageError> {
                Ok(())
            }
        }

        let store = FavouritesStore::new(Arc::new(FailingStorage));
        assert!(store.toggle("bitcoin").is_err());
        assert!(store.is_favourite("bitcoin"));
    }
}
