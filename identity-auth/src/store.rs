//! Session store contract and the per-client stored session entries.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use crate::error::{store_error, Error, ErrorKind};

/// Key under which all provider sessions of one client are stored.
pub const SESSION_NAME: &str = "_gothic_session";

/// Per-client key-value session backing the authentication flow.
///
/// One instance is bound to one client (cookie or equivalent correlator) for the
/// duration of one request.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read a value previously written with [`SessionStore::set`].
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Write a value; it becomes durable on [`SessionStore::save`].
    async fn set(&self, key: &str, value: String) -> Result<(), Error>;

    /// Persist pending writes.
    async fn save(&self) -> Result<(), Error>;

    /// Drop every value and let the client's session expire after `grace`.
    async fn invalidate(&self, grace: Duration) -> Result<(), Error>;
}

/// Compressed provider sessions of one client, keyed by provider name.
pub type StoredSessions = BTreeMap<String, String>;

/// Load the stored session entries of this client.
pub async fn load_entries(store: &dyn SessionStore) -> Result<StoredSessions, Error> {
    match store.get(SESSION_NAME).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| Error::with_source(ErrorKind::SessionStoreFailed, e)),
        None => Ok(StoredSessions::new()),
    }
}

/// Write the stored session entries of this client and save the store.
pub async fn save_entries(store: &dyn SessionStore, entries: &StoredSessions) -> Result<(), Error> {
    let raw = serde_json::to_string(entries)
        .map_err(|e| Error::with_source(ErrorKind::SessionStoreFailed, e))?;
    store.set(SESSION_NAME, raw).await?;
    store.save().await
}

/// In-memory [`SessionStore`] for tests and hosts without an HTTP session layer.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    pending: HashMap<String, String>,
    saved: HashMap<String, String>,
    expires_at: Option<SystemTime>,
    saves: usize,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, Error> {
        self.inner
            .lock()
            .map_err(|_| store_error("memory session store lock poisoned"))
    }

    /// Values as last persisted by `save`.
    pub fn saved_values(&self) -> Result<HashMap<String, String>, Error> {
        Ok(self.lock()?.saved.clone())
    }

    /// Retention deadline set by the last invalidation.
    pub fn expires_at(&self) -> Result<Option<SystemTime>, Error> {
        Ok(self.lock()?.expires_at)
    }

    /// Number of times the store was saved.
    pub fn save_count(&self) -> Result<usize, Error> {
        Ok(self.lock()?.saves)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.lock()?.pending.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), Error> {
        self.lock()?.pending.insert(key.to_string(), value);
        Ok(())
    }

    async fn save(&self) -> Result<(), Error> {
        let mut state = self.lock()?;
        state.saved = state.pending.clone();
        state.saves += 1;
        Ok(())
    }

    async fn invalidate(&self, grace: Duration) -> Result<(), Error> {
        let mut state = self
            .lock()
            .map_err(|e| e.in_step(ErrorKind::SessionInvalidationFailed))?;
        state.pending.clear();
        state.saved.clear();
        state.expires_at = Some(SystemTime::now() + grace);
        state.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entries_round_trip_through_store() {
        let store = MemorySessionStore::new();
        let mut entries = StoredSessions::new();
        entries.insert("faux".to_string(), "blob".to_string());

        save_entries(&store, &entries).await.unwrap();

        assert_eq!(load_entries(&store).await.unwrap(), entries);
        assert!(store.saved_values().unwrap().contains_key(SESSION_NAME));
    }

    #[tokio::test]
    async fn test_load_entries_from_empty_store() {
        let store = MemorySessionStore::new();
        assert!(load_entries(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_entries_rejects_garbage() {
        let store = MemorySessionStore::new();
        store.set(SESSION_NAME, "not json".to_string()).await.unwrap();
        let err = load_entries(&store).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionStoreFailed);
    }

    #[tokio::test]
    async fn test_invalidate_clears_values_and_sets_deadline() {
        let store = MemorySessionStore::new();
        store.set("key", "value".to_string()).await.unwrap();
        store.save().await.unwrap();

        store.invalidate(Duration::from_secs(100)).await.unwrap();

        assert_eq!(store.get("key").await.unwrap(), None);
        assert!(store.saved_values().unwrap().is_empty());
        let deadline = store.expires_at().unwrap().unwrap();
        assert!(deadline > SystemTime::now());
        assert!(deadline <= SystemTime::now() + Duration::from_secs(100));
    }
}
