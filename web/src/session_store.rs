//! [`SessionStore`] backed by the request's `tower_sessions` session.

use std::time::Duration;

use async_trait::async_trait;
use identity_auth::{Error, ErrorKind, SessionStore};
use log::*;
use time::OffsetDateTime;
use tower_sessions::{Expiry, Session};

fn session_error(err: tower_sessions::session::Error) -> Error {
    Error::with_source(ErrorKind::SessionStoreFailed, err)
}

pub(crate) struct TowerSessionStore {
    session: Session,
}

impl TowerSessionStore {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl SessionStore for TowerSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.session.get::<String>(key).await.map_err(session_error)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), Error> {
        self.session.insert(key, value).await.map_err(session_error)
    }

    async fn save(&self) -> Result<(), Error> {
        self.session.save().await.map_err(session_error)
    }

    async fn invalidate(&self, grace: Duration) -> Result<(), Error> {
        self.session.clear().await;
        let expires_at = OffsetDateTime::now_utc() + grace;
        self.session.set_expiry(Some(Expiry::AtDateTime(expires_at)));
        trace!("Session cleared, expiring at {expires_at}");
        self.session.save().await.map_err(session_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    fn store() -> TowerSessionStore {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        TowerSessionStore::new(session)
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = store();
        store.set("faux", "blob".to_string()).await.unwrap();
        store.save().await.unwrap();
        assert_eq!(store.get("faux").await.unwrap(), Some("blob".to_string()));
        assert_eq!(store.get("github").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalidate_clears_values_and_sets_expiry() {
        let store = store();
        store.set("faux", "blob".to_string()).await.unwrap();
        store.save().await.unwrap();

        store.invalidate(Duration::from_secs(100)).await.unwrap();

        assert_eq!(store.get("faux").await.unwrap(), None);
        match store.session.expiry() {
            Some(Expiry::AtDateTime(at)) => {
                let remaining = at - OffsetDateTime::now_utc();
                assert!(remaining <= time::Duration::seconds(100));
                assert!(remaining > time::Duration::seconds(90));
            }
            other => panic!("unexpected expiry {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let store = store();
        store.invalidate(Duration::from_secs(100)).await.unwrap();
        store.invalidate(Duration::from_secs(100)).await.unwrap();
        assert_eq!(store.get("faux").await.unwrap(), None);
    }
}
