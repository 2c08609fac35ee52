use crate::domain::money::{Amount, Balance};
use crate::domain::ports::{BalanceStore, SessionStore, UserStore};
use crate::domain::session::Session;
use crate::domain::user::{UserId, UserProfile};
use crate::error::{MallError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for open sessions.
pub const CF_SESSIONS: &str = "sessions";
/// Column Family for prepaid balances.
pub const CF_BALANCES: &str = "balances";
/// Column Family for registered users.
pub const CF_USERS: &str = "users";

/// A persistent per-key store implementation using RocksDB.
///
/// Unlike the JSON file store, each operation touches a single record.
/// Read-modify-write operations (session replace/remove, balance updates,
/// registration) go through one writer lock so check-then-write is atomic
/// for every handle cloned from the same `open` call.
///
/// Sessions are listed in key order.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    writer: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating the
    /// "sessions", "balances" and "users" column families if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [CF_SESSIONS, CF_BALANCES, CF_USERS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            MallError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &UserId) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf_name: &str, key: &UserId, value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(cf, key.as_str().as_bytes(), bytes)?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for RocksDBStore {
    async fn start(&self, user_id: &UserId, session: Session) -> Result<Option<Session>> {
        let _guard = self.writer.lock().await;
        let replaced = self.read::<Session>(CF_SESSIONS, user_id)?;
        self.write(CF_SESSIONS, user_id, &session)?;
        Ok(replaced)
    }

    async fn end(&self, user_id: &UserId) -> Result<Option<Session>> {
        let _guard = self.writer.lock().await;
        let existing = self.read::<Session>(CF_SESSIONS, user_id)?;
        if existing.is_some() {
            let cf = self.cf(CF_SESSIONS)?;
            self.db.delete_cf(cf, user_id.as_str().as_bytes())?;
        }
        Ok(existing)
    }

    async fn list_all(&self) -> Result<Vec<(UserId, Session)>> {
        let cf = self.cf(CF_SESSIONS)?;
        let mut sessions = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (key, value) = item?;
            let key = std::str::from_utf8(&key).map_err(|e| {
                MallError::InternalError(Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Session key is not UTF-8: {e}"),
                )))
            })?;
            sessions.push((UserId::from_stored_key(key)?, serde_json::from_slice(&value)?));
        }
        Ok(sessions)
    }
}

#[async_trait]
impl BalanceStore for RocksDBStore {
    async fn get(&self, user_id: &UserId) -> Result<Balance> {
        Ok(self
            .read::<Balance>(CF_BALANCES, user_id)?
            .unwrap_or_default())
    }

    async fn add(&self, user_id: &UserId, amount: Amount) -> Result<Balance> {
        let _guard = self.writer.lock().await;
        let current = self
            .read::<Balance>(CF_BALANCES, user_id)?
            .unwrap_or_default();
        let updated = current + amount;
        self.write(CF_BALANCES, user_id, &updated)?;
        Ok(updated)
    }

    async fn deduct(&self, user_id: &UserId, amount: Amount) -> Result<bool> {
        let _guard = self.writer.lock().await;
        let current = self
            .read::<Balance>(CF_BALANCES, user_id)?
            .unwrap_or_default();
        match current.checked_sub(amount) {
            Some(remaining) => {
                self.write(CF_BALANCES, user_id, &remaining)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl UserStore for RocksDBStore {
    async fn register(&self, user_id: &UserId, profile: UserProfile) -> Result<bool> {
        let _guard = self.writer.lock().await;
        if self.read::<UserProfile>(CF_USERS, user_id)?.is_some() {
            return Ok(false);
        }
        self.write(CF_USERS, user_id, &profile)?;
        Ok(true)
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        self.read(CF_USERS, user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn uid(raw: &str) -> UserId {
        UserId::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        assert!(store.db.cf_handle(CF_SESSIONS).is_some());
        assert!(store.db.cf_handle(CF_BALANCES).is_some());
        assert!(store.db.cf_handle(CF_USERS).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_session_store() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let session = Session::new(Utc::now(), UserProfile::new("A", "a@b.c", ""));

        assert!(store.start(&uid("a@b.c"), session.clone()).await.unwrap().is_none());
        assert_eq!(store.list_all().await.unwrap().len(), 1);

        let ended = store.end(&uid("a@b.c")).await.unwrap().unwrap();
        assert_eq!(ended, session);
        assert!(store.end(&uid("a@b.c")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rocksdb_padded_session_key_is_reported() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let session = Session::new(Utc::now(), UserProfile::new("P", "", ""));
        let cf = store.cf(CF_SESSIONS).unwrap();
        store
            .db
            .put_cf(cf, b" padded ", serde_json::to_vec(&session).unwrap())
            .unwrap();

        match store.list_all().await {
            Err(MallError::ValidationError(message)) => assert!(message.contains("\" padded \"")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rocksdb_negative_balance_is_an_error() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let cf = store.cf(CF_BALANCES).unwrap();
        store.db.put_cf(cf, b"a", b"-20").unwrap();

        let read = BalanceStore::get(&store, &uid("a")).await;
        assert!(matches!(read, Err(MallError::JsonError(_))));
        let added = store.add(&uid("a"), Amount::new(dec!(10)).unwrap()).await;
        assert!(matches!(added, Err(MallError::JsonError(_))));
    }

    #[tokio::test]
    async fn test_rocksdb_balance_store() {
        let dir = tempdir().unwrap();
        let user = uid("a@b.c");
        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            store.add(&user, Amount::new(dec!(100)).unwrap()).await.unwrap();
            assert!(store.deduct(&user, Amount::new(dec!(60)).unwrap()).await.unwrap());
            assert!(!store.deduct(&user, Amount::new(dec!(41)).unwrap()).await.unwrap());
        }

        let store = RocksDBStore::open(dir.path()).unwrap();
        assert_eq!(BalanceStore::get(&store, &user).await.unwrap(), Balance::new(dec!(40)).unwrap());
        assert_eq!(
            BalanceStore::get(&store, &uid("other")).await.unwrap(),
            Balance::ZERO
        );
    }

    #[tokio::test]
    async fn test_rocksdb_user_store() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let user = uid("a@b.c");

        assert!(store.register(&user, UserProfile::new("A", "a@b.c", "")).await.unwrap());
        assert!(!store.register(&user, UserProfile::new("B", "a@b.c", "")).await.unwrap());
        assert_eq!(UserStore::get(&store, &user).await.unwrap().unwrap().name, "A");
    }
}
