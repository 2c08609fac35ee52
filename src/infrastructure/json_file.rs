use crate::domain::money::{Amount, Balance};
use crate::domain::ports::{BalanceStore, SessionStore, UserStore};
use crate::domain::session::Session;
use crate::domain::user::{UserId, UserProfile};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

pub const SESSIONS_FILE: &str = "sessions.json";
pub const BALANCES_FILE: &str = "balance.json";
pub const USERS_FILE: &str = "users.json";

/// One keyed collection persisted as a single JSON object.
///
/// Every operation loads the whole file and every mutation rewrites it.
/// The mutex makes each read-modify-write a single step within this
/// process; separate processes sharing the file still race (last write wins).
struct JsonCollection {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonCollection {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    async fn read(&self) -> Result<Map<String, Value>> {
        let _guard = self.lock.lock().await;
        self.load()
    }

    /// Runs `mutate` against the loaded collection and saves it if `mutate`
    /// reports a change.
    async fn update<T>(
        &self,
        mutate: impl FnOnce(&mut Map<String, Value>) -> Result<(T, bool)>,
    ) -> Result<T> {
        let _guard = self.lock.lock().await;
        let mut map = self.load()?;
        let (output, changed) = mutate(&mut map)?;
        if changed {
            self.save(&map)?;
        }
        Ok(output)
    }

    fn load(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "creating empty collection");
            self.save(&Map::new())?;
        }
        let raw = fs::read_to_string(&self.path)?;
        let map = serde_json::from_str(&raw)?;
        debug!(path = %self.path.display(), "collection loaded");
        Ok(map)
    }

    fn save(&self, map: &Map<String, Value>) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        map.serialize(&mut serializer)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&buf)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!(path = %self.path.display(), entries = map.len(), "collection saved");
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T> {
    Ok(T::deserialize(value)?)
}

/// File-backed store keeping sessions, balances and users in three JSON
/// files under one data directory.
///
/// Layout:
/// - `sessions.json`: `{ user_id: { "entry_time": "...", "data": { name, email, phone } } }`
/// - `balance.json`: `{ user_id: number }`
/// - `users.json`: `{ user_id: { name, email, phone } }`
///
/// Missing files are created as `{}` on first access. `Clone` shares the
/// same collections and locks.
#[derive(Clone)]
pub struct JsonFileStore {
    sessions: Arc<JsonCollection>,
    balances: Arc<JsonCollection>,
    users: Arc<JsonCollection>,
}

impl JsonFileStore {
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            sessions: Arc::new(JsonCollection::new(dir.join(SESSIONS_FILE))),
            balances: Arc::new(JsonCollection::new(dir.join(BALANCES_FILE))),
            users: Arc::new(JsonCollection::new(dir.join(USERS_FILE))),
        })
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn start(&self, user_id: &UserId, session: Session) -> Result<Option<Session>> {
        let value = serde_json::to_value(&session)?;
        self.sessions
            .update(|map| {
                let replaced = map
                    .insert(user_id.to_string(), value)
                    .map(|old| decode::<Session>(&old))
                    .transpose()?;
                Ok((replaced, true))
            })
            .await
    }

    async fn end(&self, user_id: &UserId) -> Result<Option<Session>> {
        self.sessions
            .update(|map| match map.shift_remove(user_id.as_str()) {
                Some(old) => Ok((Some(decode::<Session>(&old)?), true)),
                None => Ok((None, false)),
            })
            .await
    }

    async fn list_all(&self) -> Result<Vec<(UserId, Session)>> {
        let map = self.sessions.read().await?;
        map.iter()
            .map(|(key, value)| Ok((UserId::from_stored_key(key)?, decode::<Session>(value)?)))
            .collect()
    }
}

#[async_trait]
impl BalanceStore for JsonFileStore {
    async fn get(&self, user_id: &UserId) -> Result<Balance> {
        let map = self.balances.read().await?;
        map.get(user_id.as_str())
            .map(decode::<Balance>)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    async fn add(&self, user_id: &UserId, amount: Amount) -> Result<Balance> {
        self.balances
            .update(|map| {
                let current = map
                    .get(user_id.as_str())
                    .map(decode::<Balance>)
                    .transpose()?
                    .unwrap_or_default();
                let updated = current + amount;
                map.insert(user_id.to_string(), serde_json::to_value(updated)?);
                Ok((updated, true))
            })
            .await
    }

    async fn deduct(&self, user_id: &UserId, amount: Amount) -> Result<bool> {
        self.balances
            .update(|map| {
                let current = map
                    .get(user_id.as_str())
                    .map(decode::<Balance>)
                    .transpose()?
                    .unwrap_or_default();
                match current.checked_sub(amount) {
                    Some(remaining) => {
                        map.insert(user_id.to_string(), serde_json::to_value(remaining)?);
                        Ok((true, true))
                    }
                    None => Ok((false, false)),
                }
            })
            .await
    }
}

#[async_trait]
impl UserStore for JsonFileStore {
    async fn register(&self, user_id: &UserId, profile: UserProfile) -> Result<bool> {
        let value = serde_json::to_value(&profile)?;
        self.users
            .update(|map| {
                if map.contains_key(user_id.as_str()) {
                    return Ok((false, false));
                }
                map.insert(user_id.to_string(), value);
                Ok((true, true))
            })
            .await
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        let map = self.users.read().await?;
        map.get(user_id.as_str()).map(decode::<UserProfile>).transpose()
    }
}
