use crate::domain::money::{Amount, Balance};
use crate::domain::ports::{BalanceStore, SessionStore, UserStore};
use crate::domain::session::Session;
use crate::domain::user::{UserId, UserProfile};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory session store.
///
/// Sessions are kept in a `Vec` so `list_all` reports them in insertion
/// order; replacing an open session keeps its original position.
#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<Vec<(UserId, Session)>>>,
}

impl InMemorySessionStore {
    /// Creates a new, empty `InMemorySessionStore`.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn start(&self, user_id: &UserId, session: Session) -> Result<Option<Session>> {
        let mut sessions = self.sessions.write().await;
        if let Some((_, existing)) = sessions.iter_mut().find(|(id, _)| id == user_id) {
            return Ok(Some(std::mem::replace(existing, session)));
        }
        sessions.push((user_id.clone(), session));
        Ok(None)
    }

    async fn end(&self, user_id: &UserId) -> Result<Option<Session>> {
        let mut sessions = self.sessions.write().await;
        let position = sessions.iter().position(|(id, _)| id == user_id);
        Ok(position.map(|index| sessions.remove(index).1))
    }

    async fn list_all(&self) -> Result<Vec<(UserId, Session)>> {
        Ok(self.sessions.read().await.clone())
    }
}

/// A thread-safe in-memory balance store.
///
/// `deduct` holds the write lock across the check and the update, so
/// concurrent deductions cannot drive a balance negative.
#[derive(Default, Clone)]
pub struct InMemoryBalanceStore {
    balances: Arc<RwLock<HashMap<UserId, Balance>>>,
}

impl InMemoryBalanceStore {
    /// Creates a new, empty `InMemoryBalanceStore`; every user starts at zero.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BalanceStore for InMemoryBalanceStore {
    async fn get(&self, user_id: &UserId) -> Result<Balance> {
        let balances = self.balances.read().await;
        Ok(balances.get(user_id).copied().unwrap_or_default())
    }

    async fn add(&self, user_id: &UserId, amount: Amount) -> Result<Balance> {
        let mut balances = self.balances.write().await;
        let entry = balances.entry(user_id.clone()).or_default();
        *entry = *entry + amount;
        Ok(*entry)
    }

    async fn deduct(&self, user_id: &UserId, amount: Amount) -> Result<bool> {
        let mut balances = self.balances.write().await;
        let current = balances.get(user_id).copied().unwrap_or_default();
        match current.checked_sub(amount) {
            Some(remaining) => {
                balances.insert(user_id.clone(), remaining);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// A thread-safe in-memory registry of user profiles.
///
/// `register` checks and inserts under one write lock, so the first
/// registration of an id wins.
#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<UserId, UserProfile>>>,
}

impl InMemoryUserStore {
    /// Creates a new, empty `InMemoryUserStore`.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn register(&self, user_id: &UserId, profile: UserProfile) -> Result<bool> {
        let mut users = self.users.write().await;
        if users.contains_key(user_id) {
            return Ok(false);
        }
        users.insert(user_id.clone(), profile);
        Ok(true)
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }
}
