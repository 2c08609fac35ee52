use super::money::{Amount, Balance};
use super::session::Session;
use super::user::{UserId, UserProfile};
use crate::error::Result;
use async_trait::async_trait;

/// Open sessions keyed by user.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts or replaces the session for `user_id`, returning the replaced one.
    async fn start(&self, user_id: &UserId, session: Session) -> Result<Option<Session>>;
    /// Removes and returns the session for `user_id`, if one is open.
    async fn end(&self, user_id: &UserId) -> Result<Option<Session>>;
    /// Every open session in store order.
    async fn list_all(&self) -> Result<Vec<(UserId, Session)>>;
}

/// Prepaid balances keyed by user. Unknown users hold [`Balance::ZERO`].
#[async_trait]
pub trait BalanceStore: Send + Sync {
    async fn get(&self, user_id: &UserId) -> Result<Balance>;
    /// Adds `amount` unconditionally and returns the new balance.
    async fn add(&self, user_id: &UserId, amount: Amount) -> Result<Balance>;
    /// All-or-nothing deduction. Returns `false` and leaves the balance
    /// untouched when it is smaller than `amount`.
    async fn deduct(&self, user_id: &UserId, amount: Amount) -> Result<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Registers a new user. Returns `false` without writing if the id is taken.
    async fn register(&self, user_id: &UserId, profile: UserProfile) -> Result<bool>;
    async fn get(&self, user_id: &UserId) -> Result<Option<UserProfile>>;

    async fn exists(&self, user_id: &UserId) -> Result<bool> {
        Ok(self.get(user_id).await?.is_some())
    }
}

pub type SessionStoreBox = Box<dyn SessionStore>;
pub type BalanceStoreBox = Box<dyn BalanceStore>;
pub type UserStoreBox = Box<dyn UserStore>;
