use crate::error::MallError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a user by email or phone number.
///
/// Always trimmed and non-empty; construct with [`UserId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, MallError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MallError::ValidationError(
                "Email or phone is required".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Rebuilds an id from a key read back from storage.
    ///
    /// Keys are written verbatim from a parsed id, so a blank or padded key
    /// means the store was edited by hand and is rejected rather than trimmed.
    pub fn from_stored_key(key: &str) -> Result<Self, MallError> {
        if key.is_empty() || key.trim() != key {
            return Err(MallError::ValidationError(format!(
                "Invalid stored user id key {key:?}"
            )));
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = MallError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Contact details captured at registration and at mall entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl UserProfile {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
        }
    }

    /// The identifier this profile is keyed by: email if given, otherwise phone.
    pub fn user_id(&self) -> Result<UserId, MallError> {
        if !self.email.trim().is_empty() {
            UserId::parse(&self.email)
        } else {
            UserId::parse(&self.phone)
        }
    }
}
