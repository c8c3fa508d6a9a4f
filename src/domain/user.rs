//! User entity and its request contracts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validate::{self, InvalidInput};

/// A persisted bookmark owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
}

impl NewUser {
    pub fn validated(self) -> Result<Self, InvalidInput> {
        Ok(Self {
            username: validate::username(&self.username)?,
            email: validate::email(&self.email)?,
        })
    }
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserPatch {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserPatch {
    pub fn validated(self) -> Result<Self, InvalidInput> {
        Ok(Self {
            username: self.username.as_deref().map(validate::username).transpose()?,
            email: self.email.as_deref().map(validate::email).transpose()?,
        })
    }
}
