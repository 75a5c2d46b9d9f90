//! User records as seen by the tournament engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User ID type
pub type UserId = Uuid;

/// Country recorded when none is supplied
pub const DEFAULT_COUNTRY: &str = "Unknown";

/// Starting coin balance for new users
pub const DEFAULT_COINS: i64 = 1000;

/// Starting level for new users
pub const DEFAULT_LEVEL: i32 = 1;

/// A player account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub country: String,
    /// Coin balance
    pub coins: i64,
    pub level: i32,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when creating a user
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub country: Option<String>,
    pub coins: Option<i64>,
    pub level: Option<i32>,
}

impl NewUser {
    pub fn named(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            country: None,
            coins: None,
            level: None,
        }
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_coins(mut self, coins: i64) -> Self {
        self.coins = Some(coins);
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Resolve defaults into a full record
    pub fn into_user(self, id: UserId, created_at: DateTime<Utc>) -> User {
        User {
            id,
            username: self.username,
            country: self.country.unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            coins: self.coins.unwrap_or(DEFAULT_COINS),
            level: self.level.unwrap_or(DEFAULT_LEVEL),
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = NewUser::named("alice").into_user(Uuid::new_v4(), Utc::now());
        assert_eq!(user.country, DEFAULT_COUNTRY);
        assert_eq!(user.coins, DEFAULT_COINS);
        assert_eq!(user.level, DEFAULT_LEVEL);
    }

    #[test]
    fn test_new_user_overrides() {
        let user = NewUser::named("bob")
            .with_level(12)
            .with_coins(600)
            .with_country("Turkey")
            .into_user(Uuid::new_v4(), Utc::now());
        assert_eq!(user.level, 12);
        assert_eq!(user.coins, 600);
        assert_eq!(user.country, "Turkey");
    }
}
