use core::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct UserId(pub i32);

/// Base `users` table model. Holds the bcrypt hash; never serialized whole.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub password: String,
    pub points: f64,
    pub is_guest: bool,
    pub registration_date: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Client-facing projection of a [`User`], hash excluded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub points: f64,
    pub is_guest: bool,
    pub registration_date: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub is_guest: bool,
}

impl From<User> for UserProfile {
    fn from(value: User) -> Self {
        Self {
            id: value.user_id,
            name: value.name,
            email: value.email,
            points: value.points,
            is_guest: value.is_guest,
            registration_date: value.registration_date,
        }
    }
}

impl From<i32> for UserId {
    fn from(value: i32) -> Self {
        UserId(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
