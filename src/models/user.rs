use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User as returned by the API; the password hash never leaves the db layer
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub team_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Login lookup row
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: i64,
    pub username: String,
    pub hash: String,
    pub role: String,
    pub team_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub team_id: i64,
    /// bcrypt hash, `None` on updates that leave the password alone
    pub hash: Option<String>,
}

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
}
