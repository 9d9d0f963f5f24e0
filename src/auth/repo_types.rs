use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never exposed in JSON
    pub is_admin: bool,
    #[serde(skip_serializing)]
    pub password_reset_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn has_pending_reset(&self) -> bool {
        self.password_reset_token_hash.is_some()
    }
}

/// Fields needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub is_admin: bool,
}

/// Stored half of a reset token: its digest and when it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReset {
    pub token_hash: String,
    pub expires_at: OffsetDateTime,
}
