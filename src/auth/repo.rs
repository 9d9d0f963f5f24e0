use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, PendingReset, User};
use crate::db::{StoreError, StoreResult};

const USER_COLUMNS: &str = "id, name, email, password_hash, is_admin, \
     password_reset_token_hash, password_reset_expires_at, created_at, updated_at";

/// Persistence for user accounts and their pending-reset state.
///
/// Reset-token writes are single operations so that no handler needs to
/// read-then-write across an await point.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn create(&self, user: NewUser<'_>) -> StoreResult<User>;

    async fn promote_to_admin(&self, user_id: Uuid) -> StoreResult<()>;

    /// Overwrites any previous pending reset for the user.
    async fn set_pending_reset(&self, user_id: Uuid, pending: &PendingReset) -> StoreResult<()>;

    /// Clears the pending reset only if it still carries `token_hash`.
    async fn clear_pending_reset(&self, user_id: Uuid, token_hash: &str) -> StoreResult<bool>;

    /// Atomically: find the user whose reset hash matches and has not expired
    /// at `now`, replace the password hash and clear the pending reset.
    async fn consume_reset(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
        new_password_hash: &str,
    ) -> StoreResult<Option<User>>;
}

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser<'_>) -> StoreResult<User> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, is_admin)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.is_admin)
        .fetch_one(&self.db)
        .await?;
        Ok(created)
    }

    async fn promote_to_admin(&self, user_id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE users SET is_admin = TRUE, updated_at = now() WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn set_pending_reset(&self, user_id: Uuid, pending: &PendingReset) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET password_reset_token_hash = $2,
                   password_reset_expires_at = $3,
                   updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(&pending.token_hash)
        .bind(pending.expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn clear_pending_reset(&self, user_id: Uuid, token_hash: &str) -> StoreResult<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET password_reset_token_hash = NULL,
                   password_reset_expires_at = NULL,
                   updated_at = now()
             WHERE id = $1 AND password_reset_token_hash = $2
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn consume_reset(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
        new_password_hash: &str,
    ) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET password_hash = $3,
                   password_reset_token_hash = NULL,
                   password_reset_expires_at = NULL,
                   updated_at = now()
             WHERE password_reset_token_hash = $1
               AND password_reset_expires_at > $2
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(token_hash)
        .bind(now)
        .bind(new_password_hash)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

/// Process-local store used when no database is configured, and in tests.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn create(&self, user: NewUser<'_>) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate);
        }
        let now = OffsetDateTime::now_utc();
        let created = User {
            id: Uuid::new_v4(),
            name: user.name.to_string(),
            email: user.email.to_string(),
            password_hash: user.password_hash.to_string(),
            is_admin: user.is_admin,
            password_reset_token_hash: None,
            password_reset_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn promote_to_admin(&self, user_id: Uuid) -> StoreResult<()> {
        if let Some(u) = self.users.write().await.get_mut(&user_id) {
            u.is_admin = true;
            u.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn set_pending_reset(&self, user_id: Uuid, pending: &PendingReset) -> StoreResult<()> {
        if let Some(u) = self.users.write().await.get_mut(&user_id) {
            u.password_reset_token_hash = Some(pending.token_hash.clone());
            u.password_reset_expires_at = Some(pending.expires_at);
            u.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn clear_pending_reset(&self, user_id: Uuid, token_hash: &str) -> StoreResult<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(&user_id) {
            Some(u) if u.password_reset_token_hash.as_deref() == Some(token_hash) => {
                u.password_reset_token_hash = None;
                u.password_reset_expires_at = None;
                u.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn consume_reset(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
        new_password_hash: &str,
    ) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;
        let found = users.values_mut().find(|u| {
            u.password_reset_token_hash.as_deref() == Some(token_hash)
                && u.password_reset_expires_at.map_or(false, |exp| exp > now)
        });
        Ok(found.map(|u| {
            u.password_hash = new_password_hash.to_string();
            u.password_reset_token_hash = None;
            u.password_reset_expires_at = None;
            u.updated_at = now;
            u.clone()
        }))
    }
}
