use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::StoreResult;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub message: String,
    pub created_at: OffsetDateTime,
}

#[async_trait]
pub trait ContactRepo: Send + Sync {
    async fn insert(&self, name: &str, email: &str, message: &str) -> StoreResult<ContactMessage>;
}

pub struct PgContactRepo {
    db: PgPool,
}

impl PgContactRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContactRepo for PgContactRepo {
    async fn insert(&self, name: &str, email: &str, message: &str) -> StoreResult<ContactMessage> {
        let row = sqlx::query_as::<_, ContactMessage>(
            r#"
            INSERT INTO contact_messages (id, name, email, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, message, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(message)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }
}

#[derive(Default)]
pub struct MemoryContactRepo {
    pub messages: RwLock<Vec<ContactMessage>>,
}

impl MemoryContactRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContactRepo for MemoryContactRepo {
    async fn insert(&self, name: &str, email: &str, message: &str) -> StoreResult<ContactMessage> {
        let row = ContactMessage {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            message: message.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.messages.write().await.push(row.clone());
        Ok(row)
    }
}
