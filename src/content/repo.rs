use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::defaults::ContentDefaults;
use crate::db::StoreResult;

/// One editable block of the public site.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    pub section_id: String,
    pub html: String,
    pub updated_by: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[async_trait]
pub trait ContentRepo: Send + Sync {
    async fn find(&self, section_id: &str) -> StoreResult<Option<PageContent>>;

    /// Insert unless a row for `section_id` already exists; return the stored row.
    async fn insert_if_absent(
        &self,
        section_id: &str,
        html: &str,
        updated_by: &str,
    ) -> StoreResult<PageContent>;

    async fn upsert(&self, section_id: &str, html: &str, updated_by: &str)
        -> StoreResult<PageContent>;

    /// All sections ordered by id.
    async fn list(&self) -> StoreResult<Vec<PageContent>>;
}

pub struct PgContentRepo {
    db: PgPool,
}

impl PgContentRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContentRepo for PgContentRepo {
    async fn find(&self, section_id: &str) -> StoreResult<Option<PageContent>> {
        let row = sqlx::query_as::<_, PageContent>(
            r#"
            SELECT section_id, html, updated_by, created_at, updated_at
              FROM page_content
             WHERE section_id = $1
            "#,
        )
        .bind(section_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn insert_if_absent(
        &self,
        section_id: &str,
        html: &str,
        updated_by: &str,
    ) -> StoreResult<PageContent> {
        sqlx::query(
            r#"
            INSERT INTO page_content (section_id, html, updated_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (section_id) DO NOTHING
            "#,
        )
        .bind(section_id)
        .bind(html)
        .bind(updated_by)
        .execute(&self.db)
        .await?;

        let row = sqlx::query_as::<_, PageContent>(
            r#"
            SELECT section_id, html, updated_by, created_at, updated_at
              FROM page_content
             WHERE section_id = $1
            "#,
        )
        .bind(section_id)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn upsert(
        &self,
        section_id: &str,
        html: &str,
        updated_by: &str,
    ) -> StoreResult<PageContent> {
        let row = sqlx::query_as::<_, PageContent>(
            r#"
            INSERT INTO page_content (section_id, html, updated_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (section_id) DO UPDATE
               SET html = EXCLUDED.html,
                   updated_by = EXCLUDED.updated_by,
                   updated_at = now()
            RETURNING section_id, html, updated_by, created_at, updated_at
            "#,
        )
        .bind(section_id)
        .bind(html)
        .bind(updated_by)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn list(&self) -> StoreResult<Vec<PageContent>> {
        let rows = sqlx::query_as::<_, PageContent>(
            r#"
            SELECT section_id, html, updated_by, created_at, updated_at
              FROM page_content
             ORDER BY section_id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

#[derive(Default)]
pub struct MemoryContentRepo {
    rows: RwLock<BTreeMap<String, PageContent>>,
}

impl MemoryContentRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentRepo for MemoryContentRepo {
    async fn find(&self, section_id: &str) -> StoreResult<Option<PageContent>> {
        Ok(self.rows.read().await.get(section_id).cloned())
    }

    async fn insert_if_absent(
        &self,
        section_id: &str,
        html: &str,
        updated_by: &str,
    ) -> StoreResult<PageContent> {
        let mut rows = self.rows.write().await;
        let row = rows.entry(section_id.to_string()).or_insert_with(|| {
            let now = OffsetDateTime::now_utc();
            PageContent {
                section_id: section_id.to_string(),
                html: html.to_string(),
                updated_by: Some(updated_by.to_string()),
                created_at: now,
                updated_at: now,
            }
        });
        Ok(row.clone())
    }

    async fn upsert(
        &self,
        section_id: &str,
        html: &str,
        updated_by: &str,
    ) -> StoreResult<PageContent> {
        let mut rows = self.rows.write().await;
        let now = OffsetDateTime::now_utc();
        let row = rows
            .entry(section_id.to_string())
            .and_modify(|r| {
                r.html = html.to_string();
                r.updated_by = Some(updated_by.to_string());
                r.updated_at = now;
            })
            .or_insert_with(|| PageContent {
                section_id: section_id.to_string(),
                html: html.to_string(),
                updated_by: Some(updated_by.to_string()),
                created_at: now,
                updated_at: now,
            });
        Ok(row.clone())
    }

    async fn list(&self) -> StoreResult<Vec<PageContent>> {
        Ok(self.rows.read().await.values().cloned().collect())
    }
}

/// Section reads with seed-on-first-read, over any [`ContentRepo`].
#[derive(Clone)]
pub struct ContentStore {
    repo: Arc<dyn ContentRepo>,
    defaults: Arc<ContentDefaults>,
}

impl ContentStore {
    pub const SYSTEM_AUTHOR: &'static str = "system";

    pub fn new(repo: Arc<dyn ContentRepo>, defaults: ContentDefaults) -> Self {
        Self {
            repo,
            defaults: Arc::new(defaults),
        }
    }

    pub async fn get_section(&self, section_id: &str) -> StoreResult<PageContent> {
        if let Some(row) = self.repo.find(section_id).await? {
            return Ok(row);
        }
        self.repo
            .insert_if_absent(section_id, self.defaults.get(section_id), Self::SYSTEM_AUTHOR)
            .await
    }

    pub async fn put_section(
        &self,
        section_id: &str,
        html: &str,
        updated_by: &str,
    ) -> StoreResult<PageContent> {
        self.repo.upsert(section_id, html, updated_by).await
    }

    pub async fn list_sections(&self) -> StoreResult<Vec<PageContent>> {
        self.repo.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ContentStore {
        ContentStore::new(
            Arc::new(MemoryContentRepo::new()),
            ContentDefaults::from_pairs([("about", "<h2>About</h2>")]),
        )
    }

    #[tokio::test]
    async fn first_read_seeds_default_and_persists() {
        let s = store();
        let first = s.get_section("about").await.unwrap();
        assert_eq!(first.html, "<h2>About</h2>");
        assert_eq!(first.updated_by.as_deref(), Some("system"));

        let again = s.get_section("about").await.unwrap();
        assert_eq!(again, first);
        assert_eq!(s.list_sections().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_section_seeds_empty() {
        let s = store();
        assert_eq!(s.get_section("careers").await.unwrap().html, "");
    }

    #[tokio::test]
    async fn put_overrides_default_and_keeps_created_at() {
        let s = store();
        let seeded = s.get_section("about").await.unwrap();
        let updated = s.put_section("about", "", "admin-1").await.unwrap();
        assert_eq!(updated.html, "");
        assert_eq!(updated.updated_by.as_deref(), Some("admin-1"));
        assert_eq!(updated.created_at, seeded.created_at);
        assert_eq!(s.get_section("about").await.unwrap().html, "");
    }

    #[tokio::test]
    async fn list_is_ordered_by_section_id() {
        let s = store();
        s.put_section("zeta", "z", "a").await.unwrap();
        s.put_section("alpha", "a", "a").await.unwrap();
        let ids: Vec<_> = s
            .list_sections()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.section_id)
            .collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }

    #[test]
    fn serializes_camel_case() {
        let now = OffsetDateTime::now_utc();
        let row = PageContent {
            section_id: "blog".into(),
            html: "<p/>".into(),
            updated_by: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["sectionId"], "blog");
        assert!(json.get("updatedBy").is_some());
        assert!(json["createdAt"].is_string());
    }
}
