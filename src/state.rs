use std::sync::Arc;

use tracing::warn;

use crate::auth::repo::{MemoryUserStore, PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::contact::{ContactRepo, MemoryContactRepo, PgContactRepo};
use crate::content::{ContentDefaults, ContentRepo, ContentStore, MemoryContentRepo, PgContentRepo};
use crate::mail::{self, Mailer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub content: ContentStore,
    pub contacts: Arc<dyn ContactRepo>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let defaults = ContentDefaults::load(config.content_defaults_file.as_deref())?;
        let mailer = mail::from_config(&config.mail)?;

        let (users, content_repo, contacts): (
            Arc<dyn UserStore>,
            Arc<dyn ContentRepo>,
            Arc<dyn ContactRepo>,
        ) = match config.database_url.as_deref() {
            Some(url) => {
                let db = crate::db::connect(url).await?;
                (
                    Arc::new(PgUserStore::new(db.clone())),
                    Arc::new(PgContentRepo::new(db.clone())),
                    Arc::new(PgContactRepo::new(db)),
                )
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory stores, data is lost on restart");
                (
                    Arc::new(MemoryUserStore::new()),
                    Arc::new(MemoryContentRepo::new()),
                    Arc::new(MemoryContactRepo::new()),
                )
            }
        };

        Ok(Self::from_parts(
            Arc::new(config),
            users,
            ContentStore::new(content_repo, defaults),
            contacts,
            mailer,
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        content: ContentStore,
        contacts: Arc<dyn ContactRepo>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            config,
            users,
            content,
            contacts,
            mailer,
        }
    }
}
