use crate::state::AppState;
use axum::Router;

pub mod defaults;
mod dto;
pub mod handlers;
pub mod repo;

pub use defaults::ContentDefaults;
pub use repo::{ContentRepo, ContentStore, MemoryContentRepo, PageContent, PgContentRepo};

pub fn router() -> Router<AppState> {
    handlers::content_routes()
}
