use crate::state::AppState;
use axum::Router;

pub mod handlers;
pub mod repo;

pub use repo::{ContactMessage, ContactRepo, MemoryContactRepo, PgContactRepo};

pub fn router() -> Router<AppState> {
    handlers::contact_routes()
}
