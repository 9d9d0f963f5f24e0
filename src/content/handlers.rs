use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{SectionListResponse, SectionResponse, UpdateSectionRequest, UpdateSectionResponse};
use crate::{auth::extractors::AdminUser, error::AppError, state::AppState};

pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/content", get(list_sections))
        .route("/content/:section_id", get(get_section).put(update_section))
}

/// Public: the site fetches each section through this.
#[instrument(skip(state))]
pub async fn get_section(
    State(state): State<AppState>,
    Path(section_id): Path<String>,
) -> Result<Json<SectionResponse>, AppError> {
    let doc = state
        .content
        .get_section(&section_id)
        .await
        .map_err(AppError::dependency("Failed to retrieve content"))?;

    Ok(Json(SectionResponse {
        success: true,
        section_id: doc.section_id,
        html: doc.html,
    }))
}

#[instrument(skip(state, admin, payload))]
pub async fn update_section(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(section_id): Path<String>,
    payload: Result<Json<UpdateSectionRequest>, JsonRejection>,
) -> Result<Json<UpdateSectionResponse>, AppError> {
    let Json(payload) = payload?;
    let html = payload
        .html
        .ok_or_else(|| AppError::validation("HTML content is required"))?;

    let updated_by = admin.sub.to_string();
    let doc = state
        .content
        .put_section(&section_id, &html, &updated_by)
        .await
        .map_err(AppError::dependency("Failed to update content"))?;

    info!(section_id = %doc.section_id, updated_by = %updated_by, bytes = doc.html.len(), "content updated");
    Ok(Json(UpdateSectionResponse {
        success: true,
        message: format!("Content updated successfully for {}", doc.section_id),
        section_id: doc.section_id,
        html: doc.html,
    }))
}

#[instrument(skip(state, _admin))]
pub async fn list_sections(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<SectionListResponse>, AppError> {
    let content = state
        .content
        .list_sections()
        .await
        .map_err(AppError::dependency("Failed to retrieve content"))?;
    Ok(Json(SectionListResponse {
        success: true,
        content,
    }))
}
