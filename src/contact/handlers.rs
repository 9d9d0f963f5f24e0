use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    error::AppError,
    mail::contact_notification_email,
    state::AppState,
    validation::{is_valid_email, present},
};

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub message: String,
}

pub fn contact_routes() -> Router<AppState> {
    Router::new().route("/contact", post(submit_contact))
}

/// Stores the message, then notifies the operator inbox if one is configured.
#[instrument(skip(state, payload))]
pub async fn submit_contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<Json<ContactResponse>, AppError> {
    let Json(payload) = payload?;
    let (Some(name), Some(email), Some(message)) = (
        present(payload.name.as_deref()),
        present(payload.email.as_deref()),
        present(payload.message.as_deref()),
    ) else {
        return Err(AppError::validation("Please fill in all contact fields."));
    };
    if !is_valid_email(email) {
        return Err(AppError::validation("Invalid email"));
    }

    let saved = state
        .contacts
        .insert(name, email, message)
        .await
        .map_err(AppError::dependency("Failed to send message."))?;
    info!(contact_id = %saved.id, from = %saved.email, "contact message stored");

    if let Some(inbox) = state.config.mail.contact_inbox.as_deref() {
        let note = contact_notification_email(inbox, name, email, message);
        if let Err(e) = state.mailer.send(note).await {
            warn!(error = %e, contact_id = %saved.id, "contact notification not delivered");
        }
    }

    Ok(Json(ContactResponse {
        message: "Message sent successfully!".into(),
    }))
}
