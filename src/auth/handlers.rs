use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse,
            ProtectedResponse, ResetPasswordRequest, SignupRequest,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        services,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/protected", get(protected))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let Json(payload) = payload?;
    services::signup(
        &state,
        payload.name.as_deref(),
        payload.email.as_deref(),
        payload.password.as_deref(),
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User created successfully")),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let (token, user) = services::login(
        &state,
        &keys,
        payload.email.as_deref(),
        payload.password.as_deref(),
    )
    .await?;
    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(payload) = payload?;
    services::request_reset(&state, payload.email.as_deref()).await?;
    Ok(Json(MessageResponse::new(services::RESET_REQUESTED_MESSAGE)))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(payload) = payload?;
    services::consume_reset(&state, payload.token.as_deref(), payload.password.as_deref())
        .await?;
    Ok(Json(MessageResponse::new(services::RESET_DONE_MESSAGE)))
}

pub async fn protected(AuthUser(claims): AuthUser) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        message: "This is protected data".into(),
        user: claims,
    })
}
