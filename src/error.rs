use axum::{
    extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json,
};
use serde::Serialize;
use tracing::{debug, error};

/// Every failure a handler can surface. Bodies are always `{success, message}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("User already exists")]
    Conflict,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error("Admin access required")]
    Forbidden,

    #[error("Password reset token is invalid or has expired.")]
    InvalidOrExpiredToken,

    /// Database, mail or upstream API failure. Only `context` reaches the client.
    #[error("{context}")]
    Dependency {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// For use with `map_err`: `.map_err(AppError::dependency("Server error"))`.
    pub fn dependency<E>(context: &'static str) -> impl FnOnce(E) -> AppError
    where
        E: Into<anyhow::Error>,
    {
        move |e| AppError::Dependency {
            context,
            source: e.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::Conflict
            | AppError::InvalidCredentials
            | AppError::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Dependency { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if let AppError::Dependency { context, source } = &self {
            error!(error = ?source, context, "dependency failure");
        }
        let status = self.status();
        let body = ErrorBody {
            success: false,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Unreadable bodies (wrong content type, bad JSON, wrong field types) are a
/// plain 400 with the usual JSON body.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(status = %rejection.status(), reason = %rejection.body_text(), "request body rejected");
        AppError::Validation("Invalid request body".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_hides_source() {
        let err = AppError::dependency("Server error")(anyhow::anyhow!("connection refused on 10.0.0.4"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Server error");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::Conflict.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidOrExpiredToken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Unauthorized("nope".into()).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
