use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use super::{claims::Claims, guards, jwt::JwtKeys};
use crate::error::AppError;

/// Any caller holding a valid session token.
pub struct AuthUser(pub Claims);

/// A caller whose session token says `isAdmin: true`.
pub struct AdminUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        guards::run(guards::AUTHENTICATED, &parts.headers, &keys).map(AuthUser)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        guards::run(guards::ADMIN, &parts.headers, &keys).map(AdminUser)
    }
}
