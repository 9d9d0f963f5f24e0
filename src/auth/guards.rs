//! Request guards.
//!
//! A route's access policy is a slice of guards run in order; the first
//! failure is returned and later guards never see the request.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use tracing::warn;

use crate::{
    auth::{claims::Claims, jwt::JwtKeys},
    error::AppError,
};

pub struct GuardContext<'a> {
    pub headers: &'a HeaderMap,
    pub keys: &'a JwtKeys,
    pub claims: Option<Claims>,
}

pub trait Guard: Sync {
    fn check(&self, ctx: &mut GuardContext<'_>) -> Result<(), AppError>;
}

/// Requires a valid, unexpired `Authorization: Bearer` token.
pub struct Bearer;

/// Requires the already-verified claims to carry `isAdmin: true`.
pub struct RequireAdmin;

impl Guard for Bearer {
    fn check(&self, ctx: &mut GuardContext<'_>) -> Result<(), AppError> {
        let header = ctx
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Access denied. No token provided.".into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Access denied. No token provided.".into()))?;

        let claims = ctx.keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Unauthorized("Invalid or expired token".into())
        })?;
        ctx.claims = Some(claims);
        Ok(())
    }
}

impl Guard for RequireAdmin {
    fn check(&self, ctx: &mut GuardContext<'_>) -> Result<(), AppError> {
        match &ctx.claims {
            Some(c) if c.is_admin => Ok(()),
            Some(c) => {
                warn!(user_id = %c.sub, "admin route refused for non-admin");
                Err(AppError::Forbidden)
            }
            None => Err(AppError::Forbidden),
        }
    }
}

pub const AUTHENTICATED: &[&dyn Guard] = &[&Bearer];
pub const ADMIN: &[&dyn Guard] = &[&Bearer, &RequireAdmin];

/// Run `guards` in sequence and return the verified claims.
pub fn run(guards: &[&dyn Guard], headers: &HeaderMap, keys: &JwtKeys) -> Result<Claims, AppError> {
    let mut ctx = GuardContext {
        headers,
        keys,
        claims: None,
    };
    for guard in guards {
        guard.check(&mut ctx)?;
    }
    ctx.claims
        .ok_or_else(|| AppError::Unauthorized("Access denied. No token provided.".into()))
}
