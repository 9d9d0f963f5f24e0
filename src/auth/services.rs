//! Credential lifecycle: signup, login, password reset and admin seeding.

use anyhow::Context;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    auth::{
        jwt::JwtKeys,
        password::{hash_password_blocking, verify_password_blocking},
        repo::UserStore,
        repo_types::{NewUser, User},
        reset,
    },
    config::AdminSeed,
    db::StoreError,
    error::AppError,
    mail::password_reset_email,
    state::AppState,
    validation::{is_valid_email, present},
};

pub const RESET_REQUESTED_MESSAGE: &str =
    "If an account with that email exists, a reset link has been sent.";
pub const RESET_DONE_MESSAGE: &str = "Password has been reset successfully.";

// Unknown emails still pay one Argon2 verification against this. Same
// parameters as `Argon2::default()`; matches no password anyone can send.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$olDxF8PJjsrnYAHl16/+kQ$5q0ksREH2LxzHd5wq19ZNpuVfAH+UeseNNitKo5QCQ8";

pub async fn signup(
    st: &AppState,
    name: Option<&str>,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<User, AppError> {
    let password = password.filter(|p| !p.trim().is_empty());
    let (Some(name), Some(email), Some(password)) = (present(name), present(email), password)
    else {
        return Err(AppError::validation("All fields are required"));
    };
    if !is_valid_email(email) {
        warn!(email = %email, "signup with invalid email");
        return Err(AppError::validation("Invalid email"));
    }

    if st
        .users
        .find_by_email(email)
        .await
        .map_err(AppError::dependency("Server error"))?
        .is_some()
    {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict);
    }

    let hash = hash_password_blocking(password.to_string())
        .await
        .map_err(AppError::dependency("Server error"))?;

    let user = st
        .users
        .create(NewUser {
            name,
            email,
            password_hash: &hash,
            is_admin: false,
        })
        .await
        .map_err(|e| match e {
            StoreError::Duplicate => AppError::Conflict,
            other => AppError::dependency("Server error")(other),
        })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Returns the signed session token and the user it was issued for.
pub async fn login(
    st: &AppState,
    keys: &JwtKeys,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<(String, User), AppError> {
    let (Some(email), Some(password)) = (present(email), password.filter(|p| !p.is_empty()))
    else {
        return Err(AppError::InvalidCredentials);
    };

    let user = st
        .users
        .find_by_email(email)
        .await
        .map_err(AppError::dependency("Server error"))?;

    let Some(user) = user else {
        let _ = verify_password_blocking(password.to_string(), DUMMY_HASH.to_string()).await;
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    let ok = verify_password_blocking(password.to_string(), user.password_hash.clone())
        .await
        .map_err(AppError::dependency("Server error"))?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = keys
        .sign(user.id, user.is_admin)
        .map_err(AppError::dependency("Server error"))?;
    info!(user_id = %user.id, is_admin = user.is_admin, "user logged in");
    Ok((token, user))
}

/// Issues a reset token for `email` if it belongs to a user.
///
/// Unknown or blank emails succeed silently. If the mail cannot be delivered
/// the pending reset this call wrote is cleared again.
pub async fn request_reset(st: &AppState, email: Option<&str>) -> Result<(), AppError> {
    let Some(email) = present(email) else {
        return Ok(());
    };

    let Some(user) = st
        .users
        .find_by_email(email)
        .await
        .map_err(AppError::dependency("Server error"))?
    else {
        info!("password reset requested for unknown email");
        return Ok(());
    };

    let issued = reset::issue(OffsetDateTime::now_utc());
    st.users
        .set_pending_reset(user.id, &issued.pending)
        .await
        .map_err(AppError::dependency("Server error"))?;

    let url = reset_url(&st.config.mail.reset_url_base, &issued.token);
    let email = password_reset_email(&user.email, &user.name, &url);

    if let Err(e) = st.mailer.send(email).await {
        match st
            .users
            .clear_pending_reset(user.id, &issued.pending.token_hash)
            .await
        {
            Ok(cleared) => warn!(user_id = %user.id, cleared, "reset email failed; pending reset rolled back"),
            Err(rollback) => warn!(user_id = %user.id, error = %rollback, "reset email failed and rollback failed"),
        }
        return Err(AppError::dependency("Error sending password reset email.")(e));
    }

    info!(user_id = %user.id, expires_at = %issued.pending.expires_at, "password reset issued");
    Ok(())
}

pub async fn consume_reset(
    st: &AppState,
    token: Option<&str>,
    password: Option<&str>,
) -> Result<(), AppError> {
    let (Some(token), Some(password)) = (present(token), password.filter(|p| !p.is_empty()))
    else {
        return Err(AppError::validation("Token and new password are required"));
    };

    let token_hash = reset::hash_token(token);
    let new_hash = hash_password_blocking(password.to_string())
        .await
        .map_err(AppError::dependency("Server error"))?;

    let user = st
        .users
        .consume_reset(&token_hash, OffsetDateTime::now_utc(), &new_hash)
        .await
        .map_err(AppError::dependency("Server error"))?
        .ok_or(AppError::InvalidOrExpiredToken)?;

    info!(user_id = %user.id, "password reset completed");
    Ok(())
}

fn reset_url(base: &str, token: &str) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}token={token}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminSeedOutcome {
    Created,
    Promoted,
    AlreadyAdmin,
}

/// Make sure the operator's admin account exists and carries the admin flag.
/// Safe to run on every boot.
pub async fn ensure_admin(users: &dyn UserStore, seed: &AdminSeed) -> anyhow::Result<AdminSeedOutcome> {
    match users.find_by_email(&seed.email).await.context("lookup admin")? {
        Some(u) if u.is_admin => {
            info!(email = %seed.email, "admin user already exists");
            Ok(AdminSeedOutcome::AlreadyAdmin)
        }
        Some(u) => {
            users.promote_to_admin(u.id).await.context("promote admin")?;
            info!(email = %seed.email, "existing user promoted to admin");
            Ok(AdminSeedOutcome::Promoted)
        }
        None => {
            let hash = hash_password_blocking(seed.password.clone()).await?;
            users
                .create(NewUser {
                    name: "Admin",
                    email: &seed.email,
                    password_hash: &hash,
                    is_admin: true,
                })
                .await
                .context("create admin")?;
            info!(email = %seed.email, "admin user created");
            Ok(AdminSeedOutcome::Created)
        }
    }
}
