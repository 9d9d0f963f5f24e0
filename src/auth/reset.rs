//! Password-reset tokens.
//!
//! The plaintext token only ever leaves the process inside the reset email;
//! the user record keeps its SHA-256 digest and an expiry.

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::auth::repo_types::PendingReset;

const TOKEN_BYTES: usize = 32;

pub const RESET_TOKEN_TTL: Duration = Duration::minutes(10);

/// A freshly issued token: the plaintext to deliver and what gets stored.
pub struct IssuedReset {
    pub token: String,
    pub pending: PendingReset,
}

pub fn issue(now: OffsetDateTime) -> IssuedReset {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    let pending = PendingReset {
        token_hash: hash_token(&token),
        expires_at: now + RESET_TOKEN_TTL,
    };
    IssuedReset { token, pending }
}

pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
