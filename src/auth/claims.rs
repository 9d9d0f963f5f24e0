use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload carried by the session bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,      // user ID
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool, // absent claim means not admin
    pub iat: usize,     // issued at (unix timestamp)
    pub exp: usize,     // expires at (unix timestamp)
    pub iss: String,    // issuer
    pub aud: String,    // audience
}
