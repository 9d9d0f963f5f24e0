use std::path::Path;

use anyhow::{bail, Context};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tracing::{debug, info};

const SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const API_BASE: &str = "https://analyticsdata.googleapis.com/v1beta";
const ASSERTION_TTL: Duration = Duration::hours(1);
// Refresh this long before Google's stated expiry.
const REFRESH_MARGIN: Duration = Duration::seconds(60);

/// Runs Data API reports for one property.
#[async_trait]
pub trait ReportClient: Send + Sync {
    async fn run_report(&self, body: Value) -> anyhow::Result<Value>;
    async fn run_realtime_report(&self, body: Value) -> anyhow::Result<Value>;
}

/// The fields of a downloaded service-account JSON key that the token grant needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".into()
}

impl ServiceAccountKey {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read service account key {}", path.display()))?;
        serde_json::from_str(&raw).context("parse service account key")
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    access_token: String,
    expires_at: OffsetDateTime,
}

impl CachedToken {
    fn is_fresh(&self, now: OffsetDateTime) -> bool {
        self.expires_at - REFRESH_MARGIN > now
    }
}

pub struct GoogleAnalyticsClient {
    http: Client,
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    property_id: String,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleAnalyticsClient {
    pub fn new(key: ServiceAccountKey, property_id: impl Into<String>) -> anyhow::Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .context("service account private key is not a valid RSA PEM")?;
        Ok(Self {
            http: Client::new(),
            key,
            signing_key,
            property_id: property_id.into(),
            token: Mutex::new(None),
        })
    }

    fn assertion(&self, now: OffsetDateTime) -> anyhow::Result<String> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: SCOPE,
            aud: &self.key.token_uri,
            iat: now.unix_timestamp(),
            exp: (now + ASSERTION_TTL).unix_timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .context("sign token assertion")
    }

    /// Cached access token, fetching a new one when missing or about to expire.
    async fn access_token(&self) -> anyhow::Result<String> {
        let mut cached = self.token.lock().await;
        let now = OffsetDateTime::now_utc();
        if let Some(t) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(t.access_token.clone());
        }

        let assertion = self.assertion(now)?;
        let res = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await
            .context("token request")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            bail!("token endpoint returned {status}: {body}");
        }
        let token: TokenResponse = res.json().await.context("decode token response")?;
        info!(expires_in = token.expires_in, "fetched analytics access token");

        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        });
        Ok(access_token)
    }

    async fn call(&self, method: &str, body: Value) -> anyhow::Result<Value> {
        let token = self.access_token().await?;
        let url = format!("{API_BASE}/properties/{}:{method}", self.property_id);
        debug!(%url, "analytics request");

        let res = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("{method} request"))?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            bail!("{method} returned {status}: {text}");
        }
        let data: Value = res.json().await.with_context(|| format!("decode {method}"))?;
        Ok(if data.is_null() { Value::Object(Default::default()) } else { data })
    }
}

#[async_trait]
impl ReportClient for GoogleAnalyticsClient {
    async fn run_report(&self, body: Value) -> anyhow::Result<Value> {
        self.call("runReport", body).await
    }

    async fn run_realtime_report(&self, body: Value) -> anyhow::Result<Value> {
        self.call("runRealtimeReport", body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_defaults_token_uri() {
        let key: ServiceAccountKey = serde_json::from_str(
            r#"{"client_email":"svc@proj.iam.gserviceaccount.com","private_key":"x"}"#,
        )
        .unwrap();
        assert_eq!(key.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn rejects_non_pem_key() {
        let key = ServiceAccountKey {
            client_email: "svc@x".into(),
            private_key: "not a key".into(),
            token_uri: default_token_uri(),
        };
        assert!(GoogleAnalyticsClient::new(key, "123").is_err());
    }

    #[test]
    fn cached_token_refreshes_before_expiry() {
        let now = OffsetDateTime::now_utc();
        let fresh = CachedToken {
            access_token: "a".into(),
            expires_at: now + Duration::minutes(30),
        };
        let stale = CachedToken {
            access_token: "b".into(),
            expires_at: now + Duration::seconds(30),
        };
        assert!(fresh.is_fresh(now));
        assert!(!stale.is_fresh(now));
    }
}
