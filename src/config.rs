use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// SMTP relay settings. Absent host means mail is only logged.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub smtp: Option<SmtpConfig>,
    pub from: String,
    pub reset_url_base: String,
    pub contact_inbox: Option<String>,
}

/// Operator-supplied credentials for the bootstrap admin account.
#[derive(Clone, Deserialize)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub admin: Option<AdminSeed>,
    pub static_dir: PathBuf,
    pub cors_origins: Vec<String>,
    pub content_defaults_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = non_empty_var("DATABASE_URL");
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "techvision".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "techvision-site".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
        };

        let smtp = non_empty_var("SMTP_HOST").map(|host| SmtpConfig {
            host,
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            username: non_empty_var("SMTP_USERNAME"),
            password: non_empty_var("SMTP_PASSWORD"),
        });
        let mail = MailConfig {
            smtp,
            from: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "TechVision Solutions <noreply@techvision.com>".into()),
            reset_url_base: std::env::var("RESET_URL_BASE")
                .unwrap_or_else(|_| "http://localhost:5000/reset-password.html".into()),
            contact_inbox: non_empty_var("CONTACT_INBOX"),
        };

        let admin = match (non_empty_var("ADMIN_EMAIL"), non_empty_var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            _ => None,
        };

        let cors_origins = std::env::var("CORS_ORIGINS")
            .map(|v| parse_list(&v))
            .unwrap_or_default();

        Ok(Self {
            database_url,
            jwt,
            mail,
            admin,
            static_dir: std::env::var("STATIC_DIR")
                .unwrap_or_else(|_| "public".into())
                .into(),
            cors_origins,
            content_defaults_file: non_empty_var("CONTENT_DEFAULTS_FILE").map(PathBuf::from),
        })
    }
}

/// Settings for the analytics proxy binary.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    pub property_id: String,
    pub service_account_file: PathBuf,
    pub host: String,
    pub port: u16,
}

impl AnalyticsConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            property_id: std::env::var("GA_PROPERTY_ID").context("GA_PROPERTY_ID must be set")?,
            service_account_file: std::env::var("GOOGLE_SERVICE_ACCOUNT_FILE")
                .unwrap_or_else(|_| "service-account.json".into())
                .into(),
            host: std::env::var("ANALYTICS_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("ANALYTICS_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(3000),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_skips_blanks() {
        let origins = parse_list(" http://localhost:5500, ,http://localhost:3000,");
        assert_eq!(
            origins,
            vec!["http://localhost:5500".to_string(), "http://localhost:3000".to_string()]
        );
    }

    #[test]
    fn admin_seed_debug_hides_password() {
        let seed = AdminSeed {
            email: "root@example.com".into(),
            password: "hunter2".into(),
        };
        let out = format!("{:?}", seed);
        assert!(out.contains("root@example.com"));
        assert!(!out.contains("hunter2"));
    }
}
