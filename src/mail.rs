use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, warn};

use crate::config::MailConfig;

#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Outbound transactional mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let smtp = config
            .smtp
            .as_ref()
            .context("SMTP host not configured")?;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
            .with_context(|| format!("smtp relay {}", smtp.host))?
            .port(smtp.port);
        if let (Some(user), Some(pass)) = (&smtp.username, &smtp.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        let from = config
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("invalid MAIL_FROM {}", config.from))?;
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        let to = email
            .to
            .parse::<Mailbox>()
            .with_context(|| format!("invalid recipient {}", email.to))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(email.html)
            .context("build message")?;
        self.transport.send(message).await.context("smtp send")?;
        info!(to = %email.to, "mail sent");
        Ok(())
    }
}

/// Used when no SMTP relay is configured. Only the envelope is logged; bodies
/// can carry reset links.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        warn!(
            to = %email.to,
            subject = %email.subject,
            body_bytes = email.html.len(),
            "SMTP not configured; mail dropped"
        );
        Ok(())
    }
}

pub fn from_config(config: &MailConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    match config.smtp {
        Some(_) => Ok(Arc::new(SmtpMailer::new(config)?)),
        None => {
            warn!("SMTP_HOST not set; outgoing mail will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

pub fn password_reset_email(to: &str, name: &str, reset_url: &str) -> Email {
    let html = format!(
        r#"<h2>Password Reset Request</h2>
<p>Hello {name},</p>
<p>You requested a password reset. Click the link below to reset your password. This link is valid for 10 minutes.</p>
<a href="{url}" style="padding: 10px 20px; background: #007bff; color: white; text-decoration: none; border-radius: 5px;">Reset Password</a>
<p>If you didn't request this, please ignore this email.</p>"#,
        name = escape_html(name),
        url = escape_html(reset_url),
    );
    Email {
        to: to.to_string(),
        subject: "Password Reset Request".into(),
        html,
    }
}

pub fn contact_notification_email(inbox: &str, name: &str, from: &str, message: &str) -> Email {
    let html = format!(
        r#"<h2>New contact form message</h2>
<p><strong>From:</strong> {name} &lt;{from}&gt;</p>
<p style="white-space: pre-wrap;">{message}</p>"#,
        name = escape_html(name),
        from = escape_html(from),
        message = escape_html(message),
    );
    Email {
        to: inbox.to_string(),
        subject: format!("Contact form: {}", name),
        html,
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
