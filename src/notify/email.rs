// src/notify/email.rs
use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::AlertSubscription;

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailSender {
    /// Build from SMTP_* environment. Missing configuration is an error the
    /// caller resolves by running without email, not by failing startup.
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("SMTP_HOST").context("SMTP_HOST missing")?;
        let user = std::env::var("SMTP_USER").context("SMTP_USER missing")?;
        let pass = std::env::var("SMTP_PASS").context("SMTP_PASS missing")?;
        let from_addr = std::env::var("ALERTS_EMAIL_FROM").context("ALERTS_EMAIL_FROM missing")?;

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        let from = from_addr.parse().context("invalid ALERTS_EMAIL_FROM")?;
        Ok(Self { mailer, from })
    }

    pub async fn send_confirmation(&self, sub: &AlertSubscription) -> Result<()> {
        let to: Mailbox = sub.email.parse().context("invalid subscriber address")?;
        let subject = format!("Listing alerts active for \"{}\"", sub.query);
        let body = format!(
            "You are subscribed to new-listing alerts matching \"{}\".\nSubscribed at: {}\n",
            sub.query,
            sub.created_at.to_rfc3339()
        );

        let msg = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body)
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}
