// src/notify/email.rs

use chrono::Local;
use lettre::message::{Mailbox, Message, header};
use lettre::transport::smtp::AsyncSmtpTransport;
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncTransport, Tokio1Executor};

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::models::Credentials;
use crate::notify::Notifier;

/// Body timestamp prefix, e.g. `[2021-03-05 14:15:07]`.
const BODY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sends notifications by SMTP over implicit TLS.
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
    subject: String,
}

impl EmailNotifier {
    pub fn new(credentials: &Credentials, subject: impl Into<String>) -> Result<Self, NotifyError> {
        let from: Mailbox = credentials
            .email
            .parse()
            .map_err(|e| NotifyError::Build(format!("sender {}: {e}", credentials.email)))?;
        let to = credentials
            .recipient
            .to_vec()
            .into_iter()
            .map(|addr| {
                addr.parse::<Mailbox>()
                    .map_err(|e| NotifyError::Build(format!("recipient {addr}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if to.is_empty() {
            return Err(NotifyError::Build("no recipients configured".into()));
        }

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&credentials.smtp_host)
            .map_err(|e| NotifyError::Build(format!("SMTP host {}: {e}", credentials.smtp_host)))?
            .port(credentials.smtp_port)
            .credentials(SmtpCredentials::new(
                credentials.email.clone(),
                credentials.password.clone(),
            ))
            .build();

        Ok(Self {
            mailer,
            from,
            to,
            subject: subject.into(),
        })
    }

    fn build(&self, message: &str) -> Result<Message, NotifyError> {
        let body = format!("[{}] {}", Local::now().format(BODY_TIME_FORMAT), message);
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(self.subject.clone())
            .header(header::ContentType::TEXT_PLAIN);
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        builder
            .body(body)
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        let email = self.build(message)?;
        self.mailer
            .send(email)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        log::info!("Message sent: {message}");
        Ok(())
    }
}
