use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;
use tracing::debug;

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("failed to build email: {0}")]
    Build(String),
    #[error("failed to send email: {0}")]
    Send(String),
}

#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub async fn send_welcome_email(&self, to: &str, first_name: &str) -> Result<(), EmailError> {
        let subject = "Welcome to EventSmart Pro!";
        let body = format!(
            r#"
<h2>Welcome to EventSmart Pro, {first_name}!</h2>
<p>Thank you for joining EventSmart Pro. Your account has been successfully created.</p>
<p>You can now start exploring our platform and manage your events efficiently.</p>
<br>
<p>Best regards,<br>EventSmart Pro Team</p>
"#
        );
        self.send(to, subject, body).await
    }

    pub async fn send_password_reset_email(
        &self,
        to: &str,
        reset_token: &str,
        reset_url: &str,
    ) -> Result<(), EmailError> {
        let subject = "Password Reset - EventSmart Pro";
        let body = format!(
            r#"
<h2>Password Reset Request</h2>
<p>You have requested to reset your password. Click the link below to reset your password:</p>
<p><a href="{reset_url}?token={reset_token}" style="background-color: #4CAF50; color: white; padding: 14px 20px; text-decoration: none; border-radius: 4px;">Reset Password</a></p>
<p>This link will expire in 1 hour.</p>
<p>If you did not request this password reset, please ignore this email.</p>
<br>
<p>Best regards,<br>EventSmart Pro Team</p>
"#
        );
        self.send(to, subject, body).await
    }

    async fn send(&self, to: &str, subject: &str, html_body: String) -> Result<(), EmailError> {
        if !self.config.enabled {
            debug!("SMTP not configured, skipping email '{}' to {}", subject, to);
            return Ok(());
        }

        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);
        let message = Message::builder()
            .from(from.parse().map_err(|e| EmailError::Build(format!("{e}")))?)
            .to(to.parse().map_err(|e| EmailError::Build(format!("{e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body)
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let mailer = SmtpTransport::relay(&self.config.smtp_server)
            .map_err(|e| EmailError::Send(e.to_string()))?
            .port(self.config.smtp_port)
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .build();

        // Транспорт lettre синхронный, уводим в blocking pool
        tokio::task::spawn_blocking(move || {
            mailer.send(&message).map_err(|e| EmailError::Send(e.to_string()))
        })
        .await
        .map_err(|e| EmailError::Send(e.to_string()))?
        .map(|_| ())
    }
}
