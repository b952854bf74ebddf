//! Outbound confirmation-code email.

use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{Result, UserError};

/// SMTP configuration for confirmation-code delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    /// SMTP server host
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP username; empty means unauthenticated (development relay)
    pub smtp_username: String,
    /// SMTP password
    pub smtp_password: String,
    /// From email address
    pub from_email: String,
    /// From name
    pub from_name: String,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025, // MailHog default port for development
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "noreply@folio.local".to_string(),
            from_name: "Folio".to_string(),
        }
    }
}

/// Confirmation-code mailer.
#[derive(Clone)]
pub struct Mailer {
    config: MailerConfig,
}

impl Mailer {
    pub fn new(config: MailerConfig) -> Self {
        Self { config }
    }

    /// Dispatch the code without blocking or failing the caller. Delivery
    /// problems are logged and swallowed: the stored code stays valid, so
    /// issuance must report success regardless of transport flakiness.
    pub fn dispatch_code(&self, email: &str, code: &str) {
        let mailer = self.clone();
        let email = email.to_string();
        let code = code.to_string();
        tokio::spawn(async move {
            if let Err(e) = mailer.send_code(&email, &code).await {
                error!("Failed to deliver confirmation code to {}: {}", email, e);
            }
        });
    }

    /// Send the confirmation-code message and wait for the transport.
    pub async fn send_code(&self, to_email: &str, code: &str) -> Result<()> {
        let body = format!(
            "Your Folio confirmation code is:\n\n{code}\n\n\
             Use it together with your email address to obtain an access token.\n\
             If you did not request this code, you can safely ignore this email.\n"
        );

        let message = Message::builder()
            .from(
                format!("{} <{}>", self.config.from_name, self.config.from_email)
                    .parse()
                    .map_err(|e| UserError::Configuration(format!("Invalid from email: {}", e)))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| UserError::Configuration(format!("Invalid to email: {}", e)))?)
            .subject("Confirm your email")
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| UserError::Configuration(format!("Failed to build email: {}", e)))?;

        let transport = if self.config.smtp_username.is_empty() {
            // No authentication (for development with MailHog)
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            );
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
                .map_err(|e| UserError::Configuration(format!("Invalid SMTP host: {}", e)))?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build()
        };

        transport
            .send(message)
            .await
            .map_err(|e| UserError::Configuration(format!("Failed to send email: {}", e)))?;

        debug!("Confirmation code email sent to: {}", to_email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mailer_config_default() {
        let config = MailerConfig::default();
        assert_eq!(config.smtp_host, "localhost");
        assert_eq!(config.smtp_port, 1025);
        assert!(config.smtp_username.is_empty());
    }
}
