/// Outbound activation mail delivery
///
/// Activation codes are delivered through an HTTP mail relay. Delivery
/// is fire-and-forget: the registration and activation paths never
/// block on (or fail because of) the relay. A failed send is logged
/// and the user can request a fresh code by retrying activation.
///
/// When no relay is configured (`MAIL_ENDPOINT` unset), the code is
/// logged at info level instead, which is what local development
/// wants anyway.

use crate::config::MailConfig;
use serde::Serialize;

/// One activation mail
#[derive(Debug, Clone, Serialize)]
struct ActivationMail {
    from: String,
    to: String,
    subject: String,
    body: String,
}

/// Mail delivery handle
///
/// Cheap to clone; the underlying reqwest client pools connections.
#[derive(Clone)]
pub struct Mailer {
    config: MailConfig,
    client: reqwest::Client,
}

impl Mailer {
    /// Creates a mailer from configuration
    pub fn new(config: MailConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Sends an activation code to a user, without blocking the caller
    ///
    /// The actual send runs on a spawned task. Failures are logged
    /// with the recipient so operators can correlate support tickets.
    pub fn send_activation_code(&self, to: &str, full_name: &str, code: &str) {
        let Some(endpoint) = self.config.endpoint.clone() else {
            tracing::info!(recipient = %to, code = %code, "Mail relay not configured, logging activation code");
            return;
        };

        let mail = ActivationMail {
            from: self.config.from.clone(),
            to: to.to_string(),
            subject: "Activate your BookRelay account".to_string(),
            body: format!(
                "Hello {},\n\nYour activation code is {}. \
                 It expires in 15 minutes.\n\nThe BookRelay team",
                full_name, code
            ),
        };

        let client = self.client.clone();
        let recipient = to.to_string();
        tokio::spawn(async move {
            let result = client.post(&endpoint).json(&mail).send().await;
            match result {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(recipient = %recipient, "Activation mail sent");
                }
                Ok(response) => {
                    tracing::warn!(
                        recipient = %recipient,
                        status = %response.status(),
                        "Mail relay rejected activation mail"
                    );
                }
                Err(e) => {
                    tracing::warn!(recipient = %recipient, error = %e, "Failed to send activation mail");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_without_endpoint_is_a_noop() {
        let mailer = Mailer::new(MailConfig {
            endpoint: None,
            from: "no-reply@bookrelay.local".to_string(),
        });

        // Must not panic or block
        mailer.send_activation_code("user@example.com", "Ada Lovelace", "123456");
    }
}
