//! Owner notification by email.
//!
//! Providers:
//! - `console`: logs the message (development)
//! - `sendgrid`: SendGrid v3 mail API

use reqwest::Client;
use serde_json::json;
use tracing::info;

use super::Channel;
use crate::error::{NotifyError, Result};
use crate::event::Notification;
use crate::settings::{EmailProvider, EmailSettings};

const CHANNEL: &str = "email";

#[derive(Debug, Clone)]
pub struct EmailChannel {
    client: Client,
    settings: EmailSettings,
}

impl EmailChannel {
    pub fn new(client: Client, settings: EmailSettings) -> Self {
        Self { client, settings }
    }

    fn subject(notification: &Notification) -> String {
        match &notification.plate {
            Some(plate) => format!("[plategate] {} - {plate}", notification.title),
            None => format!("[plategate] {}", notification.title),
        }
    }

    fn send_console(&self, notification: &Notification) -> Result<()> {
        info!(
            to = ?self.settings.recipient,
            subject = %Self::subject(notification),
            severity = %notification.severity(),
            body = %notification.message,
            "Email (console provider)"
        );
        Ok(())
    }

    async fn send_sendgrid(&self, notification: &Notification) -> Result<()> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or_else(|| NotifyError::not_configured(CHANNEL, "api key"))?;
        let sender = self
            .settings
            .sender
            .as_deref()
            .ok_or_else(|| NotifyError::not_configured(CHANNEL, "sender"))?;
        let recipient = self
            .settings
            .recipient
            .as_deref()
            .ok_or_else(|| NotifyError::not_configured(CHANNEL, "recipient"))?;

        let body = json!({
            "personalizations": [{ "to": [{ "email": recipient }] }],
            "from": { "email": sender, "name": "plategate" },
            "subject": Self::subject(notification),
            "content": [{ "type": "text/plain", "value": notification.render_text() }],
        });

        let response = self
            .client
            .post(&self.settings.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::delivery(CHANNEL, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(NotifyError::delivery(
                CHANNEL,
                format!("provider returned {status}: {}", error_body.trim()),
            ));
        }

        info!(to = %recipient, kind = %notification.kind, "Email sent via SendGrid");
        Ok(())
    }
}

impl Channel for EmailChannel {
    fn name(&self) -> &str {
        CHANNEL
    }

    async fn send(&self, notification: &Notification) -> Result<()> {
        match self.settings.provider {
            EmailProvider::Console => self.send_console(notification),
            EmailProvider::Sendgrid => self.send_sendgrid(notification).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plategate_core::{NotificationKind, Plate};
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sendgrid(api_url: String) -> EmailSettings {
        EmailSettings {
            enabled: true,
            provider: EmailProvider::Sendgrid,
            api_url,
            api_key: Some("SG.key".into()),
            sender: Some("gate@example.com".into()),
            recipient: Some("owner@example.com".into()),
        }
    }

    fn notification() -> Notification {
        Notification::new(NotificationKind::BlacklistDetected, "Stolen vehicle")
            .with_plate(Plate::new("X999YY777").unwrap())
    }

    #[tokio::test]
    async fn test_sendgrid_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .and(header("authorization", "Bearer SG.key"))
            .and(body_string_contains("owner@example.com"))
            .and(body_string_contains("Blacklisted vehicle - X999YY777"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let channel = EmailChannel::new(
            Client::new(),
            sendgrid(format!("{}/v3/mail/send", server.uri())),
        );
        channel.send(&notification()).await.unwrap();
    }

    #[tokio::test]
    async fn test_sendgrid_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let channel = EmailChannel::new(Client::new(), sendgrid(server.uri()));
        let err = channel.send(&notification()).await.unwrap_err();

        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("bad key"));
    }

    #[tokio::test]
    async fn test_sendgrid_missing_key_is_not_configured() {
        let mut settings = sendgrid("http://127.0.0.1:9".into());
        settings.api_key = None;

        let channel = EmailChannel::new(Client::new(), settings);
        let err = channel.send(&notification()).await.unwrap_err();

        assert!(matches!(err, NotifyError::NotConfigured { channel: "email", .. }));
    }

    #[tokio::test]
    async fn test_console_provider_always_succeeds() {
        let channel = EmailChannel::new(Client::new(), EmailSettings::default());
        channel.send(&notification()).await.unwrap();
    }
}
