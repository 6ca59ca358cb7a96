//! Telegram bot channel.
//!
//! Messages go to one chat through `sendMessage`. The bot token is part of
//! the request path, so transport errors are reported without their URL.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::info;

use super::Channel;
use crate::error::{NotifyError, Result};
use crate::event::Notification;
use crate::settings::TelegramSettings;

const CHANNEL: &str = "telegram";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    username: Option<String>,
    first_name: String,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
    title: Option<String>,
    username: Option<String>,
    first_name: Option<String>,
}

/// Bot and chat the channel is configured for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelegramIdentity {
    pub bot_name: String,
    pub chat_id: i64,
    pub chat_title: String,
}

#[derive(Debug, Clone)]
pub struct TelegramChannel {
    client: Client,
    settings: TelegramSettings,
}

impl TelegramChannel {
    pub fn new(client: Client, settings: TelegramSettings) -> Self {
        Self { client, settings }
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        let token = self
            .settings
            .bot_token
            .as_deref()
            .ok_or_else(|| NotifyError::not_configured(CHANNEL, "bot token"))?;
        let chat_id = self
            .settings
            .chat_id
            .as_deref()
            .ok_or_else(|| NotifyError::not_configured(CHANNEL, "chat id"))?;
        Ok((token, chat_id))
    }

    fn method_url(&self, token: &str, method: &str) -> String {
        format!("{}/bot{token}/{method}", self.settings.api_url)
    }

    async fn call<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::delivery(CHANNEL, e.without_url().to_string()))?;
        let status = response.status();

        let body: ApiResponse<T> = response.json().await.map_err(|_| {
            NotifyError::delivery(CHANNEL, format!("unexpected response ({status})"))
        })?;

        match body {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(NotifyError::delivery(
                CHANNEL,
                description.unwrap_or_else(|| format!("request rejected ({status})")),
            )),
        }
    }

    /// Check the bot token with `getMe` and the chat with `getChat`.
    pub async fn verify(&self) -> Result<TelegramIdentity> {
        let (token, chat_id) = self.credentials()?;

        let bot: BotUser = self
            .call(self.client.get(self.method_url(token, "getMe")))
            .await?;
        let chat: Chat = self
            .call(
                self.client
                    .get(self.method_url(token, "getChat"))
                    .query(&[("chat_id", chat_id)]),
            )
            .await?;

        Ok(TelegramIdentity {
            bot_name: bot.username.unwrap_or(bot.first_name),
            chat_id: chat.id,
            chat_title: chat
                .title
                .or(chat.username)
                .or(chat.first_name)
                .unwrap_or_default(),
        })
    }
}

impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        CHANNEL
    }

    async fn send(&self, notification: &Notification) -> Result<()> {
        let (token, chat_id) = self.credentials()?;

        let request = self
            .client
            .post(self.method_url(token, "sendMessage"))
            .json(&json!({
                "chat_id": chat_id,
                "text": notification.render_text(),
                "disable_web_page_preview": true,
            }));
        let _: serde_json::Value = self.call(request).await?;

        info!(kind = %notification.kind, "Telegram message sent");
        Ok(())
    }
}
