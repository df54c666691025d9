//! Telegram Bot API adapter
//!
//! Long-polls `getUpdates` and converts messages into inbound events;
//! implements the outbound [`ChatPort`] over `sendMessage` (with inline
//! keyboards for choices) and `sendChatAction` for the typing indicator.
//! Albums arrive as one message per photo; grouping them is the session's
//! job, this adapter only downloads the largest size of each.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use crate::chat::{ChatError, ChatPort, Choice, MessageId};
use crate::config::PlatformConfig;
use crate::event::{InboundEvent, PhotoPayload, PhotoVariant, UserId};

pub struct Telegram {
    http: Client,
    base_url: String,
    token: String,
    poll_timeout_s: u64,
    /// Next `getUpdates` offset; updates below it are acknowledged
    next_offset: AtomicI64,
}

#[derive(Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
    callback_query: Option<CallbackQuery>,
}

#[derive(Deserialize)]
struct Message {
    message_id: i64,
    from: Option<User>,
    text: Option<String>,
    caption: Option<String>,
    photo: Option<Vec<PhotoSize>>,
    reply_to_message: Option<Box<Message>>,
}

#[derive(Deserialize)]
struct User {
    id: i64,
}

#[derive(Deserialize)]
struct PhotoSize {
    file_id: String,
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct CallbackQuery {
    id: String,
    from: User,
    data: Option<String>,
}

#[derive(Deserialize)]
struct FileInfo {
    file_path: Option<String>,
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: i64,
}

impl Telegram {
    /// Create an adapter from configuration; the bot token is read from
    /// the environment variable named in the config
    pub fn from_config(config: &PlatformConfig) -> Result<Self, ChatError> {
        let token = std::env::var(&config.token_env)
            .map_err(|_| ChatError::InvalidResponse(format!("environment variable {} not set", config.token_env)))?;

        // The request timeout must outlast the long-poll window
        let http = Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_s + 10))
            .build()
            .map_err(ChatError::Network)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
            poll_timeout_s: config.poll_timeout_s,
            next_offset: AtomicI64::new(0),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> Result<T, ChatError> {
        let response = self.http.post(self.url(method)).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ChatError::Api {
                status: status.as_u16(),
                message,
            });
        }
        let envelope: ApiEnvelope<T> = response.json().await?;
        if !envelope.ok {
            return Err(ChatError::InvalidResponse(
                envelope.description.unwrap_or_else(|| "response not ok".to_string()),
            ));
        }
        envelope
            .result
            .ok_or_else(|| ChatError::InvalidResponse("response carried no result".to_string()))
    }

    /// Fetch the next batch of updates, blocking up to the poll timeout
    pub async fn poll(&self) -> Result<Vec<(UserId, InboundEvent)>, ChatError> {
        let offset = self.next_offset.load(Ordering::SeqCst);
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                json!({
                    "timeout": self.poll_timeout_s,
                    "offset": offset,
                    "allowed_updates": ["message", "callback_query"],
                }),
            )
            .await?;

        let mut events = Vec::new();
        for update in updates {
            self.next_offset.store(update.update_id + 1, Ordering::SeqCst);
            if let Some(message) = update.message {
                if let Some(event) = self.convert_message(message).await {
                    events.push(event);
                }
            } else if let Some(callback) = update.callback_query {
                // Ack so the pressed button stops spinning
                if let Err(e) = self
                    .call::<bool>("answerCallbackQuery", json!({ "callback_query_id": callback.id }))
                    .await
                {
                    warn!(error = %e, "answerCallbackQuery failed");
                }
                if let Some(data) = callback.data {
                    events.push((UserId(callback.from.id), InboundEvent::Callback { data }));
                }
            }
        }
        debug!(count = events.len(), "Telegram::poll: updates converted");
        Ok(events)
    }

    async fn convert_message(&self, message: Message) -> Option<(UserId, InboundEvent)> {
        let user = UserId(message.from.as_ref()?.id);

        if let Some(sizes) = message.photo {
            let largest = sizes.iter().max_by_key(|s| u64::from(s.width) * u64::from(s.height))?;
            match self.download(&largest.file_id).await {
                Ok(data) => {
                    let variant = PhotoVariant {
                        width: largest.width,
                        height: largest.height,
                        data,
                        mime: "image/jpeg".to_string(),
                    };
                    return Some((
                        user,
                        InboundEvent::Photo(PhotoPayload {
                            variants: vec![variant],
                            caption: message.caption,
                        }),
                    ));
                }
                Err(e) => {
                    warn!(user = %user, error = %e, "photo download failed, update dropped");
                    return None;
                }
            }
        }

        let text = message.text?;
        let reply_to = message.reply_to_message.as_ref().map(|m| MessageId(m.message_id));
        Some((user, InboundEvent::Text { text, reply_to }))
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, ChatError> {
        let info: FileInfo = self.call("getFile", json!({ "file_id": file_id })).await?;
        let path = info
            .file_path
            .ok_or_else(|| ChatError::InvalidResponse("file has no path".to_string()))?;
        let url = format!("{}/file/bot{}/{}", self.base_url, self.token, path);

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Api {
                status: status.as_u16(),
                message: "file download failed".to_string(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ChatPort for Telegram {
    async fn send_text(&self, user: UserId, text: &str) -> Result<MessageId, ChatError> {
        let sent: SentMessage = self
            .call("sendMessage", json!({ "chat_id": user.0, "text": text }))
            .await?;
        Ok(MessageId(sent.message_id))
    }

    async fn send_choices(&self, user: UserId, text: &str, choices: &[Choice]) -> Result<MessageId, ChatError> {
        let keyboard: Vec<Vec<serde_json::Value>> = choices
            .chunks(2)
            .map(|row| {
                row.iter()
                    .map(|c| json!({ "text": c.label, "callback_data": c.data }))
                    .collect()
            })
            .collect();
        let sent: SentMessage = self
            .call(
                "sendMessage",
                json!({
                    "chat_id": user.0,
                    "text": text,
                    "reply_markup": { "inline_keyboard": keyboard },
                }),
            )
            .await?;
        Ok(MessageId(sent.message_id))
    }

    async fn send_status(&self, user: UserId) -> Result<(), ChatError> {
        self.call::<bool>("sendChatAction", json!({ "chat_id": user.0, "action": "typing" }))
            .await
            .map(|_| ())
    }
}
