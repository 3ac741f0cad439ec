//! Telegram relay channel.
//!
//! Sends the agent's message to every authorized user through the Bot API
//! and waits for the first text reply from one of them. The transport sits
//! behind [`RelayTransport`] so polling, authorization and timeouts can be
//! exercised without the network.

use async_trait::async_trait;
use contreact_config::{TELEGRAM_TOKEN_ENV, TelegramConfig};
use contreact_core::channel::OperatorChannel;
use contreact_core::error::ChannelError;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Delay between two polls for updates.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

const API_BASE: &str = "https://api.telegram.org";

/// An incoming message as seen by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayUpdate {
    pub update_id: i64,
    pub sender_id: Option<i64>,
    pub text: Option<String>,
}

/// The bot-messaging operations the relay needs.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Liveness check; returns the bot's display name.
    async fn get_me(&self) -> Result<String, ChannelError>;

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), ChannelError>;

    /// Updates after `offset` (exclusive of those already confirmed),
    /// long-polling up to `timeout_secs`.
    async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<RelayUpdate>, ChannelError>;
}

/// [`RelayTransport`] over the Telegram Bot HTTP API.
pub struct TelegramBotApi {
    base_url: String,
    client: reqwest::Client,
}

impl TelegramBotApi {
    /// `poll_timeout_secs` is added to the HTTP timeout so long polls are not cut short.
    pub fn new(bot_token: &str, poll_timeout_secs: u64) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 10))
            .build()
            .map_err(|e| ChannelError::Configuration(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            base_url: format!("{API_BASE}/bot{bot_token}"),
            client,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, ChannelError> {
        let url = format!("{}/{method}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Connection(format!("{method}: {}", e.without_url())))?;

        let status = response.status().as_u16();
        let api: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ChannelError::Connection(format!("{method}: invalid response (status {status}): {e}")))?;

        match (api.ok, api.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(ChannelError::Connection(format!(
                "{method} failed (status {status}): {}",
                api.description.unwrap_or_else(|| "no description".into())
            ))),
        }
    }
}

#[async_trait]
impl RelayTransport for TelegramBotApi {
    async fn get_me(&self) -> Result<String, ChannelError> {
        let user: ApiUser = self.call("getMe", serde_json::json!({})).await?;
        Ok(user.first_name)
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), ChannelError> {
        let _: serde_json::Value = self
            .call("sendMessage", serde_json::json!({ "chat_id": chat_id, "text": text }))
            .await?;
        Ok(())
    }

    async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<RelayUpdate>, ChannelError> {
        let mut body = serde_json::json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            body["offset"] = serde_json::json!(offset);
        }
        let updates: Vec<ApiUpdate> = self.call("getUpdates", body).await?;
        Ok(updates.into_iter().map(ApiUpdate::into_relay).collect())
    }
}

/// Relay settings, taken from `[operator.telegram]`.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub authorized_users: Vec<i64>,
    /// Zero or negative waits forever
    pub timeout_minutes: i64,
    pub poll_timeout_secs: u64,
}

impl From<&TelegramConfig> for RelaySettings {
    fn from(config: &TelegramConfig) -> Self {
        Self {
            authorized_users: config.authorized_users.clone(),
            timeout_minutes: config.timeout_minutes,
            poll_timeout_secs: config.poll_timeout_secs,
        }
    }
}

/// Telegram operator channel.
pub struct TelegramChannel {
    transport: Arc<dyn RelayTransport>,
    settings: RelaySettings,
    /// Highest update id already seen
    last_update_id: Mutex<Option<i64>>,
}

impl std::fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramChannel")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl TelegramChannel {
    /// Build the relay from configuration and check it is reachable.
    ///
    /// Fails with a configuration error when the bot token is missing and
    /// with a connection error when the bot does not answer.
    pub async fn from_config(config: &TelegramConfig) -> Result<Self, ChannelError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            ChannelError::Configuration(format!(
                "{TELEGRAM_TOKEN_ENV} environment variable is required for the Telegram channel"
            ))
        })?;
        let api = TelegramBotApi::new(token, config.poll_timeout_secs)?;
        Self::connect(Arc::new(api), RelaySettings::from(config)).await
    }

    /// Wrap `transport` and run the liveness check.
    pub async fn connect(transport: Arc<dyn RelayTransport>, settings: RelaySettings) -> Result<Self, ChannelError> {
        if settings.authorized_users.is_empty() {
            return Err(ChannelError::Configuration(
                "Telegram channel needs at least one authorized user".into(),
            ));
        }

        match transport.get_me().await {
            Ok(bot) => info!(bot = %bot, users = settings.authorized_users.len(), "Telegram relay connected"),
            Err(e) => {
                error!(error = %e, "Telegram connection check failed");
                return Err(ChannelError::Connection(format!("Telegram connection check failed: {e}")));
            }
        }

        Ok(Self {
            transport,
            settings,
            last_update_id: Mutex::new(None),
        })
    }

    fn format_message(message: &str, run_id: &str, cycle_number: u32) -> String {
        format!(
            "\u{1F916} Agent Message (Run: {run_id}, Cycle: {cycle_number})\n{}\n{message}",
            "\u{2501}".repeat(32)
        )
    }

    fn is_authorized(&self, user_id: i64) -> bool {
        self.settings.authorized_users.contains(&user_id)
    }

    /// Send to every authorized user; succeed if at least one got it.
    async fn broadcast(&self, text: &str) -> Result<usize, ChannelError> {
        let mut delivered = 0;
        let mut errors = Vec::new();
        for &user_id in &self.settings.authorized_users {
            match self.transport.send_message(user_id, text).await {
                Ok(()) => {
                    delivered += 1;
                    debug!(user_id, "Delivered operator message");
                }
                Err(e) => {
                    error!(user_id, error = %e, "Failed to deliver operator message");
                    errors.push(
                        ChannelError::DeliveryFailed {
                            recipient: user_id.to_string(),
                            reason: e.to_string(),
                        }
                        .to_string(),
                    );
                }
            }
        }

        match (delivered, errors.is_empty()) {
            (0, false) => Err(ChannelError::Connection(format!(
                "Failed to send message to any authorized user: {}",
                errors.join("; ")
            ))),
            (0, true) => Err(ChannelError::Configuration("No authorized users configured".into())),
            (n, _) => Ok(n),
        }
    }

    /// Poll until an authorized user sends text.
    async fn poll_for_reply(&self) -> Result<String, ChannelError> {
        let mut cursor = self.last_update_id.lock().await;
        loop {
            let offset = cursor.map(|id| id + 1);
            let updates = self
                .transport
                .get_updates(offset, self.settings.poll_timeout_secs)
                .await?;

            for update in updates {
                if cursor.is_none_or(|last| update.update_id > last) {
                    *cursor = Some(update.update_id);
                } else {
                    continue;
                }

                let (Some(sender), Some(text)) = (update.sender_id, update.text) else {
                    continue;
                };
                if self.is_authorized(sender) {
                    info!(user_id = sender, "Received operator reply via Telegram");
                    return Ok(text);
                }
                warn!(user_id = sender, "Rejected message from unauthorized Telegram user");
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl OperatorChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_and_wait(
        &self,
        message: &str,
        run_id: &str,
        cycle_number: u32,
    ) -> Result<String, ChannelError> {
        let text = Self::format_message(message, run_id, cycle_number);
        let delivered = self.broadcast(&text).await?;
        info!(run_id = %run_id, cycle = cycle_number, delivered, "Waiting for operator reply via Telegram");

        let minutes = self.settings.timeout_minutes;
        let Some(limit) = reply_limit(minutes) else {
            return self.poll_for_reply().await;
        };

        match tokio::time::timeout(limit, self.poll_for_reply()).await {
            Ok(reply) => reply,
            Err(_) => {
                warn!(minutes, "Timed out waiting for Telegram reply");
                Err(ChannelError::Timeout { minutes })
            }
        }
    }
}

/// How long to wait for a reply; `None` waits indefinitely.
fn reply_limit(minutes: i64) -> Option<Duration> {
    (minutes > 0).then(|| Duration::from_secs(minutes.unsigned_abs().saturating_mul(60)))
}

// --- Bot API types ---

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: i64,
    #[serde(default)]
    first_name: String,
}

#[derive(Debug, Deserialize)]
struct ApiUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    from: Option<ApiUser>,
    #[serde(default)]
    text: Option<String>,
}

impl ApiUpdate {
    fn into_relay(self) -> RelayUpdate {
        let (sender_id, text) = match self.message {
            Some(m) => (m.from.map(|u| u.id), m.text),
            None => (None, None),
        };
        RelayUpdate {
            update_id: self.update_id,
            sender_id,
            text,
        }
    }
}
