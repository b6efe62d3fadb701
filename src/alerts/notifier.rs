//! Alert delivery
//!
//! Telegram Bot API `sendMessage` in production, a log sink when no bot token
//! is configured. Delivery is attempted once; the cooldown already taken for
//! the alert prevents an immediate re-send.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::detector::AlertKind;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Timeout for Bot API calls
const API_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { message_id: Option<i64> },
    /// Not delivered and not worth retrying
    Suppressed {
        reason: String,
        /// The recipient blocked us; the chat link should be removed
        unlink_recipient: bool,
    },
    Failed { reason: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    pub fn message_id(&self) -> Option<i64> {
        match self {
            DeliveryOutcome::Delivered { message_id } => *message_id,
            _ => None,
        }
    }

    pub fn error_text(&self) -> Option<&str> {
        match self {
            DeliveryOutcome::Delivered { .. } => None,
            DeliveryOutcome::Suppressed { reason, .. } | DeliveryOutcome::Failed { reason } => {
                Some(reason)
            }
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// `recipient` is the linked chat; `None` means the owner never linked one
    async fn send_alert(&self, recipient: Option<&str>, kind: AlertKind, message: &str) -> DeliveryOutcome;
}

// ============================================
// TELEGRAM
// ============================================

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    result: Option<SentMessage>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

pub struct TelegramNotifier {
    http_client: Client,
    api_url: String,
    bot_token: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>) -> eyre::Result<Self> {
        Self::with_api_url(bot_token, TELEGRAM_API_URL)
    }

    /// Point at a different Bot API host
    pub fn with_api_url(bot_token: impl Into<String>, api_url: impl Into<String>) -> eyre::Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token)
    }
}

/// Map a Bot API HTTP status to an outcome
fn classify_status(status: StatusCode, chat_id: &str, description: Option<String>) -> DeliveryOutcome {
    let detail = description.unwrap_or_else(|| status.to_string());
    match status {
        StatusCode::FORBIDDEN => {
            info!("Chat {} blocked the bot", chat_id);
            DeliveryOutcome::Suppressed {
                reason: format!("blocked by user: {}", detail),
                unlink_recipient: true,
            }
        }
        StatusCode::BAD_REQUEST => {
            info!("Chat {} not found", chat_id);
            DeliveryOutcome::Suppressed {
                reason: format!("chat not found: {}", detail),
                unlink_recipient: false,
            }
        }
        _ => DeliveryOutcome::Failed {
            reason: format!("telegram error {}: {}", status.as_u16(), detail),
        },
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_alert(&self, recipient: Option<&str>, kind: AlertKind, message: &str) -> DeliveryOutcome {
        let Some(chat_id) = recipient else {
            debug!("No linked chat for {} alert", kind);
            return DeliveryOutcome::Suppressed {
                reason: "no telegram chat linked".to_string(),
                unlink_recipient: false,
            };
        };

        let request = SendMessageRequest {
            chat_id,
            text: message,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        let response = match self.http_client.post(self.endpoint()).json(&request).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Telegram send failed: {}", e);
                return DeliveryOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let status = response.status();
        let body: Option<TelegramResponse> = response.json().await.ok();

        if !status.is_success() {
            let outcome = classify_status(status, chat_id, body.and_then(|b| b.description));
            if let DeliveryOutcome::Failed { reason } = &outcome {
                error!("Telegram rejected {} alert: {}", kind, reason);
            }
            return outcome;
        }

        match body {
            Some(TelegramResponse { ok: true, result, .. }) => {
                info!("📨 {} alert sent to chat {}", kind, chat_id);
                DeliveryOutcome::Delivered {
                    message_id: result.map(|m| m.message_id),
                }
            }
            Some(TelegramResponse { description, .. }) => DeliveryOutcome::Failed {
                reason: description.unwrap_or_else(|| "telegram returned ok=false".to_string()),
            },
            None => {
                warn!("Unreadable Telegram response for {} alert", kind);
                DeliveryOutcome::Delivered { message_id: None }
            }
        }
    }
}

// ============================================
// LOG SINK
// ============================================

/// Writes alerts to the log instead of sending them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_alert(&self, recipient: Option<&str>, kind: AlertKind, message: &str) -> DeliveryOutcome {
        info!(
            "🔔 [{}] to {}: {}",
            kind,
            recipient.unwrap_or("<unlinked>"),
            message.lines().next().unwrap_or_default()
        );
        DeliveryOutcome::Delivered { message_id: None }
    }
}

/// Keeps every alert and answers with a fixed outcome
#[cfg(test)]
pub struct RecordingNotifier {
    pub outcome: DeliveryOutcome,
    sent: std::sync::Mutex<Vec<(Option<String>, AlertKind, String)>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::answering(DeliveryOutcome::Delivered { message_id: Some(1) })
    }

    pub fn answering(outcome: DeliveryOutcome) -> Self {
        Self {
            outcome,
            sent: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<(Option<String>, AlertKind, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<AlertKind> {
        self.sent().into_iter().map(|(_, kind, _)| kind).collect()
    }
}

#[cfg(test)]
#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_alert(&self, recipient: Option<&str>, kind: AlertKind, message: &str) -> DeliveryOutcome {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.map(str::to_string), kind, message.to_string()));
        self.outcome.clone()
    }
}
