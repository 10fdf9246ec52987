use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::domain::order::ChannelRef;
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};

// ============================================================================
// Telegram Transport
// ============================================================================
//
// Only failures of the Bot API itself count against the circuit breaker:
// transport errors, 5xx and 429. A per-chat rejection (blocked bot, unknown
// chat) is a healthy API answering and leaves the breaker alone.
//
// ============================================================================

const REQUEST_TIMEOUT: Duration = Duration::from_secs(4);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Telegram circuit breaker open")]
    CircuitOpen,

    #[error("Telegram request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Telegram API unavailable: HTTP {0}")]
    Unavailable(u16),

    #[error("Telegram rejected message: {0}")]
    Rejected(String),

    #[error("Telegram send timed out after {0:?}")]
    Timeout(Duration),
}

impl NotificationError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            NotificationError::CircuitOpen => "circuit_open",
            NotificationError::Transport(_) => "transport",
            NotificationError::Unavailable(_) => "unavailable",
            NotificationError::Rejected(_) => "rejected",
            NotificationError::Timeout(_) => "timeout",
        }
    }
}

/// Delivers a rendered text message to a chat.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, channel: &ChannelRef, text: &str) -> Result<(), NotificationError>;

    async fn circuit_state(&self) -> CircuitState {
        CircuitState::Closed
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

/// Bot API `sendMessage` over HTTPS.
pub struct TelegramClient {
    http: Client,
    send_url: String,
    circuit_breaker: CircuitBreaker,
}

impl TelegramClient {
    pub fn new(api_base: &str, bot_token: &str) -> Result<Self, NotificationError> {
        let cb_config = CircuitBreakerConfig {
            failure_threshold: 5,
            cool_down: Duration::from_secs(30),
            success_threshold: 2,
        };

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            send_url: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), bot_token),
            circuit_breaker: CircuitBreaker::new("telegram", cb_config),
        })
    }

    /// Outer error: the API is unhealthy. Inner error: this one message was
    /// refused.
    async fn post(&self, channel: &ChannelRef, text: &str) -> Result<Result<(), NotificationError>, NotificationError> {
        let response = self
            .http
            .post(&self.send_url)
            .json(&SendMessage { chat_id: channel.as_str(), text })
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(NotificationError::Unavailable(status.as_u16()));
        }

        let body: ApiResponse = response.json().await?;
        if body.ok {
            Ok(Ok(()))
        } else {
            Ok(Err(NotificationError::Rejected(body.description.unwrap_or_default())))
        }
    }
}

#[async_trait]
impl MessageSender for TelegramClient {
    async fn send(&self, channel: &ChannelRef, text: &str) -> Result<(), NotificationError> {
        match self.circuit_breaker.call(self.post(channel, text)).await {
            Ok(Ok(())) => {
                tracing::debug!(chat_id = %channel.as_str(), "Sent Telegram message");
                Ok(())
            }
            Ok(Err(rejected)) => Err(rejected),
            Err(CircuitBreakerError::CircuitOpen) => Err(NotificationError::CircuitOpen),
            Err(CircuitBreakerError::OperationFailed(e)) => Err(e),
        }
    }

    async fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state().await
    }
}

/// Used when no bot token is configured: the message goes to the log only.
pub struct LogOnlySender;

#[async_trait]
impl MessageSender for LogOnlySender {
    async fn send(&self, channel: &ChannelRef, text: &str) -> Result<(), NotificationError> {
        tracing::info!(chat_id = %channel.as_str(), message = %text, "Telegram disabled, notification logged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{web, App, HttpResponse, HttpServer};
    use serde_json::json;

    /// Local stand-in for the Bot API; the bot token picks the behavior.
    async fn fake_send_message(path: web::Path<String>) -> HttpResponse {
        match path.as_str() {
            "botrejecting" => HttpResponse::BadRequest()
                .json(json!({ "ok": false, "error_code": 400, "description": "Bad Request: chat not found" })),
            "botthrottled" => HttpResponse::TooManyRequests()
                .json(json!({ "ok": false, "error_code": 429, "description": "Too Many Requests: retry after 5" })),
            "botbroken" => HttpResponse::BadGateway().finish(),
            _ => HttpResponse::Ok().json(json!({ "ok": true, "result": {} })),
        }
    }

    fn fake_bot_api() -> String {
        let server = HttpServer::new(|| App::new().route("/{bot}/sendMessage", web::post().to(fake_send_message)))
            .workers(1)
            .bind(("127.0.0.1", 0))
            .unwrap();
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        format!("http://{addr}")
    }

    #[actix_web::test]
    async fn test_chat_rejections_leave_circuit_closed() {
        let client = TelegramClient::new(&fake_bot_api(), "rejecting").unwrap();
        let channel = ChannelRef("42".to_string());

        for _ in 0..10 {
            let err = client.send(&channel, "hi").await.unwrap_err();
            assert_eq!(err.reason(), "rejected");
            assert!(err.to_string().contains("chat not found"));
        }
        assert_eq!(client.circuit_state().await, CircuitState::Closed);
    }

    #[actix_web::test]
    async fn test_throttling_and_server_errors_open_circuit() {
        let base = fake_bot_api();
        let channel = ChannelRef("42".to_string());

        let throttled = TelegramClient::new(&base, "throttled").unwrap();
        for _ in 0..5 {
            let err = throttled.send(&channel, "hi").await.unwrap_err();
            assert!(matches!(err, NotificationError::Unavailable(429)));
        }
        assert_eq!(throttled.circuit_state().await, CircuitState::Open);

        let broken = TelegramClient::new(&base, "broken").unwrap();
        for _ in 0..5 {
            let err = broken.send(&channel, "hi").await.unwrap_err();
            assert!(matches!(err, NotificationError::Unavailable(502)));
        }
        assert_eq!(broken.circuit_state().await, CircuitState::Open);
    }

    #[actix_web::test]
    async fn test_successful_send() {
        let client = TelegramClient::new(&fake_bot_api(), "healthy").unwrap();
        client.send(&ChannelRef("42".to_string()), "hi").await.unwrap();
        assert_eq!(client.circuit_state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_unreachable_api_opens_circuit() {
        // Port 9 (discard) on localhost refuses connections.
        let client = TelegramClient::new("http://127.0.0.1:9/", "token").unwrap();
        assert_eq!(client.send_url, "http://127.0.0.1:9/bottoken/sendMessage");

        let channel = ChannelRef("42".to_string());
        for _ in 0..5 {
            let err = client.send(&channel, "hi").await.unwrap_err();
            assert!(matches!(err, NotificationError::Transport(_)));
        }

        assert_eq!(client.circuit_state().await, CircuitState::Open);
        let err = client.send(&channel, "hi").await.unwrap_err();
        assert_eq!(err.reason(), "circuit_open");
    }

    #[tokio::test]
    async fn test_log_only_sender_succeeds() {
        let result = LogOnlySender.send(&ChannelRef("42".to_string()), "hello").await;
        assert!(result.is_ok());
    }
}
