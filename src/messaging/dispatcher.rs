use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::telegram::{MessageSender, NotificationError};
use super::templates::message_for;
use crate::domain::order::{ChannelRef, OrderNumber, OrderStatus};
use crate::metrics::Metrics;

/// Receives a status change after it has been persisted. Infallible by
/// contract: whatever goes wrong stays inside the notifier.
#[async_trait]
pub trait StatusNotifier: Send + Sync {
    async fn notify(&self, channel: &ChannelRef, order_number: &OrderNumber, status: OrderStatus);
}

/// Upper bound on one notification, so a stalled chat API cannot hold up the
/// status change that triggered it.
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

pub struct NotificationDispatcher {
    sender: Arc<dyn MessageSender>,
    metrics: Arc<Metrics>,
    send_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(sender: Arc<dyn MessageSender>, metrics: Arc<Metrics>) -> Self {
        Self {
            sender,
            metrics,
            send_timeout: SEND_TIMEOUT,
        }
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }
}

#[async_trait]
impl StatusNotifier for NotificationDispatcher {
    async fn notify(&self, channel: &ChannelRef, order_number: &OrderNumber, status: OrderStatus) {
        let text = message_for(order_number, status.as_str());

        let sent = tokio::time::timeout(self.send_timeout, self.sender.send(channel, &text))
            .await
            .unwrap_or(Err(NotificationError::Timeout(self.send_timeout)));

        match sent {
            Ok(()) => {
                tracing::info!(
                    order_number = %order_number,
                    status = %status,
                    chat_id = %channel.as_str(),
                    "Status notification sent"
                );
                self.metrics.record_notification(Ok(()));
            }
            Err(e) => {
                tracing::warn!(
                    order_number = %order_number,
                    status = %status,
                    chat_id = %channel.as_str(),
                    error = %e,
                    "Status notification failed"
                );
                self.metrics.record_notification(Err(e.reason()));
            }
        }

        self.metrics
            .update_circuit_breaker_state(self.sender.circuit_state().await);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct CapturingSender {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl MessageSender for CapturingSender {
        async fn send(&self, channel: &ChannelRef, text: &str) -> Result<(), NotificationError> {
            if self.fail {
                return Err(NotificationError::Rejected("chat not found".to_string()));
            }
            self.sent.lock().await.push((channel.0.clone(), text.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_renders_template() {
        let sender = Arc::new(CapturingSender::default());
        let metrics = Arc::new(Metrics::new().unwrap());
        let dispatcher = NotificationDispatcher::new(sender.clone(), metrics.clone());

        dispatcher
            .notify(&ChannelRef("777".to_string()), &OrderNumber("DK000001".to_string()), OrderStatus::Ready)
            .await;

        let sent = sender.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "777");
        assert!(sent[0].1.contains("Ready for Pickup"));
        assert_eq!(metrics.notifications_sent.get(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_swallowed_and_counted() {
        let sender = Arc::new(CapturingSender { fail: true, ..Default::default() });
        let metrics = Arc::new(Metrics::new().unwrap());
        let dispatcher = NotificationDispatcher::new(sender, metrics.clone());

        dispatcher
            .notify(&ChannelRef("777".to_string()), &OrderNumber("DK000002".to_string()), OrderStatus::Cancelled)
            .await;

        assert_eq!(metrics.notifications_failed.with_label_values(&["rejected"]).get(), 1);
        assert_eq!(metrics.notifications_sent.get(), 0);
    }

    /// Never answers.
    struct StalledSender;

    #[async_trait]
    impl MessageSender for StalledSender {
        async fn send(&self, _: &ChannelRef, _: &str) -> Result<(), NotificationError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_stalled_sender_times_out() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let dispatcher = NotificationDispatcher::new(Arc::new(StalledSender), metrics.clone())
            .with_send_timeout(Duration::from_millis(50));

        let channel = ChannelRef("777".to_string());
        let order_number = OrderNumber("DK000003".to_string());
        let notify = dispatcher.notify(
            &channel,
            &order_number,
            OrderStatus::Preparing,
        );
        tokio::time::timeout(Duration::from_secs(2), notify)
            .await
            .expect("notify should give up on its own");

        assert_eq!(metrics.notifications_failed.with_label_values(&["timeout"]).get(), 1);
        assert_eq!(metrics.notifications_sent.get(), 0);
    }
}
