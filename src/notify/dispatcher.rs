//! Concurrent notification fan-out

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use crate::config::Config;
use crate::notify::{retry_with_backoff, NotifyChannel, RetryConfig};
use crate::store::PriceStore;
use crate::types::{NotificationRecord, NotificationStatus, OpportunitySnapshot};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Fans one opportunity out to every configured channel concurrently.
/// Channel failures are isolated: each one is logged and recorded, and
/// never blocks the other channels or the detection loop.
pub struct NotificationDispatcher {
    store: Arc<dyn PriceStore>,
    channels: Vec<NotifyChannel>,
    client: reqwest::Client,
    retry: RetryConfig,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn PriceStore>, channels: Vec<NotifyChannel>) -> Self {
        Self {
            store,
            channels,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            retry: RetryConfig::default(),
        }
    }

    pub fn from_config(store: Arc<dyn PriceStore>, config: &Config) -> Self {
        let mut channels = Vec::new();

        if config.telegram_enabled {
            match (&config.telegram_bot_token, &config.telegram_chat_id) {
                (Some(token), Some(chat_id)) => channels.push(NotifyChannel::Telegram {
                    api_base: TELEGRAM_API_BASE.to_string(),
                    token: token.clone(),
                    chat_id: chat_id.clone(),
                }),
                _ => warn!("Telegram enabled but token/chat id missing, skipping channel"),
            }
        }
        if config.discord_enabled {
            match &config.discord_webhook_url {
                Some(url) => channels.push(NotifyChannel::Discord {
                    webhook_url: url.clone(),
                }),
                None => warn!("Discord enabled but webhook URL missing, skipping channel"),
            }
        }
        if config.webhook_enabled {
            match &config.webhook_url {
                Some(url) => channels.push(NotifyChannel::Webhook { url: url.clone() }),
                None => warn!("Webhook enabled but URL missing, skipping channel"),
            }
        }

        if !channels.is_empty() {
            info!(
                "📣 Notifications enabled on: {}",
                channels.iter().map(|c| c.name()).collect::<Vec<_>>().join(", ")
            );
        }
        Self::new(store, channels)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Returns the number of channels that confirmed delivery.
    pub async fn dispatch(&self, snapshot: &OpportunitySnapshot) -> usize {
        if self.channels.is_empty() {
            return 0;
        }

        let mut handles = Vec::with_capacity(self.channels.len());
        for channel in self.channels.iter().cloned() {
            let client = self.client.clone();
            let retry = self.retry.clone();
            let snapshot = snapshot.clone();
            handles.push(tokio::spawn(async move {
                let name = channel.name();
                let result = retry_with_backoff(
                    || channel.deliver(&client, &snapshot),
                    &retry,
                    name,
                )
                .await;

                match result {
                    Ok(()) => {
                        info!("✉️  Sent {} alert for opportunity {}", name, snapshot.id);
                        NotificationRecord {
                            opportunity_id: snapshot.id.clone(),
                            channel: name.to_string(),
                            status: NotificationStatus::Sent,
                            error_message: None,
                            sent_at: Utc::now(),
                        }
                    }
                    Err(e) => {
                        error!(
                            "Notification via {} failed for opportunity {}: {}",
                            name, snapshot.id, e
                        );
                        NotificationRecord {
                            opportunity_id: snapshot.id.clone(),
                            channel: name.to_string(),
                            status: NotificationStatus::Failed,
                            error_message: Some(e.to_string()),
                            sent_at: Utc::now(),
                        }
                    }
                }
            }));
        }

        let mut delivered = 0;
        for handle in handles {
            match handle.await {
                Ok(record) => {
                    if record.status == NotificationStatus::Sent {
                        delivered += 1;
                    }
                    if let Err(e) = self.store.record_notification(record) {
                        warn!("Failed to record notification outcome: {e}");
                    }
                }
                Err(e) => error!("Notification task panicked: {e}"),
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::PriceTag;
    use rust_decimal_macros::dec;

    fn snapshot() -> OpportunitySnapshot {
        OpportunitySnapshot {
            id: "op-1".to_string(),
            product_name: "Elden Ring".to_string(),
            profit_margin: dec!(66.7),
            absolute_profit: dec!(20),
            risk_score: 0.47,
            source_marketplace: "GOG".to_string(),
            target_marketplace: "Steam".to_string(),
            source_price: PriceTag {
                amount: dec!(30),
                currency: "EUR".to_string(),
            },
            target_price: PriceTag {
                amount: dec!(50),
                currency: "EUR".to_string(),
            },
            detected_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::hours(72),
            fee_breakdown: Default::default(),
        }
    }

    #[tokio::test]
    async fn one_failing_channel_does_not_block_the_other() {
        let mut server = mockito::Server::new_async().await;
        let good = server
            .mock("POST", "/good")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        let bad = server
            .mock("POST", "/bad")
            .with_status(500)
            .expect_at_least(1)
            .create_async()
            .await;

        let store = Arc::new(MemoryStore::new());
        let dispatcher = NotificationDispatcher {
            store: store.clone(),
            channels: vec![
                NotifyChannel::Webhook {
                    url: format!("{}/bad", server.url()),
                },
                NotifyChannel::Webhook {
                    url: format!("{}/good", server.url()),
                },
            ],
            client: reqwest::Client::new(),
            retry: RetryConfig {
                max_attempts: 1,
                initial_delay_ms: 1,
                max_delay_ms: 1,
                exponential_base: 2.0,
            },
        };

        let delivered = dispatcher.dispatch(&snapshot()).await;
        assert_eq!(delivered, 1);

        good.assert_async().await;
        bad.assert_async().await;

        let records = store.notifications();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.opportunity_id == "op-1"));
        assert!(records.iter().any(|r| r.status == NotificationStatus::Sent));
        assert!(records.iter().any(|r| r.status == NotificationStatus::Failed));
    }

    #[tokio::test]
    async fn no_channels_is_a_quiet_noop() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = NotificationDispatcher::new(store.clone(), Vec::new());
        assert_eq!(dispatcher.dispatch(&snapshot()).await, 0);
        assert!(store.notifications().is_empty());
    }
}
