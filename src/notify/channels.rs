//! Notification channel implementations

use anyhow::{anyhow, Result};
use serde_json::json;
use crate::types::OpportunitySnapshot;

/// A configured delivery target. Telegram and Discord get a formatted text
/// message; the generic webhook gets the raw snapshot JSON.
#[derive(Debug, Clone)]
pub enum NotifyChannel {
    Telegram {
        api_base: String,
        token: String,
        chat_id: String,
    },
    Discord {
        webhook_url: String,
    },
    Webhook {
        url: String,
    },
}

impl NotifyChannel {
    pub fn name(&self) -> &'static str {
        match self {
            NotifyChannel::Telegram { .. } => "telegram",
            NotifyChannel::Discord { .. } => "discord",
            NotifyChannel::Webhook { .. } => "webhook",
        }
    }

    pub async fn deliver(
        &self,
        client: &reqwest::Client,
        snapshot: &OpportunitySnapshot,
    ) -> Result<()> {
        let response = match self {
            NotifyChannel::Telegram {
                api_base,
                token,
                chat_id,
            } => {
                let url = format!("{api_base}/bot{token}/sendMessage");
                client
                    .post(&url)
                    .json(&json!({
                        "chat_id": chat_id,
                        "text": format_message(snapshot),
                    }))
                    .send()
                    .await?
            }
            NotifyChannel::Discord { webhook_url } => {
                client
                    .post(webhook_url)
                    .json(&json!({ "content": format_message(snapshot) }))
                    .send()
                    .await?
            }
            NotifyChannel::Webhook { url } => client.post(url).json(snapshot).send().await?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("{} returned {status}: {body}", self.name()));
        }
        Ok(())
    }
}

/// Human-readable alert text shared by the chat channels.
pub fn format_message(snapshot: &OpportunitySnapshot) -> String {
    format!(
        "💰 Arbitrage opportunity: {}\n\
         Buy on {} at {} {}\n\
         Sell on {} at {} {}\n\
         Net profit: {:.2} ({:.1}% margin)\n\
         Risk score: {:.2}\n\
         Expires: {}",
        snapshot.product_name,
        snapshot.source_marketplace,
        snapshot.source_price.amount,
        snapshot.source_price.currency,
        snapshot.target_marketplace,
        snapshot.target_price.amount,
        snapshot.target_price.currency,
        snapshot.absolute_profit,
        snapshot.profit_margin,
        snapshot.risk_score,
        snapshot.expires_at.format("%Y-%m-%d %H:%M UTC"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PriceTag;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    pub(super) fn snapshot() -> OpportunitySnapshot {
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

    #[test]
    fn message_names_both_sides() {
        let text = format_message(&snapshot());
        assert!(text.contains("Buy on GOG at 30 EUR"));
        assert!(text.contains("Sell on Steam at 50 EUR"));
        assert!(text.contains("66.7% margin"));
    }

    #[tokio::test]
    async fn telegram_delivery_hits_send_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bottoken123/sendMessage")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let channel = NotifyChannel::Telegram {
            api_base: server.url(),
            token: "token123".to_string(),
            chat_id: "42".to_string(),
        };
        let client = reqwest::Client::new();
        channel.deliver(&client, &snapshot()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn webhook_posts_snapshot_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"id":"op-1","product_name":"Elden Ring"}"#.to_string(),
            ))
            .with_status(204)
            .create_async()
            .await;

        let channel = NotifyChannel::Webhook {
            url: format!("{}/hook", server.url()),
        };
        let client = reqwest::Client::new();
        channel.deliver(&client, &snapshot()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hook")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let channel = NotifyChannel::Webhook {
            url: format!("{}/hook", server.url()),
        };
        let client = reqwest::Client::new();
        let err = channel.deliver(&client, &snapshot()).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
