//! Fee and net profit calculation

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::warn;
use crate::store::PriceStore;
use crate::types::{FeeBreakdown, FeeQuote, MarketplaceId, ProfitBreakdown, TransactionFee};

pub struct FeeModel {
    store: Arc<dyn PriceStore>,
}

impl FeeModel {
    pub fn new(store: Arc<dyn PriceStore>) -> Self {
        Self { store }
    }

    /// Fees owed on `price` at a marketplace. Marketplaces without a fee
    /// schedule (or unknown ids) contribute zero.
    pub fn calculate_fees(&self, marketplace_id: MarketplaceId, price: Decimal) -> FeeQuote {
        let schedule = match self.store.marketplace(marketplace_id) {
            Ok(marketplace) => marketplace.and_then(|m| m.fees),
            Err(e) => {
                warn!("Fee schedule lookup failed for marketplace {marketplace_id}: {e}");
                None
            }
        };

        let Some(schedule) = schedule else {
            return FeeQuote {
                total: Decimal::ZERO,
                breakdown: FeeBreakdown::default(),
            };
        };

        let mut breakdown = FeeBreakdown::default();

        if let Some(pct) = schedule.platform_fee {
            breakdown.platform_fee = Some(price * pct / dec!(100));
        }
        if let Some(transaction_fee) = &schedule.transaction_fee {
            breakdown.transaction_fee = Some(match transaction_fee {
                TransactionFee::Fixed(amount) => *amount,
                TransactionFee::Percentage(pct) => price * pct / dec!(100),
            });
        }
        if let Some(pct) = schedule.payment_fee {
            breakdown.payment_fee = Some(price * pct / dec!(100));
        }

        FeeQuote {
            total: breakdown.total(),
            breakdown,
        }
    }

    /// Net profit for a buy/sell pair after fees on both sides. Buy fees
    /// come from the buy marketplace and sell fees from the sell
    /// marketplace.
    pub fn calculate_net_profit(
        &self,
        buy_price: Decimal,
        sell_price: Decimal,
        buy_marketplace_id: MarketplaceId,
        sell_marketplace_id: MarketplaceId,
    ) -> ProfitBreakdown {
        let buy_fees = self.calculate_fees(buy_marketplace_id, buy_price);
        let sell_fees = self.calculate_fees(sell_marketplace_id, sell_price);

        let gross_profit = sell_price - buy_price;
        let total_fees = buy_fees.total + sell_fees.total;

        ProfitBreakdown {
            gross_profit,
            total_fees,
            net_profit: gross_profit - total_fees,
            buy_fees: buy_fees.breakdown,
            sell_fees: sell_fees.breakdown,
        }
    }
}
