use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Currency;

/// One purchase-then-sale pair of an asset and its realized log return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitEvent {
    pub asset_id: String,
    /// Position of the purchase within the asset's sequence (starts at 1).
    pub trade_no: u32,
    pub purchase_date: DateTime<Utc>,
    pub sell_date: DateTime<Utc>,
    #[serde(with = "duration_secs")]
    pub holding_period: Duration,
    pub purchase_price_eth: Decimal,
    pub sell_price_eth: Decimal,
    pub profit_eth: f64,
    pub purchase_price_usd: Decimal,
    pub sell_price_usd: Decimal,
    pub profit_usd: f64,
    pub collection: String,
    pub from_address: String,
    pub to_address: String,
    pub purchase_hash: String,
    pub sell_hash: String,
}

impl ProfitEvent {
    pub fn purchase_price(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::Eth => self.purchase_price_eth,
            Currency::Usd => self.purchase_price_usd,
        }
    }

    pub fn sell_price(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::Eth => self.sell_price_eth,
            Currency::Usd => self.sell_price_usd,
        }
    }

    pub fn profit(&self, currency: Currency) -> f64 {
        match currency {
            Currency::Eth => self.profit_eth,
            Currency::Usd => self.profit_usd,
        }
    }

    pub fn holding_days(&self) -> i64 {
        self.holding_period.num_days()
    }
}

/// Holding periods travel as whole seconds.
mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(d)?;
        Ok(Duration::seconds(secs))
    }
}
