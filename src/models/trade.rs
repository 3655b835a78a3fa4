use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A validated marketplace purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// `<collection>_<token_id>`
    pub asset_id: String,
    pub collection: String,
    pub token_id: String,
    pub timestamp: DateTime<Utc>,
    pub price_eth: Decimal,
    pub price_usd: Decimal,
    /// Buyer address.
    pub counterparty: String,
    pub txn_hash: String,
}

impl TradeRecord {
    pub fn asset_id_for(collection: &str, token_id: &str) -> String {
        format!("{collection}_{token_id}")
    }

    /// UTC calendar day of the trade.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// A trade with its 1-based position in the asset's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedTrade {
    pub trade_no: u32,
    pub record: TradeRecord,
}

/// Chronological trade history of one asset.
///
/// Only the sequencer builds these; once built the order is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeSequence {
    asset_id: String,
    trades: Vec<SequencedTrade>,
}

impl TradeSequence {
    /// Caller guarantees `records` are sorted ascending by timestamp.
    pub(crate) fn from_sorted(asset_id: String, records: Vec<TradeRecord>) -> Self {
        let trades = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| SequencedTrade {
                trade_no: i as u32 + 1,
                record,
            })
            .collect();
        Self { asset_id, trades }
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn trades(&self) -> &[SequencedTrade] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Adjacent `(purchase, sale)` pairs, never crossing into another asset.
    pub fn pairs(&self) -> impl Iterator<Item = (&SequencedTrade, &SequencedTrade)> {
        self.trades.windows(2).map(|w| (&w[0], &w[1]))
    }
}

/// An asset whose sequence or events were aborted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetFailure {
    pub asset_id: String,
    pub stage: &'static str,
    pub reason: String,
}
