pub mod bucket;
pub mod profit;
pub mod raw;
pub mod trade;

pub use bucket::{ClusterLabel, ClusterSummary, ClusteredEvent, ReturnBucket};
pub use profit::ProfitEvent;
pub use raw::{Column, RawTradeRow};
pub use trade::{AssetFailure, SequencedTrade, TradeRecord, TradeSequence};

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Denomination used when reading a price or return off a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Eth,
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Eth => "eth",
            Currency::Usd => "usd",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "eth" => Some(Currency::Eth),
            "usd" => Some(Currency::Usd),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
