use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::models::Currency;

/// Failures raised by the trade-sequencing and return-computation core.
///
/// `MalformedPrice` is a data-quality issue: the normalizer drops the row and
/// counts it. Every other variant signals a broken upstream contract and
/// aborts the affected asset or bucket.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("malformed price string: {0:?}")]
    MalformedPrice(String),

    #[error("ambiguous order for asset {asset_id}: duplicate timestamp {timestamp}")]
    AmbiguousOrder {
        asset_id: String,
        timestamp: DateTime<Utc>,
    },

    #[error("invariant violated for asset {asset_id} trade {trade_no}: negative holding period {holding_period}")]
    InvariantViolation {
        asset_id: String,
        trade_no: u32,
        holding_period: Duration,
    },

    #[error("non-positive {currency} price {price} for asset {asset_id} trade {trade_no}")]
    DivisionDomain {
        asset_id: String,
        trade_no: u32,
        currency: Currency,
        price: Decimal,
    },

    #[error("bucket boundaries must not be empty")]
    EmptyBoundaries,

    #[error("bucket boundaries must be positive and strictly increasing: {0:?}")]
    NonMonotonicBoundaries(Vec<Decimal>),

    #[error("cluster count must be between 1 and 65536")]
    InvalidClusterCount,

    #[error("clustering failed: {0}")]
    Clustering(String),

    #[error("invalid histogram: {0}")]
    InvalidHistogram(String),
}

/// Failures loading raw exporter files.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),
}
