pub mod bucketer;
pub mod kmeans;
pub mod profit;
pub mod sequencer;

pub use bucketer::{bucket_returns, BucketFailure, BucketingOutcome};
pub use kmeans::{kmeans, ClusterConfig, KMeansFit};
pub use profit::{asset_profits, calculate_profits, ProfitOutcome};
pub use sequencer::{build_sequence, group_by_asset, sequence_trades, SequencedBatch};
