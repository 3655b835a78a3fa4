pub mod histogram;
pub mod summary;

pub use histogram::{outlier_aware_histogram, Histogram, OutlierFold};
pub use summary::{
    collection_names, daily_volume, dataset_counts, top_collections, top_counterparties,
    trades_per_day, CollectionVolume, CounterpartyActivity, DailyCount, DailyVolume,
    DatasetCounts,
};
