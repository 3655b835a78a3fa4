use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use uuid::Uuid;

use crate::analytics::bucketer::{bucket_returns, validate_boundaries, BucketFailure};
use crate::analytics::kmeans::ClusterConfig;
use crate::analytics::profit::calculate_profits;
use crate::analytics::sequencer::sequence_trades;
use crate::errors::PipelineError;
use crate::ingestion::normalizer::{normalize, NormalizationReport, NormalizerConfig};
use crate::metrics::{record_normalization, record_stage};
use crate::models::{
    AssetFailure, Currency, ProfitEvent, RawTradeRow, ReturnBucket, TradeSequence,
};
use crate::reporting::{
    collection_names, daily_volume, dataset_counts, outlier_aware_histogram, top_collections,
    top_counterparties, trades_per_day, CollectionVolume, CounterpartyActivity, DailyCount,
    DailyVolume, DatasetCounts, Histogram,
};

/// Everything the core needs, passed in explicitly.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub normalizer: NormalizerConfig,
    pub currency: Currency,
    /// Increasing purchase-price thresholds; the first bucket starts at 0.
    pub boundaries: Vec<Decimal>,
    pub cluster: ClusterConfig,
    pub top_n: usize,
    pub histogram_bins: usize,
    pub histogram_lower: Option<f64>,
    pub histogram_upper: Option<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            normalizer: NormalizerConfig::default(),
            currency: Currency::Usd,
            boundaries: vec![
                Decimal::from(100),
                Decimal::from(1_000),
                Decimal::from(10_000),
                Decimal::from(100_000),
            ],
            cluster: ClusterConfig::default(),
            top_n: 5,
            histogram_bins: 50,
            histogram_lower: None,
            histogram_upper: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub input_fingerprint: Option<String>,
    pub normalization: NormalizationReport,
    #[serde(skip)]
    pub sequences: BTreeMap<String, TradeSequence>,
    pub sequenced_assets: usize,
    pub events: Vec<ProfitEvent>,
    pub asset_failures: Vec<AssetFailure>,
    pub currency: Currency,
    pub buckets: Vec<ReturnBucket>,
    pub bucket_failures: Vec<BucketFailure>,
    pub top_collections: Vec<CollectionVolume>,
    pub top_counterparties: Vec<CounterpartyActivity>,
    pub profit_histogram: Option<Histogram>,
    pub daily_volume: Vec<DailyVolume>,
    pub trades_per_day: Vec<DailyCount>,
    pub counts: DatasetCounts,
    pub collections: Vec<String>,
}

/// Run a raw batch through normalization, sequencing, profit calculation,
/// bucketing and reporting.
///
/// Only configuration problems fail the whole run. An asset that breaks an
/// ordering or price invariant is dropped as a unit and listed in
/// `asset_failures`; a bucket that cannot be clustered is listed in
/// `bucket_failures`.
pub fn run_pipeline(
    rows: &[RawTradeRow],
    config: &PipelineConfig,
) -> Result<PipelineReport, PipelineError> {
    validate_boundaries(&config.boundaries)?;
    config.cluster.validate()?;

    let run_id = Uuid::new_v4();
    tracing::info!(run = %run_id, rows = rows.len(), "Pipeline started");

    // Step 1: normalize
    let start = Instant::now();
    let normalized = normalize(rows, &config.normalizer);
    record_normalization(&normalized.report);
    record_stage("normalize", start.elapsed().as_secs_f64());

    tracing::info!(
        run = %run_id,
        kept = normalized.report.kept,
        filtered = normalized.report.policy_filtered(),
        malformed = normalized.report.malformed_prices.len(),
        duplicates = normalized.report.duplicate_timestamp + normalized.report.duplicate_hash,
        outliers = normalized.report.price_outliers,
        single_trade_assets = normalized.report.single_trade_assets,
        "Records normalized"
    );

    // Step 2: sequence, one asset at a time
    let start = Instant::now();
    let sequenced = sequence_trades(&normalized.records);
    let mut sequences = sequenced.sequences;
    let mut asset_failures: Vec<AssetFailure> = sequenced.failures;
    record_stage("sequence", start.elapsed().as_secs_f64());

    // Step 3: profits, never pairing across assets
    let start = Instant::now();
    let profit_outcome = calculate_profits(&sequences);
    let events = profit_outcome.events;
    for failure in &profit_outcome.failures {
        sequences.remove(&failure.asset_id);
    }
    asset_failures.extend(profit_outcome.failures);
    counter!("profit_events_total").increment(events.len() as u64);
    counter!("asset_failures_total").increment(asset_failures.len() as u64);
    record_stage("profit", start.elapsed().as_secs_f64());

    // Step 4: bucket + cluster
    let start = Instant::now();
    let bucketing = bucket_returns(&events, config.currency, &config.boundaries, &config.cluster)?;
    counter!("bucket_failures_total").increment(bucketing.failures.len() as u64);
    record_stage("bucket", start.elapsed().as_secs_f64());

    // Step 5: summaries
    let start = Instant::now();
    let profits: Vec<f64> = events.iter().map(|e| e.profit(config.currency)).collect();
    let profit_histogram = if profits.is_empty() {
        None
    } else {
        match outlier_aware_histogram(
            &profits,
            config.histogram_lower,
            config.histogram_upper,
            config.histogram_bins,
        ) {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::warn!(error = %e, "Profit histogram skipped");
                None
            }
        }
    };

    let report = PipelineReport {
        run_id,
        generated_at: Utc::now(),
        input_fingerprint: None,
        sequenced_assets: sequences.len(),
        top_collections: top_collections(&events, config.top_n),
        top_counterparties: top_counterparties(&events, config.top_n),
        daily_volume: daily_volume(&normalized.records),
        trades_per_day: trades_per_day(&events, None),
        counts: dataset_counts(&events),
        collections: collection_names(&events),
        profit_histogram,
        normalization: normalized.report,
        sequences,
        events,
        asset_failures,
        currency: config.currency,
        buckets: bucketing.buckets,
        bucket_failures: bucketing.failures,
    };
    record_stage("report", start.elapsed().as_secs_f64());

    tracing::info!(
        run = %run_id,
        assets = report.sequenced_assets,
        events = report.events.len(),
        buckets = report.buckets.len(),
        asset_failures = report.asset_failures.len(),
        bucket_failures = report.bucket_failures.len(),
        "Pipeline finished"
    );

    Ok(report)
}
