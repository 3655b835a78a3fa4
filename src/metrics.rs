use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::ingestion::normalizer::NormalizationReport;

/// Install the Prometheus recorder and register the pipeline metrics.
/// The handle's `render()` produces the text exposition payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register counters so they appear even when nothing is dropped.
    counter!("raw_rows_total").absolute(0);
    counter!("malformed_price_rows_total").absolute(0);
    counter!("price_outliers_total").absolute(0);
    counter!("single_trade_assets_total").absolute(0);
    counter!("profit_events_total").absolute(0);
    counter!("asset_failures_total").absolute(0);
    counter!("bucket_failures_total").absolute(0);

    Ok(handle)
}

pub fn record_normalization(report: &NormalizationReport) {
    counter!("raw_rows_total").increment(report.raw_rows as u64);
    for (reason, n) in [
        ("marketplace", report.wrong_marketplace),
        ("action", report.wrong_action),
        ("standard", report.wrong_standard),
        ("currency", report.unsupported_currency),
        ("missing_field", report.missing_fields),
        ("timestamp", report.invalid_timestamp),
        ("zero_price", report.zero_price),
    ] {
        counter!("rows_filtered_total", "reason" => reason).increment(n as u64);
    }
    counter!("malformed_price_rows_total").increment(report.malformed_prices.len() as u64);
    counter!("duplicate_rows_total", "key" => "timestamp")
        .increment(report.duplicate_timestamp as u64);
    counter!("duplicate_rows_total", "key" => "txn_hash").increment(report.duplicate_hash as u64);
    counter!("price_outliers_total").increment(report.price_outliers as u64);
    counter!("single_trade_assets_total").increment(report.single_trade_assets as u64);
}

pub fn record_stage(stage: &'static str, seconds: f64) {
    histogram!("pipeline_stage_seconds", "stage" => stage).record(seconds);
}
