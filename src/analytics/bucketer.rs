use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analytics::kmeans::{kmeans, ClusterConfig};
use crate::errors::PipelineError;
use crate::models::{ClusterLabel, ClusterSummary, ClusteredEvent, Currency, ProfitEvent, ReturnBucket};

/// A bucket whose clustering was aborted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketFailure {
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketingOutcome {
    pub buckets: Vec<ReturnBucket>,
    pub failures: Vec<BucketFailure>,
}

/// Check that boundaries are non-empty, positive and strictly increasing.
pub fn validate_boundaries(boundaries: &[Decimal]) -> Result<(), PipelineError> {
    if boundaries.is_empty() {
        return Err(PipelineError::EmptyBoundaries);
    }
    let mut prev = Decimal::ZERO;
    for b in boundaries {
        if *b <= prev {
            return Err(PipelineError::NonMonotonicBoundaries(boundaries.to_vec()));
        }
        prev = *b;
    }
    Ok(())
}

/// Split events by purchase price into `(prev, boundary]` ranges, starting
/// at 0, and cluster each non-empty range in (purchase price, profit) space.
///
/// Empty ranges are skipped. A range whose clustering fails is reported in
/// `failures` and the remaining ranges are still processed.
pub fn bucket_returns(
    events: &[ProfitEvent],
    currency: Currency,
    boundaries: &[Decimal],
    config: &ClusterConfig,
) -> Result<BucketingOutcome, PipelineError> {
    validate_boundaries(boundaries)?;
    config.validate()?;

    let mut outcome = BucketingOutcome::default();
    let mut lower = Decimal::ZERO;

    for &upper in boundaries {
        let selected: Vec<&ProfitEvent> = events
            .iter()
            .filter(|e| {
                let price = e.purchase_price(currency);
                price > lower && price <= upper
            })
            .collect();

        if selected.is_empty() {
            tracing::debug!(min = %lower, max = %upper, currency = %currency, "Empty bucket, skipping");
        } else {
            match cluster_bucket(&selected, currency, lower, upper, config) {
                Ok(bucket) => {
                    tracing::debug!(
                        min = %lower,
                        max = %upper,
                        events = bucket.len(),
                        mean = bucket.mean_profit,
                        median = bucket.median_profit,
                        "Bucket clustered"
                    );
                    outcome.buckets.push(bucket);
                }
                Err(e) => {
                    tracing::warn!(min = %lower, max = %upper, error = %e, "Bucket clustering failed");
                    outcome.failures.push(BucketFailure {
                        min_price: lower,
                        max_price: upper,
                        reason: e.to_string(),
                    });
                }
            }
        }
        lower = upper;
    }

    Ok(outcome)
}

fn cluster_bucket(
    events: &[&ProfitEvent],
    currency: Currency,
    min_price: Decimal,
    max_price: Decimal,
    config: &ClusterConfig,
) -> Result<ReturnBucket, PipelineError> {
    let points: Vec<[f64; 2]> = events
        .iter()
        .map(|e| {
            let price = e.purchase_price(currency).to_f64().unwrap_or(f64::NAN);
            [price, e.profit(currency)]
        })
        .collect();

    let fit = kmeans(&points, config)?;

    let clusters = fit
        .centroids
        .iter()
        .enumerate()
        .map(|(i, c)| ClusterSummary {
            label: ClusterLabel::new(i),
            size: fit.labels.iter().filter(|&&l| l == i).count(),
            centroid_price: c[0],
            centroid_profit: c[1],
        })
        .collect();

    let profits: Vec<f64> = points.iter().map(|p| p[1]).collect();

    Ok(ReturnBucket {
        currency,
        min_price,
        max_price,
        events: events
            .iter()
            .zip(&fit.labels)
            .map(|(e, &l)| ClusteredEvent {
                event: (*e).clone(),
                label: ClusterLabel::new(l),
            })
            .collect(),
        clusters,
        mean_profit: mean(&profits),
        median_profit: median(&profits),
        inertia: fit.inertia,
    })
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Midpoint average for even lengths.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
