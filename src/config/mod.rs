use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

use crate::analytics::ClusterConfig;
use crate::ingestion::normalizer::NormalizerConfig;
use crate::ingestion::pipeline::PipelineConfig;
use crate::models::Currency;

const DEFAULT_BOUNDARIES: &str = "100,1000,10000,100000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// One export per collection, merged in order.
    pub input_paths: Vec<String>,
    pub output_path: Option<String>,

    // Row policy
    pub marketplace: String,
    pub action: String,
    pub token_standard: String,
    pub max_price_eth: Decimal,

    // Bucketing / clustering
    pub bucket_currency: Currency,
    pub bucket_boundaries: Vec<Decimal>,
    pub cluster_count: usize,
    pub cluster_restarts: usize,
    pub cluster_max_iter: usize,
    pub cluster_seed: u64,

    // Reporting
    pub top_n: usize,
    pub histogram_bins: usize,
    pub histogram_lower: Option<f64>,
    pub histogram_upper: Option<f64>,

    pub metrics_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let currency_raw = env::var("BUCKET_CURRENCY").unwrap_or_else(|_| "usd".into());
        let bucket_currency = Currency::from_str(&currency_raw)
            .ok_or_else(|| anyhow::anyhow!("BUCKET_CURRENCY must be eth or usd, got {currency_raw}"))?;

        let boundaries_raw =
            env::var("BUCKET_BOUNDARIES").unwrap_or_else(|_| DEFAULT_BOUNDARIES.into());

        Ok(Self {
            input_paths: parse_paths(
                &env::var("INPUT_PATH").map_err(|_| anyhow::anyhow!("INPUT_PATH must be set"))?,
            )?,
            output_path: env::var("OUTPUT_PATH").ok(),

            marketplace: env::var("MARKETPLACE").unwrap_or_else(|_| "OpenSea".into()),
            action: env::var("ACTION").unwrap_or_else(|_| "Bought".into()),
            token_standard: env::var("TOKEN_STANDARD").unwrap_or_else(|_| "721".into()),
            max_price_eth: env::var("MAX_PRICE_ETH")
                .unwrap_or_else(|_| "1000".into())
                .parse()?,

            bucket_currency,
            bucket_boundaries: parse_boundaries(&boundaries_raw)?,
            cluster_count: env::var("CLUSTER_COUNT")
                .unwrap_or_else(|_| "5".into())
                .parse()?,
            cluster_restarts: env::var("CLUSTER_RESTARTS")
                .unwrap_or_else(|_| "100".into())
                .parse()?,
            cluster_max_iter: env::var("CLUSTER_MAX_ITER")
                .unwrap_or_else(|_| "1000".into())
                .parse()?,
            cluster_seed: env::var("CLUSTER_SEED")
                .unwrap_or_else(|_| "42".into())
                .parse()?,

            top_n: env::var("TOP_N").unwrap_or_else(|_| "5".into()).parse()?,
            histogram_bins: env::var("HISTOGRAM_BINS")
                .unwrap_or_else(|_| "50".into())
                .parse()?,
            histogram_lower: env::var("HISTOGRAM_LOWER").ok().map(|v| v.parse()).transpose()?,
            histogram_upper: env::var("HISTOGRAM_UPPER").ok().map(|v| v.parse()).transpose()?,

            metrics_enabled: env::var("METRICS_ENABLED")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),
        })
    }

    /// Explicit inputs for the core; it never reads the environment itself.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            normalizer: NormalizerConfig {
                marketplace: self.marketplace.clone(),
                action: self.action.clone(),
                token_standard: self.token_standard.clone(),
                max_price_eth: self.max_price_eth,
                ..NormalizerConfig::default()
            },
            currency: self.bucket_currency,
            boundaries: self.bucket_boundaries.clone(),
            cluster: ClusterConfig {
                k: self.cluster_count,
                restarts: self.cluster_restarts,
                max_iter: self.cluster_max_iter,
                seed: self.cluster_seed,
            },
            top_n: self.top_n,
            histogram_bins: self.histogram_bins,
            histogram_lower: self.histogram_lower,
            histogram_upper: self.histogram_upper,
        }
    }
}

/// Parse a comma-separated list of export paths.
pub fn parse_paths(raw: &str) -> anyhow::Result<Vec<String>> {
    let paths: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if paths.is_empty() {
        anyhow::bail!("INPUT_PATH lists no files");
    }
    Ok(paths)
}

/// Parse a comma-separated list of price thresholds.
pub fn parse_boundaries(raw: &str) -> anyhow::Result<Vec<Decimal>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Decimal::from_str(s).map_err(|e| anyhow::anyhow!("invalid bucket boundary {s:?}: {e}"))
        })
        .collect()
}
