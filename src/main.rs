use nft_returns::config::AppConfig;
use nft_returns::ingestion::{load_csvs, run_pipeline};
use nft_returns::metrics::init_metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let metrics_handle = if config.metrics_enabled {
        Some(init_metrics()?)
    } else {
        None
    };

    tracing::info!(files = config.input_paths.len(), "Loading trade exports");
    let input_paths = config.input_paths.clone();
    let batch = tokio::task::spawn_blocking(move || load_csvs(&input_paths)).await??;
    tracing::info!(
        rows = batch.rows.len(),
        fingerprint = %batch.fingerprint,
        "Trade export loaded"
    );

    // The core is synchronous and CPU-bound.
    let pipeline_config = config.pipeline_config();
    let fingerprint = batch.fingerprint.clone();
    let mut report =
        tokio::task::spawn_blocking(move || run_pipeline(&batch.rows, &pipeline_config)).await??;
    report.input_fingerprint = Some(fingerprint);

    for failure in &report.asset_failures {
        tracing::error!(
            asset = %failure.asset_id,
            stage = failure.stage,
            reason = %failure.reason,
            "Asset excluded from results"
        );
    }

    let json = serde_json::to_string_pretty(&report)?;
    match &config.output_path {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            tracing::info!(path = %path, run = %report.run_id, "Report written");
        }
        None => println!("{json}"),
    }

    if let Some(handle) = metrics_handle {
        eprintln!("{}", handle.render());
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(EnvFilter::from_default_env());
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}
