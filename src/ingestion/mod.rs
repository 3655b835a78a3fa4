pub mod csv_source;
pub mod normalizer;
pub mod pipeline;
pub mod price;

pub use csv_source::{load_csv, load_csvs, merge_batches, read_csv, LoadedBatch};
pub use normalizer::{
    canonical_row, normalize, normalize_records, MalformedRow, NormalizationReport,
    NormalizedBatch, NormalizerConfig,
};
pub use price::{parse_price, ParsedPrice};
pub use pipeline::{run_pipeline, PipelineConfig, PipelineReport};
