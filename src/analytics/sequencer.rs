use std::collections::BTreeMap;

use crate::errors::PipelineError;
use crate::models::{AssetFailure, TradeRecord, TradeSequence};

#[derive(Debug, Clone, Default)]
pub struct SequencedBatch {
    pub sequences: BTreeMap<String, TradeSequence>,
    /// Assets whose trades could not be ordered; none of their trades are kept.
    pub failures: Vec<AssetFailure>,
}

/// Group records by asset and order each group chronologically.
///
/// Assets with a single record are skipped: they have no purchase/sale pair.
/// An asset with repeated timestamps is dropped whole and listed in
/// `failures`; other assets are unaffected.
pub fn sequence_trades(records: &[TradeRecord]) -> SequencedBatch {
    let mut batch = SequencedBatch::default();
    for (asset_id, group) in group_by_asset(records) {
        if group.len() < 2 {
            tracing::debug!(asset = %asset_id, "Skipping single-trade asset");
            continue;
        }
        match build_sequence(asset_id.clone(), group) {
            Ok(sequence) => {
                batch.sequences.insert(asset_id, sequence);
            }
            Err(e) => {
                tracing::warn!(asset = %asset_id, error = %e, "Sequencing aborted for asset");
                batch.failures.push(AssetFailure {
                    asset_id,
                    stage: "sequence",
                    reason: e.to_string(),
                });
            }
        }
    }
    batch
}

/// Group records by `asset_id`, keeping input order within each group.
pub fn group_by_asset(records: &[TradeRecord]) -> BTreeMap<String, Vec<TradeRecord>> {
    let mut groups: BTreeMap<String, Vec<TradeRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.asset_id.clone())
            .or_default()
            .push(record.clone());
    }
    groups
}

/// Sort one asset's records by timestamp and assign 1-based trade numbers.
///
/// Equal timestamps cannot be ordered, so they fail with `AmbiguousOrder`
/// instead of falling back to an arbitrary tie-break.
pub fn build_sequence(
    asset_id: String,
    mut records: Vec<TradeRecord>,
) -> Result<TradeSequence, PipelineError> {
    records.sort_by_key(|r| r.timestamp);

    if let Some(dup) = records.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
        return Err(PipelineError::AmbiguousOrder {
            asset_id,
            timestamp: dup[0].timestamp,
        });
    }

    Ok(TradeSequence::from_sorted(asset_id, records))
}
