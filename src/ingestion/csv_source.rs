use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::errors::IngestError;
use crate::models::{Column, RawTradeRow};

/// Raw rows of one export plus a fingerprint of their content.
#[derive(Debug, Clone)]
pub struct LoadedBatch {
    pub rows: Vec<RawTradeRow>,
    /// Hex SHA-256 over every cell, in file order.
    pub fingerprint: String,
}

/// Load a marketplace CSV export from disk.
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<LoadedBatch, IngestError> {
    let file = File::open(path)?;
    read_csv(BufReader::with_capacity(64 * 1024, file))
}

/// Load one export per collection and merge them, in the given order.
pub fn load_csvs<P: AsRef<Path>>(paths: &[P]) -> Result<LoadedBatch, IngestError> {
    let batches = paths.iter().map(load_csv).collect::<Result<Vec<_>, _>>()?;
    Ok(merge_batches(batches))
}

/// Concatenate batches. A single batch keeps its own fingerprint; otherwise
/// the fingerprint hashes the per-batch fingerprints in order.
pub fn merge_batches(mut batches: Vec<LoadedBatch>) -> LoadedBatch {
    if batches.len() == 1 {
        if let Some(batch) = batches.pop() {
            return batch;
        }
    }

    let mut hasher = Sha256::new();
    let mut rows = Vec::with_capacity(batches.iter().map(|b| b.rows.len()).sum());
    for batch in batches {
        hasher.update(batch.fingerprint.as_bytes());
        hasher.update([0x1du8]);
        rows.extend(batch.rows);
    }
    LoadedBatch {
        rows,
        fingerprint: hex::encode(hasher.finalize()),
    }
}

/// Read exporter CSV from any reader. Header spellings are reconciled per
/// file, so exports from different exporter versions can be merged.
pub fn read_csv<R: Read>(reader: R) -> Result<LoadedBatch, IngestError> {
    let mut csv_rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<Option<Column>> = csv_rdr
        .headers()?
        .iter()
        .map(Column::from_header)
        .collect();

    let mut hasher = Sha256::new();
    let mut rows = Vec::new();
    let mut record = csv::StringRecord::new();

    while csv_rdr.read_record(&mut record)? {
        let mut row = RawTradeRow::default();
        for (i, value) in record.iter().enumerate() {
            hasher.update(value.as_bytes());
            hasher.update([0x1fu8]);
            if let Some(Some(column)) = columns.get(i) {
                row.set(*column, value);
            }
        }
        hasher.update([0x1eu8]);
        rows.push(row);
    }

    tracing::debug!(rows = rows.len(), "Loaded CSV export");

    Ok(LoadedBatch {
        rows,
        fingerprint: hex::encode(hasher.finalize()),
    })
}
