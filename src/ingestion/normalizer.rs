use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::errors::PipelineError;
use crate::ingestion::price::{parse_price, price_symbol};
use crate::models::{RawTradeRow, TradeRecord};

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// Row acceptance policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// The single supported venue.
    pub marketplace: String,
    /// Purchase action label; listings, transfers and mints use other labels.
    pub action: String,
    /// Token standard number, compared with any `ERC-` prefix removed.
    pub token_standard: String,
    /// Price unit after wrapped-ETH folding.
    pub currency_symbol: String,
    /// Rows priced at or above this many ETH are treated as outliers.
    pub max_price_eth: Decimal,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            marketplace: "OpenSea".into(),
            action: "Bought".into(),
            token_standard: "721".into(),
            currency_symbol: "ETH".into(),
            max_price_eth: Decimal::from(1_000),
        }
    }
}

/// A price cell that could not be parsed, by input row index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedRow {
    pub row: usize,
    pub price: String,
}

/// What the normalizer dropped, and why.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationReport {
    pub raw_rows: usize,
    pub wrong_marketplace: usize,
    pub wrong_action: usize,
    pub wrong_standard: usize,
    pub unsupported_currency: usize,
    pub missing_fields: usize,
    pub invalid_timestamp: usize,
    pub malformed_prices: Vec<MalformedRow>,
    pub zero_price: usize,
    pub duplicate_timestamp: usize,
    pub duplicate_hash: usize,
    pub price_outliers: usize,
    pub single_trade_assets: usize,
    pub single_trade_rows: usize,
    pub kept: usize,
}

impl NormalizationReport {
    /// Rows excluded by the marketplace/action/standard/currency policy.
    pub fn policy_filtered(&self) -> usize {
        self.wrong_marketplace + self.wrong_action + self.wrong_standard + self.unsupported_currency
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    /// Sorted by `(asset_id, timestamp)`.
    pub records: Vec<TradeRecord>,
    pub report: NormalizationReport,
}

#[derive(Debug)]
enum RowRejection {
    WrongMarketplace,
    WrongAction,
    WrongStandard,
    UnsupportedCurrency,
    MissingField,
    InvalidTimestamp,
    MalformedPrice(PipelineError),
    ZeroPrice,
}

/// Validate and standardize a raw export batch.
///
/// Pure: `rows` is not modified. Applies the row policy, then the
/// record-level pass of [`normalize_records`].
pub fn normalize(rows: &[RawTradeRow], config: &NormalizerConfig) -> NormalizedBatch {
    let mut report = NormalizationReport {
        raw_rows: rows.len(),
        ..Default::default()
    };

    let mut accepted = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        match to_record(row, config) {
            Ok(record) => accepted.push(record),
            Err(RowRejection::WrongMarketplace) => report.wrong_marketplace += 1,
            Err(RowRejection::WrongAction) => report.wrong_action += 1,
            Err(RowRejection::WrongStandard) => report.wrong_standard += 1,
            Err(RowRejection::UnsupportedCurrency) => report.unsupported_currency += 1,
            Err(RowRejection::MissingField) => report.missing_fields += 1,
            Err(RowRejection::InvalidTimestamp) => report.invalid_timestamp += 1,
            Err(RowRejection::ZeroPrice) => report.zero_price += 1,
            Err(RowRejection::MalformedPrice(e)) => {
                tracing::debug!(row = idx, error = %e, "Dropping row with malformed price");
                report.malformed_prices.push(MalformedRow {
                    row: idx,
                    price: row.price.clone().unwrap_or_default(),
                });
            }
        }
    }

    let batch = normalize_records(accepted, config);
    merge_record_counts(&mut report, &batch.report);

    tracing::debug!(
        raw = report.raw_rows,
        kept = report.kept,
        filtered = report.policy_filtered(),
        malformed = report.malformed_prices.len(),
        "Normalized raw rows"
    );

    NormalizedBatch {
        records: batch.records,
        report,
    }
}

/// Record-level pass: deduplicate, drop price outliers, drop single-trade
/// assets, sort by `(asset_id, timestamp)`.
///
/// Running this on its own output returns the same records.
pub fn normalize_records(records: Vec<TradeRecord>, config: &NormalizerConfig) -> NormalizedBatch {
    let mut report = NormalizationReport::default();

    // First occurrence wins for both keys.
    let mut seen_time: HashSet<(String, DateTime<Utc>)> = HashSet::new();
    let mut seen_hash: HashSet<(String, String)> = HashSet::new();
    let mut deduped = Vec::with_capacity(records.len());
    for record in records {
        if !seen_time.insert((record.asset_id.clone(), record.timestamp)) {
            report.duplicate_timestamp += 1;
            continue;
        }
        deduped.push(record);
    }
    let mut unique = Vec::with_capacity(deduped.len());
    for record in deduped {
        if !seen_hash.insert((record.asset_id.clone(), record.txn_hash.clone())) {
            report.duplicate_hash += 1;
            continue;
        }
        unique.push(record);
    }

    let mut priced = Vec::with_capacity(unique.len());
    for record in unique {
        if record.price_eth <= Decimal::ZERO {
            report.zero_price += 1;
        } else if record.price_eth >= config.max_price_eth || record.price_usd <= Decimal::ZERO {
            report.price_outliers += 1;
        } else {
            priced.push(record);
        }
    }

    // Outlier removal can itself leave an asset with one trade.
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in &priced {
        *counts.entry(record.asset_id.as_str()).or_default() += 1;
    }
    let singles: HashSet<String> = counts
        .into_iter()
        .filter(|(_, n)| *n < 2)
        .map(|(id, _)| id.to_string())
        .collect();
    report.single_trade_assets = singles.len();

    let before = priced.len();
    let mut kept: Vec<TradeRecord> = priced
        .into_iter()
        .filter(|r| !singles.contains(&r.asset_id))
        .collect();
    report.single_trade_rows = before - kept.len();
    kept.sort_by(|a, b| {
        a.asset_id
            .cmp(&b.asset_id)
            .then_with(|| a.timestamp.cmp(&b.timestamp))
    });
    report.kept = kept.len();

    NormalizedBatch {
        records: kept,
        report,
    }
}

/// Render a record back into the canonical export shape.
pub fn canonical_row(record: &TradeRecord, config: &NormalizerConfig) -> RawTradeRow {
    RawTradeRow {
        timestamp: Some(record.timestamp.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        unix_timestamp: None,
        txn_hash: Some(record.txn_hash.clone()),
        market: Some(config.marketplace.clone()),
        action: Some(config.action.clone()),
        token_standard: Some(config.token_standard.clone()),
        price: Some(format!(
            "{} {} (${})",
            record.price_eth, config.currency_symbol, record.price_usd
        )),
        collection: Some(record.collection.clone()),
        token_id: Some(record.token_id.clone()),
        buyer: Some(record.counterparty.clone()),
    }
}

fn to_record(row: &RawTradeRow, config: &NormalizerConfig) -> Result<TradeRecord, RowRejection> {
    let market = row.market.as_deref().ok_or(RowRejection::WrongMarketplace)?;
    if !market.eq_ignore_ascii_case(&config.marketplace) {
        return Err(RowRejection::WrongMarketplace);
    }

    let action = row.action.as_deref().ok_or(RowRejection::WrongAction)?;
    if !action.eq_ignore_ascii_case(&config.action) {
        return Err(RowRejection::WrongAction);
    }

    let standard = row.token_standard.as_deref().ok_or(RowRejection::WrongStandard)?;
    if !same_standard(standard, &config.token_standard) {
        return Err(RowRejection::WrongStandard);
    }

    let price_text = row.price.as_deref().ok_or(RowRejection::MissingField)?;
    match price_symbol(price_text) {
        Some(symbol) if symbol == config.currency_symbol => {}
        Some(_) => return Err(RowRejection::UnsupportedCurrency),
        // "0 ETH" style cells without a unit are handled by the parser below
        None if price_text.contains(&config.currency_symbol) => {}
        None => return Err(RowRejection::UnsupportedCurrency),
    }

    let collection = row.collection.as_deref().ok_or(RowRejection::MissingField)?;
    let token_id = row.token_id.as_deref().ok_or(RowRejection::MissingField)?;
    let buyer = row.buyer.as_deref().ok_or(RowRejection::MissingField)?;
    let txn_hash = row.txn_hash.as_deref().ok_or(RowRejection::MissingField)?;

    let timestamp = parse_timestamp(row).ok_or(RowRejection::InvalidTimestamp)?;

    if leading_amount_is_zero(price_text) {
        return Err(RowRejection::ZeroPrice);
    }
    let price = parse_price(price_text).map_err(RowRejection::MalformedPrice)?;

    Ok(TradeRecord {
        asset_id: TradeRecord::asset_id_for(collection, token_id),
        collection: collection.to_string(),
        token_id: token_id.to_string(),
        timestamp,
        price_eth: price.amount,
        price_usd: price.fiat,
        counterparty: buyer.to_string(),
        txn_hash: txn_hash.to_string(),
    })
}

fn leading_amount_is_zero(text: &str) -> bool {
    text.split_whitespace()
        .next()
        .and_then(|t| t.replace(',', "").parse::<Decimal>().ok())
        .is_some_and(|amount| amount.is_zero())
}

/// Standards are numbers, so spreadsheet-written `721.0` matches `721`.
fn same_standard(a: &str, b: &str) -> bool {
    let (a, b) = (strip_erc_prefix(a), strip_erc_prefix(b));
    match (a.parse::<Decimal>(), b.parse::<Decimal>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => a.eq_ignore_ascii_case(b),
    }
}

fn strip_erc_prefix(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("ERC-")
        .or_else(|| s.strip_prefix("ERC"))
        .unwrap_or(s)
        .trim()
}

/// Parse the textual UTC timestamp, falling back to the unix-seconds column.
pub fn parse_timestamp(row: &RawTradeRow) -> Option<DateTime<Utc>> {
    if let Some(text) = row.timestamp.as_deref() {
        if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
            return Some(ts.with_timezone(&Utc));
        }
        for fmt in TIMESTAMP_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }
    }
    let secs: i64 = row.unix_timestamp.as_deref()?.trim().parse().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}

fn merge_record_counts(into: &mut NormalizationReport, from: &NormalizationReport) {
    into.zero_price += from.zero_price;
    into.duplicate_timestamp += from.duplicate_timestamp;
    into.duplicate_hash += from.duplicate_hash;
    into.price_outliers += from.price_outliers;
    into.single_trade_assets = from.single_trade_assets;
    into.single_trade_rows = from.single_trade_rows;
    into.kept = from.kept;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(nft: &str, token: &str, ts: &str, price: &str, hash: &str) -> RawTradeRow {
        RawTradeRow {
            timestamp: Some(ts.into()),
            unix_timestamp: None,
            txn_hash: Some(hash.into()),
            market: Some("OpenSea".into()),
            action: Some("Bought".into()),
            token_standard: Some("721".into()),
            price: Some(price.into()),
            collection: Some(nft.into()),
            token_id: Some(token.into()),
            buyer: Some("0xbuyer".into()),
        }
    }

    #[test]
    fn test_policy_filters_are_counted_not_errors() {
        let mut listing = make_row("X", "1", "2021-01-01 00:00:00", "1 ETH ($2,000.00)", "0x1");
        listing.action = Some("Listed".into());
        let mut other_market = make_row("X", "1", "2021-01-02 00:00:00", "1 ETH ($2,000.00)", "0x2");
        other_market.market = Some("Rarible".into());
        let mut erc1155 = make_row("X", "1", "2021-01-03 00:00:00", "1 ETH ($2,000.00)", "0x3");
        erc1155.token_standard = Some("1155".into());
        let usdc = make_row("X", "1", "2021-01-04 00:00:00", "10 USDC ($10.00)", "0x4");

        let batch = normalize(&[listing, other_market, erc1155, usdc], &NormalizerConfig::default());
        assert!(batch.records.is_empty());
        assert_eq!(batch.report.wrong_action, 1);
        assert_eq!(batch.report.wrong_marketplace, 1);
        assert_eq!(batch.report.wrong_standard, 1);
        assert_eq!(batch.report.unsupported_currency, 1);
        assert_eq!(batch.report.policy_filtered(), 4);
    }

    #[test]
    fn test_weth_is_accepted_and_erc_prefix_ignored() {
        let mut a = make_row("X", "1", "2021-01-01 00:00:00", "1 WETH ($2,000.00)", "0x1");
        a.token_standard = Some("ERC-721".into());
        let b = make_row("X", "1", "2021-01-02 00:00:00", "2 ETH ($4,000.00)", "0x2");
        let batch = normalize(&[a, b], &NormalizerConfig::default());
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].price_eth, Decimal::ONE);
    }

    #[test]
    fn test_standard_compared_as_number() {
        let mut a = make_row("X", "1", "2021-01-01 00:00:00", "1 ETH ($2,000.00)", "0x1");
        a.token_standard = Some("721.0".into());
        let mut b = make_row("X", "1", "2021-01-02 00:00:00", "2 ETH ($4,000.00)", "0x2");
        b.token_standard = Some("ERC-721.00".into());
        let mut c = make_row("X", "1", "2021-01-03 00:00:00", "2 ETH ($4,000.00)", "0x3");
        c.token_standard = Some("7210".into());
        let batch = normalize(&[a, b, c], &NormalizerConfig::default());
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.report.wrong_standard, 1);
    }

    #[test]
    fn test_malformed_price_counted_with_row_index() {
        let rows = vec![
            make_row("X", "1", "2021-01-01 00:00:00", "1 ETH ($2,000.00)", "0x1"),
            make_row("X", "1", "2021-01-02 00:00:00", "1.x ETH ($2,000.00)", "0x2"),
            make_row("X", "1", "2021-01-03 00:00:00", "3 ETH ($6,000.00)", "0x3"),
        ];
        let batch = normalize(&rows, &NormalizerConfig::default());
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.report.malformed_prices.len(), 1);
        assert_eq!(batch.report.malformed_prices[0].row, 1);
    }

    #[test]
    fn test_zero_price_dropped() {
        let rows = vec![
            make_row("X", "1", "2021-01-01 00:00:00", "0 ETH ", "0x1"),
            make_row("X", "1", "2021-01-02 00:00:00", "1 ETH ($2,000.00)", "0x2"),
        ];
        let batch = normalize(&rows, &NormalizerConfig::default());
        assert_eq!(batch.report.zero_price, 1);
        // the survivor is alone and goes too
        assert!(batch.records.is_empty());
        assert_eq!(batch.report.single_trade_assets, 1);
    }

    #[test]
    fn test_duplicate_timestamp_keeps_first() {
        let rows = vec![
            make_row("X", "1", "2021-01-01 00:00:00", "1 ETH ($2,000.00)", "0xa"),
            make_row("X", "1", "2021-01-01 00:00:00", "5 ETH ($9,000.00)", "0xb"),
            make_row("X", "1", "2021-01-02 00:00:00", "2 ETH ($4,000.00)", "0xc"),
        ];
        let batch = normalize(&rows, &NormalizerConfig::default());
        assert_eq!(batch.report.duplicate_timestamp, 1);
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].txn_hash, "0xa");
    }

    #[test]
    fn test_same_hash_on_other_asset_is_kept() {
        let rows = vec![
            make_row("X", "1", "2021-01-01 00:00:00", "1 ETH ($2,000.00)", "0xa"),
            make_row("X", "2", "2021-01-01 00:00:00", "1 ETH ($2,000.00)", "0xa"),
            make_row("X", "1", "2021-01-02 00:00:00", "2 ETH ($4,000.00)", "0xb"),
            make_row("X", "2", "2021-01-02 00:00:00", "2 ETH ($4,000.00)", "0xc"),
        ];
        let batch = normalize(&rows, &NormalizerConfig::default());
        assert_eq!(batch.report.duplicate_hash, 0);
        assert_eq!(batch.records.len(), 4);
    }

    #[test]
    fn test_unix_timestamp_fallback() {
        let mut row = make_row("X", "1", "not a date", "1 ETH ($1.00)", "0x1");
        row.unix_timestamp = Some("1609459200".into());
        assert_eq!(
            parse_timestamp(&row),
            Some(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap())
        );
        row.unix_timestamp = None;
        assert_eq!(parse_timestamp(&row), None);
    }

    #[test]
    fn test_output_sorted_by_asset_then_time() {
        let rows = vec![
            make_row("B", "1", "2021-01-03 00:00:00", "1 ETH ($1.00)", "0x1"),
            make_row("A", "1", "2021-01-02 00:00:00", "1 ETH ($1.00)", "0x2"),
            make_row("B", "1", "2021-01-01 00:00:00", "1 ETH ($1.00)", "0x3"),
            make_row("A", "1", "2021-01-01 00:00:00", "1 ETH ($1.00)", "0x4"),
        ];
        let batch = normalize(&rows, &NormalizerConfig::default());
        let order: Vec<&str> = batch.records.iter().map(|r| r.txn_hash.as_str()).collect();
        assert_eq!(order, vec!["0x4", "0x2", "0x3", "0x1"]);
    }

    #[test]
    fn test_canonical_row_round_trips() {
        let rows = vec![
            make_row("X", "7", "2021-01-01 10:00:00", "1.25 ETH ($2,500.50)", "0x1"),
            make_row("X", "7", "2021-02-01 10:00:00", "2 ETH ($4,000.00)", "0x2"),
        ];
        let config = NormalizerConfig::default();
        let first = normalize(&rows, &config);
        let again: Vec<RawTradeRow> = first
            .records
            .iter()
            .map(|r| canonical_row(r, &config))
            .collect();
        let second = normalize(&again, &config);
        assert_eq!(first.records, second.records);
    }
}
