use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{ProfitEvent, TradeRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionVolume {
    pub collection: String,
    pub volume_usd: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartyActivity {
    pub address: String,
    pub trade_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyVolume {
    pub date: NaiveDate,
    pub volume_usd: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub trades: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetCounts {
    pub collections: usize,
    pub trades: usize,
    pub unique_assets: usize,
}

/// Collections ranked by total sale volume in USD.
/// Ties go to the alphabetically first collection.
pub fn top_collections(events: &[ProfitEvent], n: usize) -> Vec<CollectionVolume> {
    let mut volumes: HashMap<&str, Decimal> = HashMap::new();
    for e in events {
        *volumes.entry(e.collection.as_str()).or_default() += e.sell_price_usd;
    }

    let mut ranked: Vec<CollectionVolume> = volumes
        .into_iter()
        .map(|(collection, volume_usd)| CollectionVolume {
            collection: collection.to_string(),
            volume_usd,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.volume_usd
            .cmp(&a.volume_usd)
            .then_with(|| a.collection.cmp(&b.collection))
    });
    ranked.truncate(n);
    ranked
}

/// Buying addresses ranked by number of sales they took part in.
/// Ties go to the lexicographically first address.
pub fn top_counterparties(events: &[ProfitEvent], n: usize) -> Vec<CounterpartyActivity> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for e in events {
        *counts.entry(e.to_address.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<CounterpartyActivity> = counts
        .into_iter()
        .map(|(address, trade_count)| CounterpartyActivity {
            address: address.to_string(),
            trade_count,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.trade_count
            .cmp(&a.trade_count)
            .then_with(|| a.address.cmp(&b.address))
    });
    ranked.truncate(n);
    ranked
}

/// Total traded USD per UTC day, oldest first.
pub fn daily_volume(records: &[TradeRecord]) -> Vec<DailyVolume> {
    let mut days: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for r in records {
        *days.entry(r.date()).or_default() += r.price_usd;
    }
    days.into_iter()
        .map(|(date, volume_usd)| DailyVolume { date, volume_usd })
        .collect()
}

/// Number of sales per UTC day, oldest first, optionally from `since` on.
pub fn trades_per_day(events: &[ProfitEvent], since: Option<NaiveDate>) -> Vec<DailyCount> {
    let mut days: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for e in events {
        let date = e.sell_date.date_naive();
        if since.map_or(true, |s| date >= s) {
            *days.entry(date).or_default() += 1;
        }
    }
    days.into_iter()
        .map(|(date, trades)| DailyCount { date, trades })
        .collect()
}

pub fn dataset_counts(events: &[ProfitEvent]) -> DatasetCounts {
    let collections: BTreeSet<&str> = events.iter().map(|e| e.collection.as_str()).collect();
    let assets: BTreeSet<&str> = events.iter().map(|e| e.asset_id.as_str()).collect();
    DatasetCounts {
        collections: collections.len(),
        trades: events.len(),
        unique_assets: assets.len(),
    }
}

/// Distinct collection names, sorted.
pub fn collection_names(events: &[ProfitEvent]) -> Vec<String> {
    events
        .iter()
        .map(|e| e.collection.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn make_event(collection: &str, asset: &str, buyer: &str, usd: i64, day: i64) -> ProfitEvent {
        let t0 = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        ProfitEvent {
            asset_id: asset.into(),
            trade_no: 1,
            purchase_date: t0,
            sell_date: t0 + Duration::days(day),
            holding_period: Duration::days(day),
            purchase_price_eth: Decimal::ONE,
            sell_price_eth: Decimal::ONE,
            profit_eth: 0.0,
            purchase_price_usd: Decimal::from(usd),
            sell_price_usd: Decimal::from(usd),
            profit_usd: 0.0,
            collection: collection.into(),
            from_address: "0xseller".into(),
            to_address: buyer.into(),
            purchase_hash: "0x1".into(),
            sell_hash: "0x2".into(),
        }
    }

    #[test]
    fn test_top_collections_by_volume_with_name_tiebreak() {
        let events = vec![
            make_event("Beta", "Beta_1", "0xa", 500, 1),
            make_event("Alpha", "Alpha_1", "0xa", 300, 1),
            make_event("Alpha", "Alpha_2", "0xa", 200, 1),
            make_event("Gamma", "Gamma_1", "0xa", 100, 1),
        ];
        let top = top_collections(&events, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].collection, "Alpha");
        assert_eq!(top[0].volume_usd, Decimal::from(500));
        assert_eq!(top[1].collection, "Beta");
    }

    #[test]
    fn test_top_counterparties_by_count() {
        let events = vec![
            make_event("X", "X_1", "0xb", 1, 1),
            make_event("X", "X_2", "0xb", 1, 1),
            make_event("X", "X_3", "0xc", 1, 1),
            make_event("X", "X_4", "0xa", 1, 1),
        ];
        let top = top_counterparties(&events, 5);
        assert_eq!(top[0].address, "0xb");
        assert_eq!(top[0].trade_count, 2);
        assert_eq!(top[1].address, "0xa");
        assert_eq!(top[2].address, "0xc");
    }

    #[test]
    fn test_trades_per_day_since() {
        let events = vec![
            make_event("X", "X_1", "0xa", 1, 1),
            make_event("X", "X_2", "0xa", 1, 1),
            make_event("X", "X_3", "0xa", 1, 5),
        ];
        let all = trades_per_day(&events, None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].trades, 2);
        let later = trades_per_day(&events, NaiveDate::from_ymd_opt(2021, 1, 3));
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].trades, 1);
    }

    #[test]
    fn test_counts_and_names() {
        let events = vec![
            make_event("B", "B_1", "0xa", 1, 1),
            make_event("A", "A_1", "0xa", 1, 1),
            make_event("A", "A_1", "0xa", 1, 2),
        ];
        let counts = dataset_counts(&events);
        assert_eq!(counts.collections, 2);
        assert_eq!(counts.trades, 3);
        assert_eq!(counts.unique_assets, 2);
        assert_eq!(collection_names(&events), vec!["A".to_string(), "B".to_string()]);
    }
}
