use serde::{Deserialize, Serialize};

/// Canonical column of a marketplace export.
///
/// Exporters rename headers between batches, so every known spelling maps
/// onto one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Timestamp,
    UnixTimestamp,
    TxnHash,
    Market,
    Action,
    TokenStandard,
    Price,
    Collection,
    TokenId,
    Buyer,
}

impl Column {
    /// Resolve an exporter header to its canonical column.
    pub fn from_header(header: &str) -> Option<Self> {
        match header.trim().to_lowercase().as_str() {
            "date time (utc)" | "datetime (utc)" | "date time" | "timestamp" => {
                Some(Column::Timestamp)
            }
            "unixtimestamp" | "unix timestamp" | "unix_timestamp" => Some(Column::UnixTimestamp),
            "txn hash" | "txn_hash" | "txhash" | "transaction hash" => Some(Column::TxnHash),
            "market" | "marketplace" => Some(Column::Market),
            "action" => Some(Column::Action),
            "type" | "token standard" | "token_standard" => Some(Column::TokenStandard),
            "price" => Some(Column::Price),
            "nft" | "collection" => Some(Column::Collection),
            "token id" | "token_id" | "tokenid" => Some(Column::TokenId),
            "buyer" | "counterparty" => Some(Column::Buyer),
            _ => None,
        }
    }
}

/// One unvalidated row of a marketplace export.
///
/// All fields are kept as text; the normalizer decides what is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTradeRow {
    pub timestamp: Option<String>,
    pub unix_timestamp: Option<String>,
    pub txn_hash: Option<String>,
    pub market: Option<String>,
    pub action: Option<String>,
    pub token_standard: Option<String>,
    pub price: Option<String>,
    pub collection: Option<String>,
    pub token_id: Option<String>,
    pub buyer: Option<String>,
}

impl RawTradeRow {
    /// Build a row from `(header, value)` pairs, reconciling header variants.
    /// Unknown headers (index columns and the like) are ignored. When two
    /// headers resolve to the same column the first non-empty value wins.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut row = RawTradeRow::default();
        for (header, value) in pairs {
            if let Some(column) = Column::from_header(header) {
                row.set(column, value);
            }
        }
        row
    }

    pub fn set(&mut self, column: Column, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let slot = match column {
            Column::Timestamp => &mut self.timestamp,
            Column::UnixTimestamp => &mut self.unix_timestamp,
            Column::TxnHash => &mut self.txn_hash,
            Column::Market => &mut self.market,
            Column::Action => &mut self.action,
            Column::TokenStandard => &mut self.token_standard,
            Column::Price => &mut self.price,
            Column::Collection => &mut self.collection,
            Column::TokenId => &mut self.token_id,
            Column::Buyer => &mut self.buyer,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_variants_resolve() {
        assert_eq!(Column::from_header("Date Time (UTC)"), Some(Column::Timestamp));
        assert_eq!(Column::from_header("Txn Hash"), Some(Column::TxnHash));
        assert_eq!(Column::from_header("Txn hash"), Some(Column::TxnHash));
        assert_eq!(Column::from_header(" Token ID "), Some(Column::TokenId));
        assert_eq!(Column::from_header("Unnamed: 0"), None);
    }

    #[test]
    fn test_from_pairs_keeps_first_non_empty() {
        let row = RawTradeRow::from_pairs([
            ("Unnamed: 0", "17"),
            ("Txn Hash", ""),
            ("Txn hash", "0xabc"),
            ("NFT", "Punks"),
        ]);
        assert_eq!(row.txn_hash.as_deref(), Some("0xabc"));
        assert_eq!(row.collection.as_deref(), Some("Punks"));
        assert!(row.price.is_none());
    }
}
