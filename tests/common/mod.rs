use nft_returns::models::RawTradeRow;

/// A purchase row as the marketplace exporter writes it.
#[allow(dead_code)]
pub fn raw_row(nft: &str, token: &str, timestamp: &str, price: &str, hash: &str, buyer: &str) -> RawTradeRow {
    RawTradeRow::from_pairs([
        ("Txn Hash", hash),
        ("Date Time (UTC)", timestamp),
        ("Action", "Bought"),
        ("Buyer", buyer),
        ("NFT", nft),
        ("Token ID", token),
        ("Type", "721"),
        ("Price", price),
        ("Market", "OpenSea"),
    ])
}

/// Three assets across two collections, including noise the normalizer
/// must drop.
#[allow(dead_code)]
pub fn sample_batch() -> Vec<RawTradeRow> {
    let mut listing = raw_row("Apes", "9", "2021-05-01 00:00:00", "3 ETH ($9,000.00)", "0x90", "0xl");
    listing.action = Some("Listed".into());

    vec![
        raw_row("Apes", "1", "2021-05-01 10:00:00", "1 ETH ($3,000.00)", "0x01", "0xa"),
        raw_row("Apes", "1", "2021-05-11 10:00:00", "2 ETH ($6,000.00)", "0x02", "0xb"),
        raw_row("Apes", "1", "2021-06-01 10:00:00", "1.5 WETH ($4,000.00)", "0x03", "0xc"),
        raw_row("Apes", "2", "2021-05-02 00:00:00", "0.5 ETH ($1,500.00)", "0x04", "0xb"),
        raw_row("Apes", "2", "2021-05-03 00:00:00", "0.25 ETH ($800.00)", "0x05", "0xd"),
        raw_row("Punks", "7", "2021-07-01 00:00:00", "40 ETH ($90,000.00)", "0x06", "0xe"),
        raw_row("Punks", "7", "2021-08-01 00:00:00", "60 ETH ($180,000.00)", "0x07", "0xb"),
        // duplicate of 0x07 from an overlapping export
        raw_row("Punks", "7", "2021-08-01 00:00:00", "60 ETH ($180,000.00)", "0x07", "0xb"),
        raw_row("Punks", "8", "2021-07-05 00:00:00", "oops ETH ($1.00)", "0x08", "0xf"),
        listing,
    ]
}
