use rust_decimal::Decimal;
use std::str::FromStr;

use crate::errors::PipelineError;

/// Wrapped-ETH symbols that settle 1:1 in ETH.
const WRAPPED_ETH_SYMBOLS: [&str; 1] = ["WETH"];

/// Amount, unit and fiat value read from an exporter price cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPrice {
    pub amount: Decimal,
    pub symbol: String,
    pub fiat: Decimal,
}

/// Unit symbol of a price cell (`"1.5 WETH ($3,000.00)"` → `"ETH"`),
/// with wrapped ETH folded into ETH.
pub fn price_symbol(text: &str) -> Option<String> {
    let symbol = text.split_whitespace().nth(1)?;
    if symbol.starts_with("($") {
        return None;
    }
    let upper = symbol.to_uppercase();
    if WRAPPED_ETH_SYMBOLS.contains(&upper.as_str()) {
        return Some("ETH".into());
    }
    Some(upper)
}

/// Parse `"<amount> <SYMBOL> ($<fiat>)"`.
///
/// Thousands separators are stripped from both numbers. Fails with
/// `MalformedPrice` when either number is missing or not numeric.
pub fn parse_price(text: &str) -> Result<ParsedPrice, PipelineError> {
    let malformed = || PipelineError::MalformedPrice(text.to_string());

    let amount_token = text.split_whitespace().next().ok_or_else(malformed)?;
    let amount = parse_number(amount_token).ok_or_else(malformed)?;
    let symbol = price_symbol(text).ok_or_else(malformed)?;

    let open = text.find("($").ok_or_else(malformed)?;
    let rest = &text[open + 2..];
    let close = rest.find(')').ok_or_else(malformed)?;
    let fiat = parse_number(&rest[..close]).ok_or_else(malformed)?;

    Ok(ParsedPrice {
        amount,
        symbol,
        fiat,
    })
}

fn parse_number(token: &str) -> Option<Decimal> {
    let cleaned = token.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}
