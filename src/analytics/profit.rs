use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::errors::PipelineError;
use crate::models::{AssetFailure, Currency, ProfitEvent, SequencedTrade, TradeSequence};

#[derive(Debug, Clone, Default)]
pub struct ProfitOutcome {
    pub events: Vec<ProfitEvent>,
    pub failures: Vec<AssetFailure>,
}

/// Derive every profit event of every sequence.
///
/// An asset that breaches an ordering or price invariant contributes no
/// events and is listed in `failures`.
pub fn calculate_profits(sequences: &BTreeMap<String, TradeSequence>) -> ProfitOutcome {
    let mut outcome = ProfitOutcome::default();
    for (asset_id, sequence) in sequences {
        match asset_profits(sequence) {
            Ok(events) => outcome.events.extend(events),
            Err(e) => {
                tracing::warn!(asset = %asset_id, error = %e, "Profit calculation aborted for asset");
                outcome.failures.push(AssetFailure {
                    asset_id: asset_id.clone(),
                    stage: "profit",
                    reason: e.to_string(),
                });
            }
        }
    }
    outcome
}

/// Pair each trade with the next one of the same asset.
///
/// A sequence of `n` trades yields `n - 1` events; event `i` is bought at
/// trade `i` and sold at trade `i + 1`.
pub fn asset_profits(sequence: &TradeSequence) -> Result<Vec<ProfitEvent>, PipelineError> {
    sequence
        .pairs()
        .map(|(purchase, sale)| profit_event(sequence.asset_id(), purchase, sale))
        .collect()
}

fn profit_event(
    asset_id: &str,
    purchase: &SequencedTrade,
    sale: &SequencedTrade,
) -> Result<ProfitEvent, PipelineError> {
    let trade_no = purchase.trade_no;
    let bought = &purchase.record;
    let sold = &sale.record;

    let holding_period = sold.timestamp - bought.timestamp;
    if holding_period < chrono::Duration::zero() {
        return Err(PipelineError::InvariantViolation {
            asset_id: asset_id.to_string(),
            trade_no,
            holding_period,
        });
    }

    let profit_eth = log_return(asset_id, trade_no, Currency::Eth, bought.price_eth, sold.price_eth)?;
    let profit_usd = log_return(asset_id, trade_no, Currency::Usd, bought.price_usd, sold.price_usd)?;

    Ok(ProfitEvent {
        asset_id: asset_id.to_string(),
        trade_no,
        purchase_date: bought.timestamp,
        sell_date: sold.timestamp,
        holding_period,
        purchase_price_eth: bought.price_eth,
        sell_price_eth: sold.price_eth,
        profit_eth,
        purchase_price_usd: bought.price_usd,
        sell_price_usd: sold.price_usd,
        profit_usd,
        collection: sold.collection.clone(),
        from_address: bought.counterparty.clone(),
        to_address: sold.counterparty.clone(),
        purchase_hash: bought.txn_hash.clone(),
        sell_hash: sold.txn_hash.clone(),
    })
}

/// `ln(sell / purchase)`; both prices must be strictly positive.
fn log_return(
    asset_id: &str,
    trade_no: u32,
    currency: Currency,
    purchase: Decimal,
    sell: Decimal,
) -> Result<f64, PipelineError> {
    let domain_error = |price: Decimal| PipelineError::DivisionDomain {
        asset_id: asset_id.to_string(),
        trade_no,
        currency,
        price,
    };

    if purchase <= Decimal::ZERO {
        return Err(domain_error(purchase));
    }
    if sell <= Decimal::ZERO {
        return Err(domain_error(sell));
    }

    let ratio = sell.to_f64().unwrap_or(f64::NAN) / purchase.to_f64().unwrap_or(f64::NAN);
    let profit = ratio.ln();
    if !profit.is_finite() {
        return Err(domain_error(purchase));
    }
    Ok(profit)
}
