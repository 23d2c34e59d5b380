use std::collections::BTreeMap;

use log::warn;
use rust_decimal::Decimal;
use serde::Serialize;

/// Current and reference price for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub current: Decimal,
    pub reference: Decimal,
}

/// Anything that can price the instruments held in a portfolio. Keeping this as a trait means
/// the ledger never depends on the price model directly.
pub trait PriceSource {
    fn quote(&self, name: &str) -> Option<Quote>;
}

/// Portfolio summary shown to the player after every turn.
///
/// The naming is historical and does not mean what it says:
/// * `total_investment` is the current market value of the holdings (shares times current
///   price), not the cash originally spent on them.
/// * `total_current_value` adds, per instrument, that market value scaled by the instrument's
///   fractional return over its reference price on top of the market value itself. Price
///   movement is therefore counted twice.
/// * `profit_loss_percent` compares the two, and is zero when nothing is held.
///
/// Totals that would overflow `Decimal` are clamped to `Decimal::MAX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Valuation {
    pub total_investment: Decimal,
    pub total_current_value: Decimal,
    pub profit_loss_percent: Decimal,
}

impl Valuation {
    pub fn compute<P>(holdings: &BTreeMap<String, u64>, prices: &P) -> Self
    where
        P: PriceSource + ?Sized,
    {
        let mut total_investment = Decimal::ZERO;
        let mut total_current_value = Decimal::ZERO;

        for (name, &shares) in holdings {
            let quote = match prices.quote(name) {
                Some(quote) => quote,
                None => {
                    warn!("No quote available for held instrument {name}; leaving it out of the valuation");
                    continue;
                }
            };

            if quote.current <= Decimal::ZERO || quote.reference <= Decimal::ZERO {
                continue;
            }

            let investment = Decimal::from(shares).checked_mul(quote.current);
            let current_value = investment.and_then(|investment| {
                let rate = (quote.current - quote.reference).checked_div(quote.reference)?;
                investment.checked_add(rate.checked_mul(investment)?)
            });

            total_investment = accumulate(total_investment, investment, name);
            total_current_value = accumulate(total_current_value, current_value, name);
        }

        let profit_loss_percent = if total_investment > Decimal::ZERO {
            (total_current_value - total_investment)
                .checked_div(total_investment)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .unwrap_or_else(|| {
                    warn!("Portfolio P/L overflowed; saturating at the maximum representable value");
                    Decimal::MAX
                })
        } else {
            Decimal::ZERO
        };

        Self {
            total_investment,
            total_current_value,
            profit_loss_percent,
        }
    }
}

// Totals saturate at Decimal::MAX instead of overflowing
fn accumulate(total: Decimal, amount: Option<Decimal>, name: &str) -> Decimal {
    match amount.and_then(|amount| total.checked_add(amount)) {
        Some(total) => total,
        None => {
            warn!("Valuation of {name} overflowed; saturating at the maximum representable value");
            Decimal::MAX
        }
    }
}
