use std::io::{self, Write};

use colored::Colorize;
use entity::market::Trend;
use log::warn;
use rust_decimal::Decimal;

use crate::{broker::Ledger, market::PriceModel};

/// Writes a price and its return since the session started, colored by direction. Names the
/// market does not know are skipped.
pub fn write_instrument<W: Write>(w: &mut W, market: &PriceModel, name: &str) -> io::Result<()> {
    let quote = market.current_price(name).and_then(|price| {
        Ok((price, market.trend(name)?, market.return_percent(name)?))
    });

    let (price, trend, change) = match quote {
        Ok(quote) => quote,
        Err(error) => {
            warn!("Not displaying {name}: {error}");
            return Ok(());
        }
    };

    let price = format!("{price:.2}");
    let price = match trend {
        Trend::Up => price.green(),
        Trend::Down => price.red(),
        Trend::Flat => price.normal(),
    };

    let change = match change.round_dp(2) {
        change if change.is_zero() => Decimal::ZERO,
        change => change,
    };
    let sign = if change < Decimal::ZERO { "" } else { "+" };

    writeln!(w, "{name}: {price} ({sign}{change:.2}%)")
}

pub fn write_ticker_board<W: Write>(w: &mut W, market: &PriceModel) -> io::Result<()> {
    writeln!(w, "------ Ticker Board ------")?;
    for instrument in market.instruments() {
        write_instrument(w, market, &instrument.name)?;
    }
    Ok(())
}

pub fn write_account_info<W: Write>(
    w: &mut W,
    ledger: &Ledger,
    market: &PriceModel,
) -> io::Result<()> {
    writeln!(w, "\n------ Your Information ------")?;
    writeln!(w, "Current Balance: {:.2}", ledger.balance())?;

    for name in ledger.portfolio().keys() {
        write_instrument(w, market, name)?;
    }

    let valuation = ledger.valuation(market);
    writeln!(w, "\nTotal Investment: {:.2}", valuation.total_investment)?;
    writeln!(w, "Total Current Value: {:.2}", valuation.total_current_value)?;
    writeln!(w, "P/L (%): {:.2}%", valuation.profit_loss_percent)
}

pub fn write_portfolio<W: Write>(w: &mut W, ledger: &Ledger) -> io::Result<()> {
    writeln!(w, "------ Portfolio ------")?;

    if ledger.portfolio().is_empty() {
        return writeln!(w, "You do not own any shares.");
    }

    for (name, shares) in ledger.portfolio() {
        writeln!(w, "{name}: {shares} shares")?;
    }
    Ok(())
}

pub fn write_history<W: Write>(w: &mut W, ledger: &Ledger) -> io::Result<()> {
    writeln!(w, "------ Transaction History ------")?;

    if ledger.history().is_empty() {
        return writeln!(w, "No transactions yet.");
    }

    for transaction in ledger.history() {
        writeln!(w, "{transaction}")?;
    }
    Ok(())
}
