pub mod valuation;

use std::collections::BTreeMap;

use entity::trading::{Transaction, TransactionKind};
use log::{debug, trace};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use self::valuation::{PriceSource, Valuation};

/// Raised when the ledger is called in a way no user input should be able to produce.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Cash, holdings and the transaction history of the player.
///
/// Balance and holdings only change through [`Ledger::buy`] and [`Ledger::sell`], and each call
/// either applies all of its effects or none of them. The balance never goes negative. A
/// holding that drops to zero shares is removed, so an absent instrument means zero shares.
#[derive(Debug, Clone, Serialize)]
pub struct Ledger {
    balance: Decimal,
    holdings: BTreeMap<String, u64>,
    history: Vec<Transaction>,
}

impl Ledger {
    pub fn new(starting_balance: Decimal) -> Result<Self, LedgerError> {
        if starting_balance < Decimal::ZERO {
            return Err(LedgerError::InvalidArgument(format!(
                "Starting balance cannot be negative, got {starting_balance}"
            )));
        }

        Ok(Self {
            balance: starting_balance,
            holdings: BTreeMap::new(),
            history: Vec::new(),
        })
    }

    /// Buys `shares` of `instrument` at `price` each. Returns `Ok(false)` without touching any
    /// state if the balance cannot cover the cost. Buying zero shares trivially succeeds and
    /// records nothing.
    pub fn buy(
        &mut self,
        instrument: &str,
        shares: u64,
        price: Decimal,
    ) -> Result<bool, LedgerError> {
        Self::validate(instrument, price)?;

        if shares == 0 {
            trace!("Ignoring buy of zero shares of {instrument}");
            return Ok(true);
        }

        let transaction = Transaction {
            kind: TransactionKind::Buy,
            instrument: instrument.to_owned(),
            shares,
            price,
        };

        let cost = match transaction.notional() {
            Some(cost) if cost <= self.balance => cost,
            _ => {
                trace!(
                    "Cannot afford {shares} shares of {instrument} at {price:.2} with a balance of {:.2}",
                    self.balance
                );
                return Ok(false);
            }
        };

        let held = self.holding(instrument);
        let new_holding = held.checked_add(shares).ok_or_else(|| {
            LedgerError::InvalidArgument(format!(
                "Holding of {instrument} would exceed {} shares",
                u64::MAX
            ))
        })?;

        self.balance -= cost;
        self.holdings.insert(instrument.to_owned(), new_holding);
        self.history.push(transaction);

        debug!(
            "Bought {shares} shares of {instrument} at {price:.2} for {cost:.2}, balance is now {:.2}",
            self.balance
        );
        Ok(true)
    }

    /// Sells `shares` of `instrument` at `price` each. Returns `Ok(false)` without touching any
    /// state if fewer than `shares` are held.
    pub fn sell(
        &mut self,
        instrument: &str,
        shares: u64,
        price: Decimal,
    ) -> Result<bool, LedgerError> {
        Self::validate(instrument, price)?;

        let held = self.holding(instrument);
        if held < shares {
            trace!("Cannot sell {shares} shares of {instrument}, only {held} held");
            return Ok(false);
        }

        if shares == 0 {
            trace!("Ignoring sale of zero shares of {instrument}");
            return Ok(true);
        }

        let transaction = Transaction {
            kind: TransactionKind::Sell,
            instrument: instrument.to_owned(),
            shares,
            price,
        };

        let overflow = || {
            LedgerError::InvalidArgument(format!(
                "Proceeds of selling {shares} shares of {instrument} at {price} overflow the balance"
            ))
        };
        let proceeds = transaction.notional().ok_or_else(overflow)?;
        let new_balance = self.balance.checked_add(proceeds).ok_or_else(overflow)?;

        self.balance = new_balance;
        if held == shares {
            self.holdings.remove(instrument);
        } else {
            self.holdings.insert(instrument.to_owned(), held - shares);
        }
        self.history.push(transaction);

        debug!(
            "Sold {shares} shares of {instrument} at {price:.2} for {proceeds:.2}, balance is now {:.2}",
            self.balance
        );
        Ok(true)
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn portfolio(&self) -> &BTreeMap<String, u64> {
        &self.holdings
    }

    pub fn holding(&self, instrument: &str) -> u64 {
        self.holdings.get(instrument).copied().unwrap_or(0)
    }

    /// All executed transactions, oldest first.
    pub fn history(&self) -> &[Transaction] {
        &self.history
    }

    pub fn valuation<P>(&self, prices: &P) -> Valuation
    where
        P: PriceSource + ?Sized,
    {
        Valuation::compute(&self.holdings, prices)
    }

    fn validate(instrument: &str, price: Decimal) -> Result<(), LedgerError> {
        if instrument.is_empty() {
            return Err(LedgerError::InvalidArgument(
                "Instrument name cannot be empty".to_owned(),
            ));
        }

        if price <= Decimal::ZERO {
            return Err(LedgerError::InvalidArgument(format!(
                "Price per share of {instrument} must be positive, got {price}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;
    use rust_decimal_macros::dec;

    fn snapshot(ledger: &Ledger) -> (Decimal, BTreeMap<String, u64>, Vec<Transaction>) {
        (
            ledger.balance(),
            ledger.portfolio().clone(),
            ledger.history().to_vec(),
        )
    }

    #[test]
    fn buy_then_partial_sell_then_oversell() {
        let mut ledger = Ledger::new(dec!(10000)).unwrap();

        assert_eq!(ledger.buy("Apple", 10, dec!(150)), Ok(true));
        assert_eq!(ledger.balance(), dec!(8500));
        assert_eq!(ledger.holding("Apple"), 10);
        assert_eq!(ledger.portfolio().len(), 1);

        assert_eq!(ledger.sell("Apple", 5, dec!(160)), Ok(true));
        assert_eq!(ledger.balance(), dec!(9300));
        assert_eq!(ledger.holding("Apple"), 5);

        let before = snapshot(&ledger);
        assert_eq!(ledger.sell("Apple", 10, dec!(160)), Ok(false));
        assert_eq!(snapshot(&ledger), before);
    }

    #[test]
    fn unaffordable_buy_changes_nothing() {
        let mut ledger = Ledger::new(dec!(100)).unwrap();

        assert_eq!(ledger.buy("Google", 1, dec!(2500)), Ok(false));
        assert_eq!(ledger.balance(), dec!(100));
        assert!(ledger.portfolio().is_empty());
        assert!(ledger.history().is_empty());
    }

    #[test]
    fn buy_can_spend_the_entire_balance() {
        let mut ledger = Ledger::new(dec!(300)).unwrap();

        assert_eq!(ledger.buy("Intel", 6, dec!(50)), Ok(true));
        assert!(ledger.balance().is_zero());
        assert_eq!(ledger.buy("Intel", 1, dec!(0.01)), Ok(false));
    }

    #[test]
    fn history_records_in_order() {
        let mut ledger = Ledger::new(dec!(10000)).unwrap();
        ledger.buy("Apple", 10, dec!(150)).unwrap();
        ledger.buy("Intel", 20, dec!(50)).unwrap();
        ledger.sell("Apple", 4, dec!(155.5)).unwrap();

        let history = ledger.history();
        assert_eq!(history.len(), 3);
        assert_eq!(
            history[0],
            Transaction {
                kind: TransactionKind::Buy,
                instrument: "Apple".to_owned(),
                shares: 10,
                price: dec!(150),
            }
        );
        assert_eq!(history[1].instrument, "Intel");
        assert_eq!(history[2].kind, TransactionKind::Sell);
        assert_eq!(history[2].price, dec!(155.5));
    }

    #[test]
    fn selling_everything_removes_the_holding() {
        let mut ledger = Ledger::new(dec!(1000)).unwrap();
        ledger.buy("Tesla", 1, dec!(700)).unwrap();

        assert_eq!(ledger.sell("Tesla", 1, dec!(650)), Ok(true));
        assert!(!ledger.portfolio().contains_key("Tesla"));
        assert_eq!(ledger.holding("Tesla"), 0);
        assert_eq!(ledger.balance(), dec!(950));
    }

    #[test]
    fn selling_an_unheld_instrument_fails() {
        let mut ledger = Ledger::new(dec!(1000)).unwrap();

        assert_eq!(ledger.sell("Netflix", 1, dec!(550)), Ok(false));
        assert_eq!(ledger.balance(), dec!(1000));
        assert!(ledger.history().is_empty());
    }

    #[test]
    fn zero_shares_is_a_no_op() {
        let mut ledger = Ledger::new(dec!(1000)).unwrap();
        let before = snapshot(&ledger);

        assert_eq!(ledger.buy("Apple", 0, dec!(150)), Ok(true));
        assert_eq!(ledger.sell("Apple", 0, dec!(150)), Ok(true));
        assert_eq!(snapshot(&ledger), before);
    }

    #[test]
    fn contract_violations_are_errors() {
        let mut ledger = Ledger::new(dec!(1000)).unwrap();

        assert!(matches!(
            ledger.buy("Apple", 1, Decimal::ZERO),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            ledger.sell("Apple", 1, dec!(-1)),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            ledger.buy("", 1, dec!(1)),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(Ledger::new(dec!(-0.01)).is_err());
        assert!(ledger.history().is_empty());
    }

    #[test]
    fn overflowing_sale_is_rejected_without_side_effects() {
        let mut ledger = Ledger::new(Decimal::MAX).unwrap();
        assert_eq!(ledger.buy("Apple", 1, dec!(1)), Ok(true));
        let before = snapshot(&ledger);

        assert!(matches!(
            ledger.sell("Apple", 1, dec!(10)),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert_eq!(snapshot(&ledger), before);
    }

    #[test]
    fn valuation_uses_supplied_prices() {
        use crate::market::PriceModel;

        let mut ledger = Ledger::new(dec!(10000)).unwrap();
        ledger.buy("Apple", 10, dec!(150)).unwrap();

        let market = PriceModel::new([("Apple", dec!(150)), ("Intel", dec!(50))]).unwrap();
        let valuation = ledger.valuation(&market);

        assert_eq!(valuation.total_investment, dec!(1500));
        assert_eq!(valuation.total_current_value, dec!(1500));
        assert!(valuation.profit_loss_percent.is_zero());
    }

    #[test]
    fn valuation_of_a_huge_position_survives_price_moves() {
        use crate::market::PriceModel;
        use rand::{rngs::StdRng, SeedableRng};

        let mut ledger = Ledger::new(Decimal::MAX).unwrap();
        let mut market = PriceModel::new([("Intel", dec!(50000000000))]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        assert_eq!(
            ledger.buy("Intel", 1_000_000_000_000_000_000, dec!(50000000000)),
            Ok(true)
        );

        for _ in 0..100 {
            market.tick(&mut rng);
            let valuation = ledger.valuation(&market);
            assert!(valuation.total_investment > Decimal::ZERO);
            assert!(valuation.total_current_value >= Decimal::ZERO);
        }
    }

    #[quickcheck]
    fn buy_then_sell_restores_state(shares: u16, cents: u32) -> TestResult {
        if shares == 0 || cents == 0 {
            return TestResult::discard();
        }

        let price = Decimal::new(i64::from(cents), 2);
        let mut ledger = Ledger::new(dec!(1000000000)).unwrap();
        let balance = ledger.balance();

        if !ledger.buy("Apple", u64::from(shares), price).unwrap() {
            return TestResult::discard();
        }

        let bought = ledger.balance() == balance - Decimal::from(shares) * price
            && ledger.holding("Apple") == u64::from(shares)
            && ledger.history().len() == 1;

        let sold = ledger.sell("Apple", u64::from(shares), price).unwrap();

        TestResult::from_bool(
            bought
                && sold
                && ledger.balance() == balance
                && ledger.portfolio().is_empty()
                && ledger.history().len() == 2,
        )
    }

    #[quickcheck]
    fn balance_never_goes_negative(orders: Vec<(bool, u8, u8, u16)>) -> bool {
        const NAMES: [&str; 3] = ["Apple", "Google", "Intel"];

        let mut ledger = Ledger::new(dec!(5000)).unwrap();

        for (is_buy, name, shares, cents) in orders {
            let name = NAMES[usize::from(name) % NAMES.len()];
            let price = Decimal::new(i64::from(cents) + 1, 2);
            let before = snapshot(&ledger);

            let executed = if is_buy {
                ledger.buy(name, u64::from(shares), price).unwrap()
            } else {
                ledger.sell(name, u64::from(shares), price).unwrap()
            };

            if !executed && snapshot(&ledger) != before {
                return false;
            }

            if ledger.balance() < Decimal::ZERO
                || ledger.portfolio().values().any(|&held| held == 0)
            {
                return false;
            }
        }

        true
    }
}
