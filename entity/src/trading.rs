use std::fmt::{self, Display, Formatter};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Buy,
    Sell,
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// An executed buy or sell. Transactions are recorded once and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub kind: TransactionKind,
    pub instrument: String,
    pub shares: u64,
    pub price: Decimal,
}

impl Transaction {
    /// Cash moved by the transaction, or `None` if it does not fit in a `Decimal`.
    pub fn notional(&self) -> Option<Decimal> {
        Decimal::from(self.shares).checked_mul(self.price)
    }
}

impl Display for Transaction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}: {} shares at {:.2} each",
            self.kind, self.instrument, self.shares, self.price
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn display_matches_history_listing() {
        let transaction = Transaction {
            kind: TransactionKind::Sell,
            instrument: "Apple".to_owned(),
            shares: 5,
            price: dec!(160),
        };

        assert_eq!(transaction.to_string(), "SELL - Apple: 5 shares at 160.00 each");
        assert_eq!(transaction.notional(), Some(dec!(800)));
    }

    #[test]
    fn notional_overflow_is_none() {
        let transaction = Transaction {
            kind: TransactionKind::Buy,
            instrument: "Apple".to_owned(),
            shares: u64::MAX,
            price: Decimal::MAX,
        };

        assert_eq!(transaction.notional(), None);
    }

    #[test]
    fn kind_serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&TransactionKind::Buy).unwrap(),
            "\"BUY\""
        );
    }
}
