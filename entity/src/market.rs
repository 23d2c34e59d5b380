use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A tradable named asset. The reference price is captured when the instrument is created and
/// never changes; the current price moves every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    pub price: Decimal,
    pub reference_price: Decimal,
}

impl Instrument {
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into(),
            price,
            reference_price: price,
        }
    }

    pub fn trend(&self) -> Trend {
        match self.price.cmp(&self.reference_price) {
            std::cmp::Ordering::Greater => Trend::Up,
            std::cmp::Ordering::Less => Trend::Down,
            std::cmp::Ordering::Equal => Trend::Flat,
        }
    }
}

/// Direction of the current price relative to the reference price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_instrument_starts_at_reference() {
        let instrument = Instrument::new("Apple", dec!(150));
        assert_eq!(instrument.price, instrument.reference_price);
        assert_eq!(instrument.trend(), Trend::Flat);
    }

    #[test]
    fn trend_follows_price() {
        let mut instrument = Instrument::new("Intel", dec!(50));
        instrument.price = dec!(50.01);
        assert_eq!(instrument.trend(), Trend::Up);
        instrument.price = dec!(49.99);
        assert_eq!(instrument.trend(), Trend::Down);
    }
}
