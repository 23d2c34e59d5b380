// Every tick multiplies each price by a factor drawn uniformly from [0.9, 1.1]. There is no drift
// correction, so over many ticks prices wander geometrically without bound.

use std::collections::{hash_map::Entry, HashMap};

use common::util::percent_change;
use entity::market::{Instrument, Trend};
use log::{trace, warn};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::broker::valuation::{PriceSource, Quote};

// The tick factor is drawn as a whole number of billionths so that its bounds are exact
const TICK_FACTOR_SCALE: u32 = 9;
const TICK_FACTOR_MIN: i64 = 900_000_000;
const TICK_FACTOR_MAX: i64 = 1_100_000_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarketError {
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),
    #[error("Instrument {0} was configured more than once")]
    DuplicateInstrument(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceModel {
    instruments: Vec<Instrument>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl PriceModel {
    /// Creates the instrument set from `(name, starting price)` pairs. The starting price becomes
    /// both the current and the reference price. Configuration order is kept for iteration.
    pub fn new<I, S>(configuration: I) -> Result<Self, MarketError>
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<String>,
    {
        let mut instruments = Vec::new();
        let mut index = HashMap::new();

        for (name, price) in configuration {
            let name = name.into();

            if name.trim().is_empty() {
                return Err(MarketError::InvalidArgument(
                    "Instrument names cannot be empty".to_owned(),
                ));
            }

            if price <= Decimal::ZERO {
                return Err(MarketError::InvalidArgument(format!(
                    "Starting price of {name} must be positive, got {price}"
                )));
            }

            match index.entry(name.clone()) {
                Entry::Occupied(_) => return Err(MarketError::DuplicateInstrument(name)),
                Entry::Vacant(entry) => {
                    entry.insert(instruments.len());
                }
            }

            instruments.push(Instrument::new(name, price));
        }

        Ok(Self { instruments, index })
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn instrument(&self, name: &str) -> Option<&Instrument> {
        self.index.get(name).map(|&index| &self.instruments[index])
    }

    /// Looks up a price for a name typed in by the user. An unknown name is an expected outcome
    /// here, so it is reported as `None` rather than an error.
    pub fn price(&self, name: &str) -> Option<Decimal> {
        self.instrument(name).map(|instrument| instrument.price)
    }

    pub fn current_price(&self, name: &str) -> Result<Decimal, MarketError> {
        self.known(name).map(|instrument| instrument.price)
    }

    pub fn reference_price(&self, name: &str) -> Result<Decimal, MarketError> {
        self.known(name).map(|instrument| instrument.reference_price)
    }

    /// Percentage return of the current price over the reference price.
    pub fn return_percent(&self, name: &str) -> Result<Decimal, MarketError> {
        self.known(name)
            .map(|instrument| percent_change(instrument.reference_price, instrument.price))
    }

    pub fn trend(&self, name: &str) -> Result<Trend, MarketError> {
        self.known(name).map(Instrument::trend)
    }

    /// Advances every instrument by one step of the random walk.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for instrument in &mut self.instruments {
            let factor = Decimal::new(
                rng.gen_range(TICK_FACTOR_MIN..=TICK_FACTOR_MAX),
                TICK_FACTOR_SCALE,
            );

            match instrument.price.checked_mul(factor) {
                Some(price) => instrument.price = price,
                None => warn!(
                    "Price of {} overflowed when scaled by {factor}; holding it in place",
                    instrument.name
                ),
            }
        }

        trace!("Ticked {} instruments", self.instruments.len());
    }

    #[cfg(test)]
    pub(crate) fn set_price(&mut self, name: &str, price: Decimal) {
        if let Some(&index) = self.index.get(name) {
            self.instruments[index].price = price;
        }
    }

    fn known(&self, name: &str) -> Result<&Instrument, MarketError> {
        self.instrument(name)
            .ok_or_else(|| MarketError::UnknownInstrument(name.to_owned()))
    }
}

impl PriceSource for PriceModel {
    fn quote(&self, name: &str) -> Option<Quote> {
        self.instrument(name).map(|instrument| Quote {
            current: instrument.price,
            reference: instrument.reference_price,
        })
    }
}
