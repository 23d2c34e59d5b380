use log::LevelFilter;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{
    format_description::{self, FormatItem},
    OffsetDateTime,
};

pub static TIME_FORMAT: Lazy<Vec<FormatItem<'static>>> = Lazy::new(|| {
    format_description::parse("[hour repr:24]:[minute]:[second]")
        .expect("Invalid time format description")
});

pub static DATE_FORMAT: Lazy<Vec<FormatItem<'static>>> =
    Lazy::new(|| format_description::parse("[year]-[month]-[day]").expect("Invalid date format"));

/// The current time in the local offset, falling back to UTC when the local offset cannot be
/// determined (which is the case on some platforms once multiple threads are running).
pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Percentage change from `base` to `value`. Callers must ensure `base` is non-zero.
#[inline]
pub fn percent_change(base: Decimal, value: Decimal) -> Decimal {
    (value - base) / base * Decimal::ONE_HUNDRED
}

#[derive(Serialize, Deserialize)]
#[serde(remote = "LevelFilter")]
pub enum SerdeLevelFilter {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn percent_change_is_signed() {
        assert_eq!(percent_change(dec!(150), dec!(165)), dec!(10));
        assert_eq!(percent_change(dec!(200), dec!(150)), dec!(-25));
        assert_eq!(percent_change(dec!(50), dec!(50)), Decimal::ZERO);
    }
}
