use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::Place;

pub fn nights(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days()
}

/// What a stay at `place` should cost: nightly price times nights.
pub fn quote(place: &Place, check_in: NaiveDate, check_out: NaiveDate) -> Decimal {
    place.price * Decimal::from(nights(check_in, check_out).max(0))
}
