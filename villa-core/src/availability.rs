use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::models::Booking;

/// Every calendar day a stay occupies, check-in through check-out inclusive.
/// A same-day stay still occupies its one day.
pub fn stay_days(check_in: NaiveDate, check_out: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let last = check_out.max(check_in);
    check_in.iter_days().take_while(move |day| *day <= last)
}

/// Union of the occupied days of `bookings`, sorted ascending.
pub fn booked_dates<'a, I>(bookings: I) -> BTreeSet<NaiveDate>
where
    I: IntoIterator<Item = &'a Booking>,
{
    bookings
        .into_iter()
        .flat_map(|b| stay_days(b.check_in, b.check_out))
        .collect()
}

/// Two stays conflict when they share at least one occupied day.
pub fn stays_overlap(
    a_in: NaiveDate,
    a_out: NaiveDate,
    b_in: NaiveDate,
    b_out: NaiveDate,
) -> bool {
    a_in <= b_out.max(b_in) && b_in <= a_out.max(a_in)
}
