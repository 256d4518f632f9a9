use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use villa_core::availability::booked_dates;
use villa_core::repository::BookingRepository;
use villa_core::{CoreError, CoreResult};

/// Answers "which days of this place are taken". Advisory for the date
/// picker; the ledger enforces conflicts on its own.
#[derive(Clone)]
pub struct AvailabilityCalculator {
    bookings: Arc<dyn BookingRepository>,
}

impl AvailabilityCalculator {
    pub fn new(bookings: Arc<dyn BookingRepository>) -> Self {
        Self { bookings }
    }

    /// Sorted, de-duplicated booked days for `place_id`. An unknown place
    /// simply has none.
    pub async fn booked_dates(&self, place_id: Uuid) -> CoreResult<Vec<NaiveDate>> {
        let bookings = self
            .bookings
            .list_for_place(place_id)
            .await
            .map_err(CoreError::dependency)?;

        let dates: Vec<NaiveDate> = booked_dates(&bookings).into_iter().collect();
        debug!(%place_id, bookings = bookings.len(), days = dates.len(), "Computed availability");
        Ok(dates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use villa_core::models::{Booking, NewBooking};
    use villa_store::MemoryStore;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    async fn book(store: &MemoryStore, place_id: Uuid, from: NaiveDate, to: NaiveDate) {
        let booking = Booking::new(
            NewBooking {
                place_id,
                user_id: Uuid::new_v4(),
                check_in: from,
                check_out: to,
                number_of_guests: 2,
                name: "Guest".to_string(),
                phone: "555".to_string(),
                price: Decimal::from(100),
                payment_id: "pay".to_string(),
            },
            Utc::now(),
        );
        store.insert_booking(&booking, false).await.unwrap();
    }

    #[tokio::test]
    async fn test_single_booking_covers_every_day() {
        let store = Arc::new(MemoryStore::new());
        let place = Uuid::new_v4();
        book(&store, place, day(6, 10), day(6, 12)).await;

        let calc = AvailabilityCalculator::new(store);
        assert_eq!(
            calc.booked_dates(place).await.unwrap(),
            vec![day(6, 10), day(6, 11), day(6, 12)]
        );
    }

    #[tokio::test]
    async fn test_only_the_requested_place() {
        let store = Arc::new(MemoryStore::new());
        let place = Uuid::new_v4();
        let other = Uuid::new_v4();
        book(&store, place, day(7, 1), day(7, 1)).await;
        book(&store, other, day(7, 2), day(7, 5)).await;
        book(&store, place, day(6, 30), day(7, 2)).await;

        let calc = AvailabilityCalculator::new(store);
        assert_eq!(
            calc.booked_dates(place).await.unwrap(),
            vec![day(6, 30), day(7, 1), day(7, 2)]
        );
        assert!(calc.booked_dates(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
