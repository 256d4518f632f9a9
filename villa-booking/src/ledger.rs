use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use villa_core::clock::Clock;
use villa_core::models::{Booking, BookingSummary, BookingWithPlace, Customer, NewBooking, Place};
use villa_core::notify::Notification;
use villa_core::otp::OtpPurpose;
use villa_core::pricing;
use villa_core::{CoreError, CoreResult};
use villa_shared::Masked;

use crate::{NotificationDispatcher, Stores};

/// Server-side checks applied on top of the input invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerRules {
    /// Recompute the stay price from the nightly rate and reject mismatches.
    pub verify_price: bool,
    /// Refuse stays that share a day with an existing booking.
    pub reject_overlaps: bool,
    /// Longest stay accepted, in nights.
    pub max_nights: i64,
}

pub const DEFAULT_MAX_NIGHTS: i64 = 365;

impl Default for LedgerRules {
    fn default() -> Self {
        Self { verify_price: true, reject_overlaps: true, max_nights: DEFAULT_MAX_NIGHTS }
    }
}

/// Creates, lists and deletes booking records.
#[derive(Clone)]
pub struct BookingLedger {
    stores: Stores,
    dispatcher: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    rules: LedgerRules,
}

impl BookingLedger {
    pub fn new(
        stores: Stores,
        dispatcher: NotificationDispatcher,
        clock: Arc<dyn Clock>,
        rules: LedgerRules,
    ) -> Self {
        Self { stores, dispatcher, clock, rules }
    }

    /// Record a paid stay and send the guest a confirmation. Nothing is
    /// persisted when any check fails; a failed email does not undo the
    /// booking.
    pub async fn create(&self, request: NewBooking) -> CoreResult<Booking> {
        validate(&request)?;

        let nights = pricing::nights(request.check_in, request.check_out);
        if nights > self.rules.max_nights {
            return Err(CoreError::validation(format!(
                "Stays are limited to {} nights",
                self.rules.max_nights
            )));
        }

        let place = self
            .stores
            .places
            .get_place(request.place_id)
            .await
            .map_err(CoreError::dependency)?
            .ok_or_else(|| CoreError::not_found("Place not found"))?;

        if request.number_of_guests > place.max_guests {
            return Err(CoreError::validation(format!(
                "This place allows at most {} guests",
                place.max_guests
            )));
        }

        if self.rules.verify_price {
            let expected = pricing::quote(&place, request.check_in, request.check_out);
            if expected != request.price {
                warn!(place_id = %place.id, %expected, submitted = %request.price, "Rejected booking with mismatched price");
                return Err(CoreError::validation(format!(
                    "Price mismatch: expected {} for {} nights",
                    expected,
                    pricing::nights(request.check_in, request.check_out)
                )));
            }
        }

        let booking = Booking::new(request, self.clock.now());
        let inserted = self
            .stores
            .bookings
            .insert_booking(&booking, self.rules.reject_overlaps)
            .await
            .map_err(CoreError::dependency)?;

        if !inserted {
            return Err(CoreError::Conflict(
                "The selected dates overlap an existing booking".to_string(),
            ));
        }

        info!(
            booking_id = %booking.id,
            place_id = %booking.place_id,
            user_id = %booking.user_id,
            check_in = %booking.check_in,
            check_out = %booking.check_out,
            "Booking created"
        );

        self.notify_confirmed(&booking, &place).await;
        Ok(booking)
    }

    async fn notify_confirmed(&self, booking: &Booking, place: &Place) {
        match self.stores.users.get_user(booking.user_id).await {
            Ok(Some(user)) => {
                self.dispatcher
                    .dispatch(Notification::BookingConfirmed {
                        to: user.email,
                        villa: place.title.clone(),
                        check_in: booking.check_in,
                        check_out: booking.check_out,
                        guests: booking.number_of_guests,
                        phone: booking.phone.clone(),
                        price: booking.price,
                    })
                    .await;
            }
            Ok(None) => warn!(booking_id = %booking.id, user_id = %booking.user_id, "No user record, confirmation not sent"),
            Err(e) => warn!(booking_id = %booking.id, error = %e, "User lookup failed, confirmation not sent"),
        }
    }

    /// The caller's bookings, each with its place resolved.
    pub async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<BookingWithPlace>> {
        let bookings = self
            .stores
            .bookings
            .list_for_user(user_id)
            .await
            .map_err(CoreError::dependency)?;
        let places = self.places_of(&bookings).await?;

        Ok(bookings
            .into_iter()
            .map(|b| {
                let place = places.get(&b.place_id).cloned();
                b.with_place(place)
            })
            .collect())
    }

    /// Bookings of places owned by `owner_id`, newest check-in first.
    pub async fn list_for_owner(&self, owner_id: Uuid, limit: Option<i64>) -> CoreResult<Vec<Booking>> {
        let owned = self.owned_places(owner_id).await?;
        let ids: Vec<Uuid> = owned.keys().copied().collect();
        self.stores
            .bookings
            .list_for_places(&ids, limit)
            .await
            .map_err(CoreError::dependency)
    }

    pub async fn owner_summaries(&self, owner_id: Uuid, limit: Option<i64>) -> CoreResult<Vec<BookingSummary>> {
        let owned = self.owned_places(owner_id).await?;
        let ids: Vec<Uuid> = owned.keys().copied().collect();
        let bookings = self
            .stores
            .bookings
            .list_for_places(&ids, limit)
            .await
            .map_err(CoreError::dependency)?;

        Ok(bookings.iter().map(|b| b.summary(owned.get(&b.place_id))).collect())
    }

    /// Distinct guests across the owner's places, most recent stay first.
    pub async fn owner_customers(&self, owner_id: Uuid) -> CoreResult<Vec<Customer>> {
        let bookings = self.list_for_owner(owner_id, None).await?;

        let mut seen = HashSet::new();
        Ok(bookings
            .into_iter()
            .filter(|b| seen.insert(b.user_id))
            .map(|b| Customer { id: b.user_id, name: b.name, phone: b.phone })
            .collect())
    }

    /// Every booking as a dashboard row, newest check-in first.
    pub async fn summaries(&self, limit: Option<i64>) -> CoreResult<Vec<BookingSummary>> {
        let bookings = self
            .stores
            .bookings
            .list_all(limit)
            .await
            .map_err(CoreError::dependency)?;
        let places = self.places_of(&bookings).await?;

        Ok(bookings.iter().map(|b| b.summary(places.get(&b.place_id))).collect())
    }

    /// Direct removal by the booking's own guest. Missing and foreign
    /// bookings are indistinguishable to the caller.
    pub async fn delete(&self, booking_id: Uuid, requester: Uuid) -> CoreResult<()> {
        let removed = self
            .stores
            .bookings
            .delete_owned_booking(booking_id, requester)
            .await
            .map_err(CoreError::dependency)?;

        if !removed {
            warn!(%booking_id, user_id = %requester, "Delete refused: not found or not owner");
            return Err(CoreError::not_found(
                "Booking not found or you are not authorized to cancel this booking",
            ));
        }

        info!(%booking_id, user_id = %requester, "Booking deleted");

        // A cancellation code may still be outstanding for it.
        if let Err(e) = self
            .stores
            .verifications
            .delete_verification(booking_id, OtpPurpose::Cancellation)
            .await
        {
            warn!(%booking_id, error = %e, "Failed to discard cancellation code");
        }
        Ok(())
    }

    async fn owned_places(&self, owner_id: Uuid) -> CoreResult<HashMap<Uuid, Place>> {
        let places = self
            .stores
            .places
            .list_owned(owner_id)
            .await
            .map_err(CoreError::dependency)?;
        Ok(places.into_iter().map(|p| (p.id, p)).collect())
    }

    async fn places_of(&self, bookings: &[Booking]) -> CoreResult<HashMap<Uuid, Place>> {
        let ids: Vec<Uuid> = bookings
            .iter()
            .map(|b| b.place_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let places = self
            .stores
            .places
            .get_places(&ids)
            .await
            .map_err(CoreError::dependency)?;
        Ok(places.into_iter().map(|p| (p.id, p)).collect())
    }
}

fn validate(request: &NewBooking) -> CoreResult<()> {
    if request.payment_id.trim().is_empty() {
        return Err(CoreError::validation("Payment is required before booking"));
    }
    if request.check_in >= request.check_out {
        return Err(CoreError::validation("Check-out must be after check-in"));
    }
    if request.number_of_guests < 1 {
        return Err(CoreError::validation("At least one guest is required"));
    }
    if request.price <= rust_decimal::Decimal::ZERO {
        return Err(CoreError::validation("Price must be positive"));
    }
    if request.name.trim().is_empty() || request.phone.trim().is_empty() {
        warn!(phone = %Masked(&request.phone), "Rejected booking without contact details");
        return Err(CoreError::validation("Name and phone are required"));
    }
    Ok(())
}
