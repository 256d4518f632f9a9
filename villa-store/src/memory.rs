use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;
use villa_core::availability::stays_overlap;
use villa_core::models::{Booking, BookingTotals, Place, User};
use villa_core::otp::{OtpPurpose, PendingVerification};
use villa_core::repository::{
    BookingRepository, PlaceRepository, RepoResult, UserRepository, VerificationRepository,
};

/// Process-local store backing every repository trait. Used by tests and by
/// `storage.backend = "memory"`. Each operation holds the relevant lock for
/// its whole read-modify-write, which gives the same atomicity the Postgres
/// repositories get from row counts and advisory locks.
#[derive(Default)]
pub struct MemoryStore {
    bookings: RwLock<HashMap<Uuid, Booking>>,
    places: RwLock<HashMap<Uuid, Place>>,
    users: RwLock<HashMap<Uuid, User>>,
    verifications: RwLock<HashMap<(Uuid, OtpPurpose), PendingVerification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_place(&self, place: Place) {
        self.places.write().await.insert(place.id, place);
    }

    pub async fn remove_place(&self, id: Uuid) -> Option<Place> {
        self.places.write().await.remove(&id)
    }

    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn booking_count(&self) -> usize {
        self.bookings.read().await.len()
    }
}

fn newest_first(mut bookings: Vec<Booking>, limit: Option<i64>) -> Vec<Booking> {
    bookings.sort_by(|a, b| b.check_in.cmp(&a.check_in).then(b.created_at.cmp(&a.created_at)));
    if let Some(limit) = limit {
        bookings.truncate(limit.max(0) as usize);
    }
    bookings
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn insert_booking(&self, booking: &Booking, reject_overlaps: bool) -> RepoResult<bool> {
        let mut bookings = self.bookings.write().await;

        if reject_overlaps {
            let clash = bookings.values().any(|existing| {
                existing.place_id == booking.place_id
                    && stays_overlap(existing.check_in, existing.check_out, booking.check_in, booking.check_out)
            });
            if clash {
                return Ok(false);
            }
        }

        bookings.insert(booking.id, booking.clone());
        Ok(true)
    }

    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<Booking>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn list_for_place(&self, place_id: Uuid) -> RepoResult<Vec<Booking>> {
        let mut found: Vec<Booking> = self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| b.place_id == place_id)
            .cloned()
            .collect();
        found.sort_by_key(|b| b.check_in);
        Ok(found)
    }

    async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Booking>> {
        let found = self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(found, None))
    }

    async fn list_for_places(&self, place_ids: &[Uuid], limit: Option<i64>) -> RepoResult<Vec<Booking>> {
        let wanted: HashSet<&Uuid> = place_ids.iter().collect();
        let found = self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| wanted.contains(&b.place_id))
            .cloned()
            .collect();
        Ok(newest_first(found, limit))
    }

    async fn list_all(&self, limit: Option<i64>) -> RepoResult<Vec<Booking>> {
        let found = self.bookings.read().await.values().cloned().collect();
        Ok(newest_first(found, limit))
    }

    async fn delete_booking(&self, id: Uuid) -> RepoResult<bool> {
        Ok(self.bookings.write().await.remove(&id).is_some())
    }

    async fn delete_owned_booking(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let mut bookings = self.bookings.write().await;
        match bookings.get(&id) {
            Some(b) if b.user_id == user_id => {
                bookings.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn totals(&self, place_ids: Option<&[Uuid]>) -> RepoResult<BookingTotals> {
        let bookings = self.bookings.read().await;
        let wanted: Option<HashSet<&Uuid>> = place_ids.map(|ids| ids.iter().collect());

        let mut totals = BookingTotals { earnings: Decimal::ZERO, ..Default::default() };
        let mut guests = HashSet::new();
        for b in bookings.values() {
            if let Some(wanted) = &wanted {
                if !wanted.contains(&b.place_id) {
                    continue;
                }
            }
            totals.bookings += 1;
            totals.earnings += b.price;
            guests.insert(b.user_id);
        }
        totals.distinct_users = guests.len() as i64;
        Ok(totals)
    }
}

#[async_trait]
impl PlaceRepository for MemoryStore {
    async fn get_place(&self, id: Uuid) -> RepoResult<Option<Place>> {
        Ok(self.places.read().await.get(&id).cloned())
    }

    async fn get_places(&self, ids: &[Uuid]) -> RepoResult<Vec<Place>> {
        let places = self.places.read().await;
        Ok(ids.iter().filter_map(|id| places.get(id).cloned()).collect())
    }

    async fn list_owned(&self, owner_id: Uuid) -> RepoResult<Vec<Place>> {
        let mut owned: Vec<Place> = self
            .places
            .read()
            .await
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(owned)
    }

    async fn count_places(&self) -> RepoResult<i64> {
        Ok(self.places.read().await.len() as i64)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self.users.read().await.values().find(|u| u.email == email).cloned())
    }

    async fn mark_verified(&self, id: Uuid) -> RepoResult<bool> {
        match self.users.write().await.get_mut(&id) {
            Some(user) => {
                user.verified = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_users(&self) -> RepoResult<i64> {
        Ok(self.users.read().await.len() as i64)
    }
}

#[async_trait]
impl VerificationRepository for MemoryStore {
    async fn put_verification(&self, pending: &PendingVerification) -> RepoResult<()> {
        self.verifications
            .write()
            .await
            .insert((pending.subject_id, pending.purpose), pending.clone());
        Ok(())
    }

    async fn get_verification(
        &self,
        subject_id: Uuid,
        purpose: OtpPurpose,
    ) -> RepoResult<Option<PendingVerification>> {
        Ok(self.verifications.read().await.get(&(subject_id, purpose)).cloned())
    }

    async fn delete_verification(&self, subject_id: Uuid, purpose: OtpPurpose) -> RepoResult<bool> {
        Ok(self.verifications.write().await.remove(&(subject_id, purpose)).is_some())
    }

    async fn purge_expired_verifications(&self, before: DateTime<Utc>) -> RepoResult<u64> {
        let mut pending = self.verifications.write().await;
        let start = pending.len();
        pending.retain(|_, p| p.expires_at >= before);
        Ok((start - pending.len()) as u64)
    }
}
