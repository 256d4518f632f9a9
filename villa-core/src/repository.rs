use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Booking, BookingTotals, Place, User};
use crate::otp::{OtpPurpose, PendingVerification};

pub type RepoResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Repository trait for booking records
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Persist a new booking. With `reject_overlaps` set, the insert is
    /// skipped and `false` returned when another booking of the same place
    /// shares a day with it; the check and insert are atomic per place.
    async fn insert_booking(&self, booking: &Booking, reject_overlaps: bool) -> RepoResult<bool>;

    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<Booking>>;

    async fn list_for_place(&self, place_id: Uuid) -> RepoResult<Vec<Booking>>;

    async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Booking>>;

    /// Bookings of any of `place_ids`, newest check-in first.
    async fn list_for_places(&self, place_ids: &[Uuid], limit: Option<i64>) -> RepoResult<Vec<Booking>>;

    /// All bookings, newest check-in first.
    async fn list_all(&self, limit: Option<i64>) -> RepoResult<Vec<Booking>>;

    /// Delete by id. Returns `true` for exactly one of any number of
    /// concurrent callers.
    async fn delete_booking(&self, id: Uuid) -> RepoResult<bool>;

    /// Delete only if the booking belongs to `user_id`.
    async fn delete_owned_booking(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool>;

    /// Count, distinct guests and summed price over all bookings, or over the
    /// bookings of `place_ids` when given.
    async fn totals(&self, place_ids: Option<&[Uuid]>) -> RepoResult<BookingTotals>;
}

/// Read-side lookup of listings
#[async_trait]
pub trait PlaceRepository: Send + Sync {
    async fn get_place(&self, id: Uuid) -> RepoResult<Option<Place>>;

    async fn get_places(&self, ids: &[Uuid]) -> RepoResult<Vec<Place>>;

    async fn list_owned(&self, owner_id: Uuid) -> RepoResult<Vec<Place>>;

    async fn count_places(&self) -> RepoResult<i64>;
}

/// Read-side lookup of accounts, plus the one write the core owns.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    async fn mark_verified(&self, id: Uuid) -> RepoResult<bool>;

    async fn count_users(&self) -> RepoResult<i64>;
}

/// Storage for outstanding one-time codes, one per (subject, purpose).
#[async_trait]
pub trait VerificationRepository: Send + Sync {
    /// Insert or overwrite.
    async fn put_verification(&self, pending: &PendingVerification) -> RepoResult<()>;

    async fn get_verification(
        &self,
        subject_id: Uuid,
        purpose: OtpPurpose,
    ) -> RepoResult<Option<PendingVerification>>;

    async fn delete_verification(&self, subject_id: Uuid, purpose: OtpPurpose) -> RepoResult<bool>;

    /// Drop every code that expired before `before`. Returns how many went.
    async fn purge_expired_verifications(&self, before: DateTime<Utc>) -> RepoResult<u64>;
}
