use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use villa_core::clock::Clock;
use villa_core::models::{Booking, User};
use villa_core::notify::Notification;
use villa_core::otp::{self, OtpPurpose, PendingVerification, VerifyOutcome};
use villa_core::{CoreError, CoreResult};
use villa_shared::Masked;

use crate::{NotificationDispatcher, Stores};

const NO_CANCELLATION_CODE: &str = "No cancellation request found for this booking";
const NO_REGISTRATION_CODE: &str = "No verification code found for this user";

/// Expired codes stay readable this long so late attempts still report
/// expiry, then the next issue sweeps them.
const EXPIRED_RETENTION_SECONDS: i64 = 24 * 60 * 60;

/// Lifetime of each kind of one-time code, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpTtls {
    pub registration: u64,
    pub cancellation: u64,
}

impl Default for OtpTtls {
    fn default() -> Self {
        Self {
            registration: otp::REGISTRATION_TTL_SECONDS,
            cancellation: otp::CANCELLATION_TTL_SECONDS,
        }
    }
}

impl OtpTtls {
    fn for_purpose(&self, purpose: OtpPurpose) -> u64 {
        match purpose {
            OtpPurpose::Registration => self.registration,
            OtpPurpose::Cancellation => self.cancellation,
        }
    }
}

/// Issues and checks one-time codes, and runs the two flows built on them:
/// email verification after registration, and confirmed cancellation.
#[derive(Clone)]
pub struct VerificationService {
    stores: Stores,
    dispatcher: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    ttls: OtpTtls,
}

impl VerificationService {
    pub fn new(
        stores: Stores,
        dispatcher: NotificationDispatcher,
        clock: Arc<dyn Clock>,
        ttls: OtpTtls,
    ) -> Self {
        Self { stores, dispatcher, clock, ttls }
    }

    /// Store a fresh code for `subject_id`, replacing any outstanding one.
    pub async fn issue(&self, subject_id: Uuid, purpose: OtpPurpose) -> CoreResult<u32> {
        let code = otp::generate_code();
        let pending = PendingVerification::issue(
            subject_id,
            purpose,
            code,
            self.clock.now(),
            self.ttls.for_purpose(purpose),
        );

        self.stores
            .verifications
            .put_verification(&pending)
            .await
            .map_err(CoreError::dependency)?;

        info!(%subject_id, %purpose, expires_at = %pending.expires_at, "Issued one-time code");

        let cutoff = self.clock.now() - chrono::Duration::seconds(EXPIRED_RETENTION_SECONDS);
        match self.stores.verifications.purge_expired_verifications(cutoff).await {
            Ok(0) => {}
            Ok(purged) => debug!(purged, "Purged expired one-time codes"),
            Err(e) => warn!(error = %e, "Failed to purge expired one-time codes"),
        }
        Ok(code)
    }

    /// Check `submitted` against the outstanding code. Does not consume it.
    pub async fn verify(&self, subject_id: Uuid, purpose: OtpPurpose, submitted: u32) -> CoreResult<VerifyOutcome> {
        let pending = self
            .stores
            .verifications
            .get_verification(subject_id, purpose)
            .await
            .map_err(CoreError::dependency)?;

        let outcome = otp::evaluate(pending.as_ref(), submitted, self.clock.now());
        if outcome != VerifyOutcome::Valid {
            warn!(%subject_id, %purpose, ?outcome, "One-time code rejected");
        }
        Ok(outcome)
    }

    /// Send (or resend) the email verification code for an unverified account.
    pub async fn send_registration_code(&self, email: &str) -> CoreResult<()> {
        let user = self.user_by_email(email).await?;
        if user.verified {
            return Err(CoreError::validation("Email is already verified"));
        }

        let code = self.issue(user.id, OtpPurpose::Registration).await?;
        self.dispatcher
            .dispatch(Notification::RegistrationCode {
                to: user.email,
                code,
                ttl_seconds: self.ttls.registration,
            })
            .await;
        Ok(())
    }

    /// Mark the account verified when `submitted` matches. The code is
    /// consumed on success only.
    pub async fn verify_registration(&self, email: &str, submitted: u32) -> CoreResult<User> {
        let mut user = self.user_by_email(email).await?;

        self.verify(user.id, OtpPurpose::Registration, submitted)
            .await?
            .into_result(NO_REGISTRATION_CODE)?;

        self.stores
            .users
            .mark_verified(user.id)
            .await
            .map_err(CoreError::dependency)?;
        self.discard(user.id, OtpPurpose::Registration).await;

        info!(user_id = %user.id, email = %Masked(&user.email), "Email verified");
        user.verified = true;
        Ok(user)
    }

    /// Start a confirmed cancellation: email the booking's guest a code.
    pub async fn request_cancellation(&self, booking_id: Uuid, requester: Uuid) -> CoreResult<()> {
        let booking = self.owned_booking(booking_id, requester).await?;
        self.send_cancellation_code(&booking).await
    }

    /// Same as [`request_cancellation`](Self::request_cancellation); the new
    /// code replaces the old one and restarts its window.
    pub async fn resend_cancellation(&self, booking_id: Uuid, requester: Uuid) -> CoreResult<()> {
        let booking = self.owned_booking(booking_id, requester).await?;
        self.send_cancellation_code(&booking).await
    }

    /// Delete the booking when `submitted` matches. Of several concurrent
    /// calls with the right code exactly one succeeds; the others see the
    /// booking as already gone.
    pub async fn verify_cancellation(&self, booking_id: Uuid, requester: Uuid, submitted: u32) -> CoreResult<Booking> {
        let booking = self.owned_booking(booking_id, requester).await?;

        self.verify(booking.id, OtpPurpose::Cancellation, submitted)
            .await?
            .into_result(NO_CANCELLATION_CODE)?;

        let deleted = self
            .stores
            .bookings
            .delete_booking(booking.id)
            .await
            .map_err(CoreError::dependency)?;
        if !deleted {
            return Err(CoreError::not_found("Booking not found"));
        }
        self.discard(booking.id, OtpPurpose::Cancellation).await;

        info!(booking_id = %booking.id, user_id = %requester, "Booking cancelled");

        let villa = match self.stores.places.get_place(booking.place_id).await {
            Ok(Some(place)) => place.title,
            Ok(None) => "N/A".to_string(),
            Err(e) => {
                warn!(booking_id = %booking.id, error = %e, "Place lookup failed for cancellation email");
                "N/A".to_string()
            }
        };
        if let Some(to) = self.guest_email(&booking).await {
            self.dispatcher
                .dispatch(Notification::BookingCancelled {
                    to,
                    villa,
                    check_in: booking.check_in,
                    check_out: booking.check_out,
                })
                .await;
        }

        Ok(booking)
    }

    async fn send_cancellation_code(&self, booking: &Booking) -> CoreResult<()> {
        let to = self
            .guest_email(booking)
            .await
            .ok_or_else(|| CoreError::not_found("User not found"))?;

        let code = self.issue(booking.id, OtpPurpose::Cancellation).await?;
        self.dispatcher
            .dispatch(Notification::CancellationCode {
                to,
                code,
                ttl_seconds: self.ttls.cancellation,
            })
            .await;
        Ok(())
    }

    async fn owned_booking(&self, booking_id: Uuid, requester: Uuid) -> CoreResult<Booking> {
        let booking = self
            .stores
            .bookings
            .get_booking(booking_id)
            .await
            .map_err(CoreError::dependency)?
            .ok_or_else(|| CoreError::not_found("Booking not found"))?;

        if booking.user_id != requester {
            warn!(%booking_id, user_id = %requester, "Cancellation attempted by non-owner");
            return Err(CoreError::Forbidden(
                "You are not authorized to cancel this booking".to_string(),
            ));
        }
        Ok(booking)
    }

    async fn user_by_email(&self, email: &str) -> CoreResult<User> {
        self.stores
            .users
            .find_by_email(email.trim())
            .await
            .map_err(CoreError::dependency)?
            .ok_or_else(|| CoreError::not_found("User not found"))
    }

    async fn guest_email(&self, booking: &Booking) -> Option<String> {
        match self.stores.users.get_user(booking.user_id).await {
            Ok(Some(user)) => Some(user.email),
            Ok(None) => {
                warn!(booking_id = %booking.id, user_id = %booking.user_id, "No user record for booking");
                None
            }
            Err(e) => {
                warn!(booking_id = %booking.id, error = %e, "User lookup failed");
                None
            }
        }
    }

    // A leftover record only costs a NotFound on the next attempt.
    async fn discard(&self, subject_id: Uuid, purpose: OtpPurpose) {
        if let Err(e) = self.stores.verifications.delete_verification(subject_id, purpose).await {
            warn!(%subject_id, %purpose, error = %e, "Failed to discard used code");
        }
    }
}
