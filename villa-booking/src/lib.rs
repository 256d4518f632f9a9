pub mod availability;
pub mod dispatch;
pub mod ledger;
pub mod stats;
pub mod verification;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

use std::sync::Arc;
use villa_core::repository::{
    BookingRepository, PlaceRepository, UserRepository, VerificationRepository,
};

pub use availability::AvailabilityCalculator;
pub use dispatch::{DispatchPolicy, NotificationDispatcher};
pub use ledger::{BookingLedger, LedgerRules};
pub use stats::{Aggregator, StatsScope};
pub use verification::{OtpTtls, VerificationService};

/// The repositories every service draws from.
#[derive(Clone)]
pub struct Stores {
    pub bookings: Arc<dyn BookingRepository>,
    pub places: Arc<dyn PlaceRepository>,
    pub users: Arc<dyn UserRepository>,
    pub verifications: Arc<dyn VerificationRepository>,
}
