use std::sync::Arc;
use villa_booking::{AvailabilityCalculator, Aggregator, BookingLedger, VerificationService};
use villa_store::app_config::RateLimitConfig;
use villa_store::RedisClient;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<BookingLedger>,
    pub availability: Arc<AvailabilityCalculator>,
    pub verification: Arc<VerificationService>,
    pub aggregator: Arc<Aggregator>,
    /// Rate limiting is off when unset.
    pub redis: Option<Arc<RedisClient>>,
    pub rate_limit: RateLimitConfig,
    pub auth: AuthConfig,
}
