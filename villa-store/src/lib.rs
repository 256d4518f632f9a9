pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod mailer;
pub mod memory;
pub mod place_repo;
pub mod redis_repo;
pub mod user_repo;
pub mod verification_repo;

pub use booking_repo::PgBookingRepository;
pub use database::DbClient;
pub use mailer::{LogMailer, SmtpMailer};
pub use memory::MemoryStore;
pub use place_repo::PgPlaceRepository;
pub use redis_repo::RedisClient;
pub use user_repo::PgUserRepository;
pub use verification_repo::PgVerificationRepository;
