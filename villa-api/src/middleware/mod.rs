pub mod auth;
pub mod rate_limit;

pub use auth::{admin_only, owner_only, Session, SessionClaims};
pub use rate_limit::rate_limit_middleware;
