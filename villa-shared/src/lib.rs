pub mod dates;
pub mod pii;

pub use pii::Masked;
