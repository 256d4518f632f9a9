use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

pub const REGISTRATION_TTL_SECONDS: u64 = 60;
pub const CANCELLATION_TTL_SECONDS: u64 = 30;

const CODE_MIN: u32 = 100_000;
const CODE_MAX: u32 = 999_999;

/// What a one-time code confirms. Together with the subject id this keys the
/// pending verification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OtpPurpose {
    /// Subject is a user id.
    Registration,
    /// Subject is a booking id.
    Cancellation,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Registration => "registration",
            OtpPurpose::Cancellation => "cancellation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "registration" => Some(OtpPurpose::Registration),
            "cancellation" => Some(OtpPurpose::Cancellation),
            _ => None,
        }
    }
}

impl fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform six-digit code.
pub fn generate_code() -> u32 {
    rand::thread_rng().gen_range(CODE_MIN..=CODE_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Valid,
    Invalid,
    Expired,
    NotFound,
}

impl VerifyOutcome {
    /// `NotFound` carries `missing` as its message.
    pub fn into_result(self, missing: &str) -> CoreResult<()> {
        match self {
            VerifyOutcome::Valid => Ok(()),
            VerifyOutcome::Invalid => Err(CoreError::OtpInvalid),
            VerifyOutcome::Expired => Err(CoreError::OtpExpired),
            VerifyOutcome::NotFound => Err(CoreError::not_found(missing)),
        }
    }
}

/// An outstanding code for one (subject, purpose) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerification {
    pub subject_id: Uuid,
    pub purpose: OtpPurpose,
    pub code: u32,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingVerification {
    pub fn issue(
        subject_id: Uuid,
        purpose: OtpPurpose,
        code: u32,
        now: DateTime<Utc>,
        ttl_seconds: u64,
    ) -> Self {
        Self {
            subject_id,
            purpose,
            code,
            issued_at: now,
            expires_at: now + Duration::seconds(ttl_seconds as i64),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Expiry wins over a wrong code: a stale record is `Expired` whatever
    /// was submitted.
    pub fn check(&self, submitted: u32, now: DateTime<Utc>) -> VerifyOutcome {
        if self.is_expired(now) {
            VerifyOutcome::Expired
        } else if self.code != submitted {
            VerifyOutcome::Invalid
        } else {
            VerifyOutcome::Valid
        }
    }
}

pub fn evaluate(
    pending: Option<&PendingVerification>,
    submitted: u32,
    now: DateTime<Utc>,
) -> VerifyOutcome {
    match pending {
        Some(p) => p.check(submitted, now),
        None => VerifyOutcome::NotFound,
    }
}

/// A code as typed by the user. Accepts `123456` or `"123456"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedCode(pub u32);

impl<'de> Deserialize<'de> for SubmittedCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        let value = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n,
            Raw::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| de::Error::custom("otp must be numeric"))?,
        };
        u32::try_from(value)
            .map(SubmittedCode)
            .map_err(|_| de::Error::custom("otp out of range"))
    }
}
