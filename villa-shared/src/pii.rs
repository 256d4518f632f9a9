use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wrapper for guest contact data (emails, phone numbers) that keeps the raw
/// value out of `Debug`/`Display` output, so it can be passed to `tracing`
/// fields directly. Serialization is transparent: API responses still carry
/// the real value.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T: fmt::Display> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&mask(&self.0.to_string()))
    }
}

impl<T: fmt::Display> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&mask(&self.0.to_string()))
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

/// Emails keep their first character and domain (`j***@example.com`),
/// anything else keeps its last two characters.
pub fn mask(value: &str) -> String {
    if let Some((local, domain)) = value.split_once('@') {
        let first: String = local.chars().take(1).collect();
        return format!("{}***@{}", first, domain);
    }

    let len = value.chars().count();
    if len <= 2 {
        return "*".repeat(len);
    }
    let tail: String = value.chars().skip(len - 2).collect();
    format!("{}{}", "*".repeat(len - 2), tail)
}
