use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Account role, as carried in session claims and stored on the user record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    User,
    Admin,
    #[serde(alias = "villa owner", alias = "villa_owner")]
    VillaOwner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::VillaOwner => "villaOwner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "villaOwner" | "villa owner" | "villa_owner" => Ok(Role::VillaOwner),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub verified: bool,
}

/// A listing as seen by the booking core. Only the fields bookings depend on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: Uuid,
    #[serde(rename = "owner")]
    pub owner_id: Uuid,
    pub title: String,
    /// Price per night.
    pub price: Decimal,
    pub max_guests: i32,
}

/// A confirmed stay. Created only after payment, deleted outright on
/// cancellation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    #[serde(rename = "place")]
    pub place_id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub number_of_guests: i32,
    pub name: String,
    pub phone: String,
    pub price: Decimal,
    pub payment_id: String,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(request: NewBooking, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            place_id: request.place_id,
            user_id: request.user_id,
            check_in: request.check_in,
            check_out: request.check_out,
            number_of_guests: request.number_of_guests,
            name: request.name.trim().to_string(),
            phone: request.phone.trim().to_string(),
            price: request.price,
            payment_id: request.payment_id.trim().to_string(),
            created_at,
        }
    }

    pub fn with_place(self, place: Option<Place>) -> BookingWithPlace {
        BookingWithPlace {
            id: self.id,
            place,
            user: self.user_id,
            check_in: self.check_in,
            check_out: self.check_out,
            number_of_guests: self.number_of_guests,
            name: self.name,
            phone: self.phone,
            price: self.price,
            payment_id: self.payment_id,
            created_at: self.created_at,
        }
    }

    /// Dashboard row. `villa` falls back to "N/A" once the place is gone.
    pub fn summary(&self, place: Option<&Place>) -> BookingSummary {
        BookingSummary {
            id: self.id,
            villa: place.map(|p| p.title.clone()).unwrap_or_else(|| "N/A".to_string()),
            user: self.name.clone(),
            phone: self.phone.clone(),
            check_in: self.check_in,
            check_out: self.check_out,
            price: self.price,
        }
    }
}

/// Input to the ledger's create operation, after session resolution.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub place_id: Uuid,
    pub user_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub number_of_guests: i32,
    pub name: String,
    pub phone: String,
    pub price: Decimal,
    pub payment_id: String,
}

/// A booking with its place resolved, as returned to the guest.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingWithPlace {
    pub id: Uuid,
    pub place: Option<Place>,
    pub user: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub number_of_guests: i32,
    pub name: String,
    pub phone: String,
    pub price: Decimal,
    pub payment_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    pub id: Uuid,
    pub villa: String,
    pub user: String,
    pub phone: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub price: Decimal,
}

/// A distinct guest of an owner's places.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub phone: String,
}

/// Aggregates over a set of bookings, computed by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingTotals {
    pub bookings: i64,
    pub distinct_users: i64,
    pub earnings: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_villas: i64,
    pub total_bookings: i64,
    pub total_users: i64,
    pub total_earnings: Decimal,
}
