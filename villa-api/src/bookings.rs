use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;
use villa_core::models::{Booking, BookingWithPlace, NewBooking};
use villa_shared::dates::calendar_date;

use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::middleware::Session;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub place: Uuid,
    #[serde(deserialize_with = "calendar_date")]
    pub check_in: NaiveDate,
    #[serde(deserialize_with = "calendar_date")]
    pub check_out: NaiveDate,
    pub number_of_guests: i32,
    pub name: String,
    pub phone: String,
    pub price: Decimal,
    #[serde(default)]
    pub payment_id: Option<String>,
}

/// Availability as the calendar widget consumes it.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct BookedDates(Vec<String>);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_my_bookings).post(create_booking))
        .route("/bookings/{id}", get(booked_dates).delete(delete_booking))
}

/// `GET /bookings/{placeId}`: public.
async fn booked_dates(
    State(state): State<AppState>,
    AppPath(place_id): AppPath<Uuid>,
) -> Result<Json<BookedDates>, AppError> {
    let dates = state.availability.booked_dates(place_id).await?;
    Ok(Json(BookedDates(
        dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect(),
    )))
}

async fn create_booking(
    State(state): State<AppState>,
    session: Session,
    AppJson(req): AppJson<CreateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .ledger
        .create(NewBooking {
            place_id: req.place,
            user_id: session.user_id,
            check_in: req.check_in,
            check_out: req.check_out,
            number_of_guests: req.number_of_guests,
            name: req.name,
            phone: req.phone,
            price: req.price,
            payment_id: req.payment_id.unwrap_or_default(),
        })
        .await?;

    Ok(Json(booking))
}

async fn list_my_bookings(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<BookingWithPlace>>, AppError> {
    Ok(Json(state.ledger.list_for_user(session.user_id).await?))
}

async fn delete_booking(
    State(state): State<AppState>,
    session: Session,
    AppPath(booking_id): AppPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.ledger.delete(booking_id, session.user_id).await?;
    Ok(Json(json!({ "message": "Booking canceled successfully" })))
}
