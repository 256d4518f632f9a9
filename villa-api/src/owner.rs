use axum::{extract::State, middleware, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use villa_booking::StatsScope;
use villa_core::models::{BookingSummary, Customer, Stats};

use crate::error::AppError;
use crate::extract::AppQuery;
use crate::middleware::{owner_only, Session};
use crate::state::AppState;

const RECENT_BOOKINGS: i64 = 3;

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Listing {
    Recent,
    #[default]
    All,
}

#[derive(Debug, Deserialize)]
pub struct OwnerBookingsQuery {
    #[serde(rename = "type", default)]
    pub kind: Listing,
}

#[derive(Debug, Serialize)]
pub struct CustomersResponse {
    pub customers: Vec<Customer>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/villa-owner/stats", get(stats))
        .route("/owner-bookings", get(owner_bookings))
        .route("/owner-customers", get(owner_customers))
        .route_layer(middleware::from_fn_with_state(state, owner_only))
}

async fn stats(State(state): State<AppState>, session: Session) -> Result<Json<Stats>, AppError> {
    Ok(Json(state.aggregator.stats(StatsScope::Owner(session.user_id)).await?))
}

async fn owner_bookings(
    State(state): State<AppState>,
    session: Session,
    AppQuery(query): AppQuery<OwnerBookingsQuery>,
) -> Result<Json<Vec<BookingSummary>>, AppError> {
    let limit = match query.kind {
        Listing::Recent => Some(RECENT_BOOKINGS),
        Listing::All => None,
    };
    Ok(Json(state.ledger.owner_summaries(session.user_id, limit).await?))
}

async fn owner_customers(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CustomersResponse>, AppError> {
    let customers = state.ledger.owner_customers(session.user_id).await?;
    Ok(Json(CustomersResponse { customers }))
}
