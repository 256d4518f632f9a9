use axum::{extract::State, middleware, routing::get, Json, Router};
use villa_booking::StatsScope;
use villa_core::models::{BookingSummary, Stats};

use crate::error::AppError;
use crate::middleware::admin_only;
use crate::state::AppState;

const RECENT_BOOKINGS: i64 = 5;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(stats))
        .route("/admin/bookings/recent", get(recent_bookings))
        .route("/admin/bookings", get(all_bookings))
        .route_layer(middleware::from_fn_with_state(state, admin_only))
}

async fn stats(State(state): State<AppState>) -> Result<Json<Stats>, AppError> {
    Ok(Json(state.aggregator.stats(StatsScope::Admin).await?))
}

async fn recent_bookings(State(state): State<AppState>) -> Result<Json<Vec<BookingSummary>>, AppError> {
    Ok(Json(state.ledger.summaries(Some(RECENT_BOOKINGS)).await?))
}

async fn all_bookings(State(state): State<AppState>) -> Result<Json<Vec<BookingSummary>>, AppError> {
    Ok(Json(state.ledger.summaries(None).await?))
}
