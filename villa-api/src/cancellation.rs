use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use villa_core::otp::SubmittedCode;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::middleware::Session;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub booking_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCancelRequest {
    pub booking_id: Uuid,
    pub otp: SubmittedCode,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/request-cancel-booking", post(request_cancel))
        .route("/verify-cancel-booking", post(verify_cancel))
        .route("/resend-cancel-otp", post(resend_cancel))
}

async fn request_cancel(
    State(state): State<AppState>,
    session: Session,
    AppJson(req): AppJson<CancelRequest>,
) -> Result<Json<Value>, AppError> {
    state
        .verification
        .request_cancellation(req.booking_id, session.user_id)
        .await?;
    Ok(Json(json!({ "message": "OTP sent" })))
}

async fn verify_cancel(
    State(state): State<AppState>,
    session: Session,
    AppJson(req): AppJson<VerifyCancelRequest>,
) -> Result<Json<Value>, AppError> {
    let SubmittedCode(code) = req.otp;
    state
        .verification
        .verify_cancellation(req.booking_id, session.user_id, code)
        .await?;
    Ok(Json(json!({ "message": "Booking canceled successfully" })))
}

async fn resend_cancel(
    State(state): State<AppState>,
    session: Session,
    AppJson(req): AppJson<CancelRequest>,
) -> Result<Json<Value>, AppError> {
    state
        .verification
        .resend_cancellation(req.booking_id, session.user_id)
        .await?;
    Ok(Json(json!({ "message": "OTP resent" })))
}
