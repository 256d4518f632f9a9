use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use villa_core::otp::SubmittedCode;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub otp: SubmittedCode,
}

#[derive(Debug, Deserialize)]
pub struct ResendRequest {
    pub email: String,
}

/// Email verification after registration. Public: the account has no
/// session until it is verified.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/verify-otp", post(verify_otp))
        .route("/resend-otp", post(resend_otp))
}

async fn verify_otp(
    State(state): State<AppState>,
    AppJson(req): AppJson<VerifyEmailRequest>,
) -> Result<Json<Value>, AppError> {
    let SubmittedCode(code) = req.otp;
    state.verification.verify_registration(&req.email, code).await?;
    Ok(Json(json!({ "message": "Email verified successfully" })))
}

async fn resend_otp(
    State(state): State<AppState>,
    AppJson(req): AppJson<ResendRequest>,
) -> Result<Json<Value>, AppError> {
    state.verification.send_registration_code(&req.email).await?;
    Ok(Json(json!({ "message": "OTP resent" })))
}
