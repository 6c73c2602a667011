use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CallRequest {
    /// Phone number to call (E.164 format, e.g., "+15551234567")
    pub to_phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct CallResponse {
    pub call_sid: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    status: String,
}

/// POST /make-call: place an outbound call to the given number.
///
/// Requires `Authorization: Bearer <token>` header matching the configured
/// api.token. The answered call lands on /voice-handler for its first turn.
///
/// Request body:
/// ```json
/// {
///   "to_phone_number": "+15551234567"
/// }
/// ```
pub async fn handle_make_call(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CallRequest>,
) -> impl IntoResponse {
    // Check bearer token
    if let Err(resp) = check_auth(&headers, &state.config.api.token) {
        return resp;
    }

    if req.to_phone_number.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Phone number is required".to_string(),
                status: "failed".to_string(),
            }),
        )
            .into_response();
    }

    tracing::info!(to = %req.to_phone_number, "Outbound call requested");

    match state.twilio.call(&req.to_phone_number).await {
        Ok(call_sid) => (
            StatusCode::OK,
            Json(CallResponse {
                call_sid,
                status: "success".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to initiate call: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                    status: "failed".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[allow(clippy::result_large_err)]
fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), axum::response::Response> {
    if expected_token.is_empty() {
        tracing::warn!("API token not configured, rejecting request");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "API token not configured".to_string(),
                status: "failed".to_string(),
            }),
        )
            .into_response());
    }

    let provided = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected_token => Ok(()),
        _ => {
            tracing::warn!("Unauthorized API request");
            Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing bearer token".to_string(),
                    status: "failed".to_string(),
                }),
            )
                .into_response())
        }
    }
}
