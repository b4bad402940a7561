use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{info, warn};

use pipegate_core::event::PipelineEvent;

use crate::signature::{self, SIGNATURE_HEADER};
use crate::state::AppState;

/// POST /api/events — receive one pipeline lifecycle event.
///
/// The body is read raw so the signature check covers exactly the delivered
/// bytes. Unparseable or unrecognized bodies answer 202 with an `ignored`
/// disposition: the event source is free to grow new event shapes without
/// this endpoint erroring on them.
pub async fn receive_event(
    State(app): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = &app.webhook_secret {
        let provided = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !signature::verify(secret, &body, provided) {
            warn!("rejecting event with missing or invalid signature");
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "invalid signature" })),
            )
                .into_response();
        }
    }

    let event: PipelineEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            info!(error = %e, "ignoring event with unrecognized shape");
            return (
                StatusCode::ACCEPTED,
                Json(serde_json::json!({
                    "disposition": "ignored",
                    "reason": "unrecognized event shape",
                })),
            )
                .into_response();
        }
    };

    match app.router.handle(&event).await {
        Ok(outcome) => (StatusCode::ACCEPTED, Json(outcome)).into_response(),
        Err(e) => {
            warn!(error = %e, "event handling failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// GET /healthz — liveness probe.
pub async fn healthz() -> &'static str {
    "ok"
}
