//! Bearer-token authentication for the admin trigger.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::admin::AdminState;
use crate::lifecycle::Trigger;

/// Reject any request whose `Authorization` header is not `Bearer <api_key>`.
///
/// Runs before every admin route, so a bad token can never start a shutdown.
pub async fn require_bearer_token(
    State(state): State<AdminState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match token {
        Some(token) if token == state.trigger.api_key() => Ok(next.run(request).await),
        _ => {
            tracing::warn!(
                trigger = %state.trigger.name(),
                path = %request.uri().path(),
                "Rejected unauthenticated admin request"
            );
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
