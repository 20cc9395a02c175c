use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::lifecycle::ShutdownState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub state: ShutdownState,
    pub triggers: Vec<String>,
    pub callbacks: usize,
}

#[derive(Serialize)]
pub struct ShutdownResponse {
    pub accepted: bool,
    pub state: ShutdownState,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        state: state.coordinator.state(),
        triggers: state.coordinator.trigger_names(),
        callbacks: state.coordinator.callback_count(),
    })
}

/// Claim the coordinator and run the sequence in the background.
///
/// The claim is taken before answering, so of two concurrent requests exactly
/// one gets `202 Accepted`.
pub async fn request_shutdown(
    State(state): State<AdminState>,
) -> (StatusCode, Json<ShutdownResponse>) {
    let trigger = Arc::new(state.trigger.clone());
    if state.coordinator.spawn_shutdown(trigger).is_none() {
        return (
            StatusCode::CONFLICT,
            Json(ShutdownResponse {
                accepted: false,
                state: state.coordinator.state(),
            }),
        );
    }

    tracing::info!("Shutdown requested over admin endpoint");
    (
        StatusCode::ACCEPTED,
        Json(ShutdownResponse {
            accepted: true,
            state: ShutdownState::ShuttingDown,
        }),
    )
}
