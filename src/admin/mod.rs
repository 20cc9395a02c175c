//! HTTP admin trigger.
//!
//! # Endpoints
//! ```text
//! GET  /admin/status     → version, coordinator state, registered triggers
//! POST /admin/shutdown   → 202 Accepted, or 409 Conflict if already shutting down
//! ```
//!
//! # Design Decisions
//! - Bearer-token auth on every route
//! - The port is bound inside `start`, so a busy port is an arming error
//! - The end hook stops the server and returns; the process keeps control

pub mod auth;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::sync::watch;

use crate::config::AdminConfig;
use crate::lifecycle::{require_runtime, BoxError, Coordinator, Trigger};
use self::auth::require_bearer_token;
use self::handlers::{get_status, request_shutdown};

/// Name used by [`AdminTrigger::new`].
pub const ADMIN_TRIGGER_NAME: &str = "admin-http";

/// State injected into admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub coordinator: Coordinator,
    pub trigger: AdminTrigger,
}

struct AdminInner {
    name: String,
    bind_address: String,
    api_key: String,
    local_addr: OnceLock<SocketAddr>,
    stop: watch::Sender<bool>,
}

/// Trigger that fires on an authenticated `POST /admin/shutdown`.
#[derive(Clone)]
pub struct AdminTrigger {
    inner: Arc<AdminInner>,
}

impl AdminTrigger {
    pub fn new(bind_address: impl Into<String>, api_key: impl Into<String>) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            inner: Arc::new(AdminInner {
                name: ADMIN_TRIGGER_NAME.to_string(),
                bind_address: bind_address.into(),
                api_key: api_key.into(),
                local_addr: OnceLock::new(),
                stop,
            }),
        }
    }

    pub fn from_config(config: &AdminConfig) -> Self {
        Self::new(config.bind_address.clone(), config.api_key.clone())
    }

    /// Address actually bound, once started. Useful with port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.local_addr.get().copied()
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.inner.api_key
    }
}

/// Build the admin router with auth applied to every route.
pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/shutdown", post(request_shutdown))
        .layer(middleware::from_fn_with_state(state.clone(), require_bearer_token))
        .with_state(state)
}

#[async_trait]
impl Trigger for AdminTrigger {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn start(self: Arc<Self>, coordinator: Coordinator) -> Result<(), BoxError> {
        let runtime = require_runtime(&self.inner.name)?;

        let std_listener = std::net::TcpListener::bind(&self.inner.bind_address)
            .map_err(|e| format!("failed to bind {}: {}", self.inner.bind_address, e))?;
        std_listener.set_nonblocking(true)?;
        let local_addr = std_listener.local_addr()?;

        let listener = {
            let _enter = runtime.enter();
            tokio::net::TcpListener::from_std(std_listener)?
        };
        let _ = self.inner.local_addr.set(local_addr);

        let state = AdminState {
            coordinator,
            trigger: (*self).clone(),
        };
        let app = setup_admin_router(state);
        let mut stop = self.inner.stop.subscribe();

        tracing::info!(trigger = %self.inner.name, address = %local_addr, "Admin endpoint listening");

        runtime.spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop.wait_for(|stopped| *stopped).await;
                })
                .await;
            match result {
                Ok(()) => tracing::info!(address = %local_addr, "Admin endpoint stopped"),
                Err(e) => tracing::error!(address = %local_addr, error = %e, "Admin endpoint failed"),
            }
        });
        Ok(())
    }

    async fn on_shutdown_end(&self) -> Result<(), BoxError> {
        self.inner.stop.send_replace(true);
        Ok(())
    }
}

impl std::fmt::Debug for AdminTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminTrigger")
            .field("name", &self.inner.name)
            .field("bind_address", &self.inner.bind_address)
            .field("local_addr", &self.local_addr())
            .finish()
    }
}
