//! # Introspection Server
//!
//! This module defines the `IntrospectionServer`, an `axum`-based web server
//! exposing the profiling handlers under `/debug/pprof`.
//!
//! The listener is bound synchronously so the caller learns about an
//! unavailable port immediately, while serving happens on a background task.
//! The server shuts down gracefully when the shared stop signal flips to
//! `true`; bounding how long in-flight requests may drain is the job of
//! whoever awaits the task.

use super::profiling::{self, ProfilingState};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::timeout::TimeoutLayer;
use tracing::trace;

/// Base path shared by every introspection route.
pub const BASE_PATH: &str = "/debug/pprof";

/// An HTTP server exposing the profiling routes.
pub struct IntrospectionServer {
    listener: TcpListener,
    router: Router,
    shutdown_rx: watch::Receiver<bool>,
}

impl IntrospectionServer {
    /// Binds the listener but does not start serving.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `addr` - The address to listen on.
    /// * `state` - Shared state for the profiling handlers.
    /// * `shutdown_rx` - Stop signal; the server drains once it reads `true`.
    pub fn bind(
        addr: SocketAddr,
        state: ProfilingState,
        shutdown_rx: watch::Receiver<bool>,
    ) -> std::io::Result<Self> {
        let listener = std::net::TcpListener::bind(addr)?;
        // The listener must be non-blocking to be used with Tokio.
        listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(listener)?;

        Ok(Self {
            listener,
            router: router(state),
            shutdown_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves requests until the stop signal is raised and open requests drain.
    pub async fn run(self) -> std::io::Result<()> {
        let mut shutdown_rx = self.shutdown_rx;
        let result = axum::serve(self.listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                // A dropped sender also ends the wait, which is what we want.
                let _ = shutdown_rx.wait_for(|stopped| *stopped).await;
                trace!("Introspection server received shutdown signal.");
            })
            .await;
        trace!("Introspection server task finished.");
        result
    }
}

/// Builds the fixed set of profiling routes.
pub fn router(state: ProfilingState) -> Router {
    let request_timeout = state.request_timeout;
    Router::new()
        .route(BASE_PATH, get(profiling::index))
        .route(&format!("{}/", BASE_PATH), get(profiling::index))
        .route(&format!("{}/cmdline", BASE_PATH), get(profiling::cmdline))
        .route(&format!("{}/profile", BASE_PATH), get(profiling::cpu_profile))
        .route(
            &format!("{}/symbol", BASE_PATH),
            get(profiling::symbol_info).post(profiling::symbol_lookup),
        )
        .route(&format!("{}/trace", BASE_PATH), get(profiling::trace))
        .route(&format!("{}/{{name}}", BASE_PATH), get(profiling::named_profile))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
}
