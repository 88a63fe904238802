#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! HTTP surface for the chat gateway.
//!
//! The public [`router`] only serves `/`: `POST` sends a message, `GET`
//! returns the caller's history and `OPTIONS` answers CORS preflight. Other
//! methods get `405`. Every public response carries permissive CORS headers.
//!
//! The session store wire shape lives on [`internal_router`], which is only
//! bound when an internal address is configured. It addresses sessions by
//! id, so it must not share a listener with the public endpoint.

mod chat;
mod error;
mod sessions;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::middleware;
use axum::response::Response;
use axum::routing::{get, post};
use healthmate_conversation::ConversationGateway;
use tracing::info;

pub use chat::{ChatResponse, HistoryResponse, SESSION_HEADER};
pub use error::{Error, Result};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ConversationGateway>,
}

async fn with_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, GET, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, X-Session-ID"),
    );
    response
}

/// Public chat endpoint.
pub fn router(gateway: Arc<ConversationGateway>) -> Router {
    Router::new()
        .route(
            "/",
            post(chat::send_message)
                .get(chat::get_history)
                .options(chat::preflight),
        )
        .layer(middleware::map_response(with_cors))
        .with_state(AppState { gateway })
}

/// Session store routes, addressed by session id. No CORS headers.
pub fn internal_router(gateway: Arc<ConversationGateway>) -> Router {
    Router::new()
        .route("/sessions", get(sessions::list))
        .route(
            "/sessions/{id}/history",
            get(sessions::read)
                .post(sessions::append)
                .delete(sessions::delete),
        )
        .with_state(AppState { gateway })
}

/// Serve the public endpoint on `addr` until Ctrl+C.
///
/// When `internal_addr` is given the session store routes are served there
/// as well, on their own listener.
pub async fn serve(
    gateway: Arc<ConversationGateway>,
    addr: &str,
    internal_addr: Option<&str>,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HealthMate listening on http://{}", listener.local_addr()?);
    let public = async {
        axum::serve(listener, router(Arc::clone(&gateway)))
            .with_graceful_shutdown(shutdown_signal())
            .await
    };

    match internal_addr {
        Some(internal_addr) => {
            let listener = tokio::net::TcpListener::bind(internal_addr).await?;
            info!("Session store routes on http://{}", listener.local_addr()?);
            let internal = async {
                axum::serve(listener, internal_router(Arc::clone(&gateway)))
                    .with_graceful_shutdown(shutdown_signal())
                    .await
            };
            tokio::try_join!(public, internal)?;
        }
        None => public.await?,
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
