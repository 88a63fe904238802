//! Session store wire endpoints under `/sessions`.
//!
//! These address the store directly by session id and bypass the model.
//! Writes still go through the gateway so they respect the per-session lock.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use healthmate_core::{SessionId, SessionSummary, Turn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::chat::HistoryResponse;
use crate::{AppState, Error, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendRequest {
    user_input: String,
    ai_response: String,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionSummary>,
}

fn session_id(raw: String) -> Result<SessionId> {
    SessionId::new(raw).ok_or_else(|| Error::BadRequest("Empty session id".to_string()))
}

/// `GET /sessions/{id}/history`
pub async fn read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>> {
    let id = session_id(id)?;
    let history = state.gateway.history(Some(&id)).await?;

    Ok(Json(HistoryResponse {
        history: history.to_lines(),
    }))
}

/// `POST /sessions/{id}/history` with `{"userInput", "aiResponse"}`
pub async fn append(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>> {
    let id = session_id(id)?;
    let request: AppendRequest = serde_json::from_slice(&body)
        .map_err(|e| Error::BadRequest(format!("Invalid body: {e}")))?;

    state
        .gateway
        .record(&id, Turn::new(request.user_input, request.ai_response))
        .await?;

    Ok(Json(json!({ "success": true })))
}

/// `DELETE /sessions/{id}/history`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let id = session_id(id)?;
    let existed = state.gateway.reset(&id).await?;
    info!("Reset session {id} via API");

    Ok(Json(json!({ "success": true, "existed": existed })))
}

/// `GET /sessions`
pub async fn list(State(state): State<AppState>) -> Result<Json<SessionsResponse>> {
    let sessions = state.gateway.sessions().await?;
    Ok(Json(SessionsResponse { sessions }))
}
