//! Public chat endpoint mounted at `/`.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use healthmate_core::SessionId;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppState, Error, Result};

pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Debug, Deserialize)]
struct ChatRequest {
    input: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub ai_response: String,
    pub session_id: SessionId,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<String>,
}

/// Session id from `X-Session-ID`; missing or empty means none.
pub fn session_from_headers(headers: &HeaderMap) -> Result<Option<SessionId>> {
    headers.get(SESSION_HEADER).map_or(Ok(None), |value| {
        value
            .to_str()
            .map(SessionId::new)
            .map_err(|_| Error::BadRequest("Invalid X-Session-ID header".to_string()))
    })
}

/// `POST /`: run one chat turn.
pub async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ChatResponse>> {
    let session_id = session_from_headers(&headers)?;
    let request: ChatRequest = serde_json::from_slice(&body)
        .map_err(|e| Error::BadRequest(format!("Invalid input format: {e}")))?;

    let result = state
        .gateway
        .handle_message(session_id, &request.input)
        .await?;

    info!(
        "Turn {} answered for session {}",
        result.turn_number, result.session_id
    );

    Ok(Json(ChatResponse {
        ai_response: result.reply,
        session_id: result.session_id,
    }))
}

/// `GET /`: the caller's history as display lines.
pub async fn get_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<HistoryResponse>> {
    let session_id = session_from_headers(&headers)?;
    let history = state.gateway.history(session_id.as_ref()).await?;

    Ok(Json(HistoryResponse {
        history: history.to_lines(),
    }))
}

/// `OPTIONS /`: CORS preflight. Headers are added by the CORS layer.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}
