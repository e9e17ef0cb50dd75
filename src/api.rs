//! HTTP API over the memory store and the speech optimizer.
//!
//! JSON in, JSON out. Listens on `server.host:server.port` (default
//! 127.0.0.1:3001) using axum.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::analysis::derive_context;
use crate::config::ServerConfig;
use crate::error::SpeechError;
use crate::memory::{ContextUpdate, MemoryStore, TurnContext};
use crate::speech::{detect_language, SpeechOptimizer};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MemoryStore>,
    pub optimizer: Arc<SpeechOptimizer>,
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct WindowQuery {
    #[serde(rename = "lastN")]
    last_n: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveConversationRequest {
    #[serde(default)]
    user_message: Option<String>,
    #[serde(default)]
    ai_response: Option<String>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    context: Option<TurnContext>,
}

#[derive(Deserialize)]
struct ConcernRequest {
    #[serde(default)]
    concern: Option<String>,
}

#[derive(Deserialize)]
struct OptimizeRequest {
    text: String,
}

#[derive(Serialize)]
struct SimpleResponse {
    success: bool,
    message: String,
}

impl SimpleResponse {
    fn ok(message: &str) -> Response {
        Json(Self {
            success: true,
            message: message.into(),
        })
        .into_response()
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "success": false, "error": message.into() }))).into_response()
}

/// Map a store outcome onto `{success, message}` or a 500.
fn outcome(succeeded: bool, message: &str, failure: &str) -> Response {
    if succeeded {
        SimpleResponse::ok(message)
    } else {
        error_response(StatusCode::INTERNAL_SERVER_ERROR, failure)
    }
}

/// Malformed bodies get the same `{success, error}` shape as other failures.
fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.body_text()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = match origin.parse::<HeaderValue>() {
        Ok(value) if origin != "*" => AllowOrigin::exact(value),
        _ => AllowOrigin::from(Any),
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the axum router.
pub fn router(state: AppState, cors_origin: &str) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/memory/stats/all", get(handle_stats))
        .route(
            "/api/memory/{customer_id}",
            get(handle_history).delete(handle_clear),
        )
        .route("/api/memory/{customer_id}/summary", get(handle_summary))
        .route(
            "/api/memory/{customer_id}/context",
            get(handle_get_context).put(handle_update_context),
        )
        .route(
            "/api/memory/{customer_id}/conversation",
            post(handle_save_conversation),
        )
        .route(
            "/api/memory/{customer_id}/concern",
            post(handle_add_concern).delete(handle_remove_concern),
        )
        .route("/api/speech/optimize", post(handle_optimize))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origin))
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn serve(state: AppState, config: &ServerConfig) -> std::io::Result<()> {
    let app = router(state, &config.cors_origin);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        warn!("Failed to bind API on {addr}: {e}");
        e
    })?;
    info!("Voice agent API listening on {addr}");

    axum::serve(listener, app).await
}

// --- Handlers ---

async fn handle_health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "service": "voice-agent-rs",
    }))
}

async fn handle_history(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Response {
    let last_n = query
        .last_n
        .unwrap_or(state.store.config().default_window);
    let history = state.store.conversation_history(&customer_id, last_n).await;

    Json(json!({
        "success": true,
        "customerId": customer_id,
        "count": history.len(),
        "history": history,
    }))
    .into_response()
}

async fn handle_summary(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Response {
    let last_n = query
        .last_n
        .unwrap_or(state.store.config().default_window);
    let summary = state.store.summarized_context(&customer_id, last_n).await;

    Json(json!({
        "success": true,
        "customerId": customer_id,
        "summary": summary,
    }))
    .into_response()
}

async fn handle_get_context(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Response {
    match state.store.customer_context(&customer_id).await {
        Some(context) => Json(json!({
            "success": true,
            "customerId": customer_id,
            "context": context,
        }))
        .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Customer context not found"),
    }
}

async fn handle_update_context(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
    payload: Result<Json<ContextUpdate>, JsonRejection>,
) -> Response {
    let updates = match parse_body(payload) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let updated = state
        .store
        .update_customer_context(&customer_id, updates)
        .await;
    outcome(
        updated,
        "Customer context updated successfully",
        "Failed to update customer context",
    )
}

async fn handle_save_conversation(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
    payload: Result<Json<SaveConversationRequest>, JsonRejection>,
) -> Response {
    let req = match parse_body(payload) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let (Some(user_message), Some(ai_response)) =
        (non_empty(req.user_message), non_empty(req.ai_response))
    else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "userMessage and aiResponse are required",
        );
    };

    let context = req
        .context
        .unwrap_or_else(|| derive_context(&user_message, &ai_response));
    let saved = state
        .store
        .save_conversation(
            &customer_id,
            &user_message,
            &ai_response,
            req.timestamp,
            Some(context),
        )
        .await;

    outcome(
        saved,
        "Conversation saved successfully",
        "Failed to save conversation",
    )
}

async fn handle_add_concern(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
    payload: Result<Json<ConcernRequest>, JsonRejection>,
) -> Response {
    let req = match parse_body(payload) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let Some(concern) = non_empty(req.concern) else {
        return error_response(StatusCode::BAD_REQUEST, "concern is required");
    };
    let added = state.store.add_concern(&customer_id, &concern).await;
    outcome(added, "Concern added successfully", "Failed to add concern")
}

async fn handle_remove_concern(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
    payload: Result<Json<ConcernRequest>, JsonRejection>,
) -> Response {
    let req = match parse_body(payload) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let Some(concern) = non_empty(req.concern) else {
        return error_response(StatusCode::BAD_REQUEST, "concern is required");
    };
    let removed = state.store.remove_concern(&customer_id, &concern).await;
    outcome(
        removed,
        "Concern removed successfully",
        "Failed to remove concern",
    )
}

async fn handle_clear(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Response {
    let cleared = state.store.clear_history(&customer_id).await;
    outcome(
        cleared,
        "Conversation history cleared",
        "Failed to clear conversation history",
    )
}

async fn handle_stats(State(state): State<AppState>) -> Response {
    let stats = state.store.memory_stats().await;
    Json(json!({ "success": true, "stats": stats })).into_response()
}

async fn handle_optimize(
    State(state): State<AppState>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Response {
    let req = match parse_body(payload) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let language = detect_language(&req.text);
    match state.optimizer.prepare_for_tts(&req.text) {
        Ok(optimized) => Json(json!({
            "original": req.text,
            "optimized": optimized,
            "language": language,
        }))
        .into_response(),
        Err(e @ SpeechError::TooLong { .. }) => {
            error_response(StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_count_as_missing() {
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some("   ".into())), None);
        assert_eq!(non_empty(Some("hi".into())).as_deref(), Some("hi"));
    }

    #[test]
    fn save_request_accepts_partial_bodies() {
        let req: SaveConversationRequest =
            serde_json::from_value(json!({ "userMessage": "Hello" })).unwrap();
        assert_eq!(req.user_message.as_deref(), Some("Hello"));
        assert!(req.ai_response.is_none());
        assert!(req.context.is_none());
    }
}
