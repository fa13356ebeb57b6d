use crate::error::ApiError;
use crate::markdown;
use crate::page;
use crate::rate_limit::RateLimiter;
use crate::sanitizer::Sanitizer;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{delete, get, post},
    Json, Router,
};
use biblebuddy_agent::TurnCoordinator;
use biblebuddy_core::{BuddyError, Message};
use biblebuddy_session::{SessionHandle, SessionStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Shared application state.
pub struct AppState {
    pub coordinator: Arc<TurnCoordinator>,
    pub sessions: Arc<dyn SessionStore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub sanitizer: Sanitizer,
    index: String,
}

impl AppState {
    /// State with the default sanitizer and a permissive rate limiter.
    pub fn new(coordinator: Arc<TurnCoordinator>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            coordinator,
            sessions,
            rate_limiter: Arc::new(RateLimiter::new(1000.0, 1000.0)),
            sanitizer: Sanitizer::default(),
            index: page::render_index(),
        }
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    async fn session(&self, id: Uuid) -> Result<SessionHandle, ApiError> {
        self.sessions
            .get(id)
            .await?
            .ok_or(ApiError::Buddy(BuddyError::SessionNotFound(id)))
    }
}

/// The HTTP chat server.
pub struct GatewayServer;

impl GatewayServer {
    pub fn build(state: AppState) -> Router {
        Router::new()
            .route("/", get(index_handler))
            .route("/health", get(health_handler))
            .route("/api/status", get(status_handler))
            .route("/api/sessions", post(create_session_handler))
            .route("/api/sessions/{id}", delete(end_session_handler))
            .route("/api/sessions/{id}/messages", get(messages_handler))
            .route("/api/sessions/{id}/turns", post(turn_handler))
            .with_state(Arc::new(state))
    }
}

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub content: String,
}

/// A transcript entry with its content rendered for the page.
#[derive(Debug, Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub html: String,
}

impl From<Message> for MessageView {
    fn from(message: Message) -> Self {
        let html = markdown::render(&message.content);
        Self { message, html }
    }
}

fn views(messages: Vec<Message>) -> Vec<MessageView> {
    messages.into_iter().map(MessageView::from).collect()
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub reply: String,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub session_id: Uuid,
    pub messages: Vec<MessageView>,
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.index.clone())
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": "biblebuddy"}))
}

async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(serde_json::json!({
        "credential_configured": state.coordinator.has_credential(),
        "model": state.coordinator.assistant().model,
        "active_sessions": state.sessions.count().await?,
    })))
}

async fn create_session_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.sessions.create().await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "session_id": session.id() })),
    ))
}

async fn messages_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session = state.session(id).await?;
    Ok(Json(HistoryResponse {
        session_id: id,
        messages: views(session.history().await),
    }))
}

async fn turn_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    payload: Result<Json<TurnRequest>, JsonRejection>,
) -> Result<Json<TurnResponse>, ApiError> {
    let session = state.session(id).await?;
    let Json(request) = payload.map_err(|rejection| {
        warn!(session_id = %id, error = %rejection.body_text(), "Malformed turn request");
        ApiError::from(rejection)
    })?;

    if !state.rate_limiter.check(id).await {
        warn!(session_id = %id, "Rate limited turn submission");
        return Err(ApiError::RateLimited);
    }

    let content = state
        .sanitizer
        .sanitize(&request.content)
        .into_result()
        .map_err(|rejection| {
            warn!(session_id = %id, ?rejection, "Rejected user input");
            ApiError::from(rejection)
        })?;

    let reply = state.coordinator.run_turn(&session, &content).await?;
    Ok(Json(TurnResponse {
        reply,
        messages: views(session.history().await),
    }))
}

async fn end_session_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.sessions.end(id).await? {
        return Err(ApiError::Buddy(BuddyError::SessionNotFound(id)));
    }
    state.rate_limiter.forget(id).await;
    Ok(StatusCode::NO_CONTENT)
}
