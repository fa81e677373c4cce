//! Browser chat UI and its JSON API.
//!
//! Each browser tab owns a session id; turns on the same session are
//! serialized by the session lock, while different sessions run in
//! parallel.

use crate::agent::{Agent, ToolCallRecord};
use crate::chat::{Assistant, ChatMessage, SessionStore, MISSING_KEY_MESSAGE};
use crate::cli::{load_prompts, Output};
use crate::config::{Prompts, Settings};
use crate::tools::Toolbox;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;

const CHAT_PAGE: &str = include_str!("../../../assets/chat.html");

/// How often idle sessions are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared application state.
pub struct AppState {
    settings: Settings,
    prompts: Prompts,
    toolbox: Arc<Toolbox>,
    sessions: SessionStore,
}

impl AppState {
    pub fn new(settings: Settings, prompts: Prompts, toolbox: Arc<Toolbox>) -> Self {
        let sessions = SessionStore::new(settings.chat.clone());
        Self {
            settings,
            prompts,
            toolbox,
            sessions,
        }
    }

    /// Key from the request, then the config file, then the environment.
    fn api_key(&self, supplied: Option<&str>) -> Option<String> {
        supplied
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or_else(|| self.settings.llm.resolve_api_key())
    }
}

/// Build the router for the chat UI and API.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/messages", delete(clear_session))
        .route("/api/chat", post(chat))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let prompts = load_prompts(&settings)?;
    let toolbox = Arc::new(Toolbox::from_settings(&settings.tools)?);

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let key_configured = settings.llm.resolve_api_key().is_some();

    let state = Arc::new(AppState::new(settings, prompts, toolbox));
    spawn_session_sweeper(state.sessions.clone());
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    Output::header("Scout Chat Server");
    println!();
    Output::success(&format!("Open http://{} in your browser", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Chat UI", "GET    /");
    Output::kv("Health", "GET    /health");
    Output::kv("New session", "POST   /api/sessions");
    Output::kv("Get session", "GET    /api/sessions/{id}");
    Output::kv("End session", "DELETE /api/sessions/{id}");
    Output::kv("Clear history", "DELETE /api/sessions/{id}/messages");
    Output::kv("Chat", "POST   /api/chat");
    println!();
    if !key_configured {
        Output::warning("No API key configured; the browser must supply one.");
    }
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically drop sessions that have been idle past their TTL.
fn spawn_session_sweeper(sessions: SessionStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let evicted = sessions.evict_idle().await;
            if evicted > 0 {
                info!("Dropped {} idle session(s)", evicted);
            }
        }
    });
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    session_id: Option<Uuid>,
    message: String,
    #[serde(default)]
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    session_id: Uuid,
    reply: String,
    steps: Vec<ToolCallRecord>,
    fallback: bool,
}

#[derive(Serialize)]
struct SessionResponse {
    session_id: Uuid,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<Uuid>,
}

fn error_response(status: StatusCode, error: &str, session_id: Option<Uuid>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            session_id,
        }),
    )
        .into_response()
}

// === Handlers ===

async fn index() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (session_id, handle) = state.sessions.create().await;
    let messages = handle.lock().await.messages().to_vec();
    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id,
            messages,
        }),
    )
}

async fn get_session(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    match state.sessions.get(&id).await {
        Some(handle) => {
            let messages = handle.lock().await.messages().to_vec();
            Json(SessionResponse {
                session_id: id,
                messages,
            })
            .into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "Session not found", None),
    }
}

async fn delete_session(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    if state.sessions.remove(&id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "Session not found", None)
    }
}

async fn clear_session(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    match state.sessions.get(&id).await {
        Some(handle) => {
            let mut session = handle.lock().await;
            session.clear();
            Json(SessionResponse {
                session_id: id,
                messages: session.messages().to_vec(),
            })
            .into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "Session not found", None),
    }
}

async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Response {
    let message = req.message.trim();
    if message.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Message must not be empty", req.session_id);
    }

    let (session_id, handle) = state.sessions.get_or_create(req.session_id).await;
    let mut session = handle.lock().await;

    let Some(api_key) = state.api_key(req.api_key.as_deref()) else {
        session.push_user(message);
        return error_response(StatusCode::UNAUTHORIZED, MISSING_KEY_MESSAGE, Some(session_id));
    };

    let agent = match Agent::from_settings(
        &state.settings,
        &state.prompts,
        &api_key,
        state.toolbox.clone(),
    ) {
        Ok(agent) => agent,
        Err(e) => {
            error!("Failed to build agent: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string(), Some(session_id));
        }
    };
    let assistant = Assistant::new(agent);

    match session.ask(&assistant, &state.prompts, message).await {
        Ok(answer) => Json(ChatResponse {
            session_id,
            reply: answer.text,
            steps: answer.steps,
            fallback: answer.fallback,
        })
        .into_response(),
        Err(e) => {
            error!("Chat turn failed for session {}: {}", session_id, e);
            error_response(StatusCode::BAD_GATEWAY, &e.to_string(), Some(session_id))
        }
    }
}
