//! HTTP API gateway for Parley.
//!
//! Exposes the turn loop over SSE plus read endpoints for conversations,
//! the tool catalogue, and live sessions.
//!
//! Built on Axum for async HTTP.

pub mod session;

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, Sse};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use parley_agent::{TurnRunner, DEFAULT_SYSTEM_PROMPT};
use parley_core::history::{ConversationSummary, HistoryStore};
use parley_core::message::{ConversationId, Message};
use parley_core::tool::ToolRegistry;
use parley_history::SqliteStore;

pub use session::{SessionHandle, SessionRegistry};

/// Shared application state for the gateway.
pub struct AppState {
    pub runner: TurnRunner,
    pub tools: Arc<ToolRegistry>,
    pub history: Arc<dyn HistoryStore>,
    pub sessions: Arc<SessionRegistry>,
}

pub type SharedState = Arc<AppState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .expose_headers([axum::http::HeaderName::from_static("x-conversation-id")]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/chat/stream", post(chat_stream_handler))
        .route("/v1/conversations", get(list_conversations_handler))
        .route("/v1/conversations/{id}", get(get_conversation_handler))
        .route("/v1/tools", get(list_tools_handler))
        .route("/v1/sessions", get(list_sessions_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server from config.
pub async fn start(config: parley_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let backend = Arc::new(parley_backend::OpenAiCompatBackend::new(
        "openai_compat",
        &config.backend.base_url,
        config.backend.api_key.clone().unwrap_or_default(),
    ));
    let tools = Arc::new(parley_tools::default_registry(&config.extraction.base_url));
    let history: Arc<dyn HistoryStore> = Arc::new(SqliteStore::new(&config.history.db_path).await?);

    let system_prompt = config
        .agent
        .system_prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
    let mut runner = TurnRunner::new(
        backend,
        &config.backend.model,
        tools.clone(),
        history.clone(),
        system_prompt,
    )
    .with_max_rounds(config.agent.max_rounds)
    .with_temperature(config.backend.temperature)
    .with_max_tokens(config.backend.max_tokens);
    if let Some(ctx) = &config.agent.project_context {
        runner = runner.with_project_context(ctx);
    }

    let state = Arc::new(AppState {
        runner,
        tools,
        history,
        sessions: Arc::new(SessionRegistry::new()),
    });

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Gateway listening on {addr}");
    axum::serve(listener, router).await?;
    Ok(())
}

// ── Request / response shapes ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatStreamRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub messages: Vec<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ToolListResponse {
    pub count: usize,
    pub tools: Vec<parley_core::backend::ToolDefinition>,
}

#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub count: usize,
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub id: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub count: usize,
    pub sessions: Vec<SessionHandle>,
}

// ── Handlers ────────────────────────────────────────────────────────────────

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// `POST /v1/chat/stream` — run one turn, streaming its events as SSE.
///
/// The conversation id (existing or freshly created) is returned in the
/// `X-Conversation-Id` response header; the event stream itself carries no
/// identifiers.
async fn chat_stream_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatStreamRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let conversation = match &payload.conversation_id {
        Some(id) => ConversationId::from(id),
        None => ConversationId::new(),
    };

    let user_messages: Vec<Message> = payload
        .messages
        .iter()
        .filter(|m| m.role == "user")
        .map(|m| Message::user(&m.content))
        .collect();
    if user_messages.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "request must contain at least one user message".into(),
            }),
        ));
    }

    info!(
        conversation = conversation.as_str(),
        messages = user_messages.len(),
        "v1/chat/stream request"
    );

    let session_id = state
        .sessions
        .insert(SessionHandle::new(conversation.as_str()))
        .await;

    let mut turn_rx = state.runner.run_stream(conversation.clone(), user_messages);

    // Forward through an intermediate channel so the session entry is
    // removed when the turn finishes or the client goes away.
    let (tx, rx) = mpsc::channel(64);
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        while let Some(event) = turn_rx.recv().await {
            if tx.send(event).await.is_err() {
                debug!("Stream client disconnected");
                break;
            }
        }
        sessions.remove(&session_id).await;
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        Ok::<SseEvent, Infallible>(
            SseEvent::default()
                .event(event.event_type())
                .data(event.payload_json().to_string()),
        )
    });

    Ok((
        [("x-conversation-id", conversation.as_str().to_string())],
        Sse::new(stream),
    ))
}

async fn list_conversations_handler(
    State(state): State<SharedState>,
) -> Result<Json<ConversationListResponse>, (StatusCode, Json<ErrorResponse>)> {
    let conversations = state.history.conversations().await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;
    Ok(Json(ConversationListResponse {
        count: conversations.len(),
        conversations,
    }))
}

async fn get_conversation_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, (StatusCode, Json<ErrorResponse>)> {
    let conversation = ConversationId::from(&id);
    let messages = state.history.load(&conversation).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;
    if messages.is_empty() {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("no conversation with id {id}"),
            }),
        ));
    }
    Ok(Json(ConversationResponse { id, messages }))
}

async fn list_tools_handler(State(state): State<SharedState>) -> Json<ToolListResponse> {
    let mut tools = state.tools.definitions();
    tools.sort_by(|a, b| a.name.cmp(&b.name));
    Json(ToolListResponse {
        count: tools.len(),
        tools,
    })
}

async fn list_sessions_handler(State(state): State<SharedState>) -> Json<SessionListResponse> {
    let sessions = state.sessions.list().await;
    Json(SessionListResponse {
        count: sessions.len(),
        sessions,
    })
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use parley_core::backend::{ChatBackend, ChatRequest, ChatResponse};
    use parley_core::error::BackendError;
    use parley_history::InMemoryStore;
    use tower::ServiceExt;

    /// Lightweight mock backend for gateway tests.
    struct MockBackend {
        response_text: String,
    }

    #[async_trait::async_trait]
    impl ChatBackend for MockBackend {
        fn name(&self) -> &str {
            "gateway_mock"
        }

        async fn complete(&self, _request: ChatRequest) -> Result<ChatResponse, BackendError> {
            Ok(ChatResponse {
                message: Message::assistant(&self.response_text),
                model: "mock-model".into(),
                usage: None,
            })
        }
    }

    fn test_state() -> SharedState {
        let backend = Arc::new(MockBackend {
            response_text: "Mock answer.".into(),
        });
        let tools = Arc::new(parley_tools::default_registry("http://localhost:3000"));
        let history: Arc<dyn HistoryStore> = Arc::new(InMemoryStore::new());
        let runner = TurnRunner::new(
            backend,
            "mock-model",
            tools.clone(),
            history.clone(),
            DEFAULT_SYSTEM_PROMPT,
        );
        Arc::new(AppState {
            runner,
            tools,
            history,
            sessions: Arc::new(SessionRegistry::new()),
        })
    }

    #[tokio::test]
    async fn health_reports_version() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(!json["version"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn tools_lists_the_catalogue() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/tools")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["count"], 14);
        let names: Vec<&str> = json["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"list_datasets"));
        assert!(names.contains(&"extract_document"));
        assert!(names.contains(&"delete_config"));
    }

    #[tokio::test]
    async fn conversations_starts_empty() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/conversations")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["count"], 0);
    }

    #[tokio::test]
    async fn unknown_conversation_is_404() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/conversations/nonexistent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn sessions_starts_empty() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/sessions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["count"], 0);
    }

    #[tokio::test]
    async fn chat_stream_runs_a_turn_and_returns_the_conversation_id() {
        let state = test_state();
        let app = build_router(state.clone());

        let payload = serde_json::json!({
            "messages": [{"role": "user", "content": "hello"}]
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/chat/stream")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let conv_id = response
            .headers()
            .get("x-conversation-id")
            .expect("conversation id header")
            .to_str()
            .unwrap()
            .to_string();
        assert!(!conv_id.is_empty());

        // The stream closes after done, so the whole body can be collected.
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("event: message"));
        assert!(text.contains("Mock answer."));
        assert!(text.contains("event: done"));

        // The turn was persisted under the returned id.
        let stored = state
            .history
            .load(&ConversationId::from(&conv_id))
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);

        // And the session entry is gone once the stream completed.
        assert!(state.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn chat_stream_rejects_empty_input() {
        let app = build_router(test_state());
        let payload = serde_json::json!({ "messages": [] });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/chat/stream")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn persisted_conversation_is_served_back() {
        let state = test_state();
        let conv = ConversationId::new();
        state
            .history
            .append_batch(
                &conv,
                &[Message::user("q"), Message::assistant("a")],
            )
            .await
            .unwrap();

        let app = build_router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/conversations/{}", conv.as_str()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "a");
    }
}
