//! Gateway HTTP server, an Axum router over the hub

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use chorus_core::{ChatSession, GenerationRequest, GenerationResponse, Hub};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::auth;
use crate::error::ApiError;

/// Shared state for every request
#[derive(Clone)]
pub struct GatewayState {
    pub hub: Arc<Hub>,
    /// Empty disables auth
    pub api_key: Arc<str>,
}

/// The gateway server
pub struct GatewayServer {
    state: GatewayState,
    bind: SocketAddr,
}

#[derive(Debug, Deserialize)]
struct CreateSessionBody {
    title: String,
}

#[derive(Debug, Deserialize)]
struct RenameSessionBody {
    title: String,
}

/// A session turn: like a chat request, but the prompt is called `content`
#[derive(Debug, Deserialize)]
struct SendMessageBody {
    content: String,
    models: Vec<String>,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(
        default = "default_temperature",
        deserialize_with = "chorus_core::types::temperature_or_default"
    )]
    temperature: f32,
    #[serde(default)]
    max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    chorus_core::types::DEFAULT_TEMPERATURE
}

impl SendMessageBody {
    fn into_request(self) -> GenerationRequest {
        let mut request = GenerationRequest::new(self.content, self.models);
        request.system_prompt = self.system_prompt;
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        request
    }
}

impl GatewayServer {
    pub fn new(bind: SocketAddr, hub: Arc<Hub>, api_key: impl Into<String>) -> Self {
        let api_key: String = api_key.into();
        let state = GatewayState {
            hub,
            api_key: Arc::from(api_key.as_str()),
        };
        Self { state, bind }
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Serve until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind).await?;
        info!(
            "Gateway listening on {} (auth {})",
            listener.local_addr()?,
            if self.state.api_key.is_empty() { "disabled" } else { "enabled" }
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Gateway stopped");
        Ok(())
    }

    /// Start the server in the background, returning a handle
    pub fn spawn(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}

pub fn build_router(state: GatewayState) -> Router {
    let protected = Router::new()
        .route("/api/providers", get(providers_handler))
        .route("/api/chat", post(chat_handler))
        .route(
            "/api/sessions",
            post(create_session_handler).get(list_sessions_handler),
        )
        .route(
            "/api/sessions/{id}",
            get(get_session_handler)
                .patch(rename_session_handler)
                .delete(delete_session_handler),
        )
        .route("/api/sessions/{id}/messages", post(send_message_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/api/health", get(health_handler))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Unwrap a JSON body, turning extractor rejections into validation errors
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::Validation(rejection.body_text()))
}

// ── HTTP Handlers ──

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn providers_handler(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({ "providers": state.hub.registry().ids() }))
}

async fn chat_handler(
    State(state): State<GatewayState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let request = body(payload)?;
    debug!(
        "Chat request for {} providers ({} chars)",
        request.provider_ids.len(),
        request.prompt.len()
    );
    Ok(Json(state.hub.generate(&request).await?))
}

async fn create_session_handler(
    State(state): State<GatewayState>,
    payload: Result<Json<CreateSessionBody>, JsonRejection>,
) -> Result<Json<ChatSession>, ApiError> {
    let CreateSessionBody { title } = body(payload)?;
    Ok(Json(state.hub.create_session(&title)))
}

async fn list_sessions_handler(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({ "sessions": state.hub.list_sessions() }))
}

async fn get_session_handler(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let session = state.hub.get_session(&id)?;
    Ok(Json(json!({ "session": session })))
}

async fn rename_session_handler(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    payload: Result<Json<RenameSessionBody>, JsonRejection>,
) -> Result<Json<ChatSession>, ApiError> {
    let RenameSessionBody { title } = body(payload)?;
    Ok(Json(state.hub.rename_session(&id, &title)?))
}

async fn delete_session_handler(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.hub.delete_session(&id)?;
    Ok(Json(json!({ "message": "Session deleted" })))
}

async fn send_message_handler(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    payload: Result<Json<SendMessageBody>, JsonRejection>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let request = body(payload)?.into_request();
    Ok(Json(state.hub.send_message(&id, &request).await?))
}
