//! Leadline relay - HTTP front for the chat-network webhook
//!
//! Browser clients can't call the webhook directly (no CORS, secrets in the
//! URL), so they post here and the relay forwards the payload.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use crm::Settings;
use crm::webhook::MessageSink;
use crm::webhook::api::{OutboundPayload, RelayResponse};
use log::{error, info};
use tower_http::cors::{Any, CorsLayer};

/// Path the send endpoint is mounted at
pub const SEND_PATH: &str = "/send-whatsapp-message";

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub sink: Arc<dyn MessageSink>,
}

impl AppState {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self { sink }
    }
}

/// Relay failure. Every variant answers 500 with the failure envelope.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid request body: {0}")]
    InvalidPayload(String),

    #[error("{0}")]
    Delivery(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        error!("Relay request failed: {}", self);
        let body = Json(RelayResponse::failed(self.to_string()));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// CORS policy: any origin, and the headers browser clients send
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            CONTENT_TYPE,
        ])
}

/// Build the relay router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(SEND_PATH, post(send_message))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(cors())
}

/// Bind to the configured address and serve until shutdown
///
/// The relay always calls the webhook directly, whatever `relay_url` says.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let sink: Arc<dyn MessageSink> = Arc::new(settings.webhook_client());
    let app = router(AppState::new(sink));

    let listener = tokio::net::TcpListener::bind(&settings.relay_addr).await?;
    info!(
        "Relay listening on http://{} -> {}",
        listener.local_addr()?,
        settings.webhook_url
    );

    axum::serve(listener, app).await?;
    Ok(())
}

async fn send_message(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RelayResponse>, RelayError> {
    let payload: OutboundPayload =
        serde_json::from_slice(&body).map_err(|e| RelayError::InvalidPayload(e.to_string()))?;
    info!(
        "Relaying message {} -> {}",
        payload.account_phone, payload.counterparty_phone
    );

    // The sink blocks on HTTP
    let sink = state.sink.clone();
    let data = tokio::task::spawn_blocking(move || sink.deliver(&payload))
        .await
        .map_err(|e| RelayError::Internal(e.to_string()))?
        .map_err(|e| RelayError::Delivery(format!("{e:#}")))?;

    Ok(Json(RelayResponse::ok(data)))
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RelayError::Delivery("Webhook returned status 404: nope".to_string());
        assert_eq!(err.to_string(), "Webhook returned status 404: nope");

        let err = RelayError::InvalidPayload("missing field `numero_w`".to_string());
        assert!(err.to_string().starts_with("Invalid request body"));
    }

    #[test]
    fn test_error_response_status() {
        let response = RelayError::Internal("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
