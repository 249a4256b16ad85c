//! HTTP sinks for outbound messages
//!
//! Uses synchronous HTTP (ureq) to stay executor-agnostic, same as the
//! rest of the crate.

use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde_json::{Value, json};
use ureq::Agent;

use super::api::{OutboundPayload, RelayResponse};
use super::{MessageSink, Transport};

/// Failure delivering to the webhook
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// Webhook answered with a non-2xx status
    #[error("Webhook returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Request never got a response
    #[error("Webhook request failed: {0}")]
    Transport(#[from] ureq::Error),
}

/// Build an agent that reports non-2xx statuses as responses, not errors,
/// so the body can be kept for diagnostics
fn build_agent(timeout: Option<Duration>) -> Agent {
    let config = Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(timeout)
        .build();
    Agent::new_with_config(config)
}

/// Parse a response body as JSON, falling back to an empty object
fn parse_best_effort(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| json!({}))
}

/// Append the payload as query parameters to `base`
fn url_with_query(base: &str, payload: &OutboundPayload) -> String {
    let query = payload
        .query_pairs()
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{query}")
}

/// Direct client for the chat-network webhook
pub struct WebhookClient {
    agent: Agent,
    url: String,
    transport: Transport,
}

impl WebhookClient {
    /// Create a client for `url`
    ///
    /// # Arguments
    /// * `url` - Webhook endpoint
    /// * `transport` - Preferred wire form
    /// * `timeout` - Whole-request timeout; `None` waits indefinitely
    pub fn new(url: impl Into<String>, transport: Transport, timeout: Option<Duration>) -> Self {
        Self {
            agent: build_agent(timeout),
            url: url.into(),
            transport,
        }
    }

    /// Send the payload as a JSON body
    pub fn send_post(&self, payload: &OutboundPayload) -> Result<Value, WebhookError> {
        debug!("POST {}", self.url);
        let response = self.agent.post(&self.url).send_json(payload)?;
        Self::read_response(response)
    }

    /// Send the payload as query parameters
    pub fn send_get(&self, payload: &OutboundPayload) -> Result<Value, WebhookError> {
        let url = url_with_query(&self.url, payload);
        debug!("GET {}", self.url);
        let response = self
            .agent
            .get(&url)
            .header("Content-Type", "application/json")
            .call()?;
        Self::read_response(response)
    }

    /// Send using the preferred transport.
    ///
    /// With [`Transport::Post`] a failed POST is retried once as GET; the
    /// GET outcome is what the caller sees.
    pub fn send(&self, payload: &OutboundPayload) -> Result<Value, WebhookError> {
        match self.transport {
            Transport::Get => self.send_get(payload),
            Transport::Post => match self.send_post(payload) {
                Ok(value) => Ok(value),
                Err(e) => {
                    warn!("Webhook POST failed ({}), retrying as GET", e);
                    self.send_get(payload)
                }
            },
        }
    }

    fn read_response(mut response: ureq::http::Response<ureq::Body>) -> Result<Value, WebhookError> {
        let status = response.status();
        // An unreadable body is treated like an empty one
        let body = response.body_mut().read_to_string().unwrap_or_default();

        if !status.is_success() {
            return Err(WebhookError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(parse_best_effort(&body))
    }
}

impl MessageSink for WebhookClient {
    fn deliver(&self, payload: &OutboundPayload) -> Result<Value> {
        info!(
            "Delivering message {} -> {} via webhook",
            payload.account_phone, payload.counterparty_phone
        );
        Ok(self.send(payload)?)
    }
}

/// Client for the relay service, which forwards to the webhook on our behalf
pub struct RelayClient {
    agent: Agent,
    url: String,
}

impl RelayClient {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            agent: build_agent(timeout),
            url: url.into(),
        }
    }
}

impl MessageSink for RelayClient {
    fn deliver(&self, payload: &OutboundPayload) -> Result<Value> {
        info!(
            "Delivering message {} -> {} via relay",
            payload.account_phone, payload.counterparty_phone
        );
        let mut response = self
            .agent
            .post(&self.url)
            .send_json(payload)
            .context("Failed to reach relay")?;

        let status = response.status();
        let envelope: RelayResponse = response
            .body_mut()
            .read_json()
            .with_context(|| format!("Relay returned status {status} with an unreadable body"))?;

        if envelope.success {
            Ok(envelope.data.unwrap_or_else(|| json!({})))
        } else {
            let error = envelope
                .error
                .unwrap_or_else(|| format!("Relay returned status {status}"));
            Err(anyhow::anyhow!(error))
        }
    }
}
