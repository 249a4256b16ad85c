//! Outbound message delivery
//!
//! This module provides:
//! - The wire types shared by the webhook, the relay service and its clients
//! - The `MessageSink` seam the send action delivers through
//! - Blocking HTTP sinks for the webhook and for the relay

mod client;

pub use client::{RelayClient, WebhookClient, WebhookError};

use anyhow::Result;
use serde_json::Value;

use api::OutboundPayload;

/// Destination for outbound message payloads
///
/// Implementations block until the destination answers; callers on an async
/// runtime must move the call onto a blocking thread.
pub trait MessageSink: Send + Sync {
    /// Hand one payload to the destination, returning its (best-effort JSON)
    /// response body
    fn deliver(&self, payload: &OutboundPayload) -> Result<Value>;
}

/// How a payload is put on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// JSON body; falls back to GET once if the POST fails
    #[default]
    Post,
    /// Query parameters only
    Get,
}

impl std::str::FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "post" => Ok(Transport::Post),
            "get" => Ok(Transport::Get),
            other => Err(format!("unknown transport: {other}")),
        }
    }
}

/// Wire types
pub mod api {
    use serde::{Deserialize, Deserializer, Serialize};
    use serde_json::Value;

    use crate::models::{MessageRecord, OUTBOUND_TAG, SENT_ID, UNKNOWN_COUNTERPARTY};

    fn default_direction_tag() -> String {
        OUTBOUND_TAG.to_string()
    }

    fn default_sent_id() -> String {
        SENT_ID.to_string()
    }

    fn non_blank<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.filter(|v| !v.trim().is_empty()))
    }

    fn direction_tag_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(non_blank(deserializer)?.unwrap_or_else(default_direction_tag))
    }

    fn sent_id_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(non_blank(deserializer)?.unwrap_or_else(default_sent_id))
    }

    /// Payload understood by the chat-network webhook
    ///
    /// Field names are fixed by the webhook. `tipo_mensaje` and `sentid`
    /// default to the outbound tags when a caller leaves them out, sends
    /// `null` or sends an empty string.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct OutboundPayload {
        #[serde(rename = "mensaje")]
        pub message: String,
        /// Account phone
        #[serde(rename = "numero_c")]
        pub account_phone: String,
        /// Counterparty phone
        #[serde(rename = "numero_w")]
        pub counterparty_phone: String,
        #[serde(
            rename = "tipo_mensaje",
            default = "default_direction_tag",
            deserialize_with = "direction_tag_or_default"
        )]
        pub direction_tag: String,
        #[serde(
            rename = "sentid",
            default = "default_sent_id",
            deserialize_with = "sent_id_or_default"
        )]
        pub sent_id: String,
    }

    impl OutboundPayload {
        pub fn new(
            message: impl Into<String>,
            account_phone: impl Into<String>,
            counterparty_phone: impl Into<String>,
        ) -> Self {
            Self {
                message: message.into(),
                account_phone: account_phone.into(),
                counterparty_phone: counterparty_phone.into(),
                direction_tag: default_direction_tag(),
                sent_id: default_sent_id(),
            }
        }

        /// Payload for a stored message
        pub fn from_record(record: &MessageRecord) -> Self {
            Self {
                message: record.body.clone().unwrap_or_default(),
                account_phone: record.account_phone.clone(),
                counterparty_phone: record
                    .counterparty_phone
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_COUNTERPARTY.to_string()),
                direction_tag: record
                    .direction_tag
                    .clone()
                    .unwrap_or_else(default_direction_tag),
                sent_id: record.sent_id.clone().unwrap_or_else(default_sent_id),
            }
        }

        /// Query-string pairs, in wire order
        pub fn query_pairs(&self) -> [(&'static str, &str); 5] {
            [
                ("mensaje", self.message.as_str()),
                ("numero_c", self.account_phone.as_str()),
                ("numero_w", self.counterparty_phone.as_str()),
                ("tipo_mensaje", self.direction_tag.as_str()),
                ("sentid", self.sent_id.as_str()),
            ]
        }
    }

    /// Envelope returned by the relay service
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct RelayResponse {
        pub success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub data: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub error: Option<String>,
    }

    impl RelayResponse {
        pub fn ok(data: Value) -> Self {
            Self {
                success: true,
                data: Some(data),
                error: None,
            }
        }

        pub fn failed(error: impl Into<String>) -> Self {
            Self {
                success: false,
                data: None,
                error: Some(error.into()),
            }
        }
    }
}
