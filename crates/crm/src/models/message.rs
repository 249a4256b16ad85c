//! Message model representing one chat message on an account

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Direction;

/// Store-assigned message identifier (auto-increment)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub i64);

impl MessageId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tag written on rows created by the send path
pub const OUTBOUND_TAG: &str = "salida";

/// Secondary tag written on rows created by the send path
pub const SENT_ID: &str = "sent";

/// Delivery state of a message handed to the webhook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Recorded locally, not yet confirmed by the webhook
    Pending,
    /// Webhook accepted the payload
    Delivered,
    /// Webhook rejected the payload or was unreachable
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DeliveryStatus::Pending),
            "delivered" => Some(DeliveryStatus::Delivered),
            "failed" => Some(DeliveryStatus::Failed),
            _ => None,
        }
    }
}

/// A single chat message between the account and a counterparty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Store-assigned id (0 until inserted)
    pub id: MessageId,
    /// Phone number of the account this message belongs to
    pub account_phone: String,
    /// Chat-network identifier of the other party
    pub counterparty_phone: Option<String>,
    /// Text content
    pub body: Option<String>,
    /// Link to a media attachment
    pub attachment_url: Option<String>,
    /// Free-text direction tag as stored
    pub direction_tag: Option<String>,
    /// Free-text secondary tag forwarded to the webhook
    pub sent_id: Option<String>,
    /// Delivery state, `None` for rows that never went through the send path
    pub delivery: Option<DeliveryStatus>,
    /// When the message was recorded
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    /// Create a new message builder
    pub fn builder(account_phone: impl Into<String>) -> MessageBuilder {
        MessageBuilder::new(account_phone.into())
    }

    /// Classify this message's direction tag
    pub fn direction(&self) -> Direction {
        self.direction_tag
            .as_deref()
            .map(super::classify_direction)
            .unwrap_or(Direction::Unknown)
    }

    /// Body text if present and not blank
    pub fn text(&self) -> Option<&str> {
        self.body.as_deref().filter(|b| !b.is_empty())
    }

    pub fn has_attachment(&self) -> bool {
        self.attachment_url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// Builder for MessageRecord instances
pub struct MessageBuilder {
    id: MessageId,
    account_phone: String,
    counterparty_phone: Option<String>,
    body: Option<String>,
    attachment_url: Option<String>,
    direction_tag: Option<String>,
    sent_id: Option<String>,
    delivery: Option<DeliveryStatus>,
    created_at: Option<DateTime<Utc>>,
}

impl MessageBuilder {
    fn new(account_phone: String) -> Self {
        Self {
            id: MessageId(0),
            account_phone,
            counterparty_phone: None,
            body: None,
            attachment_url: None,
            direction_tag: None,
            sent_id: None,
            delivery: None,
            created_at: None,
        }
    }

    pub fn id(mut self, id: MessageId) -> Self {
        self.id = id;
        self
    }

    pub fn counterparty(mut self, phone: impl Into<String>) -> Self {
        self.counterparty_phone = Some(phone.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn attachment_url(mut self, url: impl Into<String>) -> Self {
        self.attachment_url = Some(url.into());
        self
    }

    pub fn direction_tag(mut self, tag: impl Into<String>) -> Self {
        self.direction_tag = Some(tag.into());
        self
    }

    pub fn sent_id(mut self, sent_id: impl Into<String>) -> Self {
        self.sent_id = Some(sent_id.into());
        self
    }

    pub fn delivery(mut self, delivery: DeliveryStatus) -> Self {
        self.delivery = Some(delivery);
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Tag the message the way the send path does
    pub fn outbound(self) -> Self {
        self.direction_tag(OUTBOUND_TAG).sent_id(SENT_ID)
    }

    pub fn build(self) -> MessageRecord {
        MessageRecord {
            id: self.id,
            account_phone: self.account_phone,
            counterparty_phone: self.counterparty_phone,
            body: self.body,
            attachment_url: self.attachment_url,
            direction_tag: self.direction_tag,
            sent_id: self.sent_id,
            delivery: self.delivery,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let msg = MessageRecord::builder("+5491100000000").build();
        assert_eq!(msg.id, MessageId(0));
        assert!(msg.counterparty_phone.is_none());
        assert!(msg.delivery.is_none());
        assert_eq!(msg.direction(), Direction::Unknown);
    }

    #[test]
    fn test_outbound_tags() {
        let msg = MessageRecord::builder("+1")
            .counterparty("+2")
            .body("hola")
            .outbound()
            .build();
        assert_eq!(msg.direction_tag.as_deref(), Some("salida"));
        assert_eq!(msg.sent_id.as_deref(), Some("sent"));
        assert_eq!(msg.direction(), Direction::Outbound);
    }

    #[test]
    fn test_empty_body_is_not_text() {
        let msg = MessageRecord::builder("+1").body("").build();
        assert!(msg.text().is_none());
        assert!(!msg.has_attachment());
    }

    #[test]
    fn test_delivery_status_parse() {
        for status in [
            DeliveryStatus::Pending,
            DeliveryStatus::Delivered,
            DeliveryStatus::Failed,
        ] {
            assert_eq!(DeliveryStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DeliveryStatus::parse("queued"), None);
    }
}
