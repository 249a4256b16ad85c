//! Conversation thread derived from an account's messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MessageRecord;

/// Grouping key used for messages with no counterparty
pub const UNKNOWN_COUNTERPARTY: &str = "unknown";

/// Preview shown when the latest message has no text
pub const ATTACHMENT_PREVIEW: &str = "Attachment";

/// All messages exchanged with one counterparty, oldest first.
///
/// Threads are never persisted; they are rebuilt from the message rows on
/// every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationThread {
    /// Counterparty phone, or [`UNKNOWN_COUNTERPARTY`]
    pub counterparty_phone: String,
    /// Messages ordered by created_at ascending
    pub messages: Vec<MessageRecord>,
    /// Preview of the latest message
    pub preview_text: String,
    /// Timestamp of the latest message
    pub preview_timestamp: DateTime<Utc>,
}

impl ConversationThread {
    /// Build a thread from an already ordered, non-empty message list.
    ///
    /// Returns `None` when `messages` is empty.
    pub fn from_messages(
        counterparty_phone: impl Into<String>,
        messages: Vec<MessageRecord>,
    ) -> Option<Self> {
        let last = messages.last()?;
        let preview_text = preview_for(last);
        let preview_timestamp = last.created_at;
        Some(Self {
            counterparty_phone: counterparty_phone.into(),
            messages,
            preview_text,
            preview_timestamp,
        })
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Short label for the avatar: the last two characters of the phone
    pub fn avatar_label(&self) -> String {
        let chars: Vec<char> = self.counterparty_phone.chars().collect();
        if chars.is_empty() {
            return "??".to_string();
        }
        chars[chars.len().saturating_sub(2)..].iter().collect()
    }

    pub fn is_unknown(&self) -> bool {
        self.counterparty_phone == UNKNOWN_COUNTERPARTY
    }
}

/// Preview text for a message shown as the latest in its thread.
///
/// Any message without text previews as [`ATTACHMENT_PREVIEW`], whether or
/// not it carries an attachment URL.
pub fn preview_for(message: &MessageRecord) -> String {
    message
        .text()
        .map(str::to_string)
        .unwrap_or_else(|| ATTACHMENT_PREVIEW.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(body: Option<&str>, attachment: Option<&str>) -> MessageRecord {
        let mut builder = MessageRecord::builder("+100").counterparty("+5491122334455");
        if let Some(body) = body {
            builder = builder.body(body);
        }
        if let Some(url) = attachment {
            builder = builder.attachment_url(url);
        }
        builder.build()
    }

    #[test]
    fn test_preview_uses_body() {
        assert_eq!(preview_for(&msg(Some("hola"), None)), "hola");
    }

    #[test]
    fn test_preview_falls_back_to_attachment() {
        let m = msg(None, Some("https://cdn.example.com/a.jpg"));
        assert_eq!(preview_for(&m), ATTACHMENT_PREVIEW);

        let m = msg(Some(""), Some("https://cdn.example.com/a.jpg"));
        assert_eq!(preview_for(&m), ATTACHMENT_PREVIEW);
    }

    #[test]
    fn test_preview_placeholder_without_body_or_attachment() {
        assert_eq!(preview_for(&msg(None, None)), ATTACHMENT_PREVIEW);
        assert_eq!(preview_for(&msg(Some(""), None)), ATTACHMENT_PREVIEW);
    }

    #[test]
    fn test_from_empty_messages() {
        assert!(ConversationThread::from_messages("+1", Vec::new()).is_none());
    }

    #[test]
    fn test_avatar_label() {
        let thread = ConversationThread::from_messages("+5491122334455", vec![msg(Some("x"), None)])
            .unwrap();
        assert_eq!(thread.avatar_label(), "55");

        let thread = ConversationThread::from_messages("7", vec![msg(Some("x"), None)]).unwrap();
        assert_eq!(thread.avatar_label(), "7");

        let thread = ConversationThread::from_messages("", vec![msg(Some("x"), None)]).unwrap();
        assert_eq!(thread.avatar_label(), "??");
    }
}
