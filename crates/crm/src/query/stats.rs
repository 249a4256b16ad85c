//! Message statistics for the dashboard overview

use std::collections::HashSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::{AccountContext, Direction, MessageRecord, UNKNOWN_COUNTERPARTY};
use crate::storage::CrmStore;

/// Aggregate counts over an account's messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageStats {
    pub total: usize,
    /// Messages classified outbound
    pub sent: usize,
    /// Messages classified inbound
    pub received: usize,
    /// Messages whose tag matched neither set
    pub unclassified: usize,
    pub with_attachment: usize,
    /// Distinct counterparties (missing phones count as one)
    pub conversations: usize,
}

impl MessageStats {
    pub fn from_records(records: &[MessageRecord]) -> Self {
        let mut stats = MessageStats::default();
        let mut counterparties = HashSet::new();

        for record in records {
            stats.total += 1;
            match record.direction() {
                Direction::Outbound => stats.sent += 1,
                Direction::Inbound => stats.received += 1,
                Direction::Unknown => stats.unclassified += 1,
            }
            if record.has_attachment() {
                stats.with_attachment += 1;
            }
            counterparties.insert(
                record
                    .counterparty_phone
                    .as_deref()
                    .unwrap_or(UNKNOWN_COUNTERPARTY),
            );
        }

        stats.conversations = counterparties.len();
        stats
    }

    /// Received count as shown to users: anything not proven outbound
    pub fn received_or_unknown(&self) -> usize {
        self.received + self.unclassified
    }
}

/// Compute statistics for an account
pub fn account_stats(store: &dyn CrmStore, ctx: &AccountContext) -> Result<MessageStats> {
    let messages = store.list_messages_for_account(&ctx.account_phone)?;
    Ok(MessageStats::from_records(&messages))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(counterparty: Option<&str>, tag: &str) -> MessageRecord {
        let mut builder = MessageRecord::builder("+100").direction_tag(tag);
        if let Some(phone) = counterparty {
            builder = builder.counterparty(phone);
        }
        builder.build()
    }

    #[test]
    fn test_counts_by_direction() {
        let records = vec![
            tagged(Some("A"), "salida"),
            tagged(Some("A"), "sent"),
            tagged(Some("A"), "entrada"),
            tagged(Some("B"), "incoming"),
            tagged(Some("B"), "foo"),
            tagged(None, "received"),
        ];
        let stats = MessageStats::from_records(&records);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.sent, 2);
        assert_eq!(stats.received, 3);
        assert_eq!(stats.unclassified, 1);
        assert_eq!(stats.received_or_unknown(), 4);
        assert_eq!(stats.conversations, 3);
    }

    #[test]
    fn test_attachments_counted() {
        let records = vec![
            MessageRecord::builder("+100")
                .attachment_url("https://cdn.example.com/doc.pdf")
                .build(),
            MessageRecord::builder("+100").attachment_url("").build(),
        ];
        assert_eq!(MessageStats::from_records(&records).with_attachment, 1);
    }

    #[test]
    fn test_empty() {
        assert_eq!(MessageStats::from_records(&[]), MessageStats::default());
    }
}
