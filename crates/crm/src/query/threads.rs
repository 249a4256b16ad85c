//! Conversation threading
//!
//! Threads are recomputed from the flat message rows on every fetch; there
//! is no incremental update and no identity across runs.

use std::collections::HashMap;

use anyhow::Result;
use log::debug;

use crate::models::{AccountContext, ConversationThread, MessageRecord, UNKNOWN_COUNTERPARTY};
use crate::storage::CrmStore;

/// Group an account's messages into per-counterparty threads.
///
/// 1. Messages are sorted by `created_at` ascending. The sort is stable, so
///    equal timestamps keep their input order.
/// 2. They are grouped by counterparty phone, with missing phones under
///    [`UNKNOWN_COUNTERPARTY`].
/// 3. Threads come out in the order their key first appears in the sorted
///    sequence, i.e. by each thread's *earliest* message. Use
///    [`sort_by_recency`] for most-recent-first.
pub fn build_threads(mut records: Vec<MessageRecord>) -> Vec<ConversationThread> {
    records.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<MessageRecord>)> = Vec::new();

    for record in records {
        let key = record
            .counterparty_phone
            .clone()
            .unwrap_or_else(|| UNKNOWN_COUNTERPARTY.to_string());

        match index.get(&key) {
            Some(&slot) => groups[slot].1.push(record),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![record]));
            }
        }
    }

    groups
        .into_iter()
        .filter_map(|(key, messages)| ConversationThread::from_messages(key, messages))
        .collect()
}

/// Reorder threads so the most recently active comes first
pub fn sort_by_recency(threads: &mut [ConversationThread]) {
    threads.sort_by(|a, b| b.preview_timestamp.cmp(&a.preview_timestamp));
}

/// Find the thread for a counterparty
pub fn find_thread<'a>(
    threads: &'a [ConversationThread],
    counterparty_phone: &str,
) -> Option<&'a ConversationThread> {
    threads
        .iter()
        .find(|t| t.counterparty_phone == counterparty_phone)
}

/// Fetch an account's messages and thread them
pub fn list_conversations(
    store: &dyn CrmStore,
    ctx: &AccountContext,
) -> Result<Vec<ConversationThread>> {
    let messages = store.list_messages_for_account(&ctx.account_phone)?;
    let count = messages.len();
    let threads = build_threads(messages);
    debug!(
        "Built {} threads from {} messages for {}",
        threads.len(),
        count,
        ctx.account_phone
    );
    Ok(threads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ATTACHMENT_PREVIEW;
    use crate::storage::InMemoryCrmStore;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(t: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + t, 0).unwrap()
    }

    fn msg(counterparty: Option<&str>, t: i64, body: &str) -> MessageRecord {
        let mut builder = MessageRecord::builder("+100").created_at(at(t)).body(body);
        if let Some(phone) = counterparty {
            builder = builder.counterparty(phone);
        }
        builder.build()
    }

    fn bodies(thread: &ConversationThread) -> Vec<&str> {
        thread
            .messages
            .iter()
            .filter_map(|m| m.body.as_deref())
            .collect()
    }

    #[test]
    fn test_two_threads_in_first_appearance_order() {
        let threads = build_threads(vec![
            msg(Some("A"), 1, "hi"),
            msg(Some("B"), 2, "yo"),
            msg(Some("A"), 3, "bye"),
        ]);

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].counterparty_phone, "A");
        assert_eq!(threads[1].counterparty_phone, "B");
        assert_eq!(bodies(&threads[0]), vec!["hi", "bye"]);
        assert_eq!(threads[0].preview_text, "bye");
        assert_eq!(threads[0].preview_timestamp, at(3));
    }

    #[test]
    fn test_sorts_before_grouping() {
        // B's only message is earlier than A's first, so B comes first
        let threads = build_threads(vec![
            msg(Some("A"), 5, "second"),
            msg(Some("A"), 3, "first"),
            msg(Some("B"), 1, "early"),
        ]);

        assert_eq!(threads[0].counterparty_phone, "B");
        assert_eq!(bodies(&threads[1]), vec!["first", "second"]);
        assert_eq!(threads[1].preview_text, "second");
    }

    #[test]
    fn test_order_is_by_earliest_not_latest_message() {
        let threads = build_threads(vec![
            msg(Some("A"), 1, "old"),
            msg(Some("B"), 2, "mid"),
            msg(Some("A"), 9, "newest"),
        ]);
        assert_eq!(threads[0].counterparty_phone, "A");

        let mut threads = threads;
        sort_by_recency(&mut threads);
        assert_eq!(threads[0].counterparty_phone, "A");
        assert_eq!(threads[1].counterparty_phone, "B");
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let threads = build_threads(vec![
            msg(Some("A"), 1, "one"),
            msg(Some("A"), 1, "two"),
            msg(Some("A"), 1, "three"),
        ]);
        assert_eq!(bodies(&threads[0]), vec!["one", "two", "three"]);
        assert_eq!(threads[0].preview_text, "three");
    }

    #[test]
    fn test_missing_counterparty_buckets_under_unknown() {
        let threads = build_threads(vec![msg(None, 1, "x"), msg(Some("A"), 2, "y"), msg(None, 3, "z")]);
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].counterparty_phone, UNKNOWN_COUNTERPARTY);
        assert!(threads[0].is_unknown());
        assert_eq!(bodies(&threads[0]), vec!["x", "z"]);
    }

    #[test]
    fn test_attachment_only_last_message() {
        let attachment = MessageRecord::builder("+100")
            .counterparty("A")
            .attachment_url("https://cdn.example.com/photo.jpg")
            .created_at(at(2))
            .build();
        let threads = build_threads(vec![msg(Some("A"), 1, "look"), attachment]);
        assert_eq!(threads[0].preview_text, ATTACHMENT_PREVIEW);
    }

    #[test]
    fn test_bare_last_message_uses_placeholder() {
        let bare = MessageRecord::builder("+100").counterparty("A").build();
        let threads = build_threads(vec![bare]);
        assert_eq!(threads[0].preview_text, ATTACHMENT_PREVIEW);
    }

    #[test]
    fn test_empty_input() {
        assert!(build_threads(Vec::new()).is_empty());
    }

    #[test]
    fn test_every_message_in_exactly_one_thread() {
        let input: Vec<MessageRecord> = (0..40)
            .map(|i| {
                let phone = match i % 4 {
                    0 => None,
                    n => Some(format!("+{n}")),
                };
                let mut builder = MessageRecord::builder("+100")
                    .id(crate::models::MessageId(i))
                    .created_at(at((i * 7) % 13));
                if let Some(phone) = phone {
                    builder = builder.counterparty(phone);
                }
                builder.build()
            })
            .collect();

        let threads = build_threads(input);
        let mut seen: Vec<i64> = threads
            .iter()
            .flat_map(|t| t.messages.iter().map(|m| m.id.0))
            .collect();
        seen.sort();
        let expected: Vec<i64> = (0..40).collect();
        assert_eq!(seen, expected);

        for thread in &threads {
            let key = thread.counterparty_phone.as_str();
            assert!(thread.messages.iter().all(|m| {
                m.counterparty_phone.as_deref().unwrap_or(UNKNOWN_COUNTERPARTY) == key
            }));
            assert!(thread
                .messages
                .windows(2)
                .all(|w| w[0].created_at <= w[1].created_at));
        }
    }

    #[test]
    fn test_idempotent() {
        let input = vec![
            msg(Some("B"), 4, "b"),
            msg(Some("A"), 2, "a"),
            msg(None, 3, "u"),
        ];
        assert_eq!(build_threads(input.clone()), build_threads(input));
    }

    #[test]
    fn test_list_conversations_uses_account_phone() {
        let store = InMemoryCrmStore::new();
        store.insert_message(msg(Some("A"), 1, "mine")).unwrap();
        store
            .insert_message(
                MessageRecord::builder("+999")
                    .counterparty("A")
                    .body("not mine")
                    .build(),
            )
            .unwrap();

        let ctx = AccountContext::new("u1", "+100");
        let threads = list_conversations(&store, &ctx).unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(bodies(&threads[0]), vec!["mine"]);
        assert!(find_thread(&threads, "A").is_some());
        assert!(find_thread(&threads, "B").is_none());
    }
}
