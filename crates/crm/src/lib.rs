//! CRM crate - Business logic for the lead dashboard
//!
//! This crate provides the platform-independent core of Leadline:
//! - Domain models (messages, threads, contacts, profiles)
//! - Conversation threading and direction classification
//! - Storage trait with SQLite and in-memory backends
//! - Query API for the dashboard views (threads, stats, lead board)
//! - Outbound delivery to the chat-network webhook
//! - Action handlers for mutations (send, retry, lead moves, contact edits)
//!
//! Everything here is synchronous; async callers move store and sink calls
//! onto blocking threads.

pub mod actions;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod storage;
pub mod webhook;

pub use actions::{ActionHandler, SendOutcome};
pub use config::Settings;
pub use error::CrmError;
pub use models::{
    AccountContext, ContactId, ContactRecord, ContactUpdate, ConversationThread, DeliveryStatus,
    Direction, LeadStatus, MessageId, MessageRecord, Profile, classify_direction,
};
pub use query::{
    BoardColumn, LeadBoard, MessageStats, account_stats, build_threads, find_thread,
    list_conversations, load_board, sort_by_recency,
};
pub use storage::{CrmStore, InMemoryCrmStore, SqliteCrmStore};
pub use webhook::{
    MessageSink, RelayClient, Transport, WebhookClient, WebhookError,
    api::{OutboundPayload, RelayResponse},
};
