//! Domain models for CRM entities

mod contact;
mod conversation;
mod direction;
mod message;
mod profile;

pub use contact::{ContactId, ContactRecord, ContactUpdate, LeadStatus};
pub use conversation::{ATTACHMENT_PREVIEW, ConversationThread, UNKNOWN_COUNTERPARTY, preview_for};
pub use direction::{Direction, INBOUND_TAGS, OUTBOUND_TAGS, classify_direction};
pub use message::{DeliveryStatus, MessageBuilder, MessageId, MessageRecord, OUTBOUND_TAG, SENT_ID};
pub use profile::{AccountContext, Profile};
