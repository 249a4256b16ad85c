//! Storage trait definitions

use anyhow::Result;

use crate::models::{
    ContactId, ContactRecord, ContactUpdate, DeliveryStatus, LeadStatus, MessageId,
    MessageRecord, Profile,
};

/// Trait for CRM storage operations
///
/// Abstracts over the in-memory and SQLite backends. Every method is a
/// single round trip keyed by primary key or a simple filter; there is no
/// optimistic concurrency, the last write wins.
pub trait CrmStore: Send + Sync {
    // === Profiles ===

    /// Get a profile by auth user id
    fn get_profile(&self, user_id: &str) -> Result<Option<Profile>>;

    /// Insert or update a profile
    fn upsert_profile(&self, profile: Profile) -> Result<()>;

    // === Messages ===

    /// Insert a message, assigning a fresh id. Returns the stored record.
    fn insert_message(&self, message: MessageRecord) -> Result<MessageRecord>;

    /// Get a message by id
    fn get_message(&self, id: MessageId) -> Result<Option<MessageRecord>>;

    /// List every message of an account, ordered by created_at ascending
    /// with insertion order breaking ties
    fn list_messages_for_account(&self, account_phone: &str) -> Result<Vec<MessageRecord>>;

    /// Set the delivery status of a message. Returns false if it doesn't exist.
    fn set_delivery_status(&self, id: MessageId, status: DeliveryStatus) -> Result<bool>;

    /// Count messages of an account
    fn count_messages(&self, account_phone: &str) -> Result<usize>;

    // === Contacts ===

    /// Insert a new contact. Fails if the counterparty phone is taken.
    fn insert_contact(&self, contact: ContactRecord) -> Result<()>;

    /// Insert the contact unless its counterparty phone is already tracked.
    /// Returns the stored contact either way.
    fn get_or_insert_contact(&self, contact: ContactRecord) -> Result<ContactRecord>;

    /// Get a contact by id
    fn get_contact(&self, id: &ContactId) -> Result<Option<ContactRecord>>;

    /// Find the contact tracking a counterparty phone
    fn find_contact_by_phone(&self, counterparty_phone: &str) -> Result<Option<ContactRecord>>;

    /// Overwrite the editable fields of a contact. Returns the updated row.
    fn update_contact(&self, id: &ContactId, update: ContactUpdate)
    -> Result<Option<ContactRecord>>;

    /// Move a contact to another pipeline stage. Returns the updated row.
    fn update_contact_status(
        &self,
        id: &ContactId,
        status: LeadStatus,
    ) -> Result<Option<ContactRecord>>;

    /// List all contacts, most recently updated first
    fn list_contacts(&self) -> Result<Vec<ContactRecord>>;

    /// Clear all data (for testing)
    fn clear(&self) -> Result<()>;
}
