//! Action handler for CRM mutations
//!
//! Coordinates between the outbound message sink and local storage.

use anyhow::Result;
use log::{info, warn};
use std::sync::Arc;

use crate::error::CrmError;
use crate::models::{
    AccountContext, ContactId, ContactRecord, ContactUpdate, DeliveryStatus, Direction,
    LeadStatus, MessageId, MessageRecord,
};
use crate::storage::CrmStore;
use crate::webhook::MessageSink;
use crate::webhook::api::OutboundPayload;

/// Result of handing a message to the sink
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// The stored message with its final delivery status
    pub record: MessageRecord,
    /// Sink error text when delivery failed
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn delivered(&self) -> bool {
        self.record.delivery == Some(DeliveryStatus::Delivered)
    }
}

/// Handler for dashboard actions: sending, lead moves and contact edits
///
/// Sends are performed in two steps:
/// 1. Record the message locally as `pending`
/// 2. Hand it to the sink and mark it `delivered` or `failed`
///
/// A failed delivery leaves the row in place so it can be retried.
pub struct ActionHandler {
    sink: Arc<dyn MessageSink>,
    store: Arc<dyn CrmStore>,
}

impl ActionHandler {
    /// Create a new action handler
    pub fn new(sink: Arc<dyn MessageSink>, store: Arc<dyn CrmStore>) -> Self {
        Self { sink, store }
    }

    /// Resolve the account a signed-in user works on
    ///
    /// Fails with [`CrmError::ProfileNotFound`] or
    /// [`CrmError::MissingPhoneNumber`].
    pub fn account_context(&self, user_id: &str) -> Result<AccountContext> {
        let profile = self
            .store
            .get_profile(user_id)?
            .ok_or_else(|| CrmError::ProfileNotFound {
                user_id: user_id.to_string(),
            })?;
        Ok(profile.account_context()?)
    }

    /// Send a text message to a counterparty
    ///
    /// # Arguments
    /// * `ctx` - Account sending the message
    /// * `counterparty_phone` - Recipient
    /// * `text` - Message text; trimmed, must not be blank
    ///
    /// Delivery failure is reported in the outcome, not as an error.
    pub fn send_message(
        &self,
        ctx: &AccountContext,
        counterparty_phone: &str,
        text: &str,
    ) -> Result<SendOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CrmError::EmptyMessage.into());
        }

        let record = self.store.insert_message(
            MessageRecord::builder(&ctx.account_phone)
                .counterparty(counterparty_phone)
                .body(text)
                .outbound()
                .delivery(DeliveryStatus::Pending)
                .build(),
        )?;
        info!(
            "Recorded message {} for {} -> {}",
            record.id, ctx.account_phone, counterparty_phone
        );

        self.deliver(record)
    }

    /// Deliver a stored message again
    ///
    /// Intended for rows left `failed`; a delivered message is sent again
    /// if asked. Only outbound rows recorded by [`Self::send_message`] for
    /// the same account qualify: another account's message is
    /// [`CrmError::MessageNotFound`], an inbound or externally written row
    /// is [`CrmError::NotRetryable`].
    pub fn retry_delivery(&self, ctx: &AccountContext, id: MessageId) -> Result<SendOutcome> {
        let record = self
            .store
            .get_message(id)?
            .filter(|m| m.account_phone == ctx.account_phone)
            .ok_or(CrmError::MessageNotFound(id))?;
        if record.delivery.is_none() || record.direction() != Direction::Outbound {
            return Err(CrmError::NotRetryable(id).into());
        }
        info!("Retrying delivery of message {}", id);

        self.store.set_delivery_status(id, DeliveryStatus::Pending)?;
        self.deliver(record)
    }

    fn deliver(&self, mut record: MessageRecord) -> Result<SendOutcome> {
        let payload = OutboundPayload::from_record(&record);

        let (status, error) = match self.sink.deliver(&payload) {
            Ok(_) => {
                info!("Delivered message {}", record.id);
                (DeliveryStatus::Delivered, None)
            }
            Err(e) => {
                warn!("Delivery of message {} failed: {:#}", record.id, e);
                (DeliveryStatus::Failed, Some(format!("{e:#}")))
            }
        };

        self.store.set_delivery_status(record.id, status)?;
        record.delivery = Some(status);
        Ok(SendOutcome { record, error })
    }

    /// Open the contact panel for a counterparty
    ///
    /// Returns the tracked contact, creating one with status `new` the first
    /// time a counterparty is viewed.
    pub fn open_contact(&self, counterparty_phone: &str) -> Result<ContactRecord> {
        if let Some(contact) = self.store.find_contact_by_phone(counterparty_phone)? {
            return Ok(contact);
        }

        let candidate = ContactRecord::new(counterparty_phone);
        let contact = self.store.get_or_insert_contact(candidate.clone())?;
        if contact.id == candidate.id {
            info!(
                "Created contact {} for {}",
                contact.id.as_str(),
                counterparty_phone
            );
        }
        Ok(contact)
    }

    /// Save the contact edit form
    pub fn save_contact(&self, id: &ContactId, update: ContactUpdate) -> Result<ContactRecord> {
        let contact = self
            .store
            .update_contact(id, update)?
            .ok_or_else(|| CrmError::ContactNotFound(id.clone()))?;
        info!("Saved contact {}", id.as_str());
        Ok(contact)
    }

    /// Move a lead to another pipeline stage
    ///
    /// Any stage can move to any other; the last write wins.
    pub fn move_lead(&self, id: &ContactId, status: LeadStatus) -> Result<ContactRecord> {
        let contact = self
            .store
            .update_contact_status(id, status)?
            .ok_or_else(|| CrmError::ContactNotFound(id.clone()))?;
        info!("Moved contact {} to {}", id.as_str(), status);
        Ok(contact)
    }
}
