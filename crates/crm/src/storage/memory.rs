//! In-memory storage implementation
//!
//! Used by tests and by anything that wants a throwaway store. Behaves
//! like the SQLite store, including id assignment and ordering.

use anyhow::{Result, bail};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use super::CrmStore;
use crate::models::{
    ContactId, ContactRecord, ContactUpdate, DeliveryStatus, LeadStatus, MessageId,
    MessageRecord, Profile,
};

/// In-memory implementation of CrmStore
///
/// Messages are keyed by id in a BTreeMap so iteration follows insertion
/// order, which is the tiebreak for equal timestamps.
pub struct InMemoryCrmStore {
    profiles: RwLock<HashMap<String, Profile>>,
    messages: RwLock<BTreeMap<i64, MessageRecord>>,
    next_message_id: RwLock<i64>,
    contacts: RwLock<HashMap<String, ContactRecord>>,
}

impl InMemoryCrmStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            messages: RwLock::new(BTreeMap::new()),
            next_message_id: RwLock::new(1),
            contacts: RwLock::new(HashMap::new()),
        }
    }

    fn modify_contact<F>(&self, id: &ContactId, f: F) -> Result<Option<ContactRecord>>
    where
        F: FnOnce(&mut ContactRecord),
    {
        let mut contacts = self.contacts.write().unwrap();
        let Some(contact) = contacts.get_mut(id.as_str()) else {
            return Ok(None);
        };
        f(contact);
        Ok(Some(contact.clone()))
    }
}

impl Default for InMemoryCrmStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CrmStore for InMemoryCrmStore {
    fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let profiles = self.profiles.read().unwrap();
        Ok(profiles.get(user_id).cloned())
    }

    fn upsert_profile(&self, profile: Profile) -> Result<()> {
        let mut profiles = self.profiles.write().unwrap();
        profiles.insert(profile.user_id.clone(), profile);
        Ok(())
    }

    fn insert_message(&self, mut message: MessageRecord) -> Result<MessageRecord> {
        let mut next_id = self.next_message_id.write().unwrap();
        message.id = MessageId(*next_id);
        *next_id += 1;

        let mut messages = self.messages.write().unwrap();
        messages.insert(message.id.0, message.clone());
        Ok(message)
    }

    fn get_message(&self, id: MessageId) -> Result<Option<MessageRecord>> {
        let messages = self.messages.read().unwrap();
        Ok(messages.get(&id.0).cloned())
    }

    fn list_messages_for_account(&self, account_phone: &str) -> Result<Vec<MessageRecord>> {
        let messages = self.messages.read().unwrap();
        let mut result: Vec<MessageRecord> = messages
            .values()
            .filter(|m| m.account_phone == account_phone)
            .cloned()
            .collect();

        // Stable sort keeps id order for equal timestamps
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }

    fn set_delivery_status(&self, id: MessageId, status: DeliveryStatus) -> Result<bool> {
        let mut messages = self.messages.write().unwrap();
        match messages.get_mut(&id.0) {
            Some(message) => {
                message.delivery = Some(status);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn count_messages(&self, account_phone: &str) -> Result<usize> {
        let messages = self.messages.read().unwrap();
        Ok(messages
            .values()
            .filter(|m| m.account_phone == account_phone)
            .count())
    }

    fn insert_contact(&self, contact: ContactRecord) -> Result<()> {
        let mut contacts = self.contacts.write().unwrap();
        if contacts.contains_key(contact.id.as_str()) {
            bail!("Contact {} already exists", contact.id.as_str());
        }
        if contacts
            .values()
            .any(|c| c.counterparty_phone == contact.counterparty_phone)
        {
            bail!(
                "A contact for {} already exists",
                contact.counterparty_phone
            );
        }
        contacts.insert(contact.id.0.clone(), contact);
        Ok(())
    }

    fn get_or_insert_contact(&self, contact: ContactRecord) -> Result<ContactRecord> {
        let mut contacts = self.contacts.write().unwrap();
        if let Some(existing) = contacts
            .values()
            .find(|c| c.counterparty_phone == contact.counterparty_phone)
        {
            return Ok(existing.clone());
        }
        contacts.insert(contact.id.0.clone(), contact.clone());
        Ok(contact)
    }

    fn get_contact(&self, id: &ContactId) -> Result<Option<ContactRecord>> {
        let contacts = self.contacts.read().unwrap();
        Ok(contacts.get(id.as_str()).cloned())
    }

    fn find_contact_by_phone(&self, counterparty_phone: &str) -> Result<Option<ContactRecord>> {
        let contacts = self.contacts.read().unwrap();
        Ok(contacts
            .values()
            .find(|c| c.counterparty_phone == counterparty_phone)
            .cloned())
    }

    fn update_contact(
        &self,
        id: &ContactId,
        update: ContactUpdate,
    ) -> Result<Option<ContactRecord>> {
        self.modify_contact(id, |contact| contact.apply(update))
    }

    fn update_contact_status(
        &self,
        id: &ContactId,
        status: LeadStatus,
    ) -> Result<Option<ContactRecord>> {
        self.modify_contact(id, |contact| {
            contact.status = status;
            contact.updated_at = Utc::now();
        })
    }

    fn list_contacts(&self) -> Result<Vec<ContactRecord>> {
        let contacts = self.contacts.read().unwrap();
        let mut result: Vec<ContactRecord> = contacts.values().cloned().collect();
        result.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        Ok(result)
    }

    fn clear(&self) -> Result<()> {
        self.profiles.write().unwrap().clear();
        self.messages.write().unwrap().clear();
        *self.next_message_id.write().unwrap() = 1;
        self.contacts.write().unwrap().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_insert_assigns_monotonic_ids() {
        let store = InMemoryCrmStore::new();
        let a = store
            .insert_message(MessageRecord::builder("+1").counterparty("+2").build())
            .unwrap();
        let b = store
            .insert_message(MessageRecord::builder("+1").counterparty("+2").build())
            .unwrap();
        assert_eq!(a.id, MessageId(1));
        assert_eq!(b.id, MessageId(2));
    }

    #[test]
    fn test_list_filters_by_account_and_sorts() {
        let store = InMemoryCrmStore::new();
        store
            .insert_message(MessageRecord::builder("+1").body("late").created_at(at(10)).build())
            .unwrap();
        store
            .insert_message(MessageRecord::builder("+9").body("other").created_at(at(0)).build())
            .unwrap();
        store
            .insert_message(MessageRecord::builder("+1").body("early").created_at(at(5)).build())
            .unwrap();
        store
            .insert_message(MessageRecord::builder("+1").body("tie").created_at(at(10)).build())
            .unwrap();

        let bodies: Vec<String> = store
            .list_messages_for_account("+1")
            .unwrap()
            .into_iter()
            .filter_map(|m| m.body)
            .collect();
        assert_eq!(bodies, vec!["early", "late", "tie"]);
        assert_eq!(store.count_messages("+1").unwrap(), 3);
    }

    #[test]
    fn test_set_delivery_status() {
        let store = InMemoryCrmStore::new();
        let msg = store
            .insert_message(
                MessageRecord::builder("+1")
                    .delivery(DeliveryStatus::Pending)
                    .build(),
            )
            .unwrap();
        assert!(store.set_delivery_status(msg.id, DeliveryStatus::Delivered).unwrap());
        assert_eq!(
            store.get_message(msg.id).unwrap().unwrap().delivery,
            Some(DeliveryStatus::Delivered)
        );
        assert!(!store.set_delivery_status(MessageId(99), DeliveryStatus::Failed).unwrap());
    }

    #[test]
    fn test_duplicate_contact_phone_rejected() {
        let store = InMemoryCrmStore::new();
        store.insert_contact(ContactRecord::new("+2")).unwrap();
        assert!(store.insert_contact(ContactRecord::new("+2")).is_err());
    }

    #[test]
    fn test_get_or_insert_contact_keeps_first() {
        let store = InMemoryCrmStore::new();
        let first = store.get_or_insert_contact(ContactRecord::new("+2")).unwrap();
        let second = store.get_or_insert_contact(ContactRecord::new("+2")).unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(store.list_contacts().unwrap().len(), 1);
    }

    #[test]
    fn test_contacts_listed_by_updated_at_desc() {
        let store = InMemoryCrmStore::new();
        let mut old = ContactRecord::new("+2");
        old.updated_at = Utc::now() - Duration::hours(2);
        let old_id = old.id.clone();
        store.insert_contact(old).unwrap();
        store.insert_contact(ContactRecord::new("+3")).unwrap();

        let listed = store.list_contacts().unwrap();
        assert_eq!(listed[1].id, old_id);

        // Moving the old lead bumps it to the top
        store
            .update_contact_status(&old_id, LeadStatus::Won)
            .unwrap()
            .unwrap();
        let listed = store.list_contacts().unwrap();
        assert_eq!(listed[0].id, old_id);
        assert_eq!(listed[0].status, LeadStatus::Won);
    }

    #[test]
    fn test_update_missing_contact() {
        let store = InMemoryCrmStore::new();
        let result = store
            .update_contact_status(&ContactId::new("nope"), LeadStatus::Lost)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_clear() {
        let store = InMemoryCrmStore::new();
        store.upsert_profile(Profile::new("u1")).unwrap();
        store.insert_message(MessageRecord::builder("+1").build()).unwrap();
        store.insert_contact(ContactRecord::new("+2")).unwrap();
        store.clear().unwrap();

        assert!(store.get_profile("u1").unwrap().is_none());
        assert_eq!(store.count_messages("+1").unwrap(), 0);
        assert!(store.list_contacts().unwrap().is_empty());
        let msg = store.insert_message(MessageRecord::builder("+1").build()).unwrap();
        assert_eq!(msg.id, MessageId(1));
    }
}
