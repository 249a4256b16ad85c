//! Dashboard state and commands
//!
//! Owns the store, the action handler and the signed-in user.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use crm::{
    AccountContext, ActionHandler, ContactId, ContactUpdate, CrmStore, LeadStatus, MessageId,
    Profile, SendOutcome, Settings, SqliteCrmStore, account_stats, find_thread,
    list_conversations, load_board, sort_by_recency,
};
use log::info;

use crate::views;

/// Fields the contact command may change; unset fields keep their value
#[derive(Debug, Default)]
pub struct ContactEdit {
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: Option<LeadStatus>,
    pub notes: Option<String>,
}

impl ContactEdit {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.status.is_none() && self.notes.is_none()
    }
}

pub struct Dashboard {
    store: Arc<dyn CrmStore>,
    actions: ActionHandler,
    user_id: String,
}

impl Dashboard {
    /// Open the dashboard on the configured database
    pub fn open(settings: &Settings, user_id: impl Into<String>) -> Result<Self> {
        let db_path = settings.database_path()?;
        info!("Opening database at {}", db_path.display());
        let store: Arc<dyn CrmStore> = Arc::new(
            SqliteCrmStore::new(&db_path)
                .with_context(|| format!("Failed to open {}", db_path.display()))?,
        );
        Ok(Self::with_store(settings, store, user_id))
    }

    pub fn with_store(
        settings: &Settings,
        store: Arc<dyn CrmStore>,
        user_id: impl Into<String>,
    ) -> Self {
        let actions = ActionHandler::new(settings.message_sink(), store.clone());
        Self {
            store,
            actions,
            user_id: user_id.into(),
        }
    }

    fn account(&self) -> Result<AccountContext> {
        self.actions.account_context(&self.user_id)
    }

    pub fn set_profile(
        &self,
        phone: Option<String>,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<String> {
        let mut profile = self
            .store
            .get_profile(&self.user_id)?
            .unwrap_or_else(|| Profile::new(&self.user_id));
        if let Some(phone) = phone {
            profile.phone_number = Some(phone).filter(|p| !p.trim().is_empty());
        }
        if let Some(name) = name {
            profile = profile.with_full_name(name);
        }
        if let Some(email) = email {
            profile = profile.with_email(email);
        }
        self.store.upsert_profile(profile.clone())?;
        Ok(views::render_profile(&profile))
    }

    pub fn show_profile(&self) -> Result<String> {
        let profile = self
            .store
            .get_profile(&self.user_id)?
            .unwrap_or_else(|| Profile::new(&self.user_id));
        Ok(views::render_profile(&profile))
    }

    pub fn threads(&self, recent_first: bool, json: bool) -> Result<String> {
        let ctx = self.account()?;
        let mut threads = list_conversations(self.store.as_ref(), &ctx)?;
        if recent_first {
            sort_by_recency(&mut threads);
        }
        if json {
            return Ok(serde_json::to_string_pretty(&threads)?);
        }
        Ok(views::render_thread_list(&threads, Utc::now()))
    }

    /// Thread view with its contact panel; viewing creates the contact
    pub fn show_thread(&self, counterparty: &str) -> Result<String> {
        let ctx = self.account()?;
        let threads = list_conversations(self.store.as_ref(), &ctx)?;
        let thread = find_thread(&threads, counterparty)
            .with_context(|| format!("No conversation with {counterparty}"))?;
        let contact = self.actions.open_contact(counterparty)?;
        Ok(views::render_thread(thread, Some(&contact)))
    }

    pub fn send(&self, counterparty: &str, text: &str) -> Result<SendOutcome> {
        let ctx = self.account()?;
        self.actions.send_message(&ctx, counterparty, text)
    }

    pub fn retry(&self, id: i64) -> Result<SendOutcome> {
        let ctx = self.account()?;
        self.actions.retry_delivery(&ctx, MessageId::new(id))
    }

    pub fn stats(&self, json: bool) -> Result<String> {
        let ctx = self.account()?;
        let stats = account_stats(self.store.as_ref(), &ctx)?;
        if json {
            return Ok(serde_json::to_string_pretty(&stats)?);
        }
        Ok(views::render_stats(&stats))
    }

    pub fn board(&self, json: bool) -> Result<String> {
        let board = load_board(self.store.as_ref())?;
        if json {
            return Ok(serde_json::to_string_pretty(&board)?);
        }
        Ok(views::render_board(&board))
    }

    pub fn move_lead(&self, contact_id: &str, status: LeadStatus) -> Result<String> {
        let contact = self.actions.move_lead(&ContactId::new(contact_id), status)?;
        Ok(format!(
            "{} moved to {}\n",
            contact.display_name(),
            contact.status.label()
        ))
    }

    /// Open a counterparty's contact, applying any edits
    pub fn contact(&self, counterparty: &str, edit: ContactEdit) -> Result<String> {
        let contact = self.actions.open_contact(counterparty)?;
        if edit.is_empty() {
            return Ok(views::render_contact(&contact));
        }

        let keep = |value: Option<String>, current: &Option<String>| {
            value.unwrap_or_else(|| current.clone().unwrap_or_default())
        };
        let update = ContactUpdate::from_form(
            &keep(edit.name, &contact.name),
            &keep(edit.email, &contact.email),
            edit.status.unwrap_or(contact.status),
            &keep(edit.notes, &contact.notes),
        );
        let saved = self.actions.save_contact(&contact.id, update)?;
        Ok(views::render_contact(&saved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm::{CrmError, InMemoryCrmStore, MessageRecord};

    fn dashboard() -> (Dashboard, Arc<InMemoryCrmStore>) {
        let store = Arc::new(InMemoryCrmStore::new());
        let dashboard = Dashboard::with_store(&Settings::default(), store.clone(), "u1");
        (dashboard, store)
    }

    #[test]
    fn test_threads_without_phone_number() {
        let (dashboard, _) = dashboard();
        dashboard.set_profile(None, Some("Ana".into()), None).unwrap();

        let err = dashboard.threads(false, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CrmError>(),
            Some(CrmError::MissingPhoneNumber { .. })
        ));
    }

    #[test]
    fn test_show_thread_creates_contact() {
        let (dashboard, store) = dashboard();
        dashboard
            .set_profile(Some("+100".into()), None, None)
            .unwrap();
        store
            .insert_message(
                MessageRecord::builder("+100")
                    .counterparty("+200")
                    .body("hola")
                    .direction_tag("entrada")
                    .build(),
            )
            .unwrap();

        let rendered = dashboard.show_thread("+200").unwrap();
        assert!(rendered.contains("hola"));
        assert!(store.find_contact_by_phone("+200").unwrap().is_some());
        assert!(dashboard.show_thread("+300").is_err());
    }

    #[test]
    fn test_contact_edit_keeps_unset_fields() {
        let (dashboard, store) = dashboard();
        dashboard
            .contact(
                "+200",
                ContactEdit {
                    name: Some("Ana".into()),
                    email: Some("ana@example.com".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        dashboard
            .contact(
                "+200",
                ContactEdit {
                    status: Some(LeadStatus::Won),
                    ..Default::default()
                },
            )
            .unwrap();

        let contact = store.find_contact_by_phone("+200").unwrap().unwrap();
        assert_eq!(contact.name.as_deref(), Some("Ana"));
        assert_eq!(contact.email.as_deref(), Some("ana@example.com"));
        assert_eq!(contact.status, LeadStatus::Won);
    }

    #[test]
    fn test_retry_only_own_outbound_messages() {
        let (dashboard, store) = dashboard();
        dashboard
            .set_profile(Some("+100".into()), None, None)
            .unwrap();
        let inbound = store
            .insert_message(
                MessageRecord::builder("+100")
                    .counterparty("+200")
                    .body("hola")
                    .direction_tag("entrada")
                    .build(),
            )
            .unwrap();

        let err = dashboard.retry(inbound.id.as_i64()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CrmError>(),
            Some(CrmError::NotRetryable(_))
        ));
    }

    #[test]
    fn test_profile_fields_round_trip() {
        let (dashboard, _) = dashboard();
        let rendered = dashboard
            .set_profile(
                Some("+100".into()),
                Some("Ana Pérez".into()),
                Some("ana@example.com".into()),
            )
            .unwrap();
        assert!(rendered.contains("Ana Pérez"));
        assert!(dashboard.show_profile().unwrap().contains("ana@example.com"));
    }

    #[test]
    fn test_board_json() {
        let (dashboard, _) = dashboard();
        dashboard.contact("+200", ContactEdit::default()).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&dashboard.board(true).unwrap()).unwrap();
        assert_eq!(json["columns"].as_array().unwrap().len(), 6);
    }
}
