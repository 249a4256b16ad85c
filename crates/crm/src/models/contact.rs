//! Contact (lead) model and its pipeline status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generated identifier for a contact (UUID string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId(pub String);

impl ContactId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ContactId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContactId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Sales pipeline stage of a lead
///
/// There is no transition graph: any status can move to any other.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Proposal,
    Won,
    Lost,
}

impl LeadStatus {
    /// Every status in board order
    pub const ALL: [LeadStatus; 6] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::Proposal,
        LeadStatus::Won,
        LeadStatus::Lost,
    ];

    /// Storage slug
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Proposal => "proposal",
            LeadStatus::Won => "won",
            LeadStatus::Lost => "lost",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::Contacted => "Contacted",
            LeadStatus::Qualified => "Qualified",
            LeadStatus::Proposal => "Proposal",
            LeadStatus::Won => "Won",
            LeadStatus::Lost => "Lost",
        }
    }

    /// Parse a stored status. Accepts the slugs and the legacy Spanish tags.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" | "nuevo" => Some(LeadStatus::New),
            "contacted" | "contactado" => Some(LeadStatus::Contacted),
            "qualified" | "calificado" => Some(LeadStatus::Qualified),
            "proposal" | "propuesta" => Some(LeadStatus::Proposal),
            "won" | "ganado" => Some(LeadStatus::Won),
            "lost" | "perdido" => Some(LeadStatus::Lost),
            _ => None,
        }
    }

    /// Position on the board (0-based)
    pub fn position(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown lead status: {s}"))
    }
}

/// A CRM record for one counterparty phone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: ContactId,
    /// Counterparty phone this lead tracks (unique)
    pub counterparty_phone: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: LeadStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContactRecord {
    /// A fresh lead in the `new` stage
    pub fn new(counterparty_phone: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ContactId::generate(),
            counterparty_phone: counterparty_phone.into(),
            name: None,
            email: None,
            status: LeadStatus::New,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_status(mut self, status: LeadStatus) -> Self {
        self.status = status;
        self
    }

    /// Name for display, falling back to the phone number
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.counterparty_phone)
    }

    /// Apply an edit-form save
    pub fn apply(&mut self, update: ContactUpdate) {
        self.name = update.name;
        self.email = update.email;
        self.status = update.status;
        self.notes = update.notes;
        self.updated_at = Utc::now();
    }
}

/// Fields written by the contact edit form
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContactUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: LeadStatus,
    pub notes: Option<String>,
}

impl ContactUpdate {
    /// Build an update from raw form values; blank strings clear the field.
    pub fn from_form(name: &str, email: &str, status: LeadStatus, notes: &str) -> Self {
        Self {
            name: non_blank(name),
            email: non_blank(email),
            status,
            notes: non_blank(notes),
        }
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_order() {
        let positions: Vec<usize> = LeadStatus::ALL.iter().map(|s| s.position()).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4, 5]);
        assert!(LeadStatus::New < LeadStatus::Lost);
    }

    #[test]
    fn test_status_parse_slugs_and_legacy() {
        for status in LeadStatus::ALL {
            assert_eq!(LeadStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(LeadStatus::parse("nuevo"), Some(LeadStatus::New));
        assert_eq!(LeadStatus::parse("ganado"), Some(LeadStatus::Won));
        assert_eq!(LeadStatus::parse("Perdido"), Some(LeadStatus::Lost));
        assert_eq!(LeadStatus::parse("archived"), None);
    }

    #[test]
    fn test_status_from_str() {
        let status: LeadStatus = "proposal".parse().unwrap();
        assert_eq!(status, LeadStatus::Proposal);
        assert!("bogus".parse::<LeadStatus>().is_err());
    }

    #[test]
    fn test_new_contact() {
        let contact = ContactRecord::new("+5491100000001");
        assert_eq!(contact.status, LeadStatus::New);
        assert_eq!(contact.display_name(), "+5491100000001");
        assert!(!contact.id.as_str().is_empty());
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(ContactId::generate(), ContactId::generate());
    }

    #[test]
    fn test_form_update_clears_blanks() {
        let update = ContactUpdate::from_form("  Ana ", "", LeadStatus::Qualified, "   ");
        assert_eq!(update.name.as_deref(), Some("Ana"));
        assert!(update.email.is_none());
        assert!(update.notes.is_none());

        let mut contact = ContactRecord::new("+1").with_name("Old");
        let before = contact.updated_at;
        contact.apply(update);
        assert_eq!(contact.display_name(), "Ana");
        assert_eq!(contact.status, LeadStatus::Qualified);
        assert!(contact.updated_at >= before);
    }
}
