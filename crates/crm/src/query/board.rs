//! Lead status board (kanban)

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::{ContactRecord, LeadStatus};
use crate::storage::CrmStore;

/// One column of the board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardColumn {
    pub status: LeadStatus,
    /// Contacts in this stage, most recently updated first
    pub contacts: Vec<ContactRecord>,
}

impl BoardColumn {
    pub fn count(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

/// All six pipeline columns in fixed order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadBoard {
    pub columns: Vec<BoardColumn>,
}

impl LeadBoard {
    /// Distribute contacts into their columns.
    ///
    /// Every column is present even when empty. Within a column contacts are
    /// ordered by `updated_at` descending.
    pub fn from_contacts(contacts: Vec<ContactRecord>) -> Self {
        let mut columns: Vec<BoardColumn> = LeadStatus::ALL
            .iter()
            .map(|&status| BoardColumn {
                status,
                contacts: Vec::new(),
            })
            .collect();

        for contact in contacts {
            columns[contact.status.position()].contacts.push(contact);
        }
        for column in &mut columns {
            column
                .contacts
                .sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        }

        Self { columns }
    }

    pub fn column(&self, status: LeadStatus) -> &BoardColumn {
        &self.columns[status.position()]
    }

    pub fn total(&self) -> usize {
        self.columns.iter().map(BoardColumn::count).sum()
    }
}

/// Load the board from storage
pub fn load_board(store: &dyn CrmStore) -> Result<LeadBoard> {
    Ok(LeadBoard::from_contacts(store.list_contacts()?))
}
