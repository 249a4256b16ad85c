//! SQLite-backed CRM storage

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use rusqlite::Error::FromSqlConversionFailure;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rusqlite_migration::{M, Migrations};

use super::traits::CrmStore;
use crate::models::{
    ContactId, ContactRecord, ContactUpdate, DeliveryStatus, LeadStatus, MessageId,
    MessageRecord, Profile,
};

/// Database migrations
///
/// Applied in order; the user_version pragma records progress.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            CREATE TABLE profiles (
                user_id TEXT PRIMARY KEY,
                email TEXT,
                full_name TEXT,
                phone_number TEXT
            );

            -- One row per chat message, partitioned by account phone
            CREATE TABLE conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_phone TEXT NOT NULL,
                counterparty_phone TEXT,
                body TEXT,
                attachment_url TEXT,
                direction_tag TEXT,
                sent_id TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX idx_conversations_account
                ON conversations(account_phone, created_at ASC, id ASC);

            CREATE TABLE contacts (
                id TEXT PRIMARY KEY,
                counterparty_phone TEXT NOT NULL UNIQUE,
                name TEXT,
                email TEXT,
                status TEXT NOT NULL DEFAULT 'new',
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX idx_contacts_updated_at ON contacts(updated_at DESC);
            "#,
        ),
        // Migration 2: Two-phase delivery tracking
        M::up(
            r#"
            ALTER TABLE conversations ADD COLUMN delivery_status TEXT;
            "#,
        ),
    ])
}

/// Fixed-width UTC timestamps so text ordering matches time ordering
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

const MESSAGE_COLUMNS: &str = "id, account_phone, counterparty_phone, body, attachment_url,
     direction_tag, sent_id, delivery_status, created_at";

const CONTACT_COLUMNS: &str =
    "id, counterparty_phone, name, email, status, notes, created_at, updated_at";

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRecord> {
    let delivery: Option<String> = row.get(7)?;
    Ok(MessageRecord {
        id: MessageId(row.get(0)?),
        account_phone: row.get(1)?,
        counterparty_phone: row.get(2)?,
        body: row.get(3)?,
        attachment_url: row.get(4)?,
        direction_tag: row.get(5)?,
        sent_id: row.get(6)?,
        delivery: delivery.as_deref().and_then(DeliveryStatus::parse),
        created_at: parse_ts(row, 8)?,
    })
}

fn contact_from_row(row: &Row<'_>) -> rusqlite::Result<ContactRecord> {
    let status: String = row.get(4)?;
    Ok(ContactRecord {
        id: ContactId::new(row.get::<_, String>(0)?),
        counterparty_phone: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        // Unrecognized stages land in the first column rather than vanishing
        status: LeadStatus::parse(&status).unwrap_or_default(),
        notes: row.get(5)?,
        created_at: parse_ts(row, 6)?,
        updated_at: parse_ts(row, 7)?,
    })
}

/// SQLite-based CRM storage
pub struct SqliteCrmStore {
    conn: Mutex<Connection>,
}

impl SqliteCrmStore {
    /// Open (or create) the database at `db_path` and migrate it
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;
        Self::with_connection(conn)
    }

    /// Create a store backed by a private in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(mut conn: Connection) -> Result<Self> {
        // WAL lets readers proceed during the occasional write
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn load_contact(&self, conn: &Connection, id: &str) -> Result<Option<ContactRecord>> {
        let contact = conn
            .query_row(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?"),
                [id],
                contact_from_row,
            )
            .optional()?;
        Ok(contact)
    }
}

impl CrmStore for SqliteCrmStore {
    fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let conn = self.conn.lock().unwrap();
        let profile = conn
            .query_row(
                "SELECT user_id, email, full_name, phone_number FROM profiles WHERE user_id = ?",
                [user_id],
                |row| {
                    Ok(Profile {
                        user_id: row.get(0)?,
                        email: row.get(1)?,
                        full_name: row.get(2)?,
                        phone_number: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    fn upsert_profile(&self, profile: Profile) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO profiles (user_id, email, full_name, phone_number)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                email = excluded.email,
                full_name = excluded.full_name,
                phone_number = excluded.phone_number",
            params![
                profile.user_id,
                profile.email,
                profile.full_name,
                profile.phone_number
            ],
        )?;
        Ok(())
    }

    fn insert_message(&self, mut message: MessageRecord) -> Result<MessageRecord> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO conversations
             (account_phone, counterparty_phone, body, attachment_url,
              direction_tag, sent_id, delivery_status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                message.account_phone,
                message.counterparty_phone,
                message.body,
                message.attachment_url,
                message.direction_tag,
                message.sent_id,
                message.delivery.map(|d| d.as_str()),
                format_ts(&message.created_at),
            ],
        )
        .context("Failed to insert message")?;

        message.id = MessageId(conn.last_insert_rowid());
        debug!("Inserted message {} for {}", message.id, message.account_phone);
        Ok(message)
    }

    fn get_message(&self, id: MessageId) -> Result<Option<MessageRecord>> {
        let conn = self.conn.lock().unwrap();
        let message = conn
            .query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM conversations WHERE id = ?"),
                [id.0],
                message_from_row,
            )
            .optional()?;
        Ok(message)
    }

    fn list_messages_for_account(&self, account_phone: &str) -> Result<Vec<MessageRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM conversations
             WHERE account_phone = ?
             ORDER BY created_at ASC, id ASC"
        ))?;

        let messages = stmt
            .query_map([account_phone], message_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    fn set_delivery_status(&self, id: MessageId, status: DeliveryStatus) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE conversations SET delivery_status = ? WHERE id = ?",
            params![status.as_str(), id.0],
        )?;
        Ok(changed > 0)
    }

    fn count_messages(&self, account_phone: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM conversations WHERE account_phone = ?",
            [account_phone],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn insert_contact(&self, contact: ContactRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!("INSERT INTO contacts ({CONTACT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"),
            params![
                contact.id.as_str(),
                contact.counterparty_phone,
                contact.name,
                contact.email,
                contact.status.as_str(),
                contact.notes,
                format_ts(&contact.created_at),
                format_ts(&contact.updated_at),
            ],
        )
        .with_context(|| format!("Failed to insert contact for {}", contact.counterparty_phone))?;
        Ok(())
    }

    fn get_or_insert_contact(&self, contact: ContactRecord) -> Result<ContactRecord> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO contacts ({CONTACT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(counterparty_phone) DO NOTHING"
            ),
            params![
                contact.id.as_str(),
                contact.counterparty_phone,
                contact.name,
                contact.email,
                contact.status.as_str(),
                contact.notes,
                format_ts(&contact.created_at),
                format_ts(&contact.updated_at),
            ],
        )
        .with_context(|| format!("Failed to insert contact for {}", contact.counterparty_phone))?;
        let stored = conn.query_row(
            &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE counterparty_phone = ?"),
            [&contact.counterparty_phone],
            contact_from_row,
        )?;
        Ok(stored)
    }

    fn get_contact(&self, id: &ContactId) -> Result<Option<ContactRecord>> {
        let conn = self.conn.lock().unwrap();
        self.load_contact(&conn, id.as_str())
    }

    fn find_contact_by_phone(&self, counterparty_phone: &str) -> Result<Option<ContactRecord>> {
        let conn = self.conn.lock().unwrap();
        let contact = conn
            .query_row(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE counterparty_phone = ?"),
                [counterparty_phone],
                contact_from_row,
            )
            .optional()?;
        Ok(contact)
    }

    fn update_contact(
        &self,
        id: &ContactId,
        update: ContactUpdate,
    ) -> Result<Option<ContactRecord>> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE contacts SET name = ?, email = ?, status = ?, notes = ?, updated_at = ?
             WHERE id = ?",
            params![
                update.name,
                update.email,
                update.status.as_str(),
                update.notes,
                format_ts(&Utc::now()),
                id.as_str(),
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.load_contact(&conn, id.as_str())
    }

    fn update_contact_status(
        &self,
        id: &ContactId,
        status: LeadStatus,
    ) -> Result<Option<ContactRecord>> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE contacts SET status = ?, updated_at = ? WHERE id = ?",
            params![status.as_str(), format_ts(&Utc::now()), id.as_str()],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.load_contact(&conn, id.as_str())
    }

    fn list_contacts(&self) -> Result<Vec<ContactRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY updated_at DESC, id ASC"
        ))?;
        let contacts = stmt
            .query_map([], contact_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(contacts)
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            DELETE FROM profiles;
            DELETE FROM conversations;
            DELETE FROM contacts;
            DELETE FROM sqlite_sequence WHERE name = 'conversations';
            "#,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_migrations_are_valid() {
        assert!(migrations().validate().is_ok());
    }

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let a = format_ts(&at(0));
        let b = format_ts(&(at(0) + chrono::Duration::microseconds(1500)));
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[test]
    fn test_sub_second_timestamps_round_trip() {
        let store = SqliteCrmStore::in_memory().unwrap();
        let created_at = at(0) + chrono::Duration::microseconds(1500);
        let msg = store
            .insert_message(MessageRecord::builder("+1").created_at(created_at).build())
            .unwrap();
        assert_eq!(store.get_message(msg.id).unwrap().unwrap().created_at, created_at);
    }

    #[test]
    fn test_corrupt_timestamp_is_an_error() {
        let store = SqliteCrmStore::in_memory().unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO conversations (account_phone, counterparty_phone, created_at)
                 VALUES ('+1', '+2', 'yesterday')",
                [],
            )
            .unwrap();
        }
        assert!(store.list_messages_for_account("+1").is_err());
    }

    #[test]
    fn test_message_roundtrip_keeps_optional_fields() {
        let store = SqliteCrmStore::in_memory().unwrap();
        let stored = store
            .insert_message(
                MessageRecord::builder("+1")
                    .attachment_url("https://cdn.example.com/v.mp4")
                    .direction_tag("entrante")
                    .created_at(at(3))
                    .build(),
            )
            .unwrap();

        let loaded = store.get_message(stored.id).unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert!(loaded.counterparty_phone.is_none());
        assert!(loaded.body.is_none());
        assert!(loaded.delivery.is_none());
    }

    #[test]
    fn test_legacy_status_rows_are_read() {
        let store = SqliteCrmStore::in_memory().unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO contacts (id, counterparty_phone, status, created_at, updated_at)
                 VALUES ('c1', '+2', 'calificado', ?1, ?1)",
                [format_ts(&at(0))],
            )
            .unwrap();
        }
        let contact = store.get_contact(&ContactId::new("c1")).unwrap().unwrap();
        assert_eq!(contact.status, LeadStatus::Qualified);
    }

    #[test]
    fn test_get_or_insert_contact_keeps_first() {
        let store = SqliteCrmStore::in_memory().unwrap();
        let first = store.get_or_insert_contact(ContactRecord::new("+2")).unwrap();
        let mut later = ContactRecord::new("+2");
        later.name = Some("Other".into());
        let second = store.get_or_insert_contact(later).unwrap();

        assert_eq!(second.id, first.id);
        assert!(second.name.is_none());
        assert_eq!(store.list_contacts().unwrap().len(), 1);
    }

    #[test]
    fn test_unique_counterparty_phone() {
        let store = SqliteCrmStore::in_memory().unwrap();
        store.insert_contact(ContactRecord::new("+2")).unwrap();
        assert!(store.insert_contact(ContactRecord::new("+2")).is_err());
    }
}
