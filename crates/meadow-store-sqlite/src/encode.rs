//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! UUIDs are stored as hyphenated lowercase strings; timestamps as RFC 3339.

use chrono::{DateTime, Utc};
use meadow_core::contact::{Contact, ContactId};

use crate::Result;

// ─── ContactId ───────────────────────────────────────────────────────────────

pub fn encode_id(id: ContactId) -> String { id.to_string() }

pub fn decode_id(s: &str) -> Result<ContactId> { Ok(s.parse()?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching the field order of [`RawContact::from_row`].
pub const CONTACT_COLUMNS: &str =
  "contact_id, first_name, last_name, phone, notes, is_favorite, is_blocked";

/// Raw values read directly from a `contacts` row.
pub struct RawContact {
  pub contact_id:  String,
  pub first_name:  String,
  pub last_name:   Option<String>,
  pub phone:       String,
  pub notes:       Option<String>,
  pub is_favorite: bool,
  pub is_blocked:  bool,
}

impl RawContact {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      contact_id:  row.get(0)?,
      first_name:  row.get(1)?,
      last_name:   row.get(2)?,
      phone:       row.get(3)?,
      notes:       row.get(4)?,
      is_favorite: row.get(5)?,
      is_blocked:  row.get(6)?,
    })
  }

  pub fn into_contact(self) -> Result<Contact> {
    Ok(Contact {
      id:          decode_id(&self.contact_id)?,
      first_name:  self.first_name,
      last_name:   self.last_name,
      phone:       self.phone,
      notes:       self.notes,
      is_favorite: self.is_favorite,
      is_blocked:  self.is_blocked,
    })
  }
}
