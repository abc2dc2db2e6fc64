//! Contact: the sole domain entity of the Meadow store.
//!
//! A contact is always replaced wholesale: there is no partial-field patching
//! anywhere in the system. Toggling a flag produces a complete replacement
//! value with the same id.

use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Opaque, immutable contact identifier. Generated once at creation and never
/// reused after the contact is deleted.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct ContactId(Uuid);

impl ContactId {
  /// A fresh random (v4) id.
  pub fn new() -> Self { Self(Uuid::new_v4()) }

  pub fn from_uuid(id: Uuid) -> Self { Self(id) }

  pub fn as_uuid(&self) -> Uuid { self.0 }
}

impl Default for ContactId {
  fn default() -> Self { Self::new() }
}

impl fmt::Display for ContactId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.hyphenated().fmt(f)
  }
}

impl FromStr for ContactId {
  type Err = uuid::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Uuid::parse_str(s).map(Self)
  }
}

// ─── Contact ─────────────────────────────────────────────────────────────────

/// One person's contact details.
///
/// `first_name` and `phone` are expected to be non-empty, but the entity does
/// not enforce it; callers that accept user input should run
/// [`Contact::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
  pub id:          ContactId,
  pub first_name:  String,
  #[serde(default)]
  pub last_name:   Option<String>,
  pub phone:       String,
  #[serde(default)]
  pub notes:       Option<String>,
  #[serde(default)]
  pub is_favorite: bool,
  #[serde(default)]
  pub is_blocked:  bool,
}

impl Contact {
  /// A new contact with a freshly generated id and every optional field unset.
  pub fn new(first_name: impl Into<String>, phone: impl Into<String>) -> Self {
    Self {
      id:          ContactId::new(),
      first_name:  first_name.into(),
      last_name:   None,
      phone:       phone.into(),
      notes:       None,
      is_favorite: false,
      is_blocked:  false,
    }
  }

  pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
    self.last_name = Some(last_name.into());
    self
  }

  pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
    self.notes = Some(notes.into());
    self
  }

  /// `"First Last"`, or just the first name when there is no last name.
  pub fn display_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name.as_deref().unwrap_or(""))
      .trim()
      .to_owned()
  }

  /// A full replacement value with `is_favorite` flipped.
  pub fn toggled_favorite(&self) -> Self {
    Self { is_favorite: !self.is_favorite, ..self.clone() }
  }

  /// A full replacement value with `is_blocked` flipped.
  pub fn toggled_blocked(&self) -> Self {
    Self { is_blocked: !self.is_blocked, ..self.clone() }
  }

  /// Check the fields a contact form requires: a first name and a phone.
  pub fn validate(&self) -> Result<()> {
    if self.first_name.trim().is_empty() {
      return Err(Error::MissingField("firstName"));
    }
    if self.phone.trim().is_empty() {
      return Err(Error::MissingField("phone"));
    }
    Ok(())
  }
}

// ─── Ordering ────────────────────────────────────────────────────────────────

/// The order of every full-list projection: first name compared
/// case-insensitively, then exactly, then by id so equal names still sort
/// deterministically.
pub fn listing_order(a: &Contact, b: &Contact) -> Ordering {
  a.first_name
    .to_lowercase()
    .cmp(&b.first_name.to_lowercase())
    .then_with(|| a.first_name.cmp(&b.first_name))
    .then_with(|| a.id.cmp(&b.id))
}

/// Sort `contacts` into [`listing_order`].
pub fn sort_for_listing(contacts: &mut [Contact]) {
  contacts.sort_by(listing_order);
}
