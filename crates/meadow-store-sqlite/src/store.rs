//! [`SqliteStore`]: the SQLite implementation of [`ContactStore`].

use std::path::Path;

use chrono::Utc;
use meadow_core::{
  contact::{Contact, ContactId},
  store::{ChangeNotifier, ContactStore, Revision},
};
use rusqlite::OptionalExtension as _;
use tokio::sync::watch;

use crate::{
  Error, Result,
  encode::{CONTACT_COLUMNS, RawContact, encode_dt, encode_id},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Meadow contact store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection and the change notifier are both
/// reference-counted, so every clone sees the same revisions.
#[derive(Clone)]
pub struct SqliteStore {
  conn:     tokio_rusqlite::Connection,
  notifier: ChangeNotifier,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn, notifier: ChangeNotifier::new() })
  }
}

// ─── ContactStore impl ───────────────────────────────────────────────────────

impl ContactStore for SqliteStore {
  type Error = Error;

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn list(&self) -> Result<Vec<Contact>> {
    let raws: Vec<RawContact> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map([], RawContact::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContact::into_contact).collect()
  }

  async fn get(&self, id: ContactId) -> Result<Option<Contact>> {
    let id_str = encode_id(id);

    let raw: Option<RawContact> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts WHERE contact_id = ?1"
              ),
              rusqlite::params![id_str],
              RawContact::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContact::into_contact).transpose()
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn upsert(&self, contact: Contact) -> Result<()> {
    let id = contact.id;
    let id_str = encode_id(id);

    let written: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if is_retired(&tx, &id_str)? {
          return Ok(false);
        }

        tx.execute(
          "INSERT INTO contacts (
             contact_id, first_name, last_name, phone, notes,
             is_favorite, is_blocked
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT (contact_id) DO UPDATE SET
             first_name  = excluded.first_name,
             last_name   = excluded.last_name,
             phone       = excluded.phone,
             notes       = excluded.notes,
             is_favorite = excluded.is_favorite,
             is_blocked  = excluded.is_blocked",
          rusqlite::params![
            id_str,
            contact.first_name,
            contact.last_name,
            contact.phone,
            contact.notes,
            contact.is_favorite,
            contact.is_blocked,
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !written {
      return Err(meadow_core::Error::IdRetired(id).into());
    }
    self.notifier.bump();
    Ok(())
  }

  async fn update(&self, contact: Contact) -> Result<bool> {
    let id = contact.id;
    let id_str = encode_id(id);

    // `None` when the id is retired.
    let changed: Option<usize> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if is_retired(&tx, &id_str)? {
          return Ok(None);
        }
        let changed = tx.execute(
          "UPDATE contacts SET
             first_name = ?2, last_name = ?3, phone = ?4, notes = ?5,
             is_favorite = ?6, is_blocked = ?7
           WHERE contact_id = ?1",
          rusqlite::params![
            id_str,
            contact.first_name,
            contact.last_name,
            contact.phone,
            contact.notes,
            contact.is_favorite,
            contact.is_blocked,
          ],
        )?;
        tx.commit()?;
        Ok(Some(changed))
      })
      .await?;

    let Some(changed) = changed else {
      return Err(meadow_core::Error::IdRetired(id).into());
    };
    if changed > 0 {
      self.notifier.bump();
    }
    Ok(changed > 0)
  }

  async fn delete(&self, id: ContactId) -> Result<bool> {
    let id_str = encode_id(id);
    let at_str = encode_dt(Utc::now());

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let removed = tx.execute(
          "DELETE FROM contacts WHERE contact_id = ?1",
          rusqlite::params![id_str],
        )?;
        if removed > 0 {
          tx.execute(
            "INSERT OR IGNORE INTO retired_contacts (contact_id, retired_at)
             VALUES (?1, ?2)",
            rusqlite::params![id_str, at_str],
          )?;
        }
        tx.commit()?;
        Ok(removed > 0)
      })
      .await?;

    if removed {
      self.notifier.bump();
    } else {
      tracing::debug!(%id, "delete of missing contact ignored");
    }
    Ok(removed)
  }

  fn changes(&self) -> watch::Receiver<Revision> { self.notifier.subscribe() }
}

fn is_retired(conn: &rusqlite::Connection, id_str: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM retired_contacts WHERE contact_id = ?1",
        rusqlite::params![id_str],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}
