//! [`MemoryStore`]: a process-local [`ContactStore`] with no durability.
//!
//! Useful for tests and for embedding the reactive layer without a database.

use std::{
  collections::HashSet,
  sync::{Mutex, MutexGuard, PoisonError},
};

use tokio::sync::watch;

use crate::{
  Error, Result,
  contact::{Contact, ContactId},
  store::{ChangeNotifier, ContactStore, Revision},
};

#[derive(Default)]
struct Table {
  /// Live records in insertion order.
  rows:    Vec<Contact>,
  /// Ids of deleted records; never accepted again.
  retired: HashSet<ContactId>,
}

/// An in-memory contact table.
#[derive(Default)]
pub struct MemoryStore {
  table:    Mutex<Table>,
  notifier: ChangeNotifier,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// A store pre-populated with `contacts`, in the given order.
  pub fn with_contacts(contacts: impl IntoIterator<Item = Contact>) -> Self {
    let store = Self::new();
    store.lock().rows.extend(contacts);
    store
  }

  fn lock(&self) -> MutexGuard<'_, Table> {
    self.table.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl ContactStore for MemoryStore {
  type Error = Error;

  async fn list(&self) -> Result<Vec<Contact>> { Ok(self.lock().rows.clone()) }

  async fn get(&self, id: ContactId) -> Result<Option<Contact>> {
    Ok(self.lock().rows.iter().find(|c| c.id == id).cloned())
  }

  async fn upsert(&self, contact: Contact) -> Result<()> {
    {
      let mut table = self.lock();
      if table.retired.contains(&contact.id) {
        return Err(Error::IdRetired(contact.id));
      }
      match table.rows.iter_mut().find(|c| c.id == contact.id) {
        Some(existing) => *existing = contact,
        None => table.rows.push(contact),
      }
    }
    self.notifier.bump();
    Ok(())
  }

  async fn update(&self, contact: Contact) -> Result<bool> {
    let replaced = {
      let mut table = self.lock();
      if table.retired.contains(&contact.id) {
        return Err(Error::IdRetired(contact.id));
      }
      match table.rows.iter_mut().find(|c| c.id == contact.id) {
        Some(existing) => {
          *existing = contact;
          true
        }
        None => false,
      }
    };
    if replaced {
      self.notifier.bump();
    }
    Ok(replaced)
  }

  async fn delete(&self, id: ContactId) -> Result<bool> {
    let removed = {
      let mut table = self.lock();
      let before = table.rows.len();
      table.rows.retain(|c| c.id != id);
      let removed = table.rows.len() != before;
      if removed {
        table.retired.insert(id);
      }
      removed
    };
    if removed {
      self.notifier.bump();
    }
    Ok(removed)
  }

  fn changes(&self) -> watch::Receiver<Revision> { self.notifier.subscribe() }
}
