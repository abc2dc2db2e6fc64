//! The `ContactStore` trait: the persistence boundary of the system.
//!
//! The trait is implemented by storage backends (e.g. `meadow-store-sqlite`,
//! or [`crate::memory::MemoryStore`]). The reactive layer (`meadow-state`)
//! depends on this abstraction, not on any concrete backend.

use std::{future::Future, sync::Arc};

use tokio::sync::watch;

use crate::contact::{Contact, ContactId};

// ─── Change notification ─────────────────────────────────────────────────────

/// Monotonic counter bumped by a store after every write that changed data.
pub type Revision = u64;

/// Publishes store revisions to any number of watchers.
///
/// Cloning is cheap and every clone bumps the same counter.
#[derive(Clone)]
pub struct ChangeNotifier {
  tx: Arc<watch::Sender<Revision>>,
}

impl ChangeNotifier {
  pub fn new() -> Self {
    let (tx, _) = watch::channel(0);
    Self { tx: Arc::new(tx) }
  }

  /// Record that the store's contents changed.
  pub fn bump(&self) { self.tx.send_modify(|rev| *rev += 1); }

  pub fn revision(&self) -> Revision { *self.tx.borrow() }

  pub fn subscribe(&self) -> watch::Receiver<Revision> { self.tx.subscribe() }
}

impl Default for ChangeNotifier {
  fn default() -> Self { Self::new() }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a durable table of contact records.
///
/// Contract relied on by the reactive layer:
///
/// - every write that changes data bumps the revision seen by
///   [`changes`](Self::changes); writes that change nothing (deleting a
///   missing id, updating a missing record) do not;
/// - [`upsert`](Self::upsert) is idempotent on `id`;
/// - [`list`](Self::list) returns records in store order (insertion order);
/// - a deleted id is retired: `upsert` and `update` of it fail with
///   [`crate::Error::IdRetired`], either directly or as a source of
///   `Self::Error`.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait ContactStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Every live record, in store order.
  fn list(
    &self,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + '_;

  /// The record with `id`, or `None` if there is none.
  fn get(
    &self,
    id: ContactId,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  /// Insert `contact`, or replace the record with the same id.
  fn upsert(
    &self,
    contact: Contact,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Replace an existing record. Returns `false` (and changes nothing) when
  /// no record has `contact.id` and the id was never deleted.
  fn update(
    &self,
    contact: Contact,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Delete the record with `id`. Returns `false` when there was nothing to
  /// delete; that is not an error.
  fn delete(
    &self,
    id: ContactId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Watch the store's revision counter.
  fn changes(&self) -> watch::Receiver<Revision>;
}
