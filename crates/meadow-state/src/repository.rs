//! [`ContactRepository`]: sorted, live reads and spawned writes over a
//! [`ContactStore`].
//!
//! The repository adds no business logic: reads are the store's records in
//! listing order, writes are forwarded as-is.

use std::{future::Future, sync::Arc};

use meadow_core::{
  Contact, ContactId,
  contact::sort_for_listing,
  store::ContactStore,
};

use crate::{
  Error, Result,
  feed::{Feed, replace_if_changed},
  mutation::Mutation,
};

/// Domain-level access to an injected store handle.
pub struct ContactRepository<S> {
  store: Arc<S>,
}

impl<S> Clone for ContactRepository<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone() } }
}

impl<S: ContactStore + 'static> ContactRepository<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// Every contact in listing order, read once.
  pub async fn snapshot(&self) -> Result<Vec<Contact>> {
    load_sorted(self.store.clone()).await.map_err(Error::store)
  }

  /// Live list of every contact in listing order.
  pub async fn all_contacts(&self) -> Feed<Vec<Contact>> {
    self.live("all_contacts", load_sorted).await
  }

  /// Live lookup of one contact; `None` while no record has `id`.
  pub async fn contact_by_id(&self, id: ContactId) -> Feed<Option<Contact>> {
    self
      .live("contact_by_id", move |store: Arc<S>| async move {
        store.get(id).await
      })
      .await
  }

  /// A feed that re-runs `load` after every store revision and publishes the
  /// result when it differs from the previous one.
  ///
  /// A failed read keeps the previous value. If the very first read fails
  /// the feed starts from `T::default()` and catches up on the next revision.
  async fn live<T, L, Fut>(&self, feed: &'static str, load: L) -> Feed<T>
  where
    T: PartialEq + Default + Send + Sync + 'static,
    L: Fn(Arc<S>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, S::Error>> + Send + 'static,
  {
    // Subscribe before the first read so no revision can slip in between.
    let mut changes = self.store.changes();
    let initial = match load(self.store.clone()).await {
      Ok(value) => value,
      Err(e) => {
        tracing::warn!(feed, error = %e, "initial read failed");
        T::default()
      }
    };

    let store = self.store.clone();
    tracing::debug!(feed, "feed started");
    Feed::spawn(initial, move |tx| async move {
      while changes.changed().await.is_ok() {
        let revision = *changes.borrow_and_update();
        match load(store.clone()).await {
          Ok(value) => {
            if replace_if_changed(&tx, value) {
              tracing::debug!(feed, revision, "feed updated");
            }
          }
          Err(e) => tracing::warn!(feed, revision, error = %e, "read failed"),
        }
      }
    })
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  /// Insert `contact` (or replace the record with its id).
  pub fn insert(&self, contact: Contact) -> Mutation {
    let store = self.store.clone();
    let id = contact.id;
    Mutation::spawn("insert", id, async move {
      store.upsert(contact).await.map_err(Error::store)
    })
  }

  /// Replace the stored record with `contact` wholesale. Fails with
  /// [`Error::NotFound`] if there is no record with its id, or
  /// [`Error::IdRetired`] if that record was deleted.
  pub fn update(&self, contact: Contact) -> Mutation {
    let store = self.store.clone();
    let id = contact.id;
    Mutation::spawn("update", id, async move {
      if store.update(contact).await.map_err(Error::store)? {
        Ok(())
      } else {
        Err(Error::NotFound(id))
      }
    })
  }

  /// Delete the record with `contact`'s id. Deleting a missing record
  /// succeeds without changing anything.
  pub fn delete(&self, contact: &Contact) -> Mutation { self.delete_by_id(contact.id) }

  /// [`delete`](Self::delete) for callers that only hold the id.
  pub fn delete_by_id(&self, id: ContactId) -> Mutation {
    let store = self.store.clone();
    Mutation::spawn("delete", id, async move {
      store.delete(id).await.map_err(Error::store)?;
      Ok(())
    })
  }
}

async fn load_sorted<S: ContactStore>(
  store: Arc<S>,
) -> Result<Vec<Contact>, S::Error> {
  let mut contacts = store.list().await?;
  sort_for_listing(&mut contacts);
  Ok(contacts)
}
