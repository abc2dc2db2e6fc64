//! [`ContactPublisher`]: the subscription hub consumed by the presentation
//! layer.
//!
//! The publisher owns one shared feed per stream (full list, filtered list,
//! one per looked-up id). A feed exists only while something holds it: the
//! first subscriber starts it, the last one to leave tears it down (after
//! [`PublisherConfig::linger`]), and the next subscriber starts it again from
//! a fresh read.

use std::{
  collections::HashMap,
  sync::{Arc, Weak},
  time::Duration,
};

use meadow_core::{Contact, ContactId, store::ContactStore};
use tokio::sync::Mutex;

use crate::{
  feed::{Feed, LiveView, Subscription},
  filter::FilterPipeline,
  mutation::Mutation,
  query::SearchQuery,
  repository::ContactRepository,
};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PublisherConfig {
  /// How long an unsubscribed stream keeps running in case someone
  /// resubscribes. Zero tears it down immediately.
  pub linger: Duration,
}

impl Default for PublisherConfig {
  fn default() -> Self { Self { linger: Duration::from_secs(5) } }
}

/// Which streams currently have a running feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamStatus {
  pub contacts: bool,
  pub filtered: bool,
  /// Number of ids with a running lookup feed.
  pub lookups:  usize,
}

// ─── Publisher ───────────────────────────────────────────────────────────────

type ListFeed = Feed<Vec<Contact>>;
type LookupFeed = Feed<Option<Contact>>;

/// Live contact views plus the mutation commands that change them.
pub struct ContactPublisher<S> {
  repository: ContactRepository<S>,
  query:      SearchQuery,
  config:     PublisherConfig,
  contacts:   Mutex<Weak<ListFeed>>,
  filtered:   Mutex<Weak<ListFeed>>,
  lookups:    Mutex<HashMap<ContactId, Weak<LookupFeed>>>,
}

impl<S: ContactStore + 'static> ContactPublisher<S> {
  pub fn new(repository: ContactRepository<S>, config: PublisherConfig) -> Self {
    Self {
      repository,
      query: SearchQuery::new(),
      config,
      contacts: Mutex::new(Weak::new()),
      filtered: Mutex::new(Weak::new()),
      lookups: Mutex::new(HashMap::new()),
    }
  }

  /// A publisher over `store` with the default configuration.
  pub fn for_store(store: Arc<S>) -> Self {
    Self::new(ContactRepository::new(store), PublisherConfig::default())
  }

  pub fn repository(&self) -> &ContactRepository<S> { &self.repository }

  // ── Shared feeds ──────────────────────────────────────────────────────────

  async fn contacts_feed(&self) -> Arc<ListFeed> {
    let mut slot = self.contacts.lock().await;
    if let Some(feed) = slot.upgrade() {
      return feed;
    }
    let feed = Arc::new(self.repository.all_contacts().await);
    *slot = Arc::downgrade(&feed);
    feed
  }

  async fn filtered_feed(&self) -> Arc<ListFeed> {
    let mut slot = self.filtered.lock().await;
    if let Some(feed) = slot.upgrade() {
      return feed;
    }
    let source = self.contacts_feed().await;
    let feed = Arc::new(FilterPipeline::spawn(source, self.query.subscribe()));
    *slot = Arc::downgrade(&feed);
    feed
  }

  async fn lookup_feed(&self, id: ContactId) -> Arc<LookupFeed> {
    let mut slots = self.lookups.lock().await;
    if let Some(feed) = slots.get(&id).and_then(Weak::upgrade) {
      return feed;
    }
    slots.retain(|_, feed| feed.strong_count() > 0);
    let feed = Arc::new(self.repository.contact_by_id(id).await);
    slots.insert(id, Arc::downgrade(&feed));
    feed
  }

  // ── Views ─────────────────────────────────────────────────────────────────

  /// The full contact list in listing order.
  pub async fn watch_contacts(&self) -> LiveView<Vec<Contact>> {
    LiveView::new(self.contacts_feed().await, self.config.linger)
  }

  /// The full list filtered by the current search query.
  pub async fn watch_filtered(&self) -> LiveView<Vec<Contact>> {
    LiveView::new(self.filtered_feed().await, self.config.linger)
  }

  /// The contact with `id`, or `None` once it does not resolve.
  pub async fn watch_by_id(&self, id: ContactId) -> LiveView<Option<Contact>> {
    LiveView::new(self.lookup_feed(id).await, self.config.linger)
  }

  /// Deliver the current full list to `callback` before returning, then
  /// every change until the subscription is dropped.
  pub async fn subscribe_contacts<F>(&self, callback: F) -> Subscription
  where
    F: FnMut(Vec<Contact>) + Send + 'static,
  {
    Subscription::start(self.watch_contacts().await, callback)
  }

  /// Like [`subscribe_contacts`](Self::subscribe_contacts), for the filtered
  /// list.
  pub async fn subscribe_filtered<F>(&self, callback: F) -> Subscription
  where
    F: FnMut(Vec<Contact>) + Send + 'static,
  {
    Subscription::start(self.watch_filtered().await, callback)
  }

  /// Like [`subscribe_contacts`](Self::subscribe_contacts), for one id.
  pub async fn subscribe_by_id<F>(&self, id: ContactId, callback: F) -> Subscription
  where
    F: FnMut(Option<Contact>) + Send + 'static,
  {
    Subscription::start(self.watch_by_id(id).await, callback)
  }

  pub async fn stream_status(&self) -> StreamStatus {
    StreamStatus {
      contacts: self.contacts.lock().await.strong_count() > 0,
      filtered: self.filtered.lock().await.strong_count() > 0,
      lookups:  self
        .lookups
        .lock()
        .await
        .values()
        .filter(|feed| feed.strong_count() > 0)
        .count(),
    }
  }

  // ── Commands ──────────────────────────────────────────────────────────────

  pub fn create_contact(&self, contact: Contact) -> Mutation {
    self.repository.insert(contact)
  }

  pub fn update_contact(&self, contact: Contact) -> Mutation {
    self.repository.update(contact)
  }

  pub fn delete_contact(&self, contact: &Contact) -> Mutation {
    self.repository.delete(contact)
  }

  pub fn delete_contact_by_id(&self, id: ContactId) -> Mutation {
    self.repository.delete_by_id(id)
  }

  pub fn set_search_query(&self, text: impl Into<String>) { self.query.set(text); }

  pub fn search_query(&self) -> String { self.query.get() }
}
