//! Behavioural tests for the reactive layer, mostly against `MemoryStore`.

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering::SeqCst},
  },
  time::Duration,
};

use meadow_core::{
  Contact, ContactId,
  memory::MemoryStore,
  store::{ContactStore, Revision},
};
use meadow_store_sqlite::SqliteStore;
use tokio::{
  sync::{mpsc, watch},
  time::timeout,
};

use crate::{
  ContactPublisher, ContactRepository, Error, PublisherConfig, StreamStatus,
  Subscription,
};

// ─── Helpers ─────────────────────────────────────────────────────────────────

type Rx<T> = mpsc::UnboundedReceiver<T>;

/// A callback that forwards every delivered value into a channel.
fn collector<T: Send + 'static>() -> (impl FnMut(T) + Send + 'static, Rx<T>) {
  let (tx, rx) = mpsc::unbounded_channel();
  (
    move |value: T| {
      let _ = tx.send(value);
    },
    rx,
  )
}

async fn next<T>(rx: &mut Rx<T>) -> T {
  timeout(Duration::from_secs(2), rx.recv())
    .await
    .expect("timed out waiting for a value")
    .expect("subscription closed")
}

/// Skip values until one satisfies `pred`.
async fn until<T>(rx: &mut Rx<T>, pred: impl Fn(&T) -> bool) -> T {
  loop {
    let value = next(rx).await;
    if pred(&value) {
      return value;
    }
  }
}

/// Assert nothing is delivered for a little while.
async fn assert_quiet<T: std::fmt::Debug>(rx: &mut Rx<T>) {
  if let Ok(Some(value)) = timeout(Duration::from_millis(150), rx.recv()).await {
    panic!("unexpected value delivered: {value:?}");
  }
}

fn names(list: &[Contact]) -> Vec<&str> {
  list.iter().map(|c| c.first_name.as_str()).collect()
}

fn publisher_with(contacts: Vec<Contact>) -> ContactPublisher<MemoryStore> {
  ContactPublisher::new(
    ContactRepository::new(Arc::new(MemoryStore::with_contacts(contacts))),
    PublisherConfig { linger: Duration::ZERO },
  )
}

fn bob_and_ann() -> (Contact, Contact) {
  (Contact::new("Bob", "111"), Contact::new("Ann", "222"))
}

// ─── Ordering ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_list_is_sorted_by_first_name() {
  let (bob, ann) = bob_and_ann();
  let carl = Contact::new("carl", "333");
  let p = publisher_with(vec![carl, bob, ann]);

  let (cb, mut rx) = collector::<Vec<Contact>>();
  let _sub = p.subscribe_contacts(cb).await;
  assert_eq!(names(&next(&mut rx).await), vec!["Ann", "Bob", "carl"]);
}

#[tokio::test]
async fn repeated_reads_are_stable() {
  let (bob, ann) = bob_and_ann();
  let twin = Contact::new("Ann", "999");
  let p = publisher_with(vec![bob, ann, twin]);

  let first = p.repository().snapshot().await.unwrap();
  let second = p.repository().snapshot().await.unwrap();
  assert_eq!(first, second);
  assert_eq!(p.watch_contacts().await.current(), first);
}

// ─── Filtering ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn bob_and_ann_scenario() {
  let (bob, ann) = bob_and_ann();
  let p = publisher_with(vec![bob, ann]);

  let (cb, mut rx) = collector::<Vec<Contact>>();
  let _sub = p.subscribe_filtered(cb).await;
  assert_eq!(names(&next(&mut rx).await), vec!["Ann", "Bob"]);

  p.set_search_query("11");
  let filtered = until(&mut rx, |v| v.len() == 1).await;
  assert_eq!(names(&filtered), vec!["Bob"]);

  p.set_search_query("");
  let reverted = until(&mut rx, |v| v.len() == 2).await;
  assert_eq!(names(&reverted), vec!["Ann", "Bob"]);
}

#[tokio::test]
async fn filter_is_case_insensitive() {
  let p = publisher_with(vec![Contact::new("Madison", "1"), Contact::new("Ann", "2")]);
  let mut view = p.watch_filtered().await;

  for q in ["mad", "MAD", "Mad"] {
    p.set_search_query("zzz");
    let empty = view.changed().await.unwrap();
    assert!(empty.is_empty());

    p.set_search_query(q);
    let hit = view.changed().await.unwrap();
    assert_eq!(names(&hit), vec!["Madison"], "query {q:?}");
  }
}

#[tokio::test]
async fn filter_searches_last_name_and_phone() {
  let p = publisher_with(vec![
    Contact::new("Ann", "555-0101").with_last_name("Lee"),
    Contact::new("Bob", "555-0202").with_notes("lee"),
  ]);
  let mut view = p.watch_filtered().await;

  p.set_search_query("LEE");
  assert_eq!(names(&view.changed().await.unwrap()), vec!["Ann"]);

  p.set_search_query("0202");
  assert_eq!(names(&view.changed().await.unwrap()), vec!["Bob"]);

  p.set_search_query("nobody");
  assert!(view.changed().await.unwrap().is_empty());
}

#[tokio::test]
async fn blank_query_restores_full_list() {
  let (bob, ann) = bob_and_ann();
  let p = publisher_with(vec![bob, ann]);
  let full = p.repository().snapshot().await.unwrap();
  let mut view = p.watch_filtered().await;

  p.set_search_query("bob");
  assert_eq!(view.changed().await.unwrap().len(), 1);
  p.set_search_query("   ");
  assert_eq!(view.changed().await.unwrap(), full);
}

#[tokio::test]
async fn rapid_queries_settle_on_the_last_one() {
  let p = publisher_with(vec![Contact::new("Ann", "1"), Contact::new("Bob", "2")]);
  let (cb, mut rx) = collector::<Vec<Contact>>();
  let _sub = p.subscribe_filtered(cb).await;
  next(&mut rx).await;

  for q in ["a", "b", "bo", "x", "Ann"] {
    p.set_search_query(q);
  }
  let settled = until(&mut rx, |v: &Vec<Contact>| names(v) == vec!["Ann"]).await;
  assert_eq!(settled.len(), 1);
  assert_eq!(p.search_query(), "Ann");
}

#[tokio::test]
async fn filtered_view_follows_mutations() {
  let p = publisher_with(vec![Contact::new("Bob", "1")]);
  p.set_search_query("an");

  let (cb, mut rx) = collector::<Vec<Contact>>();
  let _sub = p.subscribe_filtered(cb).await;
  assert!(next(&mut rx).await.is_empty());

  p.create_contact(Contact::new("Anna", "2")).await.unwrap();
  p.create_contact(Contact::new("Dan", "3")).await.unwrap();
  let seen = until(&mut rx, |v| v.len() == 2).await;
  assert_eq!(names(&seen), vec!["Anna", "Dan"]);
}

// ─── Mutations ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_appears_in_sorted_position() {
  let (bob, _) = bob_and_ann();
  let zed = Contact::new("Zed", "9");
  let p = publisher_with(vec![bob, zed]);

  let (cb, mut rx) = collector::<Vec<Contact>>();
  let _sub = p.subscribe_contacts(cb).await;
  assert_eq!(next(&mut rx).await.len(), 2);

  let ann = Contact::new("Ann", "555");
  p.create_contact(ann.clone()).await.unwrap();

  let list = next(&mut rx).await;
  assert_eq!(names(&list), vec!["Ann", "Bob", "Zed"]);
  assert_eq!(list[0], ann);
}

#[tokio::test]
async fn delete_removes_from_every_view() {
  let (bob, ann) = bob_and_ann();
  let p = publisher_with(vec![bob.clone(), ann.clone()]);
  p.set_search_query("b");

  let (list_cb, mut list_rx) = collector::<Vec<Contact>>();
  let (filtered_cb, mut filtered_rx) = collector::<Vec<Contact>>();
  let (lookup_cb, mut lookup_rx) = collector::<Option<Contact>>();
  let _list = p.subscribe_contacts(list_cb).await;
  let _filtered = p.subscribe_filtered(filtered_cb).await;
  let _lookup = p.subscribe_by_id(bob.id, lookup_cb).await;

  assert_eq!(next(&mut list_rx).await.len(), 2);
  assert_eq!(names(&next(&mut filtered_rx).await), vec!["Bob"]);
  assert_eq!(next(&mut lookup_rx).await, Some(bob.clone()));

  p.delete_contact(&bob).await.unwrap();

  assert_eq!(names(&next(&mut list_rx).await), vec!["Ann"]);
  assert!(next(&mut filtered_rx).await.is_empty());
  assert_eq!(next(&mut lookup_rx).await, None);
}

#[tokio::test]
async fn deleting_a_missing_contact_is_silent() {
  let (bob, ann) = bob_and_ann();
  let p = publisher_with(vec![bob, ann]);

  let (cb, mut rx) = collector::<Vec<Contact>>();
  let _sub = p.subscribe_contacts(cb).await;
  next(&mut rx).await;

  let ghost = Contact::new("Ghost", "0");
  p.delete_contact(&ghost).await.unwrap();
  assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn favorite_toggle_is_visible_everywhere() {
  let (bob, ann) = bob_and_ann();
  let p = publisher_with(vec![bob, ann.clone()]);

  let (list_cb, mut list_rx) = collector::<Vec<Contact>>();
  let (lookup_cb, mut lookup_rx) = collector::<Option<Contact>>();
  let _list = p.subscribe_contacts(list_cb).await;
  let _lookup = p.subscribe_by_id(ann.id, lookup_cb).await;
  next(&mut list_rx).await;
  assert!(!next(&mut lookup_rx).await.unwrap().is_favorite);

  p.update_contact(ann.toggled_favorite()).await.unwrap();

  let list = next(&mut list_rx).await;
  let listed = list.iter().find(|c| c.id == ann.id).unwrap();
  assert!(listed.is_favorite);

  let looked_up = next(&mut lookup_rx).await.unwrap();
  assert!(looked_up.is_favorite);
  assert_eq!(looked_up.id, ann.id);
}

#[tokio::test]
async fn updating_a_missing_contact_reports_not_found() {
  let p = publisher_with(vec![]);
  let ghost = Contact::new("Ghost", "0");

  let err = p.update_contact(ghost.clone()).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(id) if id == ghost.id));
  assert!(p.repository().snapshot().await.unwrap().is_empty());
}

#[tokio::test]
async fn deleted_id_never_resolves_again() {
  let ann = Contact::new("Ann", "1");
  let p = publisher_with(vec![ann.clone()]);
  p.delete_contact(&ann).await.unwrap();

  let err = p.create_contact(ann.clone()).await.unwrap_err();
  assert!(matches!(err, Error::IdRetired(id) if id == ann.id));
  let err = p.update_contact(ann.toggled_favorite()).await.unwrap_err();
  assert!(matches!(err, Error::IdRetired(id) if id == ann.id));
  assert_eq!(p.watch_by_id(ann.id).await.current(), None);
}

#[tokio::test]
async fn lookup_of_unknown_id_is_absent() {
  let p = publisher_with(vec![Contact::new("Ann", "1")]);
  let (cb, mut rx) = collector::<Option<Contact>>();
  let _sub = p.subscribe_by_id(ContactId::new(), cb).await;
  assert_eq!(next(&mut rx).await, None);
}

#[tokio::test]
async fn mutations_run_without_being_awaited() {
  let p = publisher_with(vec![]);
  let (cb, mut rx) = collector::<Vec<Contact>>();
  let _sub = p.subscribe_contacts(cb).await;
  next(&mut rx).await;

  drop(p.create_contact(Contact::new("Ann", "1")));
  let list = next(&mut rx).await;
  assert_eq!(names(&list), vec!["Ann"]);
}

#[tokio::test]
async fn concurrent_creates_all_land() {
  let p = publisher_with(vec![]);
  let mutations: Vec<_> = ["Eve", "Dan", "Cat", "Bob", "Ann"]
    .into_iter()
    .map(|name| p.create_contact(Contact::new(name, "0")))
    .collect();
  for m in mutations {
    m.await.unwrap();
  }

  let view = p.watch_contacts().await.current();
  assert_eq!(names(&view), vec!["Ann", "Bob", "Cat", "Dan", "Eve"]);
}

// ─── Subscription lifecycle ──────────────────────────────────────────────────

#[tokio::test]
async fn subscribers_each_receive_every_value() {
  let p = publisher_with(vec![]);
  let (cb_a, mut rx_a) = collector::<Vec<Contact>>();
  let (cb_b, mut rx_b) = collector::<Vec<Contact>>();
  let _a = p.subscribe_filtered(cb_a).await;
  let _b = p.subscribe_filtered(cb_b).await;
  assert!(next(&mut rx_a).await.is_empty());
  assert!(next(&mut rx_b).await.is_empty());

  p.create_contact(Contact::new("Ann", "1")).await.unwrap();
  assert_eq!(names(&next(&mut rx_a).await), vec!["Ann"]);
  assert_eq!(names(&next(&mut rx_b).await), vec!["Ann"]);
}

#[tokio::test]
async fn no_callbacks_after_unsubscribe() {
  let p = publisher_with(vec![]);
  let (cb, mut rx) = collector::<Vec<Contact>>();
  let sub = p.subscribe_contacts(cb).await;
  assert!(sub.is_active());
  next(&mut rx).await;

  sub.unsubscribe();
  p.create_contact(Contact::new("Ann", "1")).await.unwrap();
  assert_quiet(&mut rx).await;
}

async fn wait_for_status(
  p: &ContactPublisher<MemoryStore>,
  want: StreamStatus,
) {
  timeout(Duration::from_secs(2), async {
    while p.stream_status().await != want {
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
  })
  .await
  .expect("streams did not reach the expected state");
}

#[tokio::test]
async fn idle_streams_are_torn_down_and_rebuilt() {
  let p = publisher_with(vec![Contact::new("Bob", "1")]);

  let filtered = p.subscribe_filtered(|_| {}).await;
  let lookup = p.subscribe_by_id(ContactId::new(), |_| {}).await;
  assert_eq!(p.stream_status().await, StreamStatus {
    contacts: true,
    filtered: true,
    lookups:  1,
  });

  drop(filtered);
  drop(lookup);
  wait_for_status(&p, StreamStatus::default()).await;

  // Writes while idle are picked up by the next subscriber.
  p.create_contact(Contact::new("Ann", "2")).await.unwrap();
  let (cb, mut rx) = collector::<Vec<Contact>>();
  let _again = p.subscribe_filtered(cb).await;
  assert_eq!(names(&next(&mut rx).await), vec!["Ann", "Bob"]);
}

/// Counts full-list reads, so a test can tell a fresh feed (initial read)
/// from a reused one.
#[derive(Default)]
struct CountingStore {
  inner: MemoryStore,
  lists: AtomicUsize,
}

impl CountingStore {
  fn lists(&self) -> usize { self.lists.load(SeqCst) }
}

impl ContactStore for CountingStore {
  type Error = meadow_core::Error;

  async fn list(&self) -> meadow_core::Result<Vec<Contact>> {
    self.lists.fetch_add(1, SeqCst);
    self.inner.list().await
  }

  async fn get(&self, id: ContactId) -> meadow_core::Result<Option<Contact>> {
    self.inner.get(id).await
  }

  async fn upsert(&self, contact: Contact) -> meadow_core::Result<()> {
    self.inner.upsert(contact).await
  }

  async fn update(&self, contact: Contact) -> meadow_core::Result<bool> {
    self.inner.update(contact).await
  }

  async fn delete(&self, id: ContactId) -> meadow_core::Result<bool> {
    self.inner.delete(id).await
  }

  fn changes(&self) -> watch::Receiver<Revision> { self.inner.changes() }
}

fn counting_publisher(
  linger: Duration,
) -> (Arc<CountingStore>, ContactPublisher<CountingStore>) {
  let store = Arc::new(CountingStore::default());
  let p = ContactPublisher::new(
    ContactRepository::new(store.clone()),
    PublisherConfig { linger },
  );
  (store, p)
}

#[tokio::test]
async fn lingering_stream_survives_its_last_subscriber() {
  let (store, p) = counting_publisher(Duration::from_secs(60));

  let sub = p.subscribe_contacts(|_| {}).await;
  assert_eq!(store.lists(), 1);
  drop(sub);
  assert!(p.stream_status().await.contacts);

  // Resubscribing inside the linger window reuses the running feed.
  let (cb, mut rx) = collector::<Vec<Contact>>();
  let _again = p.subscribe_contacts(cb).await;
  assert!(next(&mut rx).await.is_empty());
  assert_eq!(store.lists(), 1);
}

#[tokio::test]
async fn without_linger_resubscribing_starts_a_fresh_feed() {
  let (store, p) = counting_publisher(Duration::ZERO);

  drop(p.subscribe_contacts(|_| {}).await);
  let _again = p.subscribe_contacts(|_| {}).await;
  assert_eq!(store.lists(), 2);
}

#[tokio::test]
async fn lingering_feed_catches_up_on_unwatched_writes() {
  let (store, p) = counting_publisher(Duration::from_secs(60));

  drop(p.subscribe_contacts(|_| {}).await);
  p.create_contact(Contact::new("Bob", "1")).await.unwrap();
  p.create_contact(Contact::new("Ann", "2")).await.unwrap();

  let (cb, mut rx) = collector::<Vec<Contact>>();
  let _again = p.subscribe_contacts(cb).await;
  let list = until(&mut rx, |list| list.len() == 2).await;
  assert_eq!(names(&list), vec!["Ann", "Bob"]);

  // One initial read, then only reloads; the feed was never rebuilt.
  let reads = store.lists();
  assert!((2..=3).contains(&reads), "unexpected read count {reads}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn callback_may_drop_its_own_subscription() {
  let p = publisher_with(vec![]);
  let slot: Arc<std::sync::Mutex<Option<Subscription>>> = Arc::default();
  let (tx, mut rx) = mpsc::unbounded_channel::<usize>();

  let mut calls = 0;
  let sub = p
    .subscribe_contacts({
      let slot = slot.clone();
      move |list: Vec<Contact>| {
        calls += 1;
        if !list.is_empty() {
          let own = slot.lock().unwrap().take();
          drop(own);
        }
        let _ = tx.send(calls);
      }
    })
    .await;
  *slot.lock().unwrap() = Some(sub);
  assert_eq!(next(&mut rx).await, 1);

  p.create_contact(Contact::new("Ann", "1")).await.unwrap();
  assert_eq!(next(&mut rx).await, 2);
  assert!(slot.lock().unwrap().is_none());

  p.create_contact(Contact::new("Bob", "2")).await.unwrap();
  assert_quiet(&mut rx).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unsubscribe_waits_for_a_running_callback() {
  let p = publisher_with(vec![]);
  let finished = Arc::new(AtomicBool::new(false));
  let (started_tx, mut started) = mpsc::unbounded_channel::<()>();

  let sub = p
    .subscribe_contacts({
      let finished = finished.clone();
      move |list: Vec<Contact>| {
        if list.is_empty() {
          return;
        }
        let _ = started_tx.send(());
        std::thread::sleep(Duration::from_millis(200));
        finished.store(true, SeqCst);
      }
    })
    .await;

  p.create_contact(Contact::new("Ann", "1")).await.unwrap();
  next(&mut started).await;
  drop(sub);
  assert!(finished.load(SeqCst));
}

// ─── Failure reporting ───────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("storage offline")]
struct Offline;

/// Reads succeed; every write fails.
struct ReadOnlyStore(MemoryStore);

impl ContactStore for ReadOnlyStore {
  type Error = Offline;

  async fn list(&self) -> Result<Vec<Contact>, Offline> {
    self.0.list().await.map_err(|_| Offline)
  }

  async fn get(&self, id: ContactId) -> Result<Option<Contact>, Offline> {
    self.0.get(id).await.map_err(|_| Offline)
  }

  async fn upsert(&self, _: Contact) -> Result<(), Offline> { Err(Offline) }

  async fn update(&self, _: Contact) -> Result<bool, Offline> { Err(Offline) }

  async fn delete(&self, _: ContactId) -> Result<bool, Offline> { Err(Offline) }

  fn changes(&self) -> watch::Receiver<Revision> { self.0.changes() }
}

#[tokio::test]
async fn failed_writes_are_reported_to_the_caller() {
  let ann = Contact::new("Ann", "1");
  let store = ReadOnlyStore(MemoryStore::with_contacts([ann.clone()]));
  let p = ContactPublisher::new(
    ContactRepository::new(Arc::new(store)),
    PublisherConfig { linger: Duration::ZERO },
  );

  let (cb, mut rx) = collector::<Vec<Contact>>();
  let _sub = p.subscribe_contacts(cb).await;
  next(&mut rx).await;

  let err = p.create_contact(Contact::new("Bob", "2")).await.unwrap_err();
  assert!(matches!(err, Error::Store(_)));
  assert_eq!(err.to_string(), "store error: storage offline");
  assert!(matches!(
    p.delete_contact(&ann).await,
    Err(Error::Store(_))
  ));
  assert_quiet(&mut rx).await;
}

// ─── SQLite end to end ───────────────────────────────────────────────────────

#[tokio::test]
async fn works_over_sqlite() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let p = ContactPublisher::new(
    ContactRepository::new(Arc::new(store)),
    PublisherConfig { linger: Duration::ZERO },
  );

  let (cb, mut rx) = collector::<Vec<Contact>>();
  let _sub = p.subscribe_filtered(cb).await;
  assert!(next(&mut rx).await.is_empty());

  let bob = Contact::new("Bob", "111");
  p.create_contact(bob.clone()).await.unwrap();
  p.create_contact(Contact::new("Ann", "222")).await.unwrap();
  let both = until(&mut rx, |v| v.len() == 2).await;
  assert_eq!(names(&both), vec!["Ann", "Bob"]);

  p.set_search_query("11");
  assert_eq!(names(&until(&mut rx, |v| v.len() == 1).await), vec!["Bob"]);

  p.delete_contact(&bob).await.unwrap();
  assert!(until(&mut rx, |v| v.is_empty()).await.is_empty());
}
