//! Live values and their subscriptions.
//!
//! A [`Feed`] is a value kept current by a background task and published
//! through a [`tokio::sync::watch`] channel, so readers always see the latest
//! value and any number of them can wait for the next one. Dropping the feed
//! aborts its task.
//!
//! Consumers never hold a feed directly. They hold a [`LiveView`] (async
//! access) or a [`Subscription`] (callback delivery), both of which keep the
//! shared feed alive through a lease. When the last lease goes away the feed
//! is torn down, optionally after a linger period.

use std::{
  any::Any,
  future::Future,
  sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use tokio::{runtime::Handle, sync::watch, task::JoinHandle};

// ─── Feed ────────────────────────────────────────────────────────────────────

/// A self-updating value driven by a background task.
pub struct Feed<T> {
  rx:   watch::Receiver<T>,
  task: JoinHandle<()>,
}

impl<T: Send + Sync + 'static> Feed<T> {
  /// Publish `initial` immediately and hand the sender to `drive`, which runs
  /// as a spawned task for as long as the feed exists.
  pub fn spawn<F, Fut>(initial: T, drive: F) -> Self
  where
    F: FnOnce(watch::Sender<T>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
  {
    let (tx, rx) = watch::channel(initial);
    let task = tokio::spawn(drive(tx));
    Self { rx, task }
  }
}

impl<T: Clone> Feed<T> {
  /// The most recently published value.
  pub fn current(&self) -> T { self.rx.borrow().clone() }
}

impl<T> Feed<T> {
  /// A fresh receiver positioned at the current value.
  pub fn receiver(&self) -> watch::Receiver<T> { self.rx.clone() }
}

impl<T> Drop for Feed<T> {
  fn drop(&mut self) { self.task.abort(); }
}

/// Store `value` unless it equals what is already published. Returns whether
/// watchers were notified.
pub(crate) fn replace_if_changed<T: PartialEq>(
  tx: &watch::Sender<T>,
  value: T,
) -> bool {
  tx.send_if_modified(|current| {
    if *current == value {
      false
    } else {
      *current = value;
      true
    }
  })
}

// ─── Lease ───────────────────────────────────────────────────────────────────

/// Keeps a shared feed alive; releasing it may be deferred by `linger`.
struct Lease {
  feed:   Option<Arc<dyn Any + Send + Sync>>,
  linger: Duration,
}

impl Drop for Lease {
  fn drop(&mut self) {
    let Some(feed) = self.feed.take() else { return };
    if self.linger.is_zero() {
      return;
    }
    // Outside a runtime there is nothing to linger on; release immediately.
    if let Ok(handle) = Handle::try_current() {
      let linger = self.linger;
      handle.spawn(async move {
        tokio::time::sleep(linger).await;
        drop(feed);
      });
    }
  }
}

// ─── LiveView ────────────────────────────────────────────────────────────────

/// Async access to a shared feed.
pub struct LiveView<T> {
  rx:    watch::Receiver<T>,
  lease: Lease,
}

impl<T: Clone + Send + Sync + 'static> LiveView<T> {
  pub(crate) fn new(feed: Arc<Feed<T>>, linger: Duration) -> Self {
    let mut rx = feed.receiver();
    let _ = rx.borrow_and_update();
    let feed: Arc<dyn Any + Send + Sync> = feed;
    Self { rx, lease: Lease { feed: Some(feed), linger } }
  }

  /// The latest value. Marks it as seen.
  pub fn current(&mut self) -> T { self.rx.borrow_and_update().clone() }

  /// Wait for the next value after the last one seen. Returns `None` if the
  /// feed has stopped.
  pub async fn changed(&mut self) -> Option<T> {
    self.rx.changed().await.ok()?;
    Some(self.rx.borrow_and_update().clone())
  }
}

// ─── Subscription ────────────────────────────────────────────────────────────

/// Callback delivery from a shared feed.
///
/// The callback runs once with the current value when the subscription is
/// created, then once per published value. Dropping the subscription (or
/// calling [`unsubscribe`](Self::unsubscribe)) stops delivery: once that
/// returns, the callback is never invoked again.
///
/// To keep that promise, dropping the subscription from another task waits
/// for a callback already running on a different worker to finish, so
/// callbacks should be short. Dropping it from inside its own callback is
/// allowed and never waits.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
  active: Arc<AtomicBool>,
  /// Held by the delivery task for the duration of each callback.
  running: Arc<Mutex<()>>,
  task:    JoinHandle<()>,
  _lease:  Lease,
}

impl Subscription {
  pub(crate) fn start<T, F>(view: LiveView<T>, mut callback: F) -> Self
  where
    T: Clone + Send + Sync + 'static,
    F: FnMut(T) + Send + 'static,
  {
    let LiveView { mut rx, lease } = view;
    let first = rx.borrow_and_update().clone();
    callback(first);

    let active = Arc::new(AtomicBool::new(true));
    let running = Arc::new(Mutex::new(()));
    let (gate, lock) = (active.clone(), running.clone());
    let task = tokio::spawn(async move {
      while rx.changed().await.is_ok() {
        let value = rx.borrow_and_update().clone();
        let _running = lock.lock().unwrap_or_else(PoisonError::into_inner);
        if !gate.load(Ordering::Acquire) {
          break;
        }
        callback(value);
      }
    });

    Self { active, running, task, _lease: lease }
  }

  /// Stop delivery and release this subscription's hold on the feed.
  pub fn unsubscribe(self) {}

  /// Whether values are still being delivered.
  pub fn is_active(&self) -> bool {
    self.active.load(Ordering::Acquire) && !self.task.is_finished()
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.active.store(false, Ordering::Release);
    self.task.abort();
    // Inside our own callback the delivery task already holds the lock and
    // will see the cleared flag before delivering again.
    if tokio::task::try_id() == Some(self.task.id()) {
      return;
    }
    // Wait out a callback in progress on another worker.
    drop(self.running.lock().unwrap_or_else(PoisonError::into_inner));
  }
}
