//! [`SearchQuery`]: the current search text.

use std::sync::Arc;

use tokio::sync::watch;

/// Holds exactly one search string (initially empty).
///
/// Cloning is cheap and every clone shares the same value. Writes are
/// last-write-wins; each one notifies watchers, with no debouncing.
#[derive(Clone)]
pub struct SearchQuery {
  tx: Arc<watch::Sender<String>>,
}

impl SearchQuery {
  pub fn new() -> Self {
    let (tx, _) = watch::channel(String::new());
    Self { tx: Arc::new(tx) }
  }

  /// Replace the query.
  pub fn set(&self, text: impl Into<String>) {
    let text = text.into();
    tracing::debug!(query = %text, "search query set");
    self.tx.send_replace(text);
  }

  pub fn get(&self) -> String { self.tx.borrow().clone() }

  /// Watch the query; the current value counts as already seen.
  pub fn subscribe(&self) -> watch::Receiver<String> { self.tx.subscribe() }
}

impl Default for SearchQuery {
  fn default() -> Self { Self::new() }
}
