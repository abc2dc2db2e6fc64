//! The filter pipeline: live contact list × search query → filtered view.

use std::sync::Arc;

use meadow_core::Contact;
use tokio::sync::watch;

use crate::feed::{Feed, replace_if_changed};

/// Whether `contact` matches a non-blank `query`: a case-insensitive
/// substring of the first name, last name or phone.
pub fn matches(contact: &Contact, query: &str) -> bool {
  let needle = query.to_lowercase();
  [
    contact.first_name.as_str(),
    contact.last_name.as_deref().unwrap_or(""),
    contact.phone.as_str(),
  ]
  .iter()
  .any(|field| field.to_lowercase().contains(&needle))
}

/// Filter a sorted list. A blank query returns the list unchanged; otherwise
/// the matching contacts keep their relative order.
pub fn apply(contacts: &[Contact], query: &str) -> Vec<Contact> {
  if query.trim().is_empty() {
    return contacts.to_vec();
  }
  contacts
    .iter()
    .filter(|c| matches(c, query))
    .cloned()
    .collect()
}

/// Two-input combinator over the live list and the search query.
pub struct FilterPipeline;

impl FilterPipeline {
  /// Start a feed of `apply(list, query)` that recomputes whenever either
  /// input publishes. Always uses the newest value of both, so queries set in
  /// quick succession may be coalesced into one recomputation.
  ///
  /// The pipeline holds `source` for as long as it runs.
  pub fn spawn(
    source: Arc<Feed<Vec<Contact>>>,
    mut query: watch::Receiver<String>,
  ) -> Feed<Vec<Contact>> {
    let mut list = source.receiver();
    let initial = apply(&list.borrow_and_update(), &query.borrow_and_update());

    Feed::spawn(initial, move |tx| async move {
      let _source = source;
      loop {
        tokio::select! {
          changed = list.changed() => if changed.is_err() { break },
          changed = query.changed() => if changed.is_err() { break },
        }

        let text = query.borrow_and_update().clone();
        let filtered = apply(&list.borrow_and_update(), &text);
        let count = filtered.len();
        if replace_if_changed(&tx, filtered) {
          tracing::debug!(query = %text, count, "filtered view recomputed");
        }
      }
      tracing::debug!("filter pipeline stopped");
    })
  }
}
