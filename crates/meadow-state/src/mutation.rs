//! [`Mutation`]: the observable outcome of a create, update or delete.

use std::{
  future::Future,
  pin::Pin,
  task::{Context, Poll},
};

use meadow_core::ContactId;
use tokio::task::JoinHandle;

use crate::{Error, Result};

/// A write that is already running on its own task.
///
/// The work starts as soon as the `Mutation` is created and finishes whether
/// or not anyone awaits it. Awaiting yields the outcome; the views reflect a
/// successful write through the usual change notification.
#[must_use = "a Mutation runs regardless, but its outcome is only observed by awaiting it"]
pub struct Mutation {
  handle: JoinHandle<Result<()>>,
}

impl Mutation {
  pub(crate) fn spawn<F>(op: &'static str, id: ContactId, work: F) -> Self
  where
    F: Future<Output = Result<()>> + Send + 'static,
  {
    let handle = tokio::spawn(async move {
      let outcome = work.await;
      match &outcome {
        Ok(()) => tracing::info!(op, %id, "contact mutation applied"),
        Err(e) => tracing::warn!(op, %id, error = %e, "contact mutation failed"),
      }
      outcome
    });
    Self { handle }
  }

  /// Whether the write has completed (successfully or not).
  pub fn is_finished(&self) -> bool { self.handle.is_finished() }
}

impl Future for Mutation {
  type Output = Result<()>;

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    Pin::new(&mut self.handle)
      .poll(cx)
      .map(|joined| joined.map_err(Error::from).and_then(|outcome| outcome))
  }
}
