//! Error type for `meadow-state`.

use meadow_core::ContactId;
use thiserror::Error;

/// Why a mutation failed. Reads and subscriptions never produce one.
#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("contact not found: {0}")]
  NotFound(ContactId),

  /// The write targeted the id of a deleted contact.
  #[error("contact id {0} was deleted and cannot be reused")]
  IdRetired(ContactId),

  #[error("mutation task failed: {0}")]
  Task(#[from] tokio::task::JoinError),
}

impl Error {
  /// Wrap a backend error. A retired-id rejection anywhere in its source
  /// chain becomes [`Error::IdRetired`].
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    match retired_id(&e) {
      Some(id) => Self::IdRetired(id),
      None => Self::Store(Box::new(e)),
    }
  }
}

fn retired_id(e: &(dyn std::error::Error + 'static)) -> Option<ContactId> {
  let mut cause = Some(e);
  while let Some(err) = cause {
    if let Some(meadow_core::Error::IdRetired(id)) =
      err.downcast_ref::<meadow_core::Error>()
    {
      return Some(*id);
    }
    cause = err.source();
  }
  None
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
