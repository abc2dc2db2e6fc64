//! Error types for `meadow-core`.

use thiserror::Error;

use crate::contact::ContactId;

#[derive(Debug, Error)]
pub enum Error {
  /// The id belonged to a contact that has since been deleted.
  #[error("contact id {0} was deleted and cannot be reused")]
  IdRetired(ContactId),

  #[error("missing required field: {0}")]
  MissingField(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
