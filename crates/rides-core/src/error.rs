//! Error types for `rides-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::validate::ValidationErrors;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("ride not found: {0}")]
  RideNotFound(Uuid),

  #[error("conversation not found: {0}")]
  ConversationNotFound(Uuid),

  #[error("ride is invalid: {0}")]
  Invalid(ValidationErrors),

  /// Another writer kept committing first; the operation gave up.
  #[error("ride {0} was modified concurrently")]
  Conflict(Uuid),

  #[error("store error: {0}")]
  Store(#[source] BoxError),

  #[error("ride zone error: {0}")]
  Zone(#[source] BoxError),

  #[error("conversation error: {0}")]
  Conversation(#[source] BoxError),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub(crate) fn zone(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Zone(Box::new(e))
  }

  pub(crate) fn conversation(
    e: impl std::error::Error + Send + Sync + 'static,
  ) -> Self {
    Self::Conversation(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
