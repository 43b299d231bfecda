//! Error type for `rides-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {what} in database: {value:?}")]
  UnknownEnum { what: &'static str, value: String },

  #[error("ride zone not found: {0}")]
  ZoneNotFound(uuid::Uuid),

  #[error("conversation not found: {0}")]
  ConversationNotFound(uuid::Uuid),

  /// Closed conversations cannot ask the voter anything.
  #[error("conversation {0} is closed")]
  ConversationClosed(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
