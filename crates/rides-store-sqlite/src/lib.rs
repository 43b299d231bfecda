//! SQLite backend for the ride lifecycle.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Besides rides, the same database holds
//! the users, ride zones and conversations the lifecycle talks to, so one
//! [`SqliteStore`] can stand in for every collaborator.

mod encode;
mod gateway;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use gateway::{MessageKind, NewZone, OutboxMessage, RideZone};
pub use store::SqliteStore;
