//! Core types, collaborator traits and the ride lifecycle service.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage,
//! ride zones and conversations are reached only through the traits in
//! [`store`], [`zone`] and [`conversation`].

pub mod conversation;
pub mod error;
pub mod geo;
pub mod lock;
pub mod notify;
pub mod pipeline;
pub mod ride;
pub mod schedule;
pub mod service;
pub mod status;
pub mod store;
pub mod summary;
pub mod user;
pub mod validate;
pub mod zone;

pub use error::{Error, Result};
pub use service::RideService;
