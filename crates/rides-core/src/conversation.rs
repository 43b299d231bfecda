//! The messaging conversation a ride is created from.
//!
//! Conversations own their own behaviour; the ride lifecycle only reads the
//! trip details they collected and tells them about assignment, confirmation
//! and closure.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::user::User;

/// Conversation statuses the ride lifecycle sets or relies on.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConversationStatus {
  InProgress,
  RideCreated,
  Closed,
}

/// Trip details gathered by a conversation, copied onto a new ride.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTrip {
  pub ride_zone_id:          Uuid,
  pub voter_id:              Uuid,
  pub username:              Option<String>,
  pub pickup_at:             Option<DateTime<Utc>>,
  pub from_address:          Option<String>,
  pub from_city:             Option<String>,
  pub from_latitude:         Option<f64>,
  pub from_longitude:        Option<f64>,
  pub to_address:            Option<String>,
  pub to_city:               Option<String>,
  pub to_latitude:           Option<f64>,
  pub to_longitude:          Option<f64>,
  pub additional_passengers: u32,
  pub special_requests:      Option<String>,
}

/// The calls the ride lifecycle makes on conversations.
pub trait ConversationGateway: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Trip details for a conversation. `None` if it does not exist.
  fn trip(
    &self,
    conversation_id: Uuid,
  ) -> impl Future<Output = Result<Option<ConversationTrip>, Self::Error>> + Send + '_;

  /// Tell the voter who is driving them; `None` means the driver was removed.
  fn notify_voter_of_assignment(
    &self,
    conversation_id: Uuid,
    driver: Option<User>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Ask the voter to confirm an upcoming ride. May fail.
  fn attempt_confirmation(
    &self,
    conversation_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn update_status(
    &self,
    conversation_id: Uuid,
    status: ConversationStatus,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
