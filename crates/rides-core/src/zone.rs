//! Ride zones: geographic service areas and their event bus.

use std::future::Future;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{geo::LatLng, user::User};

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ZoneEventKind {
  ConversationChanged,
  DriverChanged,
}

/// What an event is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ZonePayload {
  Conversation { conversation_id: Uuid },
  Driver(User),
}

/// A zone-scoped notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneEvent {
  pub zone_id: Uuid,
  pub kind:    ZoneEventKind,
  pub payload: ZonePayload,
}

impl ZoneEvent {
  pub fn conversation_changed(zone_id: Uuid, conversation_id: Uuid) -> Self {
    Self {
      zone_id,
      kind: ZoneEventKind::ConversationChanged,
      payload: ZonePayload::Conversation { conversation_id },
    }
  }

  pub fn driver_changed(zone_id: Uuid, driver: User) -> Self {
    Self {
      zone_id,
      kind: ZoneEventKind::DriverChanged,
      payload: ZonePayload::Driver(driver),
    }
  }
}

/// In-process fan-out of zone events.
///
/// Publishing never blocks and never fails; with no subscribers the event is
/// simply dropped. Slow subscribers lose the oldest events.
#[derive(Debug, Clone)]
pub struct ZoneEventBus {
  sender: broadcast::Sender<ZoneEvent>,
}

impl ZoneEventBus {
  pub fn new(capacity: usize) -> Self {
    let (sender, _) = broadcast::channel(capacity);
    Self { sender }
  }

  pub fn publish(&self, event: ZoneEvent) {
    if self.sender.send(event).is_err() {
      tracing::trace!("zone event dropped: no subscribers");
    }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<ZoneEvent> {
    self.sender.subscribe()
  }
}

impl Default for ZoneEventBus {
  fn default() -> Self { Self::new(256) }
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

/// What the ride lifecycle needs from ride zones.
pub trait RideZoneGateway: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Whether `point` is close enough to the zone to be picked up.
  fn is_within_pickup_radius(
    &self,
    zone_id: Uuid,
    point: LatLng,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// IANA time-zone identifier for the zone, e.g. `America/New_York`.
  fn time_zone(
    &self,
    zone_id: Uuid,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  /// Fire-and-forget. Must not block and cannot fail from the caller's view.
  fn emit_event(&self, event: ZoneEvent);
}
