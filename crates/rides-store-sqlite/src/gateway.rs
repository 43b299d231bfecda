//! Ride zones and conversations held in the same database as rides.
//!
//! Conversation calls are recorded in an append-only outbox
//! (`conversation_messages`) for the messaging service to deliver; zone
//! events go out on the store's in-process [`ZoneEventBus`].
//!
//! [`ZoneEventBus`]: rides_core::zone::ZoneEventBus

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use tracing::debug;
use uuid::Uuid;

use rides_core::{
  conversation::{ConversationGateway, ConversationStatus, ConversationTrip},
  geo::{self, LatLng},
  user::User,
  zone::{RideZoneGateway, ZoneEvent},
};

use crate::{
  Error, Result, SqliteStore,
  encode::{decode_conversation_status, decode_dt, decode_uuid, encode_dt, encode_uuid},
};

// ─── Zones ───────────────────────────────────────────────────────────────────

/// A geographic service area.
#[derive(Debug, Clone, PartialEq)]
pub struct RideZone {
  pub zone_id:       Uuid,
  pub name:          String,
  pub center:        LatLng,
  /// Miles from `center` within which pickups are accepted.
  pub pickup_radius: f64,
  /// IANA time-zone identifier.
  pub time_zone:     String,
}

/// Input to [`SqliteStore::add_zone`].
#[derive(Debug, Clone)]
pub struct NewZone {
  pub name:          String,
  pub center:        LatLng,
  pub pickup_radius: f64,
  pub time_zone:     String,
}

// ─── Outbox ──────────────────────────────────────────────────────────────────

/// What a queued conversation message asks the messaging service to say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
  DriverAssigned,
  DriverCleared,
  ConfirmationRequest,
}

fn encode_message_kind(k: MessageKind) -> &'static str {
  match k {
    MessageKind::DriverAssigned => "driver_assigned",
    MessageKind::DriverCleared => "driver_cleared",
    MessageKind::ConfirmationRequest => "confirmation_request",
  }
}

fn decode_message_kind(s: &str) -> Result<MessageKind> {
  match s {
    "driver_assigned" => Ok(MessageKind::DriverAssigned),
    "driver_cleared" => Ok(MessageKind::DriverCleared),
    "confirmation_request" => Ok(MessageKind::ConfirmationRequest),
    other => Err(Error::UnknownEnum { what: "message kind", value: other.to_owned() }),
  }
}

/// A conversation message waiting in the outbox.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxMessage {
  pub message_id:      Uuid,
  pub conversation_id: Uuid,
  pub kind:            MessageKind,
  pub driver_id:       Option<Uuid>,
  pub recorded_at:     DateTime<Utc>,
}

struct RawMessage {
  message_id:      String,
  conversation_id: String,
  kind:            String,
  driver_id:       Option<String>,
  recorded_at:     String,
}

impl RawMessage {
  fn into_message(self) -> Result<OutboxMessage> {
    Ok(OutboxMessage {
      message_id:      decode_uuid(&self.message_id)?,
      conversation_id: decode_uuid(&self.conversation_id)?,
      kind:            decode_message_kind(&self.kind)?,
      driver_id:       self.driver_id.as_deref().map(decode_uuid).transpose()?,
      recorded_at:     decode_dt(&self.recorded_at)?,
    })
  }
}

struct RawTrip {
  ride_zone_id:          String,
  voter_id:              String,
  username:              Option<String>,
  pickup_at:             Option<String>,
  from_address:          Option<String>,
  from_city:             Option<String>,
  from_latitude:         Option<f64>,
  from_longitude:        Option<f64>,
  to_address:            Option<String>,
  to_city:               Option<String>,
  to_latitude:           Option<f64>,
  to_longitude:          Option<f64>,
  additional_passengers: i64,
  special_requests:      Option<String>,
}

impl RawTrip {
  fn into_trip(self) -> Result<ConversationTrip> {
    Ok(ConversationTrip {
      ride_zone_id:          decode_uuid(&self.ride_zone_id)?,
      voter_id:              decode_uuid(&self.voter_id)?,
      username:              self.username,
      pickup_at:             self.pickup_at.as_deref().map(decode_dt).transpose()?,
      from_address:          self.from_address,
      from_city:             self.from_city,
      from_latitude:         self.from_latitude,
      from_longitude:        self.from_longitude,
      to_address:            self.to_address,
      to_city:               self.to_city,
      to_latitude:           self.to_latitude,
      to_longitude:          self.to_longitude,
      additional_passengers: u32::try_from(self.additional_passengers)
        .unwrap_or_default(),
      special_requests:      self.special_requests,
    })
  }
}

// ─── Inherent methods ────────────────────────────────────────────────────────

impl SqliteStore {
  pub async fn add_zone(&self, input: NewZone) -> Result<RideZone> {
    let zone = RideZone {
      zone_id:       Uuid::new_v4(),
      name:          input.name,
      center:        input.center,
      pickup_radius: input.pickup_radius,
      time_zone:     input.time_zone,
    };

    let id_str = encode_uuid(zone.zone_id);
    let name = zone.name.clone();
    let (lat, lon) = (zone.center.latitude, zone.center.longitude);
    let radius = zone.pickup_radius;
    let tz = zone.time_zone.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO ride_zones
             (zone_id, name, latitude, longitude, pickup_radius, time_zone)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, name, lat, lon, radius, tz],
        )?;
        Ok(())
      })
      .await?;

    Ok(zone)
  }

  pub async fn get_zone(&self, zone_id: Uuid) -> Result<Option<RideZone>> {
    let id_str = encode_uuid(zone_id);

    let raw: Option<(String, f64, f64, f64, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT name, latitude, longitude, pickup_radius, time_zone
               FROM ride_zones WHERE zone_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
              },
            )
            .optional()?,
        )
      })
      .await?;

    Ok(raw.map(|(name, lat, lon, pickup_radius, time_zone)| RideZone {
      zone_id,
      name,
      center: LatLng::new(lat, lon),
      pickup_radius,
      time_zone,
    }))
  }

  /// Start a conversation with the trip details it has gathered so far.
  pub async fn add_conversation(&self, trip: &ConversationTrip) -> Result<Uuid> {
    let conversation_id = Uuid::new_v4();
    let id_str = encode_uuid(conversation_id);
    let zone_str = encode_uuid(trip.ride_zone_id);
    let voter_str = encode_uuid(trip.voter_id);
    let pickup_str = trip.pickup_at.map(encode_dt);
    let at_str = encode_dt(Utc::now());
    let trip = trip.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO conversations (
             conversation_id, ride_zone_id, voter_id, status, username, pickup_at,
             from_address, from_city, from_latitude, from_longitude,
             to_address, to_city, to_latitude, to_longitude,
             additional_passengers, special_requests, created_at
           ) VALUES (
             :conversation_id, :ride_zone_id, :voter_id, 'in_progress', :username,
             :pickup_at, :from_address, :from_city, :from_latitude, :from_longitude,
             :to_address, :to_city, :to_latitude, :to_longitude,
             :additional_passengers, :special_requests, :created_at
           )",
          rusqlite::named_params! {
            ":conversation_id":       id_str,
            ":ride_zone_id":          zone_str,
            ":voter_id":              voter_str,
            ":username":              trip.username,
            ":pickup_at":             pickup_str,
            ":from_address":          trip.from_address,
            ":from_city":             trip.from_city,
            ":from_latitude":         trip.from_latitude,
            ":from_longitude":        trip.from_longitude,
            ":to_address":            trip.to_address,
            ":to_city":               trip.to_city,
            ":to_latitude":           trip.to_latitude,
            ":to_longitude":          trip.to_longitude,
            ":additional_passengers": i64::from(trip.additional_passengers),
            ":special_requests":      trip.special_requests,
            ":created_at":            at_str,
          },
        )?;
        Ok(())
      })
      .await?;

    Ok(conversation_id)
  }

  /// Current status of a conversation, or `None` if it does not exist.
  pub async fn conversation_status(
    &self,
    conversation_id: Uuid,
  ) -> Result<Option<ConversationStatus>> {
    let id_str = encode_uuid(conversation_id);

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT status FROM conversations WHERE conversation_id = ?1",
              rusqlite::params![id_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.as_deref().map(decode_conversation_status).transpose()
  }

  /// Outbox messages for a conversation, oldest first.
  pub async fn messages(&self, conversation_id: Uuid) -> Result<Vec<OutboxMessage>> {
    let id_str = encode_uuid(conversation_id);

    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT message_id, conversation_id, kind, driver_id, recorded_at
           FROM conversation_messages
           WHERE conversation_id = ?1
           ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawMessage {
              message_id:      row.get(0)?,
              conversation_id: row.get(1)?,
              kind:            row.get(2)?,
              driver_id:       row.get(3)?,
              recorded_at:     row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  async fn enqueue(
    &self,
    conversation_id: Uuid,
    kind: MessageKind,
    driver_id: Option<Uuid>,
  ) -> Result<()> {
    let message_id = encode_uuid(Uuid::new_v4());
    let conv_str = encode_uuid(conversation_id);
    let kind_str = encode_message_kind(kind);
    let driver_str = driver_id.map(encode_uuid);
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO conversation_messages
             (message_id, conversation_id, kind, driver_id, recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![message_id, conv_str, kind_str, driver_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    debug!(%conversation_id, kind = kind_str, "conversation message queued");
    Ok(())
  }

  async fn require_conversation(&self, conversation_id: Uuid) -> Result<ConversationStatus> {
    self
      .conversation_status(conversation_id)
      .await?
      .ok_or(Error::ConversationNotFound(conversation_id))
  }
}

// ─── RideZoneGateway impl ────────────────────────────────────────────────────

impl RideZoneGateway for SqliteStore {
  type Error = crate::Error;

  async fn is_within_pickup_radius(&self, zone_id: Uuid, point: LatLng) -> Result<bool> {
    let zone = self
      .get_zone(zone_id)
      .await?
      .ok_or(Error::ZoneNotFound(zone_id))?;
    Ok(geo::within_radius(point, zone.center, zone.pickup_radius))
  }

  async fn time_zone(&self, zone_id: Uuid) -> Result<Option<String>> {
    Ok(self.get_zone(zone_id).await?.map(|z| z.time_zone))
  }

  fn emit_event(&self, event: ZoneEvent) {
    debug!(zone_id = %event.zone_id, kind = %event.kind, "zone event");
    self.events.publish(event);
  }
}

// ─── ConversationGateway impl ────────────────────────────────────────────────

impl ConversationGateway for SqliteStore {
  type Error = crate::Error;

  async fn trip(&self, conversation_id: Uuid) -> Result<Option<ConversationTrip>> {
    let id_str = encode_uuid(conversation_id);

    let raw: Option<RawTrip> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT ride_zone_id, voter_id, username, pickup_at,
                      from_address, from_city, from_latitude, from_longitude,
                      to_address, to_city, to_latitude, to_longitude,
                      additional_passengers, special_requests
               FROM conversations WHERE conversation_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawTrip {
                  ride_zone_id:          row.get(0)?,
                  voter_id:              row.get(1)?,
                  username:              row.get(2)?,
                  pickup_at:             row.get(3)?,
                  from_address:          row.get(4)?,
                  from_city:             row.get(5)?,
                  from_latitude:         row.get(6)?,
                  from_longitude:        row.get(7)?,
                  to_address:            row.get(8)?,
                  to_city:               row.get(9)?,
                  to_latitude:           row.get(10)?,
                  to_longitude:          row.get(11)?,
                  additional_passengers: row.get(12)?,
                  special_requests:      row.get(13)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTrip::into_trip).transpose()
  }

  async fn notify_voter_of_assignment(
    &self,
    conversation_id: Uuid,
    driver: Option<User>,
  ) -> Result<()> {
    self.require_conversation(conversation_id).await?;
    let (kind, driver_id) = match driver {
      Some(d) => (MessageKind::DriverAssigned, Some(d.user_id)),
      None => (MessageKind::DriverCleared, None),
    };
    self.enqueue(conversation_id, kind, driver_id).await
  }

  async fn attempt_confirmation(&self, conversation_id: Uuid) -> Result<()> {
    if self.require_conversation(conversation_id).await? == ConversationStatus::Closed {
      return Err(Error::ConversationClosed(conversation_id));
    }
    self
      .enqueue(conversation_id, MessageKind::ConfirmationRequest, None)
      .await
  }

  async fn update_status(
    &self,
    conversation_id: Uuid,
    status: ConversationStatus,
  ) -> Result<()> {
    let id_str = encode_uuid(conversation_id);
    let status_str = status.as_ref().to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE conversations SET status = ?1 WHERE conversation_id = ?2",
          rusqlite::params![status_str, id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::ConversationNotFound(conversation_id));
    }
    debug!(%conversation_id, %status, "conversation status updated");
    Ok(())
  }
}
