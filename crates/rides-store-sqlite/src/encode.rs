//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed nine-digit
//! fraction, so string comparison in SQL agrees with time order. UUIDs are
//! stored as hyphenated lowercase strings; enums as their snake_case names.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rides_core::{
  conversation::ConversationStatus,
  ride::{Location, Ride},
  status::RideStatus,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Enums ────────────────────────────────────────────────────────────────────

pub fn decode_ride_status(s: &str) -> Result<RideStatus> {
  RideStatus::from_str(s).map_err(|_| Error::UnknownEnum {
    what:  "ride status",
    value: s.to_owned(),
  })
}

pub fn decode_conversation_status(s: &str) -> Result<ConversationStatus> {
  ConversationStatus::from_str(s).map_err(|_| Error::UnknownEnum {
    what:  "conversation status",
    value: s.to_owned(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Columns selected for a ride, in [`RideRow::from_row`] order.
pub const RIDE_COLUMNS: &str = "
  ride_id, ride_zone_id, voter_id, driver_id, conversation_id, name, status,
  pickup_at, status_updated_at, created_at,
  from_address, from_city, from_state, from_zip, from_latitude, from_longitude,
  to_address, to_city, to_state, to_zip, to_latitude, to_longitude,
  additional_passengers, special_requests, description, phone_number, email,
  lock_version";

/// A ride flattened to column values. Used in both directions.
pub struct RideRow {
  pub ride_id:               String,
  pub ride_zone_id:          String,
  pub voter_id:              String,
  pub driver_id:             Option<String>,
  pub conversation_id:       Option<String>,
  pub name:                  Option<String>,
  pub status:                String,
  pub pickup_at:             Option<String>,
  pub status_updated_at:     String,
  pub created_at:            String,
  pub from_address:          Option<String>,
  pub from_city:             Option<String>,
  pub from_state:            Option<String>,
  pub from_zip:              Option<String>,
  pub from_latitude:         Option<f64>,
  pub from_longitude:        Option<f64>,
  pub to_address:            Option<String>,
  pub to_city:               Option<String>,
  pub to_state:              Option<String>,
  pub to_zip:                Option<String>,
  pub to_latitude:           Option<f64>,
  pub to_longitude:          Option<f64>,
  pub additional_passengers: i64,
  pub special_requests:      Option<String>,
  pub description:           Option<String>,
  pub phone_number:          Option<String>,
  pub email:                 Option<String>,
  pub lock_version:          i64,
}

impl RideRow {
  pub fn from_ride(ride: &Ride) -> Self {
    Self {
      ride_id:               encode_uuid(ride.ride_id),
      ride_zone_id:          encode_uuid(ride.ride_zone_id),
      voter_id:              encode_uuid(ride.voter_id),
      driver_id:             ride.driver_id.map(encode_uuid),
      conversation_id:       ride.conversation_id.map(encode_uuid),
      name:                  ride.name.clone(),
      status:                ride.status.as_ref().to_owned(),
      pickup_at:             ride.pickup_at.map(encode_dt),
      status_updated_at:     encode_dt(ride.status_updated_at),
      created_at:            encode_dt(ride.created_at),
      from_address:          ride.from.address.clone(),
      from_city:             ride.from.city.clone(),
      from_state:            ride.from.state.clone(),
      from_zip:              ride.from.zip.clone(),
      from_latitude:         ride.from.latitude,
      from_longitude:        ride.from.longitude,
      to_address:            ride.to.address.clone(),
      to_city:               ride.to.city.clone(),
      to_state:              ride.to.state.clone(),
      to_zip:                ride.to.zip.clone(),
      to_latitude:           ride.to.latitude,
      to_longitude:          ride.to.longitude,
      additional_passengers: i64::from(ride.additional_passengers),
      special_requests:      ride.special_requests.clone(),
      description:           ride.description.clone(),
      phone_number:          ride.phone_number.clone(),
      email:                 ride.email.clone(),
      lock_version:          ride.lock_version,
    }
  }

  /// Read a row selected with [`RIDE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      ride_id:               row.get(0)?,
      ride_zone_id:          row.get(1)?,
      voter_id:              row.get(2)?,
      driver_id:             row.get(3)?,
      conversation_id:       row.get(4)?,
      name:                  row.get(5)?,
      status:                row.get(6)?,
      pickup_at:             row.get(7)?,
      status_updated_at:     row.get(8)?,
      created_at:            row.get(9)?,
      from_address:          row.get(10)?,
      from_city:             row.get(11)?,
      from_state:            row.get(12)?,
      from_zip:              row.get(13)?,
      from_latitude:         row.get(14)?,
      from_longitude:        row.get(15)?,
      to_address:            row.get(16)?,
      to_city:               row.get(17)?,
      to_state:              row.get(18)?,
      to_zip:                row.get(19)?,
      to_latitude:           row.get(20)?,
      to_longitude:          row.get(21)?,
      additional_passengers: row.get(22)?,
      special_requests:      row.get(23)?,
      description:           row.get(24)?,
      phone_number:          row.get(25)?,
      email:                 row.get(26)?,
      lock_version:          row.get(27)?,
    })
  }

  pub fn into_ride(self) -> Result<Ride> {
    Ok(Ride {
      ride_id:               decode_uuid(&self.ride_id)?,
      ride_zone_id:          decode_uuid(&self.ride_zone_id)?,
      voter_id:              decode_uuid(&self.voter_id)?,
      driver_id:             decode_opt_uuid(self.driver_id)?,
      conversation_id:       decode_opt_uuid(self.conversation_id)?,
      name:                  self.name,
      status:                decode_ride_status(&self.status)?,
      pickup_at:             decode_opt_dt(self.pickup_at)?,
      status_updated_at:     decode_dt(&self.status_updated_at)?,
      created_at:            decode_dt(&self.created_at)?,
      from:                  Location {
        address:   self.from_address,
        city:      self.from_city,
        state:     self.from_state,
        zip:       self.from_zip,
        latitude:  self.from_latitude,
        longitude: self.from_longitude,
      },
      to:                    Location {
        address:   self.to_address,
        city:      self.to_city,
        state:     self.to_state,
        zip:       self.to_zip,
        latitude:  self.to_latitude,
        longitude: self.to_longitude,
      },
      additional_passengers: u32::try_from(self.additional_passengers)
        .unwrap_or_default(),
      special_requests:      self.special_requests,
      description:           self.description,
      phone_number:          self.phone_number,
      email:                 self.email,
      lock_version:          self.lock_version,
      distance_to_voter:     None,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  #[test]
  fn encoded_timestamps_sort_chronologically() {
    let a = Utc::now();
    let b = a + Duration::nanoseconds(1);
    let c = a + Duration::milliseconds(500);
    let d = a + Duration::seconds(1);
    let mut encoded = [encode_dt(d), encode_dt(b), encode_dt(c), encode_dt(a)];
    encoded.sort();
    assert_eq!(encoded, [encode_dt(a), encode_dt(b), encode_dt(c), encode_dt(d)]);
  }

  #[test]
  fn timestamps_survive_encoding_exactly() {
    let now = Utc::now();
    assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
  }

  #[test]
  fn unknown_status_is_reported() {
    assert!(matches!(
      decode_ride_status("teleported"),
      Err(Error::UnknownEnum { what: "ride status", .. })
    ));
  }
}
