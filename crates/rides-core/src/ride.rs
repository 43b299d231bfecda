//! The ride record and its creation input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{conversation::ConversationTrip, geo::LatLng, status::RideStatus};

// ─── Location ────────────────────────────────────────────────────────────────

/// One end of a trip: a postal address plus its geocoded point, if known.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
  pub address:   Option<String>,
  pub city:      Option<String>,
  pub state:     Option<String>,
  pub zip:       Option<String>,
  pub latitude:  Option<f64>,
  pub longitude: Option<f64>,
}

impl Location {
  /// The geocoded point, if both coordinates are present and finite.
  pub fn point(&self) -> Option<LatLng> {
    let p = LatLng::new(self.latitude?, self.longitude?);
    p.is_finite().then_some(p)
  }

  /// `true` when an address string is present and not just whitespace.
  pub fn has_address(&self) -> bool {
    self.address.as_deref().is_some_and(|a| !a.trim().is_empty())
  }
}

// ─── Ride ────────────────────────────────────────────────────────────────────

/// A single passenger-transport request.
///
/// Fields are public for reading and for editing trip details, but status and
/// driver changes must go through [`crate::RideService`] so that they are
/// validated, locked and announced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ride {
  pub ride_id:               Uuid,
  pub ride_zone_id:          Uuid,
  pub voter_id:              Uuid,
  pub driver_id:             Option<Uuid>,
  /// The conversation this ride was created from, if any.
  pub conversation_id:       Option<Uuid>,
  pub name:                  Option<String>,
  pub status:                RideStatus,
  pub pickup_at:             Option<DateTime<Utc>>,
  pub status_updated_at:     DateTime<Utc>,
  pub created_at:            DateTime<Utc>,
  pub from:                  Location,
  pub to:                    Location,
  pub additional_passengers: u32,
  pub special_requests:      Option<String>,
  pub description:           Option<String>,
  pub phone_number:          Option<String>,
  pub email:                 Option<String>,
  /// Optimistic concurrency counter, bumped by the store on every update.
  pub lock_version:          i64,
  /// Distance from a query point, filled in by proximity searches only.
  #[serde(skip)]
  pub distance_to_voter:     Option<f64>,
}

impl Ride {
  /// Materialise a new ride from its creation input. Nothing is persisted.
  pub fn from_new(input: NewRide, now: DateTime<Utc>) -> Self {
    Self {
      ride_id:               Uuid::new_v4(),
      ride_zone_id:          input.ride_zone_id,
      voter_id:              input.voter_id,
      driver_id:             None,
      conversation_id:       input.conversation_id,
      name:                  input.name,
      status:                input.status,
      pickup_at:             input.pickup_at,
      status_updated_at:     now,
      created_at:            now,
      from:                  input.from,
      to:                    input.to,
      additional_passengers: input.additional_passengers,
      special_requests:      input.special_requests,
      description:           input.description,
      phone_number:          input.phone_number,
      email:                 input.email,
      lock_version:          0,
      distance_to_voter:     None,
    }
  }

  pub fn is_assignable(&self) -> bool { self.status.is_assignable() }

  pub fn is_active(&self) -> bool { self.status.is_active() }

  /// The voter always rides, so this is one more than the extra passengers.
  pub fn passenger_count(&self) -> u32 { self.additional_passengers + 1 }

  pub fn pickup_point(&self) -> Option<LatLng> { self.from.point() }

  /// Whether `driver_id` is the driver of record.
  pub fn is_driven_by(&self, driver_id: Uuid) -> bool {
    self.driver_id == Some(driver_id)
  }

  /// Record the distance from `point` to the pickup location.
  pub fn set_distance_to_voter(&mut self, point: LatLng) {
    self.distance_to_voter = self.pickup_point().map(|p| point.distance_to(&p));
  }
}

// ─── NewRide ─────────────────────────────────────────────────────────────────

/// Input to [`crate::RideService::create`]. Identity and timestamps are always
/// assigned by the service.
#[derive(Debug, Clone, Default)]
pub struct NewRide {
  pub ride_zone_id:          Uuid,
  pub voter_id:              Uuid,
  pub conversation_id:       Option<Uuid>,
  pub name:                  Option<String>,
  pub status:                RideStatus,
  pub pickup_at:             Option<DateTime<Utc>>,
  pub from:                  Location,
  pub to:                    Location,
  pub additional_passengers: u32,
  pub special_requests:      Option<String>,
  pub description:           Option<String>,
  pub phone_number:          Option<String>,
  pub email:                 Option<String>,
}

impl NewRide {
  /// Convenience constructor with every optional field left empty.
  pub fn new(ride_zone_id: Uuid, voter_id: Uuid) -> Self {
    Self { ride_zone_id, voter_id, ..Default::default() }
  }

  /// Copy the trip details gathered by a conversation. The resulting ride is
  /// `scheduled` and linked back to `conversation_id`.
  pub fn from_conversation(conversation_id: Uuid, trip: ConversationTrip) -> Self {
    Self {
      ride_zone_id:          trip.ride_zone_id,
      voter_id:              trip.voter_id,
      conversation_id:       Some(conversation_id),
      name:                  trip.username,
      status:                RideStatus::Scheduled,
      pickup_at:             trip.pickup_at,
      from:                  Location {
        address: trip.from_address,
        city: trip.from_city,
        latitude: trip.from_latitude,
        longitude: trip.from_longitude,
        ..Default::default()
      },
      to:                    Location {
        address: trip.to_address,
        city: trip.to_city,
        latitude: trip.to_latitude,
        longitude: trip.to_longitude,
        ..Default::default()
      },
      additional_passengers: trip.additional_passengers,
      special_requests:      trip.special_requests,
      description:           None,
      phone_number:          None,
      email:                 None,
    }
  }
}
