//! The outward-facing view of a ride.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result, RideService,
  conversation::ConversationGateway,
  ride::Ride,
  status::RideStatus,
  store::{RideStore, UserDirectory},
  user::User,
  zone::RideZoneGateway,
};

/// A ride as shown to API clients.
///
/// Voter and driver ids are left out; the voter appears only as a normalised
/// phone number and the driver only by name. Times are Unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideSummary {
  pub id:                    Uuid,
  pub ride_zone_id:          Uuid,
  pub name:                  Option<String>,
  pub status:                RideStatus,
  pub description:           Option<String>,
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
  pub additional_passengers: u32,
  pub special_requests:      Option<String>,
  pub pickup_at:             Option<i64>,
  pub created_at:            i64,
  pub status_updated_at:     i64,
  /// The zone's time zone, for rendering `pickup_at` locally.
  pub time_zone:             Option<String>,
  pub voter_phone_number:    Option<String>,
  pub conversation_id:       Option<Uuid>,
  pub driver_name:           Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub distance_to_voter:     Option<f64>,
}

/// Round to two decimal places.
fn round2(x: f64) -> f64 { (x * 100.0).round() / 100.0 }

impl RideSummary {
  pub fn new(
    ride: Ride,
    voter: Option<&User>,
    driver: Option<&User>,
    time_zone: Option<String>,
  ) -> Self {
    Self {
      id: ride.ride_id,
      ride_zone_id: ride.ride_zone_id,
      name: ride.name,
      status: ride.status,
      description: ride.description,
      from_address: ride.from.address,
      from_city: ride.from.city,
      from_state: ride.from.state,
      from_zip: ride.from.zip,
      from_latitude: ride.from.latitude,
      from_longitude: ride.from.longitude,
      to_address: ride.to.address,
      to_city: ride.to.city,
      to_state: ride.to.state,
      to_zip: ride.to.zip,
      to_latitude: ride.to.latitude,
      to_longitude: ride.to.longitude,
      additional_passengers: ride.additional_passengers,
      special_requests: ride.special_requests,
      pickup_at: ride.pickup_at.map(|t| t.timestamp()),
      created_at: ride.created_at.timestamp(),
      status_updated_at: ride.status_updated_at.timestamp(),
      time_zone,
      voter_phone_number: voter.and_then(User::phone_number_normalized),
      conversation_id: ride.conversation_id,
      driver_name: driver.map(|d| d.name.clone()),
      distance_to_voter: ride.distance_to_voter.map(round2),
    }
  }
}

impl<S, Z, C> RideService<S, Z, C>
where
  S: RideStore + UserDirectory,
  Z: RideZoneGateway,
  C: ConversationGateway,
{
  /// Resolve the voter, driver and zone time zone for `ride`'s summary.
  pub async fn summarize(&self, ride: Ride) -> Result<RideSummary> {
    let voter = UserDirectory::get_user(self.store(), ride.voter_id)
      .await
      .map_err(Error::store)?;
    let driver = match ride.driver_id {
      Some(id) => UserDirectory::get_user(self.store(), id)
        .await
        .map_err(Error::store)?,
      None => None,
    };
    let time_zone = self
      .zones()
      .time_zone(ride.ride_zone_id)
      .await
      .map_err(Error::zone)?;

    Ok(RideSummary::new(ride, voter.as_ref(), driver.as_ref(), time_zone))
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;
  use crate::ride::NewRide;

  #[test]
  fn summary_uses_epoch_seconds_and_rounds_distance() {
    let at = Utc.with_ymd_and_hms(2024, 11, 5, 14, 30, 0).unwrap();
    let mut ride = Ride::from_new(NewRide::new(Uuid::new_v4(), Uuid::new_v4()), at);
    ride.pickup_at = Some(at);
    ride.distance_to_voter = Some(1.23456);

    let voter = User {
      user_id:      ride.voter_id,
      name:         "Voter".into(),
      phone_number: Some("919-555-0100".into()),
    };
    let driver = User {
      user_id:      Uuid::new_v4(),
      name:         "Dana Driver".into(),
      phone_number: None,
    };

    let s = RideSummary::new(
      ride.clone(),
      Some(&voter),
      Some(&driver),
      Some("America/New_York".into()),
    );
    assert_eq!(s.id, ride.ride_id);
    assert_eq!(s.pickup_at, Some(at.timestamp()));
    assert_eq!(s.created_at, at.timestamp());
    assert_eq!(s.status_updated_at, at.timestamp());
    assert_eq!(s.distance_to_voter, Some(1.23));
    assert_eq!(s.voter_phone_number.as_deref(), Some("19195550100"));
    assert_eq!(s.driver_name.as_deref(), Some("Dana Driver"));
    assert_eq!(s.time_zone.as_deref(), Some("America/New_York"));
  }

  #[test]
  fn summary_omits_user_ids_and_absent_distance() {
    let ride = Ride::from_new(NewRide::new(Uuid::new_v4(), Uuid::new_v4()), Utc::now());
    let json = serde_json::to_value(RideSummary::new(ride, None, None, None)).unwrap();
    let obj = json.as_object().unwrap();
    assert!(!obj.contains_key("voter_id"));
    assert!(!obj.contains_key("driver_id"));
    assert!(!obj.contains_key("distance_to_voter"));
    assert_eq!(obj["status"], "incomplete_info");
  }
}
