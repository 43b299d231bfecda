//! Field-level validation run before every ride is persisted.

use std::{collections::BTreeMap, fmt};

use serde::Serialize;

use crate::{
  Error, Result,
  ride::Ride,
  store::UserDirectory,
  zone::RideZoneGateway,
};

pub const GEOCODE_FAILED: &str = "could not be found";
pub const OUT_OF_RADIUS: &str = "is too far away";
pub const MUST_EXIST: &str = "must exist";
pub const TAKEN: &str = "has already been taken";
pub const NOT_EDITABLE: &str = "cannot be changed directly";

// ─── ValidationErrors ────────────────────────────────────────────────────────

/// Messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, Vec<String>>);

impl ValidationErrors {
  pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
    self.0.entry(field).or_default().push(message.into());
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  /// Messages recorded against `field`.
  pub fn on(&self, field: &str) -> &[String] {
    self.0.get(field).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn into_result(self) -> Result<()> {
    if self.is_empty() { Ok(()) } else { Err(Error::Invalid(self)) }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for (field, messages) in &self.0 {
      for message in messages {
        if !first {
          f.write_str(", ")?;
        }
        write!(f, "{field} {message}")?;
        first = false;
      }
    }
    Ok(())
  }
}

// ─── Lengths ─────────────────────────────────────────────────────────────────

/// Maximum character counts, kept identical to the legacy column limits.
pub const MAX_NAME: usize = 50;
pub const MAX_ADDRESS: usize = 100;
pub const MAX_CITY: usize = 50;
pub const MAX_STATE: usize = 2;
pub const MAX_FROM_ZIP: usize = 50;
pub const MAX_TO_ZIP: usize = 12;
pub const MAX_PHONE: usize = 17;
pub const MAX_EMAIL: usize = 17;

fn check_length(
  errors: &mut ValidationErrors,
  field: &'static str,
  value: Option<&str>,
  max: usize,
) {
  if value.is_some_and(|v| v.chars().count() > max) {
    errors.add(field, format!("is too long (maximum is {max} characters)"));
  }
}

/// Length checks on every bounded string field.
pub fn check_lengths(ride: &Ride, errors: &mut ValidationErrors) {
  let fields: [(&'static str, Option<&str>, usize); 11] = [
    ("name", ride.name.as_deref(), MAX_NAME),
    ("from_address", ride.from.address.as_deref(), MAX_ADDRESS),
    ("from_city", ride.from.city.as_deref(), MAX_CITY),
    ("from_state", ride.from.state.as_deref(), MAX_STATE),
    ("from_zip", ride.from.zip.as_deref(), MAX_FROM_ZIP),
    ("to_address", ride.to.address.as_deref(), MAX_ADDRESS),
    ("to_city", ride.to.city.as_deref(), MAX_CITY),
    ("to_state", ride.to.state.as_deref(), MAX_STATE),
    ("to_zip", ride.to.zip.as_deref(), MAX_TO_ZIP),
    ("phone_number", ride.phone_number.as_deref(), MAX_PHONE),
    ("email", ride.email.as_deref(), MAX_EMAIL),
  ];
  for (field, value, max) in fields {
    check_length(errors, field, value, max);
  }
}

// ─── Full validation ─────────────────────────────────────────────────────────

/// Run every check against `ride`.
///
/// Returns [`Error::Invalid`] with all field errors found. Failures talking
/// to the user directory or the zone are hard errors, not field errors.
pub async fn validate<U, Z>(ride: &Ride, users: &U, zones: &Z) -> Result<()>
where
  U: UserDirectory,
  Z: RideZoneGateway,
{
  let mut errors = ValidationErrors::default();
  check_lengths(ride, &mut errors);

  if users.get_user(ride.voter_id).await.map_err(Error::store)?.is_none() {
    errors.add("voter", MUST_EXIST);
  }

  if ride.from.has_address() {
    match ride.from.point() {
      None => errors.add("from_address", GEOCODE_FAILED),
      Some(point) => {
        let inside = zones
          .is_within_pickup_radius(ride.ride_zone_id, point)
          .await
          .map_err(Error::zone)?;
        if !inside {
          errors.add("from_address", OUT_OF_RADIUS);
        }
      }
    }
  }

  errors.into_result()
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::ride::NewRide;

  fn ride() -> Ride {
    Ride::from_new(NewRide::new(Uuid::new_v4(), Uuid::new_v4()), Utc::now())
  }

  #[test]
  fn lengths_at_the_limit_pass() {
    let mut r = ride();
    r.from.address = Some("a".repeat(MAX_ADDRESS));
    r.from.state = Some("NC".into());
    r.to.zip = Some("1".repeat(MAX_TO_ZIP));
    r.phone_number = Some("5".repeat(MAX_PHONE));

    let mut errors = ValidationErrors::default();
    check_lengths(&r, &mut errors);
    assert!(errors.is_empty(), "{errors}");
  }

  #[test]
  fn lengths_over_the_limit_fail_per_field() {
    let mut r = ride();
    r.from.state = Some("NCX".into());
    r.to.zip = Some("1".repeat(MAX_TO_ZIP + 1));
    r.from.zip = Some("1".repeat(MAX_TO_ZIP + 1));
    r.email = Some("someone@example.org".into());

    let mut errors = ValidationErrors::default();
    check_lengths(&r, &mut errors);
    assert_eq!(errors.on("from_state").len(), 1);
    assert_eq!(errors.on("to_zip").len(), 1);
    assert_eq!(errors.on("email").len(), 1);
    // The pickup zip allows up to 50 characters.
    assert!(errors.on("from_zip").is_empty());
  }

  #[test]
  fn lengths_count_characters_not_bytes() {
    let mut r = ride();
    r.from.state = Some("ÉÉ".into());
    let mut errors = ValidationErrors::default();
    check_lengths(&r, &mut errors);
    assert!(errors.is_empty());
  }

  #[test]
  fn display_joins_field_messages() {
    let mut errors = ValidationErrors::default();
    errors.add("voter", MUST_EXIST);
    errors.add("from_address", OUT_OF_RADIUS);
    assert_eq!(errors.to_string(), "from_address is too far away, voter must exist");
  }

  #[test]
  fn serializes_as_field_map() {
    let mut errors = ValidationErrors::default();
    errors.add("from_address", GEOCODE_FAILED);
    let json = serde_json::to_value(&errors).unwrap();
    assert_eq!(json, serde_json::json!({ "from_address": ["could not be found"] }));
  }
}
