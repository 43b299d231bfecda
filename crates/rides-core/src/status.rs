//! The closed set of ride statuses.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Where a ride is in its lifecycle.
///
/// The graph is not linear: a ride with a driver can drop back to
/// [`WaitingAssignment`](Self::WaitingAssignment) when the driver is cleared,
/// and [`WaitingAcceptance`](Self::WaitingAcceptance) sits beside
/// [`DriverAssigned`](Self::DriverAssigned) rather than before it.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RideStatus {
  /// Required details are still missing.
  #[default]
  IncompleteInfo,
  /// Pickup is in the future and nobody has been assigned.
  Scheduled,
  /// Open for a driver to claim.
  WaitingAssignment,
  DriverAssigned,
  PickedUp,
  Complete,
  /// A driver was proposed and has not yet confirmed.
  WaitingAcceptance,
}

impl RideStatus {
  /// Statuses in which a ride is in flight.
  pub const ACTIVE: [RideStatus; 4] = [
    RideStatus::WaitingAcceptance,
    RideStatus::WaitingAssignment,
    RideStatus::DriverAssigned,
    RideStatus::PickedUp,
  ];

  /// A driver may be matched to the ride.
  pub fn is_assignable(self) -> bool {
    matches!(self, Self::Scheduled | Self::WaitingAssignment)
  }

  pub fn is_active(self) -> bool { Self::ACTIVE.contains(&self) }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn default_is_incomplete_info() {
    assert_eq!(RideStatus::default(), RideStatus::IncompleteInfo);
  }

  #[test]
  fn assignable_statuses() {
    assert!(RideStatus::Scheduled.is_assignable());
    assert!(RideStatus::WaitingAssignment.is_assignable());
    assert!(!RideStatus::DriverAssigned.is_assignable());
    assert!(!RideStatus::WaitingAcceptance.is_assignable());
    assert!(!RideStatus::Complete.is_assignable());
  }

  #[test]
  fn active_statuses() {
    assert!(RideStatus::WaitingAcceptance.is_active());
    assert!(RideStatus::WaitingAssignment.is_active());
    assert!(RideStatus::DriverAssigned.is_active());
    assert!(RideStatus::PickedUp.is_active());
    assert!(!RideStatus::Scheduled.is_active());
    assert!(!RideStatus::Complete.is_active());
    assert!(!RideStatus::IncompleteInfo.is_active());
  }

  #[test]
  fn string_forms_are_snake_case() {
    assert_eq!(RideStatus::WaitingAssignment.as_ref(), "waiting_assignment");
    assert_eq!(RideStatus::PickedUp.to_string(), "picked_up");
    assert_eq!(
      RideStatus::from_str("waiting_acceptance").unwrap(),
      RideStatus::WaitingAcceptance
    );
    assert!(RideStatus::from_str("cancelled").is_err());
  }

  #[test]
  fn serde_matches_strum() {
    let json = serde_json::to_string(&RideStatus::DriverAssigned).unwrap();
    assert_eq!(json, "\"driver_assigned\"");
  }
}
