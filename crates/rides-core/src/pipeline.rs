//! Derived-field updates applied to a ride just before it is written.
//!
//! Runs after validation and before the store write. It mutates the ride in
//! place and reports which conversation calls the change calls for; those are
//! made once the write has committed.

use chrono::{DateTime, Duration, Utc};

use crate::{ride::Ride, status::RideStatus};

/// Minutes before pickup at which a scheduled ride opens for assignment.
pub const SWITCH_TO_WAITING_ASSIGNMENT: i64 = 15;

pub fn switch_window() -> Duration {
  Duration::minutes(SWITCH_TO_WAITING_ASSIGNMENT)
}

/// Conversation follow-ups owed by a committed change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Followups {
  /// Tell the voter about the (possibly removed) driver.
  pub notify_voter:       bool,
  /// The ride just completed; close its conversation.
  pub close_conversation: bool,
}

/// Apply derived-field updates to `ride`. `previous` is the stored version,
/// or `None` for a ride that has never been written.
pub fn derive(ride: &mut Ride, previous: Option<&Ride>, now: DateTime<Utc>) -> Followups {
  if ride.status == RideStatus::Scheduled
    && ride.pickup_at.is_some_and(|at| at < now + switch_window())
  {
    ride.status = RideStatus::WaitingAssignment;
  }

  let status_changed = previous.is_none_or(|p| p.status != ride.status);
  if status_changed {
    ride.status_updated_at = now;
  }

  let became = |status: RideStatus| status_changed && ride.status == status;
  let driver_changed = match previous {
    Some(p) => p.driver_id != ride.driver_id,
    None => ride.driver_id.is_some(),
  };

  Followups {
    notify_voter:       became(RideStatus::DriverAssigned) || driver_changed,
    close_conversation: became(RideStatus::Complete),
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;
  use crate::ride::NewRide;

  fn stored(status: RideStatus, at: DateTime<Utc>) -> Ride {
    let mut r = Ride::from_new(NewRide::new(Uuid::new_v4(), Uuid::new_v4()), at);
    r.status = status;
    r
  }

  #[test]
  fn scheduled_ride_close_to_pickup_opens_for_assignment() {
    let now = Utc::now();
    let mut r = stored(RideStatus::Scheduled, now);
    r.pickup_at = Some(now + Duration::minutes(10));

    derive(&mut r, None, now);
    assert_eq!(r.status, RideStatus::WaitingAssignment);
  }

  #[test]
  fn scheduled_ride_far_from_pickup_stays_scheduled() {
    let now = Utc::now();
    let mut r = stored(RideStatus::Scheduled, now);
    r.pickup_at = Some(now + Duration::minutes(16));

    derive(&mut r, None, now);
    assert_eq!(r.status, RideStatus::Scheduled);
  }

  #[test]
  fn scheduled_ride_without_pickup_time_stays_scheduled() {
    let now = Utc::now();
    let mut r = stored(RideStatus::Scheduled, now);
    derive(&mut r, None, now);
    assert_eq!(r.status, RideStatus::Scheduled);
  }

  #[test]
  fn status_timestamp_only_moves_on_change() {
    let then = Utc::now() - Duration::hours(1);
    let now = Utc::now();
    let previous = stored(RideStatus::WaitingAssignment, then);

    let mut same = previous.clone();
    derive(&mut same, Some(&previous), now);
    assert_eq!(same.status_updated_at, then);

    let mut changed = previous.clone();
    changed.status = RideStatus::DriverAssigned;
    derive(&mut changed, Some(&previous), now);
    assert_eq!(changed.status_updated_at, now);
  }

  #[test]
  fn promotion_counts_as_status_change() {
    let then = Utc::now() - Duration::hours(1);
    let now = Utc::now();
    let mut previous = stored(RideStatus::Scheduled, then);
    previous.pickup_at = Some(now + Duration::minutes(5));

    let mut r = previous.clone();
    derive(&mut r, Some(&previous), now);
    assert_eq!(r.status, RideStatus::WaitingAssignment);
    assert_eq!(r.status_updated_at, now);
  }

  #[test]
  fn assignment_notifies_voter() {
    let now = Utc::now();
    let previous = stored(RideStatus::WaitingAssignment, now);
    let mut r = previous.clone();
    r.driver_id = Some(Uuid::new_v4());
    r.status = RideStatus::DriverAssigned;

    let f = derive(&mut r, Some(&previous), now);
    assert!(f.notify_voter);
    assert!(!f.close_conversation);
  }

  #[test]
  fn clearing_driver_notifies_voter() {
    let now = Utc::now();
    let mut previous = stored(RideStatus::DriverAssigned, now);
    previous.driver_id = Some(Uuid::new_v4());
    let mut r = previous.clone();
    r.driver_id = None;
    r.status = RideStatus::WaitingAssignment;

    assert!(derive(&mut r, Some(&previous), now).notify_voter);
  }

  #[test]
  fn pickup_by_same_driver_does_not_notify() {
    let now = Utc::now();
    let mut previous = stored(RideStatus::DriverAssigned, now);
    previous.driver_id = Some(Uuid::new_v4());
    let mut r = previous.clone();
    r.status = RideStatus::PickedUp;

    let f = derive(&mut r, Some(&previous), now);
    assert_eq!(f, Followups::default());
  }

  #[test]
  fn completion_closes_conversation_once() {
    let now = Utc::now();
    let mut previous = stored(RideStatus::PickedUp, now);
    previous.driver_id = Some(Uuid::new_v4());

    let mut r = previous.clone();
    r.status = RideStatus::Complete;
    assert!(derive(&mut r, Some(&previous), now).close_conversation);

    let mut again = r.clone();
    assert!(!derive(&mut again, Some(&r), now).close_conversation);
  }
}
