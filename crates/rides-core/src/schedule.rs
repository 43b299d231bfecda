//! The periodic sweep over scheduled rides, and the nearby-ride query.

use chrono::Utc;
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
  Error, Result, RideService,
  conversation::ConversationGateway,
  geo::{self, LatLng},
  pipeline::switch_window,
  ride::Ride,
  status::RideStatus,
  store::{RideQuery, RideStore, UserDirectory},
  zone::RideZoneGateway,
};

/// Outcome counts for one pass of a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
  pub succeeded: usize,
  pub failed:    usize,
}

impl SweepReport {
  fn merge(self, other: SweepReport) -> SweepReport {
    SweepReport {
      succeeded: self.succeeded + other.succeeded,
      failed:    self.failed + other.failed,
    }
  }
}

impl<S, Z, C> RideService<S, Z, C>
where
  S: RideStore + UserDirectory,
  Z: RideZoneGateway,
  C: ConversationGateway,
{
  /// Scheduled rides whose pickup is inside the switch window.
  async fn due_rides(&self) -> Result<Vec<Ride>> {
    let query = RideQuery {
      status: Some(RideStatus::Scheduled),
      pickup_before: Some(Utc::now() + switch_window()),
      ..Default::default()
    };
    RideStore::list_rides(self.store(), &query)
      .await
      .map_err(Error::store)
  }

  /// Ask the voter behind every due scheduled ride to confirm.
  ///
  /// A failure for one ride is logged and counted; the sweep carries on.
  /// Rides without a conversation are skipped. Never fails as a whole: if
  /// the due rides cannot even be listed, that is logged and an empty report
  /// returned.
  pub async fn confirm_scheduled_rides(&self) -> SweepReport {
    let rides = match self.due_rides().await {
      Ok(rides) => rides,
      Err(e) => {
        error!("could not list scheduled rides to confirm: {e}");
        return SweepReport::default();
      }
    };

    let mut report = SweepReport::default();
    for conversation_id in rides.iter().filter_map(|r| r.conversation_id) {
      match self.conversations().attempt_confirmation(conversation_id).await {
        Ok(()) => report.succeeded += 1,
        Err(e) => {
          error!(%conversation_id, "got error trying to confirm conversation: {e}");
          report.failed += 1;
        }
      }
    }

    warn!(
      "attempted to confirm {} scheduled rides ({} errors)",
      report.succeeded, report.failed
    );
    report
  }

  /// Re-save every due scheduled ride so it opens for assignment.
  pub async fn promote_due_rides(&self) -> SweepReport {
    let rides = match self.due_rides().await {
      Ok(rides) => rides,
      Err(e) => {
        error!("could not list scheduled rides to promote: {e}");
        return SweepReport::default();
      }
    };

    let mut report = SweepReport::default();
    for ride in rides {
      let ride_id = ride.ride_id;
      match self
        .refresh(ride_id, |r| r.status == RideStatus::Scheduled)
        .await
      {
        Ok(true) => report.succeeded += 1,
        Ok(false) => {}
        Err(e) => {
          error!(%ride_id, "could not open ride for assignment: {e}");
          report.failed += 1;
        }
      }
    }
    report
  }

  /// One full sweep: confirmations first, then promotions.
  pub async fn run_sweep(&self) -> SweepReport {
    let confirmed = self.confirm_scheduled_rides().await;
    let promoted = self.promote_due_rides().await;
    confirmed.merge(promoted)
  }

  /// Up to `limit` rides in `zone_id` waiting for a driver, nearest first.
  ///
  /// Only rides strictly closer than `radius` miles to `point` qualify. Each
  /// returned ride has `distance_to_voter` set. Rides without a geocoded
  /// pickup are never returned. Exact ties keep creation order.
  pub async fn waiting_nearby(
    &self,
    zone_id: Uuid,
    point: LatLng,
    limit: usize,
    radius: f64,
  ) -> Result<Vec<Ride>> {
    let query = RideQuery {
      zone_id: Some(zone_id),
      status: Some(RideStatus::WaitingAssignment),
      ..Default::default()
    };
    let rides = RideStore::list_rides(self.store(), &query)
      .await
      .map_err(Error::store)?;

    Ok(
      geo::nearest(point, rides, Ride::pickup_point, radius, limit)
        .into_iter()
        .map(|(distance, mut ride)| {
          ride.distance_to_voter = Some(distance);
          ride
        })
        .collect(),
    )
  }
}
