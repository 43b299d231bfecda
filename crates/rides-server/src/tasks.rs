//! Background tasks spawned alongside the HTTP server.

use std::{sync::Arc, time::Duration};

use rides_core::zone::ZoneEvent;
use tokio::{
  sync::broadcast::{self, error::RecvError},
  task::JoinHandle,
  time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use crate::Service;

// ─── Sweep ───────────────────────────────────────────────────────────────────

/// Sweep scheduled rides every `every`, forever.
///
/// The first sweep runs immediately. A sweep that overruns its slot delays
/// the next one rather than queueing catch-up runs.
pub async fn run_sweeper(service: Arc<Service>, every: Duration) {
  let mut interval = tokio::time::interval(every);
  interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

  loop {
    interval.tick().await;
    let report = service.run_sweep().await;
    debug!(succeeded = report.succeeded, failed = report.failed, "sweep finished");
  }
}

/// Start [`run_sweeper`] unless `interval_secs` is zero.
pub fn spawn_sweeper(service: Arc<Service>, interval_secs: u64) -> Option<JoinHandle<()>> {
  if interval_secs == 0 {
    info!("scheduled ride sweep disabled");
    return None;
  }
  info!(interval_secs, "starting scheduled ride sweep");
  Some(tokio::spawn(run_sweeper(service, Duration::from_secs(interval_secs))))
}

// ─── Zone events ─────────────────────────────────────────────────────────────

/// Log every zone event until the bus closes.
pub async fn log_zone_events(mut rx: broadcast::Receiver<ZoneEvent>) {
  loop {
    match rx.recv().await {
      Ok(event) => {
        let payload = serde_json::to_string(&event.payload).unwrap_or_default();
        info!(zone_id = %event.zone_id, kind = %event.kind, %payload, "zone event");
      }
      Err(RecvError::Lagged(skipped)) => {
        warn!(skipped, "zone event log fell behind");
      }
      Err(RecvError::Closed) => break,
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration as ChronoDuration, Utc};
  use rides_core::{
    RideService,
    geo::LatLng,
    ride::NewRide,
    status::RideStatus,
    store::RideStore,
    zone::ZoneEventBus,
  };
  use rides_store_sqlite::{NewZone, SqliteStore};
  use uuid::Uuid;

  use super::*;

  #[tokio::test]
  async fn zero_interval_disables_sweeper() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let service = Arc::new(RideService::new(store.clone(), store.clone(), store));
    assert!(spawn_sweeper(service, 0).is_none());
  }

  #[tokio::test]
  async fn sweeper_opens_due_rides() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let zone = store
      .add_zone(NewZone {
        name:          "Test".into(),
        center:        LatLng::new(35.0, -80.0),
        pickup_radius: 10.0,
        time_zone:     "America/New_York".into(),
      })
      .await
      .unwrap();
    let voter = store.add_user("Val", None).await.unwrap();
    let service = Arc::new(RideService::new(store.clone(), store.clone(), store.clone()));

    let mut ride = service
      .create(NewRide {
        status: RideStatus::Scheduled,
        pickup_at: Some(Utc::now() + ChronoDuration::hours(2)),
        ..NewRide::new(zone.zone_id, voter.user_id)
      })
      .await
      .unwrap();
    ride.pickup_at = Some(Utc::now() + ChronoDuration::minutes(1));
    assert!(RideStore::update_ride(&store, &ride).await.unwrap());

    let sweeper = tokio::spawn(run_sweeper(service.clone(), Duration::from_millis(10)));
    let opened = tokio::time::timeout(Duration::from_secs(5), async {
      loop {
        if service.get(ride.ride_id).await.unwrap().status == RideStatus::WaitingAssignment {
          break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
      }
    })
    .await;
    sweeper.abort();
    assert!(opened.is_ok(), "ride was never opened for assignment");
  }

  #[tokio::test]
  async fn event_log_stops_when_bus_closes() {
    let bus = ZoneEventBus::new(4);
    let task = tokio::spawn(log_zone_events(bus.subscribe()));
    bus.publish(ZoneEvent::conversation_changed(Uuid::new_v4(), Uuid::new_v4()));
    drop(bus);
    tokio::time::timeout(Duration::from_secs(5), task)
      .await
      .expect("log task should end")
      .unwrap();
  }
}
