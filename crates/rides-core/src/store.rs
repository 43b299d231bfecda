//! The `RideStore` and `UserDirectory` traits and supporting query types.
//!
//! The traits are implemented by storage backends (e.g. `rides-store-sqlite`).
//! [`crate::RideService`] depends on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{ride::Ride, status::RideStatus, user::User};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`RideStore::list_rides`]. Empty fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct RideQuery {
  pub zone_id:         Option<Uuid>,
  pub status:          Option<RideStatus>,
  pub conversation_id: Option<Uuid>,
  /// Only rides whose `pickup_at` is strictly earlier than this.
  pub pickup_before:   Option<DateTime<Utc>>,
  pub limit:           Option<usize>,
}

impl RideQuery {
  /// Rides that have finished.
  pub fn completed() -> Self {
    Self { status: Some(RideStatus::Complete), ..Default::default() }
  }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Persistence for rides.
///
/// Results of [`list_rides`](Self::list_rides) are ordered by creation time
/// and then id, so repeated queries over unchanged data agree.
pub trait RideStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a brand-new ride.
  fn insert_ride<'a>(
    &'a self,
    ride: &'a Ride,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Overwrite a ride if the stored `lock_version` still equals
  /// `ride.lock_version`, incrementing it on success.
  ///
  /// Returns `false` without writing when the stored row has moved on.
  fn update_ride<'a>(
    &'a self,
    ride: &'a Ride,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Retrieve a ride by id. Returns `None` if not found.
  fn get_ride(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Ride>, Self::Error>> + Send + '_;

  fn list_rides<'a>(
    &'a self,
    query: &'a RideQuery,
  ) -> impl Future<Output = Result<Vec<Ride>, Self::Error>> + Send + 'a;
}

/// Read access to drivers and voters.
pub trait UserDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Retrieve a user by id. Returns `None` if not found.
  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;
}
