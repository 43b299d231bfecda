//! Handlers for `/rides` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/rides/{id}` | Ride summary; 404 if not found |
//! | `POST` | `/rides/{id}/assign` | Body: [`AssignBody`] |
//! | `POST` | `/rides/{id}/reassign` | Body: `{"driver_id":"..."}` |
//! | `POST` | `/rides/{id}/clear` | Body: `{"driver_id":"..."}`, driver optional |
//! | `POST` | `/rides/{id}/pickup` | Body: `{"driver_id":"..."}` |
//! | `POST` | `/rides/{id}/complete` | Body: `{"driver_id":"..."}` |
//!
//! Every transition answers with the updated summary, or `409` when the
//! ride's current driver rules it out.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use rides_core::{
  RideService,
  conversation::ConversationGateway,
  store::{RideStore, UserDirectory},
  summary::RideSummary,
  user::User,
  zone::RideZoneGateway,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Helpers ──────────────────────────────────────────────────────────────────

async fn driver<S, Z, C>(
  service: &RideService<S, Z, C>,
  driver_id: Uuid,
) -> Result<User, ApiError>
where
  S: RideStore + UserDirectory,
  Z: RideZoneGateway,
  C: ConversationGateway,
{
  UserDirectory::get_user(service.store(), driver_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::BadRequest(format!("driver {driver_id} not found")))
}

async fn summary<S, Z, C>(
  service: &RideService<S, Z, C>,
  ride_id: Uuid,
) -> Result<Json<RideSummary>, ApiError>
where
  S: RideStore + UserDirectory,
  Z: RideZoneGateway,
  C: ConversationGateway,
{
  let ride = service.get(ride_id).await?;
  Ok(Json(service.summarize(ride).await?))
}

/// Summary of the changed ride, or `409` with `reason` if it was declined.
async fn outcome<S, Z, C>(
  service: &RideService<S, Z, C>,
  ride_id: Uuid,
  applied: bool,
  reason: &str,
) -> Result<Json<RideSummary>, ApiError>
where
  S: RideStore + UserDirectory,
  Z: RideZoneGateway,
  C: ConversationGateway,
{
  if !applied {
    return Err(ApiError::Declined(format!("ride {ride_id}: {reason}")));
  }
  summary(service, ride_id).await
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /rides/{id}`
pub async fn get_one<S, Z, C>(
  State(service): State<Arc<RideService<S, Z, C>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<RideSummary>, ApiError>
where
  S: RideStore + UserDirectory,
  Z: RideZoneGateway,
  C: ConversationGateway,
{
  summary(&service, id).await
}

// ─── Assignment ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AssignBody {
  pub driver_id:        Uuid,
  /// Take the ride even if another driver holds it. Default `false`.
  #[serde(default)]
  pub allow_reassign:   bool,
  /// Leave the ride `waiting_acceptance` instead of `driver_assigned`.
  #[serde(default)]
  pub needs_acceptance: bool,
}

/// `POST /rides/{id}/assign`
pub async fn assign<S, Z, C>(
  State(service): State<Arc<RideService<S, Z, C>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AssignBody>,
) -> Result<Json<RideSummary>, ApiError>
where
  S: RideStore + UserDirectory,
  Z: RideZoneGateway,
  C: ConversationGateway,
{
  let driver = driver(&service, body.driver_id).await?;
  let applied = service
    .assign_driver(id, &driver, body.allow_reassign, body.needs_acceptance)
    .await?;
  outcome(&service, id, applied, "already assigned to another driver").await
}

#[derive(Debug, Deserialize)]
pub struct DriverBody {
  pub driver_id: Uuid,
}

/// `POST /rides/{id}/reassign`
pub async fn reassign<S, Z, C>(
  State(service): State<Arc<RideService<S, Z, C>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<DriverBody>,
) -> Result<Json<RideSummary>, ApiError>
where
  S: RideStore + UserDirectory,
  Z: RideZoneGateway,
  C: ConversationGateway,
{
  let driver = driver(&service, body.driver_id).await?;
  let applied = service.reassign_driver(id, &driver).await?;
  outcome(&service, id, applied, "reassignment declined").await
}

#[derive(Debug, Default, Deserialize)]
pub struct ClearBody {
  /// If given, only clear when this is the driver of record.
  pub driver_id: Option<Uuid>,
}

/// `POST /rides/{id}/clear`
pub async fn clear<S, Z, C>(
  State(service): State<Arc<RideService<S, Z, C>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ClearBody>,
) -> Result<Json<RideSummary>, ApiError>
where
  S: RideStore + UserDirectory,
  Z: RideZoneGateway,
  C: ConversationGateway,
{
  let expected = match body.driver_id {
    Some(driver_id) => Some(driver(&service, driver_id).await?),
    None => None,
  };
  let applied = service.clear_driver(id, expected.as_ref()).await?;
  outcome(&service, id, applied, "not the driver of record").await
}

// ─── Driver progress ──────────────────────────────────────────────────────────

/// `POST /rides/{id}/pickup`
pub async fn pickup<S, Z, C>(
  State(service): State<Arc<RideService<S, Z, C>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<DriverBody>,
) -> Result<Json<RideSummary>, ApiError>
where
  S: RideStore + UserDirectory,
  Z: RideZoneGateway,
  C: ConversationGateway,
{
  let driver = driver(&service, body.driver_id).await?;
  let applied = service.pickup_by(id, &driver).await?;
  outcome(&service, id, applied, "not the driver of record").await
}

/// `POST /rides/{id}/complete`
pub async fn complete<S, Z, C>(
  State(service): State<Arc<RideService<S, Z, C>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<DriverBody>,
) -> Result<Json<RideSummary>, ApiError>
where
  S: RideStore + UserDirectory,
  Z: RideZoneGateway,
  C: ConversationGateway,
{
  let driver = driver(&service, body.driver_id).await?;
  let applied = service.complete_by(id, &driver).await?;
  outcome(&service, id, applied, "not the driver of record").await
}
