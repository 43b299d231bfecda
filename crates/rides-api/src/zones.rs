//! Handlers for `/zones` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/zones/{id}/rides/waiting` | `?latitude&longitude` required; optional `limit`, `radius` (miles) |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use rides_core::{
  RideService,
  conversation::ConversationGateway,
  geo::LatLng,
  store::{RideStore, UserDirectory},
  summary::RideSummary,
  zone::RideZoneGateway,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

fn default_limit() -> usize { 10 }

fn default_radius() -> f64 { 10.0 }

#[derive(Debug, Deserialize)]
pub struct WaitingParams {
  pub latitude:  f64,
  pub longitude: f64,
  #[serde(default = "default_limit")]
  pub limit:     usize,
  /// Miles. Rides this far away or further are left out.
  #[serde(default = "default_radius")]
  pub radius:    f64,
}

/// `GET /zones/{id}/rides/waiting?latitude=..&longitude=..[&limit=..][&radius=..]`
///
/// Rides waiting for a driver, nearest first, each with its
/// `distance_to_voter`.
pub async fn waiting<S, Z, C>(
  State(service): State<Arc<RideService<S, Z, C>>>,
  Path(zone_id): Path<Uuid>,
  Query(params): Query<WaitingParams>,
) -> Result<Json<Vec<RideSummary>>, ApiError>
where
  S: RideStore + UserDirectory,
  Z: RideZoneGateway,
  C: ConversationGateway,
{
  let point = LatLng::new(params.latitude, params.longitude);
  if !point.is_finite() || !params.radius.is_finite() {
    return Err(ApiError::BadRequest("coordinates and radius must be finite".into()));
  }

  let rides = service
    .waiting_nearby(zone_id, point, params.limit, params.radius)
    .await?;

  let mut summaries = Vec::with_capacity(rides.len());
  for ride in rides {
    summaries.push(service.summarize(ride).await?);
  }
  Ok(Json(summaries))
}
