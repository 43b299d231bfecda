//! Handlers for `/conversations` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/conversations/{id}/ride` | Create the conversation's ride; returns 201 + summary |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rides_core::{
  RideService,
  conversation::ConversationGateway,
  store::{RideStore, UserDirectory},
  zone::RideZoneGateway,
};
use uuid::Uuid;

use crate::error::ApiError;

/// `POST /conversations/{id}/ride`
pub async fn create_ride<S, Z, C>(
  State(service): State<Arc<RideService<S, Z, C>>>,
  Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RideStore + UserDirectory,
  Z: RideZoneGateway,
  C: ConversationGateway,
{
  let ride = service.create_from_conversation(conversation_id).await?;
  let summary = service.summarize(ride).await?;
  Ok((StatusCode::CREATED, Json(summary)))
}
