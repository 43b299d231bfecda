//! JSON REST API for the ride lifecycle.
//!
//! Exposes an axum [`Router`] backed by a [`RideService`]. Auth, TLS, and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rides_api::api_router(service.clone()))
//! ```

pub mod conversations;
pub mod error;
pub mod rides;
pub mod zones;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use rides_core::{
  RideService,
  conversation::ConversationGateway,
  store::{RideStore, UserDirectory},
  zone::RideZoneGateway,
};

pub use error::ApiError;

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, Z, C>(service: Arc<RideService<S, Z, C>>) -> Router<()>
where
  S: RideStore + UserDirectory + 'static,
  Z: RideZoneGateway + 'static,
  C: ConversationGateway + 'static,
{
  Router::new()
    // Rides
    .route("/rides/{id}", get(rides::get_one::<S, Z, C>))
    .route("/rides/{id}/assign", post(rides::assign::<S, Z, C>))
    .route("/rides/{id}/reassign", post(rides::reassign::<S, Z, C>))
    .route("/rides/{id}/clear", post(rides::clear::<S, Z, C>))
    .route("/rides/{id}/pickup", post(rides::pickup::<S, Z, C>))
    .route("/rides/{id}/complete", post(rides::complete::<S, Z, C>))
    // Conversations
    .route(
      "/conversations/{id}/ride",
      post(conversations::create_ride::<S, Z, C>),
    )
    // Zones
    .route("/zones/{id}/rides/waiting", get(zones::waiting::<S, Z, C>))
    .with_state(service)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use chrono::{Duration, Utc};
  use rides_core::{
    conversation::ConversationTrip,
    geo::{EARTH_RADIUS_MILES, LatLng},
    ride::{Location, NewRide},
    status::RideStatus,
    user::User,
  };
  use rides_store_sqlite::{NewZone, RideZone, SqliteStore};
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::*;

  type Service = RideService<SqliteStore, SqliteStore, SqliteStore>;

  const CENTER: LatLng = LatLng { latitude: 35.7796, longitude: -78.6382 };

  fn north(miles: f64) -> LatLng {
    LatLng::new(
      CENTER.latitude + (miles / EARTH_RADIUS_MILES).to_degrees(),
      CENTER.longitude,
    )
  }

  struct Harness {
    store:   SqliteStore,
    service: Arc<Service>,
    zone:    RideZone,
    voter:   User,
  }

  impl Harness {
    async fn new() -> Self {
      let store = SqliteStore::open_in_memory().await.unwrap();
      let zone = store
        .add_zone(NewZone {
          name:          "Durham".into(),
          center:        CENTER,
          pickup_radius: 25.0,
          time_zone:     "America/New_York".into(),
        })
        .await
        .unwrap();
      let voter = store
        .add_user("Val", Some("919.555.0199".into()))
        .await
        .unwrap();
      let service = Arc::new(RideService::new(store.clone(), store.clone(), store.clone()));
      Self { store, service, zone, voter }
    }

    async fn waiting_ride(&self, miles: f64) -> Uuid {
      let at = north(miles);
      let input = NewRide {
        status: RideStatus::WaitingAssignment,
        from: Location {
          address: Some("1 Main St".into()),
          latitude: Some(at.latitude),
          longitude: Some(at.longitude),
          ..Default::default()
        },
        ..NewRide::new(self.zone.zone_id, self.voter.user_id)
      };
      self.service.create(input).await.unwrap().ride_id
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> Response {
      let builder = Request::builder().method(method).uri(uri);
      let req = match body {
        Some(body) => builder
          .header(header::CONTENT_TYPE, "application/json")
          .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
      }
      .unwrap();
      api_router(self.service.clone()).oneshot(req).await.unwrap()
    }
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  // ── GET /rides/{id} ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn get_ride_returns_summary() {
    let h = Harness::new().await;
    let id = h.waiting_ride(1.0).await;

    let resp = h.send("GET", &format!("/rides/{id}"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["id"], json!(id));
    assert_eq!(body["status"], "waiting_assignment");
    assert_eq!(body["voter_phone_number"], "19195550199");
    assert_eq!(body["time_zone"], "America/New_York");
    assert!(body.get("voter_id").is_none());
  }

  #[tokio::test]
  async fn get_missing_ride_is_404() {
    let h = Harness::new().await;
    let resp = h.send("GET", &format!("/rides/{}", Uuid::new_v4()), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Assignment ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn assign_then_conflicting_assign_is_409() {
    let h = Harness::new().await;
    let d1 = h.store.add_user("Dee One", None).await.unwrap();
    let d2 = h.store.add_user("Dee Two", None).await.unwrap();
    let id = h.waiting_ride(1.0).await;

    let resp = h
      .send("POST", &format!("/rides/{id}/assign"), Some(json!({ "driver_id": d1.user_id })))
      .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["status"], "driver_assigned");
    assert_eq!(body["driver_name"], "Dee One");

    let resp = h
      .send("POST", &format!("/rides/{id}/assign"), Some(json!({ "driver_id": d2.user_id })))
      .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = h
      .send(
        "POST",
        &format!("/rides/{id}/reassign"),
        Some(json!({ "driver_id": d2.user_id })),
      )
      .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["driver_name"], "Dee Two");
  }

  #[tokio::test]
  async fn assign_with_acceptance_waits() {
    let h = Harness::new().await;
    let d1 = h.store.add_user("Dee", None).await.unwrap();
    let id = h.waiting_ride(1.0).await;

    let resp = h
      .send(
        "POST",
        &format!("/rides/{id}/assign"),
        Some(json!({ "driver_id": d1.user_id, "needs_acceptance": true })),
      )
      .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["status"], "waiting_acceptance");
  }

  #[tokio::test]
  async fn unknown_driver_is_400() {
    let h = Harness::new().await;
    let id = h.waiting_ride(1.0).await;
    let resp = h
      .send(
        "POST",
        &format!("/rides/{id}/assign"),
        Some(json!({ "driver_id": Uuid::new_v4() })),
      )
      .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn driver_progress_and_clearing() {
    let h = Harness::new().await;
    let d1 = h.store.add_user("Dee One", None).await.unwrap();
    let d2 = h.store.add_user("Dee Two", None).await.unwrap();
    let id = h.waiting_ride(1.0).await;
    h.service.assign_driver(id, &d1, false, false).await.unwrap();

    let wrong = Some(json!({ "driver_id": d2.user_id }));
    let right = Some(json!({ "driver_id": d1.user_id }));

    let resp = h.send("POST", &format!("/rides/{id}/clear"), wrong.clone()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let resp = h.send("POST", &format!("/rides/{id}/pickup"), wrong.clone()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = h.send("POST", &format!("/rides/{id}/pickup"), right.clone()).await;
    assert_eq!(json_body(resp).await["status"], "picked_up");
    let resp = h.send("POST", &format!("/rides/{id}/complete"), right).await;
    assert_eq!(json_body(resp).await["status"], "complete");

    let resp = h.send("POST", &format!("/rides/{id}/clear"), Some(json!({}))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["status"], "waiting_assignment");
    assert_eq!(body["driver_name"], Value::Null);
  }

  // ── Conversations ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn ride_from_conversation_is_201_then_invalid_is_422() {
    let h = Harness::new().await;
    let mut trip = ConversationTrip {
      ride_zone_id:          h.zone.zone_id,
      voter_id:              h.voter.user_id,
      username:              Some("val".into()),
      pickup_at:             Some(Utc::now() + Duration::minutes(10)),
      from_address:          Some("2 Main St".into()),
      from_city:             Some("Durham".into()),
      from_latitude:         Some(north(3.0).latitude),
      from_longitude:        Some(north(3.0).longitude),
      to_address:            None,
      to_city:               None,
      to_latitude:           None,
      to_longitude:          None,
      additional_passengers: 0,
      special_requests:      None,
    };
    let conversation_id = h.store.add_conversation(&trip).await.unwrap();

    let resp = h
      .send("POST", &format!("/conversations/{conversation_id}/ride"), None)
      .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["status"], "waiting_assignment");
    assert_eq!(body["conversation_id"], json!(conversation_id));

    trip.from_latitude = None;
    let conversation_id = h.store.add_conversation(&trip).await.unwrap();
    let resp = h
      .send("POST", &format!("/conversations/{conversation_id}/ride"), None)
      .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(resp).await;
    assert_eq!(body["fields"]["from_address"], json!(["could not be found"]));
  }

  #[tokio::test]
  async fn missing_conversation_is_404() {
    let h = Harness::new().await;
    let resp = h
      .send("POST", &format!("/conversations/{}/ride", Uuid::new_v4()), None)
      .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Zones ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn waiting_rides_are_nearest_first_with_distance() {
    let h = Harness::new().await;
    h.waiting_ride(6.0).await;
    let one = h.waiting_ride(1.0).await;
    let four = h.waiting_ride(4.0).await;

    let uri = format!(
      "/zones/{}/rides/waiting?latitude={}&longitude={}&limit=2&radius=5",
      h.zone.zone_id, CENTER.latitude, CENTER.longitude
    );
    let resp = h.send("GET", &uri, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    let rides = body.as_array().unwrap();
    assert_eq!(rides.len(), 2);
    assert_eq!(rides[0]["id"], json!(one));
    assert_eq!(rides[0]["distance_to_voter"], json!(1.0));
    assert_eq!(rides[1]["id"], json!(four));
    assert_eq!(rides[1]["distance_to_voter"], json!(4.0));
  }

  #[tokio::test]
  async fn waiting_rides_require_coordinates() {
    let h = Harness::new().await;
    let uri = format!("/zones/{}/rides/waiting?limit=2", h.zone.zone_id);
    let resp = h.send("GET", &uri, None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }
}
