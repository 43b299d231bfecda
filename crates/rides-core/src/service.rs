//! Every way a ride is created or changed, through [`RideService`].
//!
//! Each write goes through the same ordered steps:
//!
//! 1. validation (field lengths, voter, geocode and pickup radius)
//! 2. derived fields ([`crate::pipeline::derive`])
//! 3. driver bookkeeping ([`Pending::capture`])
//! 4. the store write, the commit point
//! 5. conversation follow-ups and zone events, after any ride lock is released
//!
//! Driver and status changes additionally run under the ride's lock and act on
//! a fresh copy read from the store, never on the caller's copy.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  conversation::{ConversationGateway, ConversationStatus},
  lock::RideLocks,
  notify::{self, Pending},
  pipeline::{self, Followups},
  ride::{NewRide, Ride},
  status::RideStatus,
  store::{RideQuery, RideStore, UserDirectory},
  user::User,
  validate::{NOT_EDITABLE, TAKEN, ValidationErrors, validate},
  zone::RideZoneGateway,
};

/// Times a locked operation re-reads and retries after losing a write race to
/// another process.
const MAX_ATTEMPTS: usize = 3;

/// A change that reached the store, awaiting its notifications.
struct Committed {
  ride:      Ride,
  pending:   Pending,
  followups: Followups,
}

pub struct RideService<S, Z, C> {
  store:         S,
  zones:         Z,
  conversations: C,
  locks:         RideLocks,
}

impl<S, Z, C> RideService<S, Z, C>
where
  S: RideStore + UserDirectory,
  Z: RideZoneGateway,
  C: ConversationGateway,
{
  pub fn new(store: S, zones: Z, conversations: C) -> Self {
    Self { store, zones, conversations, locks: RideLocks::new() }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn zones(&self) -> &Z { &self.zones }

  pub fn conversations(&self) -> &C { &self.conversations }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// Retrieve a ride by id. Returns `None` if not found.
  pub async fn find(&self, ride_id: Uuid) -> Result<Option<Ride>> {
    RideStore::get_ride(&self.store, ride_id).await.map_err(Error::store)
  }

  pub async fn get(&self, ride_id: Uuid) -> Result<Ride> {
    self.find(ride_id).await?.ok_or(Error::RideNotFound(ride_id))
  }

  // ── Creation ──────────────────────────────────────────────────────────────

  /// Validate and persist a new ride.
  pub async fn create(&self, input: NewRide) -> Result<Ride> {
    let mut ride = Ride::from_new(input, Utc::now());
    let committed = self.commit(&mut ride, None).await?;
    self.after_commit(&committed).await;
    info!(ride_id = %ride.ride_id, status = %ride.status, "ride created");
    Ok(committed.ride)
  }

  /// Create a `scheduled` ride from the trip details a conversation gathered,
  /// then mark the conversation `ride_created`.
  pub async fn create_from_conversation(&self, conversation_id: Uuid) -> Result<Ride> {
    let trip = self
      .conversations
      .trip(conversation_id)
      .await
      .map_err(Error::conversation)?
      .ok_or(Error::ConversationNotFound(conversation_id))?;

    let query = RideQuery {
      conversation_id: Some(conversation_id),
      limit: Some(1),
      ..Default::default()
    };
    let existing = RideStore::list_rides(&self.store, &query)
      .await
      .map_err(Error::store)?;
    if !existing.is_empty() {
      let mut errors = ValidationErrors::default();
      errors.add("conversation", TAKEN);
      return Err(Error::Invalid(errors));
    }

    let ride = self
      .create(NewRide::from_conversation(conversation_id, trip))
      .await?;

    self
      .conversations
      .update_status(conversation_id, ConversationStatus::RideCreated)
      .await
      .map_err(Error::conversation)?;

    Ok(ride)
  }

  // ── Updates ───────────────────────────────────────────────────────────────

  /// Persist caller-side edits to an existing ride.
  ///
  /// `ride` must carry the `lock_version` it was read with; if the stored
  /// ride has changed since, this fails with [`Error::Conflict`].
  ///
  /// `status` and `driver_id` only move through the driver operations below;
  /// a copy that changes either is rejected with [`Error::Invalid`].
  pub async fn save(&self, mut ride: Ride) -> Result<Ride> {
    let guard = self.locks.acquire(ride.ride_id).await;
    let previous = self.get(ride.ride_id).await?;
    if previous.lock_version != ride.lock_version {
      return Err(Error::Conflict(ride.ride_id));
    }

    let mut errors = ValidationErrors::default();
    if ride.status != previous.status {
      errors.add("status", NOT_EDITABLE);
    }
    if ride.driver_id != previous.driver_id {
      errors.add("driver_id", NOT_EDITABLE);
    }
    errors.into_result()?;

    let committed = self.commit(&mut ride, Some(&previous)).await?;
    drop(guard);
    self.after_commit(&committed).await;
    Ok(committed.ride)
  }

  /// Re-save a ride unchanged so its derived fields are brought up to date.
  /// Returns `false` if `still` rejects the current copy.
  pub(crate) async fn refresh<F>(&self, ride_id: Uuid, still: F) -> Result<bool>
  where
    F: Fn(&Ride) -> bool + Send + Sync,
  {
    self.mutate(ride_id, |ride| still(ride)).await
  }

  // ── Driver lifecycle ──────────────────────────────────────────────────────

  /// Give the ride to `driver`.
  ///
  /// Declines (`Ok(false)`, nothing written) if another driver already holds
  /// the ride and `allow_reassign` is off. Otherwise the ride moves to
  /// `waiting_acceptance` or `driver_assigned` depending on
  /// `needs_acceptance`.
  pub async fn assign_driver(
    &self,
    ride_id: Uuid,
    driver: &User,
    allow_reassign: bool,
    needs_acceptance: bool,
  ) -> Result<bool> {
    let driver_id = driver.user_id;
    let assigned = self
      .mutate(ride_id, |ride| {
        if !allow_reassign && ride.driver_id.is_some_and(|d| d != driver_id) {
          return false;
        }
        ride.driver_id = Some(driver_id);
        ride.status = if needs_acceptance {
          RideStatus::WaitingAcceptance
        } else {
          RideStatus::DriverAssigned
        };
        true
      })
      .await?;

    if assigned {
      info!(%ride_id, %driver_id, allow_reassign, needs_acceptance, "driver assigned");
    } else {
      debug!(%ride_id, %driver_id, "assignment declined: ride has another driver");
    }
    Ok(assigned)
  }

  /// [`assign_driver`](Self::assign_driver) that overrides any current driver.
  pub async fn reassign_driver(&self, ride_id: Uuid, driver: &User) -> Result<bool> {
    self.assign_driver(ride_id, driver, true, false).await
  }

  /// Remove the driver and reopen the ride for assignment.
  ///
  /// With `driver` given, declines unless that user is the driver of record.
  pub async fn clear_driver(&self, ride_id: Uuid, driver: Option<&User>) -> Result<bool> {
    let expected = driver.map(|d| d.user_id);
    let cleared = self
      .mutate(ride_id, |ride| {
        if let Some(id) = expected
          && !ride.is_driven_by(id)
        {
          return false;
        }
        ride.driver_id = None;
        ride.status = RideStatus::WaitingAssignment;
        true
      })
      .await?;

    if cleared {
      info!(%ride_id, "driver cleared");
    }
    Ok(cleared)
  }

  /// Mark the passenger collected. Only the driver of record may do this.
  pub async fn pickup_by(&self, ride_id: Uuid, driver: &User) -> Result<bool> {
    self
      .driver_transition(ride_id, driver, RideStatus::PickedUp)
      .await
  }

  /// Mark the ride finished. Only the driver of record may do this.
  pub async fn complete_by(&self, ride_id: Uuid, driver: &User) -> Result<bool> {
    self
      .driver_transition(ride_id, driver, RideStatus::Complete)
      .await
  }

  async fn driver_transition(
    &self,
    ride_id: Uuid,
    driver: &User,
    status: RideStatus,
  ) -> Result<bool> {
    let driver_id = driver.user_id;
    let moved = self
      .mutate(ride_id, |ride| {
        if !ride.is_driven_by(driver_id) {
          return false;
        }
        ride.status = status;
        true
      })
      .await?;

    if moved {
      info!(%ride_id, %driver_id, %status, "ride status changed by driver");
    } else {
      debug!(%ride_id, %driver_id, %status, "declined: not the driver of record");
    }
    Ok(moved)
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  /// Lock the ride, reload it, let `decide` change it, and commit.
  ///
  /// `decide` returning `false` declines the operation with nothing written.
  /// If another process commits between our read and write, the whole
  /// read-decide-write cycle is repeated on the newer copy.
  async fn mutate<F>(&self, ride_id: Uuid, decide: F) -> Result<bool>
  where
    F: Fn(&mut Ride) -> bool + Send + Sync,
  {
    for attempt in 1..=MAX_ATTEMPTS {
      let guard = self.locks.acquire(ride_id).await;
      let previous = self.get(ride_id).await?;

      let mut ride = previous.clone();
      if !decide(&mut ride) {
        return Ok(false);
      }

      match self.commit(&mut ride, Some(&previous)).await {
        Ok(committed) => {
          drop(guard);
          self.after_commit(&committed).await;
          return Ok(true);
        }
        Err(Error::Conflict(_)) => {
          warn!(%ride_id, attempt, "ride changed underneath us, retrying");
        }
        Err(e) => return Err(e),
      }
    }
    Err(Error::Conflict(ride_id))
  }

  /// Validate, derive, capture bookkeeping and write. `previous` is `None`
  /// for an insert. A lost optimistic race surfaces as [`Error::Conflict`].
  async fn commit(&self, ride: &mut Ride, previous: Option<&Ride>) -> Result<Committed> {
    validate(ride, &self.store, &self.zones).await?;
    let followups = pipeline::derive(ride, previous, Utc::now());
    let pending = Pending::capture(previous, &self.store).await?;

    match previous {
      None => RideStore::insert_ride(&self.store, ride)
        .await
        .map_err(Error::store)?,
      Some(_) => {
        let written = RideStore::update_ride(&self.store, ride)
          .await
          .map_err(Error::store)?;
        if !written {
          return Err(Error::Conflict(ride.ride_id));
        }
        ride.lock_version += 1;
      }
    }

    Ok(Committed { ride: ride.clone(), pending, followups })
  }

  async fn after_commit(&self, committed: &Committed) {
    notify::follow_up(
      committed.followups,
      &committed.ride,
      &self.store,
      &self.conversations,
    )
    .await;
    notify::announce(&committed.pending, &committed.ride, &self.store, &self.zones)
      .await;
  }
}
