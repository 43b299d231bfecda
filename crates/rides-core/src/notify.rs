//! Change notifications sent after a ride commits.
//!
//! Bookkeeping is captured before the write ([`Pending::capture`]); the
//! zone bus and the ride's conversation are told afterwards. Delivery is best
//! effort: failures are logged and never undo the committed change.

use tracing::warn;
use uuid::Uuid;

use crate::{
  Error, Result,
  conversation::{ConversationGateway, ConversationStatus},
  pipeline::Followups,
  ride::Ride,
  store::UserDirectory,
  user::User,
  zone::{RideZoneGateway, ZoneEvent},
};

/// State recorded before a write, needed to describe it afterwards.
#[derive(Debug, Clone)]
pub struct Pending {
  pub was_new:    bool,
  /// The driver of record before the change, if it still resolves.
  pub old_driver: Option<User>,
}

impl Pending {
  /// Record whether the ride is new and who drove it before this change.
  pub async fn capture<U: UserDirectory>(
    previous: Option<&Ride>,
    users: &U,
  ) -> Result<Self> {
    let old_driver = match previous.and_then(|p| p.driver_id) {
      Some(id) => users.get_user(id).await.map_err(Error::store)?,
      None => None,
    };
    Ok(Self { was_new: previous.is_none(), old_driver })
  }
}

async fn resolve_driver<U: UserDirectory>(ride: &Ride, users: &U) -> Option<User> {
  let id = ride.driver_id?;
  match users.get_user(id).await {
    Ok(user) => user,
    Err(e) => {
      warn!(ride_id = %ride.ride_id, driver_id = %id, "could not resolve driver: {e}");
      None
    }
  }
}

/// Emit zone events describing a committed change.
///
/// * `conversation_changed` for updates (not inserts) of rides with a
///   conversation.
/// * `driver_changed` for the previous driver if the driver changed.
/// * `driver_changed` for the current driver whenever there is one.
pub async fn announce<U, Z>(pending: &Pending, ride: &Ride, users: &U, zones: &Z)
where
  U: UserDirectory,
  Z: RideZoneGateway,
{
  let zone_id = ride.ride_zone_id;

  if !pending.was_new
    && let Some(conversation_id) = ride.conversation_id
  {
    zones.emit_event(ZoneEvent::conversation_changed(zone_id, conversation_id));
  }

  if let Some(old) = &pending.old_driver
    && Some(old.user_id) != ride.driver_id
  {
    zones.emit_event(ZoneEvent::driver_changed(zone_id, old.clone()));
  }

  if let Some(new) = resolve_driver(ride, users).await {
    zones.emit_event(ZoneEvent::driver_changed(zone_id, new));
  }
}

/// Make the conversation calls owed by a committed change.
pub async fn follow_up<U, C>(followups: Followups, ride: &Ride, users: &U, conversations: &C)
where
  U: UserDirectory,
  C: ConversationGateway,
{
  let Some(conversation_id) = ride.conversation_id else {
    return;
  };

  if followups.notify_voter {
    let driver = resolve_driver(ride, users).await;
    if let Err(e) = conversations
      .notify_voter_of_assignment(conversation_id, driver)
      .await
    {
      log_failure(ride.ride_id, conversation_id, "notify voter of assignment", &e);
    }
  }

  if followups.close_conversation
    && let Err(e) = conversations
      .update_status(conversation_id, ConversationStatus::Closed)
      .await
  {
    log_failure(ride.ride_id, conversation_id, "close conversation", &e);
  }
}

fn log_failure(ride_id: Uuid, conversation_id: Uuid, action: &str, e: &dyn std::error::Error) {
  warn!(%ride_id, %conversation_id, "failed to {action}: {e}");
}
