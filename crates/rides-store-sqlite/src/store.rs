//! The SQLite implementation of [`RideStore`] and [`UserDirectory`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, ToSql, types::Value};
use uuid::Uuid;

use rides_core::{
  ride::Ride,
  store::{RideQuery, RideStore, UserDirectory},
  user::User,
  zone::ZoneEventBus,
};

use crate::{
  Result,
  encode::{RIDE_COLUMNS, RideRow, decode_uuid, encode_dt, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Rides, users, ride zones and conversations backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection and event bus are shared.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn:   tokio_rusqlite::Connection,
  pub(crate) events: ZoneEventBus,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn, events: ZoneEventBus::default() })
  }

  /// The bus zone events are published on.
  pub fn events(&self) -> &ZoneEventBus { &self.events }

  /// Register a user (driver or voter).
  pub async fn add_user(
    &self,
    name: impl Into<String>,
    phone_number: Option<String>,
  ) -> Result<User> {
    let user = User { user_id: Uuid::new_v4(), name: name.into(), phone_number };

    let id_str = encode_uuid(user.user_id);
    let name = user.name.clone();
    let phone = user.phone_number.clone();
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, name, phone_number, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, phone, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }
}

/// Named parameters for every `rides` column.
fn ride_params(row: &RideRow) -> [(&'static str, &dyn ToSql); 28] {
  [
    (":ride_id", &row.ride_id),
    (":ride_zone_id", &row.ride_zone_id),
    (":voter_id", &row.voter_id),
    (":driver_id", &row.driver_id),
    (":conversation_id", &row.conversation_id),
    (":name", &row.name),
    (":status", &row.status),
    (":pickup_at", &row.pickup_at),
    (":status_updated_at", &row.status_updated_at),
    (":created_at", &row.created_at),
    (":from_address", &row.from_address),
    (":from_city", &row.from_city),
    (":from_state", &row.from_state),
    (":from_zip", &row.from_zip),
    (":from_latitude", &row.from_latitude),
    (":from_longitude", &row.from_longitude),
    (":to_address", &row.to_address),
    (":to_city", &row.to_city),
    (":to_state", &row.to_state),
    (":to_zip", &row.to_zip),
    (":to_latitude", &row.to_latitude),
    (":to_longitude", &row.to_longitude),
    (":additional_passengers", &row.additional_passengers),
    (":special_requests", &row.special_requests),
    (":description", &row.description),
    (":phone_number", &row.phone_number),
    (":email", &row.email),
    (":lock_version", &row.lock_version),
  ]
}

// ─── RideStore impl ──────────────────────────────────────────────────────────

impl RideStore for SqliteStore {
  type Error = crate::Error;

  async fn insert_ride(&self, ride: &Ride) -> Result<()> {
    let row = RideRow::from_ride(ride);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO rides (
             ride_id, ride_zone_id, voter_id, driver_id, conversation_id, name,
             status, pickup_at, status_updated_at, created_at,
             from_address, from_city, from_state, from_zip,
             from_latitude, from_longitude,
             to_address, to_city, to_state, to_zip, to_latitude, to_longitude,
             additional_passengers, special_requests, description,
             phone_number, email, lock_version
           ) VALUES (
             :ride_id, :ride_zone_id, :voter_id, :driver_id, :conversation_id, :name,
             :status, :pickup_at, :status_updated_at, :created_at,
             :from_address, :from_city, :from_state, :from_zip,
             :from_latitude, :from_longitude,
             :to_address, :to_city, :to_state, :to_zip, :to_latitude, :to_longitude,
             :additional_passengers, :special_requests, :description,
             :phone_number, :email, :lock_version
           )",
          &ride_params(&row)[..],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn update_ride(&self, ride: &Ride) -> Result<bool> {
    let row = RideRow::from_ride(ride);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE rides SET
             ride_zone_id = :ride_zone_id, voter_id = :voter_id,
             driver_id = :driver_id, conversation_id = :conversation_id,
             name = :name, status = :status, pickup_at = :pickup_at,
             status_updated_at = :status_updated_at, created_at = :created_at,
             from_address = :from_address, from_city = :from_city,
             from_state = :from_state, from_zip = :from_zip,
             from_latitude = :from_latitude, from_longitude = :from_longitude,
             to_address = :to_address, to_city = :to_city,
             to_state = :to_state, to_zip = :to_zip,
             to_latitude = :to_latitude, to_longitude = :to_longitude,
             additional_passengers = :additional_passengers,
             special_requests = :special_requests, description = :description,
             phone_number = :phone_number, email = :email,
             lock_version = lock_version + 1
           WHERE ride_id = :ride_id AND lock_version = :lock_version",
          &ride_params(&row)[..],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn get_ride(&self, id: Uuid) -> Result<Option<Ride>> {
    let id_str = encode_uuid(id);

    let raw: Option<RideRow> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {RIDE_COLUMNS} FROM rides WHERE ride_id = ?1"),
              rusqlite::params![id_str],
              RideRow::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RideRow::into_ride).transpose()
  }

  async fn list_rides(&self, query: &RideQuery) -> Result<Vec<Ride>> {
    // Build WHERE clause dynamically.
    let mut conds: Vec<&'static str> = vec![];
    let mut values: Vec<Value> = vec![];
    if let Some(zone_id) = query.zone_id {
      conds.push("ride_zone_id = ?");
      values.push(Value::Text(encode_uuid(zone_id)));
    }
    if let Some(status) = query.status {
      conds.push("status = ?");
      values.push(Value::Text(status.as_ref().to_owned()));
    }
    if let Some(conversation_id) = query.conversation_id {
      conds.push("conversation_id = ?");
      values.push(Value::Text(encode_uuid(conversation_id)));
    }
    if let Some(before) = query.pickup_before {
      conds.push("pickup_at IS NOT NULL AND pickup_at < ?");
      values.push(Value::Text(encode_dt(before)));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    let limit_clause = match query.limit {
      Some(limit) => {
        values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        "LIMIT ?"
      }
      None => "",
    };

    let sql = format!(
      "SELECT {RIDE_COLUMNS} FROM rides {where_clause}
       ORDER BY created_at, ride_id {limit_clause}"
    );

    let raws: Vec<RideRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(values), RideRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RideRow::into_ride).collect()
  }
}

// ─── UserDirectory impl ──────────────────────────────────────────────────────

impl UserDirectory for SqliteStore {
  type Error = crate::Error;

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<(String, String, Option<String>)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, name, phone_number FROM users WHERE user_id = ?1",
              rusqlite::params![id_str],
              |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|(user_id, name, phone_number)| {
        Ok(User { user_id: decode_uuid(&user_id)?, name, phone_number })
      })
      .transpose()
  }
}
