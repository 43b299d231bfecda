//! SQL schema for the rides SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS ride_zones (
    zone_id       TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    latitude      REAL NOT NULL,
    longitude     REAL NOT NULL,
    pickup_radius REAL NOT NULL,   -- miles
    time_zone     TEXT NOT NULL    -- IANA identifier
);

CREATE TABLE IF NOT EXISTS users (
    user_id      TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    phone_number TEXT,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS conversations (
    conversation_id       TEXT PRIMARY KEY,
    ride_zone_id          TEXT NOT NULL REFERENCES ride_zones(zone_id),
    voter_id              TEXT NOT NULL REFERENCES users(user_id),
    status                TEXT NOT NULL DEFAULT 'in_progress',
    username              TEXT,
    pickup_at             TEXT,
    from_address          TEXT,
    from_city             TEXT,
    from_latitude         REAL,
    from_longitude        REAL,
    to_address            TEXT,
    to_city               TEXT,
    to_latitude           REAL,
    to_longitude          REAL,
    additional_passengers INTEGER NOT NULL DEFAULT 0,
    special_requests      TEXT,
    created_at            TEXT NOT NULL
);

-- Calls received from the ride lifecycle, for the messaging service to send.
-- Append-only.
CREATE TABLE IF NOT EXISTS conversation_messages (
    message_id      TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL REFERENCES conversations(conversation_id),
    kind            TEXT NOT NULL,   -- 'driver_assigned' | 'driver_cleared' | 'confirmation_request'
    driver_id       TEXT REFERENCES users(user_id),
    recorded_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rides (
    ride_id               TEXT PRIMARY KEY,
    ride_zone_id          TEXT NOT NULL REFERENCES ride_zones(zone_id),
    voter_id              TEXT NOT NULL REFERENCES users(user_id),
    driver_id             TEXT REFERENCES users(user_id),
    conversation_id       TEXT UNIQUE REFERENCES conversations(conversation_id),
    name                  TEXT,
    status                TEXT NOT NULL,
    pickup_at             TEXT,
    status_updated_at     TEXT NOT NULL,
    created_at            TEXT NOT NULL,
    from_address          TEXT,
    from_city             TEXT,
    from_state            TEXT,
    from_zip              TEXT,
    from_latitude         REAL,
    from_longitude        REAL,
    to_address            TEXT,
    to_city               TEXT,
    to_state              TEXT,
    to_zip                TEXT,
    to_latitude           REAL,
    to_longitude          REAL,
    additional_passengers INTEGER NOT NULL DEFAULT 0,
    special_requests      TEXT,
    description           TEXT,
    phone_number          TEXT,
    email                 TEXT,
    lock_version          INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS rides_zone_status_idx ON rides(ride_zone_id, status);
CREATE INDEX IF NOT EXISTS rides_status_pickup_idx ON rides(status, pickup_at);
CREATE INDEX IF NOT EXISTS messages_conversation_idx
    ON conversation_messages(conversation_id);

PRAGMA user_version = 1;
";
