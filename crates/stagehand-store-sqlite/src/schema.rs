//! SQL schema for the Stagehand SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS profiles (
    profile_id        TEXT PRIMARY KEY,
    email             TEXT NOT NULL UNIQUE,   -- trimmed, lowercased
    display_name      TEXT NOT NULL,
    password_hash     TEXT NOT NULL,          -- argon2 PHC string
    active_account_id TEXT,                   -- no FK: accounts reference profiles
    created_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS accounts (
    account_id   TEXT PRIMARY KEY,
    owner_id     TEXT NOT NULL REFERENCES profiles(profile_id),
    kind         TEXT NOT NULL,   -- 'personal' | 'artist' | 'venue' | 'organizer' | 'admin'
    handle       TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL,
    bio          TEXT,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,   -- hex SHA-256 of the bearer token
    profile_id TEXT NOT NULL REFERENCES profiles(profile_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS events (
    event_id     TEXT PRIMARY KEY,
    organizer_id TEXT NOT NULL REFERENCES accounts(account_id),
    venue_id     TEXT REFERENCES accounts(account_id),
    title        TEXT NOT NULL,
    description  TEXT NOT NULL DEFAULT '',
    starts_at    TEXT NOT NULL,
    ends_at      TEXT NOT NULL,
    capacity     INTEGER,
    status       TEXT NOT NULL DEFAULT 'draft',
    created_at   TEXT NOT NULL,
    CHECK (ends_at > starts_at)
);

CREATE TABLE IF NOT EXISTS ticket_tiers (
    tier_id     TEXT PRIMARY KEY,
    event_id    TEXT NOT NULL REFERENCES events(event_id),
    name        TEXT NOT NULL,
    price_cents INTEGER NOT NULL CHECK (price_cents >= 0),
    quantity    INTEGER NOT NULL CHECK (quantity > 0),
    sold        INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    CHECK (sold <= quantity)
);

CREATE TABLE IF NOT EXISTS ticket_orders (
    order_id    TEXT PRIMARY KEY,
    tier_id     TEXT NOT NULL REFERENCES ticket_tiers(tier_id),
    event_id    TEXT NOT NULL REFERENCES events(event_id),
    buyer_id    TEXT NOT NULL REFERENCES accounts(account_id),
    quantity    INTEGER NOT NULL CHECK (quantity > 0),
    total_cents INTEGER NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bookings (
    booking_id   TEXT PRIMARY KEY,
    event_id     TEXT NOT NULL REFERENCES events(event_id),
    organizer_id TEXT NOT NULL REFERENCES accounts(account_id),
    artist_id    TEXT NOT NULL REFERENCES accounts(account_id),
    requested_by TEXT NOT NULL REFERENCES accounts(account_id),
    status       TEXT NOT NULL DEFAULT 'pending',
    fee_cents    INTEGER,
    message      TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

-- At most one open booking per event/artist pair.
CREATE UNIQUE INDEX IF NOT EXISTS bookings_open_idx
    ON bookings(event_id, artist_id)
    WHERE status IN ('pending', 'accepted');

CREATE TABLE IF NOT EXISTS site_maps (
    site_map_id TEXT PRIMARY KEY,
    event_id    TEXT NOT NULL REFERENCES events(event_id),
    name        TEXT NOT NULL,
    width       REAL NOT NULL,
    height      REAL NOT NULL,
    unit        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS measurements (
    measurement_id TEXT PRIMARY KEY,
    site_map_id    TEXT NOT NULL REFERENCES site_maps(site_map_id) ON DELETE CASCADE,
    label          TEXT NOT NULL,
    kind           TEXT NOT NULL,
    points_json    TEXT NOT NULL,   -- JSON array of {x, y}
    unit           TEXT NOT NULL,
    value          REAL NOT NULL,   -- computed on insert
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS compliance_rules (
    rule_id     TEXT PRIMARY KEY,
    site_map_id TEXT NOT NULL REFERENCES site_maps(site_map_id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    kind        TEXT NOT NULL,
    min_value   REAL,
    max_value   REAL,
    unit        TEXT NOT NULL,
    severity    TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS posts (
    post_id    TEXT PRIMARY KEY,
    author_id  TEXT NOT NULL REFERENCES accounts(account_id),
    event_id   TEXT REFERENCES events(event_id),
    body       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS scheduled_posts (
    scheduled_post_id TEXT PRIMARY KEY,
    account_id        TEXT NOT NULL REFERENCES accounts(account_id),
    body              TEXT NOT NULL,
    platforms_json    TEXT NOT NULL,
    scheduled_for     TEXT NOT NULL,
    status            TEXT NOT NULL DEFAULT 'scheduled',
    post_id           TEXT REFERENCES posts(post_id) ON DELETE SET NULL,
    created_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    message_id   TEXT PRIMARY KEY,
    sender_id    TEXT NOT NULL REFERENCES accounts(account_id),
    recipient_id TEXT NOT NULL REFERENCES accounts(account_id),
    body         TEXT NOT NULL,
    sent_at      TEXT NOT NULL,
    read_at      TEXT
);

CREATE TABLE IF NOT EXISTS travel_groups (
    group_id   TEXT PRIMARY KEY,
    event_id   TEXT NOT NULL REFERENCES events(event_id),
    name       TEXT NOT NULL,
    created_by TEXT NOT NULL REFERENCES accounts(account_id),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS travel_members (
    group_id   TEXT NOT NULL REFERENCES travel_groups(group_id) ON DELETE CASCADE,
    account_id TEXT NOT NULL REFERENCES accounts(account_id),
    joined_at  TEXT NOT NULL,
    PRIMARY KEY (group_id, account_id)
);

CREATE TABLE IF NOT EXISTS travel_legs (
    leg_id      TEXT PRIMARY KEY,
    group_id    TEXT NOT NULL REFERENCES travel_groups(group_id) ON DELETE CASCADE,
    kind        TEXT NOT NULL,
    description TEXT NOT NULL,
    departs_at  TEXT NOT NULL,
    arrives_at  TEXT
);

CREATE INDEX IF NOT EXISTS accounts_owner_idx      ON accounts(owner_id);
CREATE INDEX IF NOT EXISTS events_start_idx        ON events(starts_at);
CREATE INDEX IF NOT EXISTS posts_created_idx       ON posts(created_at);
CREATE INDEX IF NOT EXISTS scheduled_due_idx       ON scheduled_posts(status, scheduled_for);
CREATE INDEX IF NOT EXISTS messages_recipient_idx  ON messages(recipient_id);
CREATE INDEX IF NOT EXISTS travel_members_acct_idx ON travel_members(account_id);

PRAGMA user_version = 1;
";
