//! SQL schema for the fieldsync cache.
//!
//! Applied once per database file: [`SCHEMA`] ends by bumping
//! `PRAGMA user_version`, and the store only runs it while that is still 0.
//! [`CONNECTION_PRAGMAS`] are per-connection and run on every open.

/// Version written by [`SCHEMA`].
pub const SCHEMA_VERSION: i64 = 1;

/// Settings SQLite does not persist in the file.
pub const CONNECTION_PRAGMAS: &str = "
PRAGMA foreign_keys = ON;
";

/// Full schema DDL.
pub const SCHEMA: &str = "
BEGIN;

-- `current_update_set` is the single per-scope pointer that decides which
-- update set reads as current.
CREATE TABLE IF NOT EXISTS scopes (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    remote_id          TEXT    NOT NULL UNIQUE,
    name               TEXT    NOT NULL,
    current_update_set INTEGER REFERENCES update_sets(id)
);

CREATE TABLE IF NOT EXISTS remote_tables (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    remote_id TEXT    NOT NULL,
    name      TEXT    NOT NULL UNIQUE,
    scope_id  INTEGER NOT NULL REFERENCES scopes(id)
);

CREATE TABLE IF NOT EXISTS entries (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    remote_id     TEXT    NOT NULL,
    unique_key    TEXT    NOT NULL CHECK (unique_key <> ''),
    table_id      INTEGER NOT NULL REFERENCES remote_tables(id),
    scope_id      INTEGER NOT NULL REFERENCES scopes(id),
    last_modified TEXT    NOT NULL,   -- RFC 3339 UTC
    UNIQUE (remote_id, table_id, scope_id)
);

CREATE TABLE IF NOT EXISTS update_sets (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    remote_id TEXT    NOT NULL UNIQUE,
    name      TEXT    NOT NULL,
    scope_id  INTEGER NOT NULL REFERENCES scopes(id)
);

-- scopes.remote_id and update_sets.remote_id are indexed by their UNIQUE
-- constraints.
CREATE INDEX IF NOT EXISTS remote_tables_remote_id_idx ON remote_tables(remote_id);
CREATE INDEX IF NOT EXISTS entries_remote_id_idx       ON entries(remote_id);
CREATE INDEX IF NOT EXISTS scopes_name_idx             ON scopes(name);
CREATE INDEX IF NOT EXISTS update_sets_scope_idx       ON update_sets(scope_id);

PRAGMA user_version = 1;

COMMIT;
";
