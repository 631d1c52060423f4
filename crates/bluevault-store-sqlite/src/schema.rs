//! SQL schema for the BlueVault SQLite store.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per store namespace. `body` is the complete ledger as JSON and is
-- replaced wholesale on every mutation.
CREATE TABLE IF NOT EXISTS state_blobs (
    namespace   TEXT PRIMARY KEY,
    version     INTEGER NOT NULL,
    body        TEXT NOT NULL,
    updated_at  TEXT NOT NULL      -- RFC 3339 UTC
);

PRAGMA user_version = 1;
";
