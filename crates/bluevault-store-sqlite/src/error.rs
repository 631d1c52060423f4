//! Error type for `bluevault-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] bluevault_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// The persisted blob was written by a different schema version.
  #[error("state blob has schema version {found}, expected {expected}")]
  VersionMismatch { found: u32, expected: u32 },

  /// A column of the persisted row holds a value of the wrong type or range.
  #[error("state row is malformed: {0}")]
  Malformed(String),

  /// The persisted blob parsed but breaks the partition invariants.
  #[error("state blob is inconsistent: an id is duplicated or misfiled")]
  Inconsistent,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
