//! Error types for `bluevault-core`.
//!
//! The first five variants are the approval taxonomy: each tells the reviewer
//! whether a mint did or did not happen.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::submission::SubmissionStatus;

#[derive(Debug, Error)]
pub enum Error {
  /// Missing or malformed caller input. Raised before any side effect.
  #[error("validation error: {0}")]
  Validation(String),

  /// The pinning backend was unreachable or rejected the payload.
  #[error("pinning failed: {0}")]
  Pinning(String),

  /// The chain write did not finish within its bound. The transaction may
  /// still land on-chain.
  #[error("mint timed out after {}s", .0.as_secs())]
  MintTimeout(Duration),

  /// The chain write finished but reported failure or produced output that
  /// could not be understood. `output` is the raw executor output.
  #[error("mint execution failed: {message}")]
  MintExecution { message: String, output: String },

  /// The mint succeeded but the store could not record the approval. Funds
  /// have moved without a recorded evidence link; this needs an operator.
  #[error(
    "state inconsistency: submission {id} was minted in {tx_hash} against \
     evidence {cid} but the approval was not recorded: {detail}"
  )]
  StateInconsistency {
    id:      Uuid,
    cid:     String,
    tx_hash: String,
    detail:  String,
  },

  #[error("submission not found: {0}")]
  NotFound(Uuid),

  #[error("submission {id} is {status}, not pending")]
  NotPending { id: Uuid, status: SubmissionStatus },

  #[error("submission id {0} already exists")]
  DuplicateId(Uuid),

  #[error("a review action on submission {0} is already in flight")]
  ApprovalInFlight(Uuid),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Wrap a backend error from a [`SubmissionStore`](crate::store::SubmissionStore).
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  /// `true` if the error guarantees that no token was minted.
  pub fn is_mint_free(&self) -> bool {
    !matches!(
      self,
      Self::MintTimeout(_) | Self::StateInconsistency { .. }
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
