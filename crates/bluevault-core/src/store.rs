//! The `SubmissionStore` trait.
//!
//! Implemented by storage backends (e.g. `bluevault-store-sqlite`). The
//! lifecycle controller is the only writer; everything else reads snapshots
//! or subscribes to change notifications.

use std::future::Future;

use tokio::sync::watch;
use uuid::Uuid;

use crate::{
  ledger::Ledger,
  submission::{Approval, Submission},
};

/// Abstraction over a persisted, partitioned submission collection.
///
/// Every mutating method is a single atomic transition over the store's
/// [`Ledger`]: concurrent callers are serialised, and the full state is
/// persisted before the call returns.
pub trait SubmissionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert a pending submission at the head of `pending`. Fails if the id is
  /// already present anywhere in the store.
  fn add(
    &self,
    submission: Submission,
  ) -> impl Future<Output = Result<Submission, Self::Error>> + Send + '_;

  /// Move `id` from `pending` to `approvals`. Resolves to `None` without
  /// touching anything when `id` is not pending.
  fn approve(
    &self,
    id: Uuid,
    approval: Approval,
  ) -> impl Future<Output = Result<Option<Submission>, Self::Error>> + Send + '_;

  /// Move `id` from `pending` to `feedback` with a reviewer note. Resolves to
  /// `None` without touching anything when `id` is not pending.
  fn request_more(
    &self,
    id: Uuid,
    note: String,
  ) -> impl Future<Output = Result<Option<Submission>, Self::Error>> + Send + '_;

  /// Retrieve a submission from any partition.
  fn get(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Submission>, Self::Error>> + Send + '_;

  /// A copy of the complete current state.
  fn snapshot(&self) -> impl Future<Output = Result<Ledger, Self::Error>> + Send + '_;

  /// Hand out the next project serial and persist the bumped counter.
  fn allocate_project_serial(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// A receiver whose value is bumped after every committed mutation.
  fn subscribe(&self) -> watch::Receiver<u64>;
}
