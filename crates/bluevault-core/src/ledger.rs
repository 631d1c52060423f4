//! The partitioned submission ledger.
//!
//! A [`Ledger`] is the complete state of a submission store: three ordered
//! partitions plus the project serial counter. Every store backend wraps one
//! behind a lock and persists it as a single blob after each mutation. The
//! transition methods here are synchronous and total; they never leave the
//! ledger half-updated.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::{
  Error, Result,
  submission::{Approval, Submission, SubmissionState, SubmissionStatus},
};

/// Version stamped on every persisted ledger blob.
pub const SCHEMA_VERSION: u32 = 1;

/// The first serial handed out for blank project ids.
pub const FIRST_PROJECT_SERIAL: u64 = 1;

/// Which partition a submission currently lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
  Pending,
  Approvals,
  Feedback,
}

impl Partition {
  /// The status every member of this partition must carry.
  pub fn status(self) -> SubmissionStatus {
    match self {
      Self::Pending => SubmissionStatus::Pending,
      Self::Approvals => SubmissionStatus::Approved,
      Self::Feedback => SubmissionStatus::NeedsData,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
  /// Most recent first.
  pending:             Vec<Submission>,
  /// In approval order.
  approvals:           Vec<Submission>,
  /// Most recently returned first.
  feedback:            Vec<Submission>,
  #[serde(default = "first_serial")]
  next_project_serial: u64,
}

fn first_serial() -> u64 { FIRST_PROJECT_SERIAL }

impl Default for Ledger {
  fn default() -> Self {
    Self {
      pending:             Vec::new(),
      approvals:           Vec::new(),
      feedback:            Vec::new(),
      next_project_serial: FIRST_PROJECT_SERIAL,
    }
  }
}

impl Ledger {
  pub fn new() -> Self { Self::default() }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub fn pending(&self) -> &[Submission] { &self.pending }

  pub fn approvals(&self) -> &[Submission] { &self.approvals }

  pub fn feedback(&self) -> &[Submission] { &self.feedback }

  pub fn next_project_serial(&self) -> u64 { self.next_project_serial }

  pub fn len(&self) -> usize {
    self.pending.len() + self.approvals.len() + self.feedback.len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  fn partitions(&self) -> [(Partition, &[Submission]); 3] {
    [
      (Partition::Pending, &self.pending),
      (Partition::Approvals, &self.approvals),
      (Partition::Feedback, &self.feedback),
    ]
  }

  /// Look a submission up across all partitions.
  pub fn get(&self, id: Uuid) -> Option<&Submission> {
    self
      .partitions()
      .into_iter()
      .find_map(|(_, subs)| subs.iter().find(|s| s.id == id))
  }

  pub fn partition_of(&self, id: Uuid) -> Option<Partition> {
    self
      .partitions()
      .into_iter()
      .find(|(_, subs)| subs.iter().any(|s| s.id == id))
      .map(|(p, _)| p)
  }

  /// Every id appears in exactly one partition and every member's status
  /// matches its partition.
  pub fn is_consistent(&self) -> bool {
    let mut seen = HashSet::with_capacity(self.len());
    self.partitions().into_iter().all(|(partition, subs)| {
      subs
        .iter()
        .all(|s| s.status() == partition.status() && seen.insert(s.id))
    })
  }

  // ── Transitions ───────────────────────────────────────────────────────────

  /// Insert a pending submission at the head of `pending`.
  pub fn add(&mut self, submission: Submission) -> Result<&Submission> {
    if self.get(submission.id).is_some() {
      return Err(Error::DuplicateId(submission.id));
    }
    if !submission.is_pending() {
      return Err(Error::NotPending {
        id:     submission.id,
        status: submission.status(),
      });
    }
    self.pending.insert(0, submission);
    Ok(&self.pending[0])
  }

  /// Move `id` from `pending` to the tail of `approvals`, enriched with the
  /// approval. Returns `None` (and changes nothing) when `id` is not pending.
  pub fn approve(&mut self, id: Uuid, approval: Approval) -> Option<&Submission> {
    let mut submission = self.take_pending(id)?;
    submission.state = approval.into();
    self.approvals.push(submission);
    self.approvals.last()
  }

  /// Move `id` from `pending` to the head of `feedback` with the reviewer's
  /// note, bumping its revision count. Returns `None` (and changes nothing)
  /// when `id` is not pending.
  pub fn request_more(&mut self, id: Uuid, note: String) -> Option<&Submission> {
    let mut submission = self.take_pending(id)?;
    submission.revisions += 1;
    submission.state = SubmissionState::NeedsData { review_note: note };
    self.feedback.insert(0, submission);
    self.feedback.first()
  }

  /// Hand out the next project serial.
  pub fn allocate_project_serial(&mut self) -> u64 {
    let serial = self.next_project_serial;
    self.next_project_serial += 1;
    serial
  }

  fn take_pending(&mut self, id: Uuid) -> Option<Submission> {
    let idx = self.pending.iter().position(|s| s.id == id)?;
    Some(self.pending.remove(idx))
  }
}
