//! Evidence pinning contract and the approval record that gets pinned.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  submission::{Submission, SubmissionFields, SubmissionStatus, TokenAmount},
};

/// A JSON document to pin, plus a human-readable name for backends that
/// keep one.
#[derive(Debug, Clone, PartialEq)]
pub struct PinRequest {
  pub name:    String,
  pub content: serde_json::Value,
}

/// A content-addressed pinning backend.
///
/// Same content ⇒ same CID. Implementations fail with
/// [`Error::Pinning`](crate::Error::Pinning) when the backend is unreachable
/// or rejects the payload; there is no mutation or deletion.
pub trait EvidencePinner: Send + Sync {
  fn pin(&self, request: PinRequest) -> impl Future<Output = Result<String>> + Send + '_;
}

/// The evidence package pinned on approval: a snapshot of every submission
/// field plus the award.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRecord {
  pub submission_id:  Uuid,
  #[serde(flatten)]
  pub fields:         SubmissionFields,
  pub revisions:      u32,
  pub submitted_at:   DateTime<Utc>,
  pub approved_at:    DateTime<Utc>,
  pub status:         SubmissionStatus,
  pub tokens_awarded: TokenAmount,
}

impl ApprovalRecord {
  pub fn new(
    submission: &Submission,
    tokens_awarded: TokenAmount,
    approved_at: DateTime<Utc>,
  ) -> Self {
    Self {
      submission_id: submission.id,
      fields: submission.fields.clone(),
      revisions: submission.revisions,
      submitted_at: submission.created_at,
      approved_at,
      status: SubmissionStatus::Approved,
      tokens_awarded,
    }
  }

  /// `carbon-project-<projectId>-<unix millis>.json`
  pub fn pin_name(&self) -> String {
    format!(
      "carbon-project-{}-{}.json",
      self.fields.project_id,
      self.approved_at.timestamp_millis()
    )
  }

  pub fn to_pin_request(&self) -> Result<PinRequest> {
    Ok(PinRequest {
      name:    self.pin_name(),
      content: serde_json::to_value(self)?,
    })
  }
}
