//! Handlers for `/submissions` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/submissions` | All three partitions |
//! | `POST` | `/submissions` | Contributor form; 201 |
//! | `GET`  | `/submissions/{id}` | 404 if not found |
//! | `POST` | `/submissions/{id}/approve` | Body: `{"tokenAmount":"250"}` |
//! | `POST` | `/submissions/{id}/request-more` | Body: `{"note":"…"}` |
//! | `POST` | `/submissions/{id}/resubmit` | Returned entries only; 201 |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use bluevault_core::{
  Error,
  ledger::Ledger,
  lifecycle::{ApprovalOutcome, NewSubmission, Resubmission},
  mint::ChainExecutor,
  pinning::EvidencePinner,
  store::SubmissionStore,
  submission::Submission,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{Controller, JsonBody, error::ApiError, scalar_text};

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /submissions`
pub async fn list<S, P, E>(
  State(controller): State<Controller<S, P, E>>,
) -> Result<Json<Ledger>, ApiError>
where
  S: SubmissionStore,
  P: EvidencePinner,
  E: ChainExecutor,
{
  let ledger = controller.store().snapshot().await.map_err(ApiError::store)?;
  Ok(Json(ledger))
}

/// `GET /submissions/{id}`
pub async fn get_one<S, P, E>(
  State(controller): State<Controller<S, P, E>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Submission>, ApiError>
where
  S: SubmissionStore,
  P: EvidencePinner,
  E: ChainExecutor,
{
  let submission = controller
    .store()
    .get(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(Error::NotFound(id))?;
  Ok(Json(submission))
}

// ─── Contributor actions ──────────────────────────────────────────────────────

/// `POST /submissions`
pub async fn create<S, P, E>(
  State(controller): State<Controller<S, P, E>>,
  JsonBody(body): JsonBody<NewSubmission>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SubmissionStore,
  P: EvidencePinner,
  E: ChainExecutor,
{
  let submission = controller.submit_new(body).await?;
  Ok((StatusCode::CREATED, Json(submission)))
}

/// `POST /submissions/{id}/resubmit`
pub async fn resubmit<S, P, E>(
  State(controller): State<Controller<S, P, E>>,
  Path(id): Path<Uuid>,
  JsonBody(body): JsonBody<Resubmission>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SubmissionStore,
  P: EvidencePinner,
  E: ChainExecutor,
{
  let submission = controller.resubmit(id, body).await?;
  Ok((StatusCode::CREATED, Json(submission)))
}

// ─── Reviewer actions ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveBody {
  /// A JSON string or number.
  #[serde(default)]
  pub token_amount: Option<Value>,
}

/// `POST /submissions/{id}/approve`
pub async fn approve<S, P, E>(
  State(controller): State<Controller<S, P, E>>,
  Path(id): Path<Uuid>,
  JsonBody(body): JsonBody<ApproveBody>,
) -> Result<Json<ApprovalOutcome>, ApiError>
where
  S: SubmissionStore,
  P: EvidencePinner,
  E: ChainExecutor,
{
  let amount = scalar_text(body.token_amount.as_ref());
  let outcome = controller.approve_submission(id, &amount).await?;
  Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct RequestMoreBody {
  #[serde(default)]
  pub note: String,
}

/// `POST /submissions/{id}/request-more`
pub async fn request_more<S, P, E>(
  State(controller): State<Controller<S, P, E>>,
  Path(id): Path<Uuid>,
  JsonBody(body): JsonBody<RequestMoreBody>,
) -> Result<Json<Submission>, ApiError>
where
  S: SubmissionStore,
  P: EvidencePinner,
  E: ChainExecutor,
{
  let submission = controller.request_more_data(id, &body.note).await?;
  Ok(Json(submission))
}
