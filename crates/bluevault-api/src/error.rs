//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use bluevault_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::Core(e) => match e {
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::NotPending { .. }
        | CoreError::ApprovalInFlight(_)
        | CoreError::DuplicateId(_) => StatusCode::CONFLICT,
        CoreError::Pinning(_) => StatusCode::BAD_GATEWAY,
        CoreError::MintTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        CoreError::MintExecution { .. }
        | CoreError::StateInconsistency { .. }
        | CoreError::Store(_)
        | CoreError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
      Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self::Core(CoreError::Validation(rejection.body_text()))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let mut body = json!({ "success": false, "error": self.to_string() });

    if let Self::Core(e) = &self {
      match e {
        CoreError::MintExecution { message, output } if !output.is_empty() => {
          body["error"] = json!(format!("mint execution failed: {message}: {output}"));
        }
        CoreError::StateInconsistency { id, cid, tx_hash, detail } => {
          body["incident"] = json!({
            "submissionId": id,
            "ipfsCid":      cid,
            "txHash":       tx_hash,
            "detail":       detail,
          });
        }
        _ => {}
      }
      if !e.is_mint_free() {
        body["mintMayHaveOccurred"] = json!(true);
      }
    }

    if status.is_server_error() {
      error!(%status, error = %self, "request failed");
    }
    (status, Json(body)).into_response()
  }
}
