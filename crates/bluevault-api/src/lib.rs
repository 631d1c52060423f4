//! JSON REST API for BlueVault.
//!
//! Exposes an axum [`Router`] over a [`LifecycleController`] with any store,
//! pinner and chain executor. TLS, CORS and tracing layers are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", bluevault_api::api_router(controller.clone()))
//! ```

pub mod error;
pub mod health;
pub mod mint;
pub mod submissions;

use std::sync::Arc;

use axum::{
  Router,
  extract::FromRequest,
  routing::{get, post},
};
use bluevault_core::{
  lifecycle::LifecycleController, mint::ChainExecutor, pinning::EvidencePinner,
  store::SubmissionStore,
};

pub use error::ApiError;

/// Shared handler state.
pub type Controller<S, P, E> = Arc<LifecycleController<S, P, E>>;

/// Build a fully-materialised API router for `controller`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, P, E>(controller: Controller<S, P, E>) -> Router<()>
where
  S: SubmissionStore + 'static,
  P: EvidencePinner + 'static,
  E: ChainExecutor + 'static,
{
  Router::new()
    .route("/health", get(health::handler))
    .route("/mint", post(mint::handler::<S, P, E>))
    // Submissions
    .route(
      "/submissions",
      get(submissions::list::<S, P, E>).post(submissions::create::<S, P, E>),
    )
    .route("/submissions/{id}", get(submissions::get_one::<S, P, E>))
    .route("/submissions/{id}/approve", post(submissions::approve::<S, P, E>))
    .route(
      "/submissions/{id}/request-more",
      post(submissions::request_more::<S, P, E>),
    )
    .route("/submissions/{id}/resubmit", post(submissions::resubmit::<S, P, E>))
    .with_state(controller)
}

/// A JSON request body whose rejections (malformed JSON, mistyped fields, a
/// missing content type) reply 400 in the usual `{success, error}` envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Render a JSON string-or-number as text; anything else is empty.
pub(crate) fn scalar_text(value: Option<&serde_json::Value>) -> String {
  match value {
    Some(serde_json::Value::String(s)) => s.clone(),
    Some(serde_json::Value::Number(n)) => n.to_string(),
    _ => String::new(),
  }
}
