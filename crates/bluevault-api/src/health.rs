//! `GET /health`

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Health {
  pub status:  &'static str,
  pub message: &'static str,
}

pub async fn handler() -> Json<Health> {
  Json(Health { status: "OK", message: "Backend server is running" })
}
