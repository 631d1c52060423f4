//! Async HTTP client wrapping the BlueVault JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use bluevault_core::{
  ledger::Ledger,
  lifecycle::{ApprovalOutcome, NewSubmission, Resubmission},
  submission::Submission,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use uuid::Uuid;

/// Approvals wait on pinning and a chain write, so allow well past the
/// server's mint bound.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Async HTTP client for the BlueVault REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct Health {
  pub status:  String,
  pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MintBody<'a> {
  recipient: &'a str,
  amount:    &'a str,
  ipfs_hash: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintReply {
  pub transaction_hash: String,
}

impl ApiClient {
  pub fn new(base_url: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url: base_url.into() })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.base_url.trim_end_matches('/'), path)
  }

  /// Send `req`, turning a non-2xx reply into an error carrying the
  /// server's `error` message.
  async fn send<T: DeserializeOwned>(&self, what: &str, req: RequestBuilder) -> Result<T> {
    let resp = req.send().await.with_context(|| format!("{what} failed"))?;
    let resp = check(what, resp).await?;
    resp.json().await.with_context(|| format!("deserialising {what} reply"))
  }

  /// `GET /api/health`
  pub async fn health(&self) -> Result<Health> {
    self.send("GET /health", self.client.get(self.url("/health"))).await
  }

  // ── Submissions ───────────────────────────────────────────────────────────

  /// `GET /api/submissions`
  pub async fn list(&self) -> Result<Ledger> {
    self
      .send("GET /submissions", self.client.get(self.url("/submissions")))
      .await
  }

  /// `GET /api/submissions/<id>`
  pub async fn get(&self, id: Uuid) -> Result<Submission> {
    let path = format!("/submissions/{id}");
    self
      .send(&format!("GET {path}"), self.client.get(self.url(&path)))
      .await
  }

  /// `POST /api/submissions`
  pub async fn submit(&self, submission: &NewSubmission) -> Result<Submission> {
    self
      .send(
        "POST /submissions",
        self.client.post(self.url("/submissions")).json(submission),
      )
      .await
  }

  /// `POST /api/submissions/<id>/resubmit`
  pub async fn resubmit(&self, id: Uuid, changes: &Resubmission) -> Result<Submission> {
    let path = format!("/submissions/{id}/resubmit");
    self
      .send(&format!("POST {path}"), self.client.post(self.url(&path)).json(changes))
      .await
  }

  /// `POST /api/submissions/<id>/approve`
  pub async fn approve(&self, id: Uuid, token_amount: &str) -> Result<ApprovalOutcome> {
    let path = format!("/submissions/{id}/approve");
    self
      .send(
        &format!("POST {path}"),
        self
          .client
          .post(self.url(&path))
          .json(&json!({ "tokenAmount": token_amount })),
      )
      .await
  }

  /// `POST /api/submissions/<id>/request-more`
  pub async fn request_more(&self, id: Uuid, note: &str) -> Result<Submission> {
    let path = format!("/submissions/{id}/request-more");
    self
      .send(
        &format!("POST {path}"),
        self.client.post(self.url(&path)).json(&json!({ "note": note })),
      )
      .await
  }

  // ── Mint ──────────────────────────────────────────────────────────────────

  /// `POST /api/mint`
  pub async fn mint(&self, recipient: &str, amount: &str, ipfs_hash: &str) -> Result<MintReply> {
    self
      .send(
        "POST /mint",
        self
          .client
          .post(self.url("/mint"))
          .json(&MintBody { recipient, amount, ipfs_hash }),
      )
      .await
  }
}

async fn check(what: &str, resp: Response) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body: Value = resp.json().await.unwrap_or(Value::Null);
  let message = body["error"].as_str().unwrap_or("no error message");
  let mut err = anyhow!("{what} → {status}: {message}");
  if let Some(incident) = body.get("incident") {
    err = err.context(format!("INCIDENT, needs an operator: {incident}"));
  } else if body["mintMayHaveOccurred"] == true {
    err = err.context("the mint may still land; check the chain before retrying");
  }
  Err(err)
}
