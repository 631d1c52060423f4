//! Mint by calling a remote mint endpoint.

use std::time::Duration;

use bluevault_core::{
  Error, Result,
  mint::{ChainExecutor, DEFAULT_MINT_TIMEOUT, MintOutcome, MintRequest},
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Posts `{recipient, amount, ipfsHash, idempotencyKey}` to a mint endpoint
/// speaking the `POST /api/mint` contract.
#[derive(Clone)]
pub struct HttpExecutor {
  client:         Client,
  endpoint:       String,
  /// The remote's own bound, reported when it answers 504.
  remote_timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MintBody<'a> {
  recipient:       &'a str,
  amount:          &'a str,
  ipfs_hash:       &'a str,
  idempotency_key: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MintReply {
  #[serde(default)]
  success:          bool,
  #[serde(default)]
  transaction_hash: Option<String>,
  #[serde(default)]
  error:            Option<String>,
}

impl HttpExecutor {
  /// `endpoint` is the full URL, e.g. `http://localhost:3001/api/mint`.
  pub fn new(endpoint: impl Into<String>) -> Result<Self> {
    let client = Client::builder().build().map_err(|e| Error::MintExecution {
      message: format!("failed to build HTTP client: {e}"),
      output:  String::new(),
    })?;
    Ok(Self {
      client,
      endpoint: endpoint.into(),
      remote_timeout: DEFAULT_MINT_TIMEOUT,
    })
  }

  pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
    self.remote_timeout = timeout;
    self
  }

  pub fn endpoint(&self) -> &str { &self.endpoint }
}

impl ChainExecutor for HttpExecutor {
  async fn execute(&self, request: &MintRequest) -> Result<MintOutcome> {
    let body = MintBody {
      recipient:       &request.recipient,
      amount:          request.amount.as_str(),
      ipfs_hash:       &request.evidence_cid,
      idempotency_key: &request.idempotency_key,
    };

    let resp = self
      .client
      .post(&self.endpoint)
      .json(&body)
      .send()
      .await
      .map_err(|e| Error::MintExecution {
        message: format!("mint endpoint unreachable: {e}"),
        output:  String::new(),
      })?;

    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    debug!(%status, body = %text, "mint endpoint replied");

    // The remote gave up waiting on the chain; the write may still land.
    if status == StatusCode::GATEWAY_TIMEOUT {
      return Err(Error::MintTimeout(self.remote_timeout));
    }

    let Ok(reply) = serde_json::from_str::<MintReply>(&text) else {
      return Ok(MintOutcome::Failed { output: format!("{status}: {text}") });
    };

    match reply {
      MintReply { success: true, transaction_hash: Some(tx_hash), .. } if status.is_success() => {
        Ok(MintOutcome::Minted { tx_hash })
      }
      MintReply { error, .. } => Ok(MintOutcome::Failed {
        output: error.unwrap_or_else(|| format!("{status}: {text}")),
      }),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use axum::{Json, Router, http::StatusCode as Status, routing::post};
  use bluevault_core::mint::MintOrchestrator;
  use serde_json::{Value, json};

  use super::*;

  type Seen = Arc<Mutex<Vec<Value>>>;

  async fn fake_mint(status: Status, reply: Value, seen: Seen) -> String {
    let app = Router::new().route(
      "/api/mint",
      post(move |Json(body): Json<Value>| {
        let seen = seen.clone();
        let reply = reply.clone();
        async move {
          seen.lock().unwrap().push(body);
          (status, Json(reply))
        }
      }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}/api/mint")
  }

  #[tokio::test]
  async fn success_reply_is_minted() {
    let seen = Seen::default();
    let url = fake_mint(
      Status::OK,
      json!({ "success": true, "transactionHash": "0xabc", "message": "ok" }),
      seen.clone(),
    )
    .await;
    let orch = MintOrchestrator::new(HttpExecutor::new(url).unwrap());

    assert_eq!(orch.mint("0x6c3a", "0250", "bafy123").await.unwrap().tx_hash, "0xabc");
    let body = &seen.lock().unwrap()[0];
    assert_eq!(body["recipient"], "0x6c3a");
    assert_eq!(body["amount"], "250");
    assert_eq!(body["ipfsHash"], "bafy123");
    assert_eq!(body["idempotencyKey"], "bafy123");
  }

  #[tokio::test]
  async fn failure_reply_carries_error_text() {
    let url = fake_mint(
      Status::INTERNAL_SERVER_ERROR,
      json!({ "success": false, "error": "Minting failed: ERROR:nonce too low" }),
      Seen::default(),
    )
    .await;
    let exec = HttpExecutor::new(url).unwrap();
    let request = MintOrchestrator::<HttpExecutor>::validate("0x6c3a", "250", "bafy123").unwrap();

    assert_eq!(
      exec.execute(&request).await.unwrap(),
      MintOutcome::Failed { output: "Minting failed: ERROR:nonce too low".into() }
    );
  }

  #[tokio::test]
  async fn gateway_timeout_is_a_mint_timeout() {
    let url = fake_mint(
      Status::GATEWAY_TIMEOUT,
      json!({ "success": false, "error": "mint timed out" }),
      Seen::default(),
    )
    .await;
    let exec = HttpExecutor::new(url)
      .unwrap()
      .with_remote_timeout(Duration::from_secs(90));
    let request = MintOrchestrator::<HttpExecutor>::validate("0x6c3a", "250", "bafy123").unwrap();

    let err = exec.execute(&request).await.unwrap_err();
    assert!(matches!(err, Error::MintTimeout(d) if d == Duration::from_secs(90)));
    assert!(!err.is_mint_free());
  }

  #[tokio::test]
  async fn unreachable_endpoint_is_an_execution_error() {
    let exec = HttpExecutor::new("http://127.0.0.1:1/api/mint").unwrap();
    let request = MintOrchestrator::<HttpExecutor>::validate("0x6c3a", "250", "bafy123").unwrap();
    assert!(matches!(exec.execute(&request).await, Err(Error::MintExecution { .. })));
  }
}
