//! Mint orchestration.
//!
//! [`MintOrchestrator`] validates a mint request, hands it to a
//! [`ChainExecutor`] under a wall-clock bound, and classifies the result.
//! Executors report a structured [`MintOutcome`]; any text scraping of tool
//! output stays inside the executor that needs it.
//!
//! Exactly-once is not guaranteed here. A timeout can fire after the write
//! has landed, and retrying the same request may mint twice unless the
//! executor honours [`MintRequest::idempotency_key`].

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Error, Result, submission::TokenAmount};

/// Bound applied when none is configured.
pub const DEFAULT_MINT_TIMEOUT: Duration = Duration::from_secs(60);

/// A validated mint request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRequest {
  pub recipient:       String,
  pub amount:          TokenAmount,
  pub evidence_cid:    String,
  /// Forwarded to the executor so a layer that can detect duplicate writes
  /// may reject a replay. Currently the evidence CID.
  pub idempotency_key: String,
}

/// What the chain-write execution reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintOutcome {
  Minted { tx_hash: String },
  /// The execution ran to completion but did not mint. `output` is the raw
  /// diagnostic text.
  Failed { output: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintReceipt {
  pub tx_hash: String,
}

/// Something that can perform the chain write.
///
/// Transport-level failures (cannot launch, cannot connect) are returned as
/// [`Error::MintExecution`]; a write that ran and failed is
/// [`MintOutcome::Failed`].
pub trait ChainExecutor: Send + Sync {
  fn execute<'a>(
    &'a self,
    request: &'a MintRequest,
  ) -> impl Future<Output = Result<MintOutcome>> + Send + 'a;
}

pub struct MintOrchestrator<E> {
  executor: E,
  timeout:  Duration,
}

impl<E: ChainExecutor> MintOrchestrator<E> {
  pub fn new(executor: E) -> Self {
    Self { executor, timeout: DEFAULT_MINT_TIMEOUT }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn timeout(&self) -> Duration { self.timeout }

  pub fn executor(&self) -> &E { &self.executor }

  /// Check that all three parameters are present and the amount is a
  /// positive decimal.
  pub fn validate(recipient: &str, amount: &str, evidence_cid: &str) -> Result<MintRequest> {
    let mut missing = Vec::new();
    if recipient.trim().is_empty() {
      missing.push("recipient");
    }
    if amount.trim().is_empty() {
      missing.push("amount");
    }
    if evidence_cid.trim().is_empty() {
      missing.push("ipfsHash");
    }
    if !missing.is_empty() {
      return Err(Error::Validation(format!(
        "missing required parameters: {}",
        missing.join(", ")
      )));
    }

    let evidence_cid = evidence_cid.trim().to_owned();
    Ok(MintRequest {
      recipient:       recipient.trim().to_owned(),
      amount:          TokenAmount::parse(amount)?,
      idempotency_key: evidence_cid.clone(),
      evidence_cid,
    })
  }

  /// Validate and execute a mint. Nothing external is touched when
  /// validation fails.
  pub async fn mint(
    &self,
    recipient: &str,
    amount: &str,
    evidence_cid: &str,
  ) -> Result<MintReceipt> {
    let request = Self::validate(recipient, amount, evidence_cid)?;
    info!(
      recipient = %request.recipient,
      amount = %request.amount,
      cid = %request.evidence_cid,
      "minting"
    );

    let outcome = tokio::time::timeout(self.timeout, self.executor.execute(&request))
      .await
      .map_err(|_| {
        warn!(
          cid = %request.evidence_cid,
          timeout_secs = self.timeout.as_secs(),
          "mint timed out; the transaction may still land"
        );
        Error::MintTimeout(self.timeout)
      })??;

    match outcome {
      MintOutcome::Minted { tx_hash } if !tx_hash.trim().is_empty() => {
        info!(cid = %request.evidence_cid, %tx_hash, "minted");
        Ok(MintReceipt { tx_hash })
      }
      MintOutcome::Minted { .. } => Err(Error::MintExecution {
        message: "executor reported success without a transaction id".into(),
        output:  String::new(),
      }),
      MintOutcome::Failed { output } => {
        warn!(cid = %request.evidence_cid, "mint failed");
        Err(Error::MintExecution {
          message: "chain write did not report a transaction".into(),
          output,
        })
      }
    }
  }
}
