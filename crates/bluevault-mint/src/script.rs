//! Mint by running the deployment's mint script.

use std::{path::PathBuf, process::Stdio};

use bluevault_core::{
  Error, Result,
  mint::{ChainExecutor, MintOutcome, MintRequest},
};
use tokio::process::Command;
use tracing::debug;

use crate::legacy::parse_legacy_output;

/// Network passed to hardhat when none is configured.
pub const DEFAULT_NETWORK: &str = "polygon_amoy";

/// Runs `program args…` with the mint parameters in its environment:
/// `RECIPIENT`, `AMOUNT`, `IPFS_HASH` and `IDEMPOTENCY_KEY`.
///
/// The child is killed if the orchestrator's timeout drops the execution.
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
  program:     String,
  args:        Vec<String>,
  working_dir: Option<PathBuf>,
}

impl ScriptExecutor {
  pub fn new<I, A>(program: impl Into<String>, args: I) -> Self
  where
    I: IntoIterator<Item = A>,
    A: Into<String>,
  {
    Self {
      program:     program.into(),
      args:        args.into_iter().map(Into::into).collect(),
      working_dir: None,
    }
  }

  /// `npx hardhat run scripts/mint.cjs --network <network>`
  pub fn hardhat(network: &str) -> Self {
    Self::new("npx", ["hardhat", "run", "scripts/mint.cjs", "--network", network])
  }

  /// Run from `dir` (the hardhat project root) instead of the server's cwd.
  pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.working_dir = Some(dir.into());
    self
  }
}

impl ChainExecutor for ScriptExecutor {
  async fn execute(&self, request: &MintRequest) -> Result<MintOutcome> {
    let mut cmd = Command::new(&self.program);
    cmd
      .args(&self.args)
      .env("RECIPIENT", &request.recipient)
      .env("AMOUNT", request.amount.as_str())
      .env("IPFS_HASH", &request.evidence_cid)
      .env("IDEMPOTENCY_KEY", &request.idempotency_key)
      .stdin(Stdio::null())
      .kill_on_drop(true);
    if let Some(dir) = &self.working_dir {
      cmd.current_dir(dir);
    }

    let output = cmd.output().await.map_err(|e| Error::MintExecution {
      message: format!("cannot launch {}: {e}", self.program),
      output:  String::new(),
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!(status = %output.status, %stdout, %stderr, "mint script finished");

    if !output.status.success() {
      let diagnostic = if stderr.trim().is_empty() { &stdout } else { &stderr };
      return Ok(MintOutcome::Failed { output: diagnostic.trim().to_owned() });
    }

    Ok(match parse_legacy_output(&stdout) {
      Some(tx_hash) => MintOutcome::Minted { tx_hash },
      None => MintOutcome::Failed {
        output: format!("{}\n{}", stdout.trim(), stderr.trim())
          .trim()
          .to_owned(),
      },
    })
  }
}
