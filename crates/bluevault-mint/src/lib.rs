//! Chain-write executors for BlueVault.
//!
//! Both implement [`ChainExecutor`]; the [`MintOrchestrator`] in
//! `bluevault-core` applies validation and the wall-clock bound.
//!
//! - [`ScriptExecutor`] runs the mint script as a child process and reads the
//!   legacy stdout protocol (see [`parse_legacy_output`]).
//! - [`HttpExecutor`] calls a remote `POST /api/mint` endpoint.
//!
//! [`MintOrchestrator`]: bluevault_core::mint::MintOrchestrator

mod http;
mod legacy;
mod script;

use bluevault_core::{
  Result,
  mint::{ChainExecutor, MintOutcome, MintRequest},
};

pub use http::HttpExecutor;
pub use legacy::parse_legacy_output;
pub use script::{DEFAULT_NETWORK, ScriptExecutor};

/// A chain-write executor chosen at runtime.
pub enum AnyExecutor {
  Script(ScriptExecutor),
  Http(HttpExecutor),
}

impl ChainExecutor for AnyExecutor {
  async fn execute(&self, request: &MintRequest) -> Result<MintOutcome> {
    match self {
      Self::Script(s) => s.execute(request).await,
      Self::Http(h) => h.execute(request).await,
    }
  }
}
