//! Evidence pinning backends for BlueVault.
//!
//! - [`PinataPinner`] pins JSON documents to IPFS through Pinata's HTTP API.
//! - [`LocalPinStore`] is a content-addressed directory store for
//!   development and tests.
//!
//! [`AnyPinner`] lets the server pick one at startup from configuration.

mod local;
mod pinata;

use bluevault_core::{
  Result,
  pinning::{EvidencePinner, PinRequest},
};

pub use local::{CID_PREFIX, LocalPinStore};
pub use pinata::{DEFAULT_PINATA_URL, PinataPinner};

/// A pinning backend chosen at runtime.
pub enum AnyPinner {
  Pinata(PinataPinner),
  Local(LocalPinStore),
}

impl EvidencePinner for AnyPinner {
  async fn pin(&self, request: PinRequest) -> Result<String> {
    match self {
      Self::Pinata(p) => p.pin(request).await,
      Self::Local(l) => l.pin(request).await,
    }
  }
}
