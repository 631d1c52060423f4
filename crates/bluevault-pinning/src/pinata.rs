//! Pinata-backed pinning.

use std::time::Duration;

use bluevault_core::{
  Error, Result,
  pinning::{EvidencePinner, PinRequest},
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_PINATA_URL: &str = "https://api.pinata.cloud";

/// Pins JSON documents through `POST /pinning/pinJSONToIPFS`.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct PinataPinner {
  client:   Client,
  base_url: String,
  jwt:      String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PinBody<'a> {
  pinata_metadata: PinMetadata<'a>,
  pinata_content:  &'a serde_json::Value,
}

#[derive(Serialize)]
struct PinMetadata<'a> {
  name: &'a str,
}

#[derive(Deserialize)]
struct PinResponse {
  #[serde(rename = "IpfsHash")]
  ipfs_hash: String,
}

impl PinataPinner {
  pub fn new(jwt: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .map_err(|e| Error::Pinning(format!("failed to build HTTP client: {e}")))?;
    Ok(Self {
      client,
      base_url: DEFAULT_PINATA_URL.to_owned(),
      jwt: jwt.into(),
    })
  }

  /// Point at a different API host (a gateway proxy, or a test server).
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  fn url(&self) -> String {
    format!("{}/pinning/pinJSONToIPFS", self.base_url.trim_end_matches('/'))
  }
}

impl EvidencePinner for PinataPinner {
  async fn pin(&self, request: PinRequest) -> Result<String> {
    if self.jwt.trim().is_empty() {
      return Err(Error::Pinning("no Pinata JWT configured".into()));
    }

    let body = PinBody {
      pinata_metadata: PinMetadata { name: &request.name },
      pinata_content:  &request.content,
    };
    let resp = self
      .client
      .post(self.url())
      .bearer_auth(&self.jwt)
      .json(&body)
      .send()
      .await
      .map_err(|e| Error::Pinning(format!("pinning service unreachable: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
      let detail = resp.text().await.unwrap_or_default();
      return Err(Error::Pinning(format!(
        "pinning service rejected the payload ({status}): {detail}"
      )));
    }

    let PinResponse { ipfs_hash } = resp
      .json()
      .await
      .map_err(|e| Error::Pinning(format!("unreadable pinning response: {e}")))?;
    if ipfs_hash.is_empty() {
      return Err(Error::Pinning("pinning service returned an empty CID".into()));
    }

    debug!(name = %request.name, cid = %ipfs_hash, "pinned to pinata");
    Ok(ipfs_hash)
  }
}
