//! `POST /mint`: the direct mint endpoint.
//!
//! Body: `{"recipient": "0x…", "amount": "250", "ipfsHash": "bafy…"}`. The
//! amount may be a JSON string or number. Success is
//! `200 {"success": true, "transactionHash": "0x…", "message": …}`; any
//! failure is `{"success": false, "error": …}` with a non-200 status.

use axum::{Json, extract::State};
use bluevault_core::{
  mint::ChainExecutor, pinning::EvidencePinner, store::SubmissionStore,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Controller, JsonBody, error::ApiError, scalar_text};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintBody {
  #[serde(default)]
  pub recipient: Option<String>,
  #[serde(default)]
  pub amount:    Option<Value>,
  #[serde(default)]
  pub ipfs_hash: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintReply {
  pub success:          bool,
  pub transaction_hash: String,
  pub message:          &'static str,
}

pub async fn handler<S, P, E>(
  State(controller): State<Controller<S, P, E>>,
  JsonBody(body): JsonBody<MintBody>,
) -> Result<Json<MintReply>, ApiError>
where
  S: SubmissionStore,
  P: EvidencePinner,
  E: ChainExecutor,
{
  let receipt = controller
    .minter()
    .mint(
      body.recipient.as_deref().unwrap_or_default(),
      &scalar_text(body.amount.as_ref()),
      body.ipfs_hash.as_deref().unwrap_or_default(),
    )
    .await?;

  Ok(Json(MintReply {
    success:          true,
    transaction_hash: receipt.tx_hash,
    message:          "BVT tokens minted successfully",
  }))
}
