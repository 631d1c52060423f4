//! A content-addressed pin store on the local filesystem.
//!
//! Documents are canonicalised (object keys sorted recursively, compact
//! encoding) before hashing, so the same content always yields the same CID
//! regardless of key order. Each document is written once as `<cid>.json`.

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use bluevault_core::{
  Error, Result,
  pinning::{EvidencePinner, PinRequest},
};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Prefix of every CID this store issues.
pub const CID_PREFIX: &str = "bafy";

#[derive(Debug, Clone)]
pub struct LocalPinStore {
  dir: PathBuf,
}

impl LocalPinStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

  pub fn dir(&self) -> &Path { &self.dir }

  /// The CID `content` would be pinned under.
  pub fn cid_for(content: &Value) -> String { cid_of(&canonical_json(content)) }

  /// Read a pinned document back. `None` if nothing is pinned under `cid`.
  pub async fn get(&self, cid: &str) -> Result<Option<Value>> {
    if !is_local_cid(cid) {
      return Err(Error::Validation(format!("{cid:?} is not a local pin CID")));
    }
    match tokio::fs::read(self.path_for(cid)).await {
      Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(Error::Pinning(format!("cannot read pin {cid}: {e}"))),
    }
  }

  fn path_for(&self, cid: &str) -> PathBuf { self.dir.join(format!("{cid}.json")) }
}

impl EvidencePinner for LocalPinStore {
  async fn pin(&self, request: PinRequest) -> Result<String> {
    let body = canonical_json(&request.content);
    let cid = cid_of(&body);
    let path = self.path_for(&cid);

    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
      debug!(name = %request.name, %cid, "already pinned");
      return Ok(cid);
    }

    let io = |e: std::io::Error| Error::Pinning(format!("cannot write pin {cid}: {e}"));
    tokio::fs::create_dir_all(&self.dir).await.map_err(io)?;
    // Write-then-rename so a reader never sees a partial document.
    let tmp = self.dir.join(format!(".{cid}.tmp"));
    tokio::fs::write(&tmp, body.as_bytes()).await.map_err(io)?;
    tokio::fs::rename(&tmp, &path).await.map_err(io)?;

    debug!(name = %request.name, %cid, "pinned locally");
    Ok(cid)
  }
}

fn cid_of(canonical: &str) -> String {
  format!("{CID_PREFIX}{}", hex::encode(Sha256::digest(canonical.as_bytes())))
}

fn is_local_cid(cid: &str) -> bool {
  cid
    .strip_prefix(CID_PREFIX)
    .is_some_and(|h| h.len() == 64 && h.chars().all(|c| c.is_ascii_hexdigit()))
}

fn canonical_json(value: &Value) -> String { canonicalize(value).to_string() }

fn canonicalize(value: &Value) -> Value {
  match value {
    Value::Object(map) => {
      let mut keys: Vec<_> = map.keys().collect();
      keys.sort();
      let sorted: Map<String, Value> = keys
        .into_iter()
        .map(|k| (k.clone(), canonicalize(&map[k])))
        .collect();
      Value::Object(sorted)
    }
    Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
    other => other.clone(),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  struct TempDir(PathBuf);

  impl TempDir {
    fn new() -> Self {
      Self(std::env::temp_dir().join(format!("bluevault-pins-{}", uuid::Uuid::new_v4())))
    }
  }

  impl Drop for TempDir {
    fn drop(&mut self) { let _ = std::fs::remove_dir_all(&self.0); }
  }

  fn request(content: Value) -> PinRequest {
    PinRequest { name: "carbon-project-P1-1.json".into(), content }
  }

  #[tokio::test]
  async fn same_content_same_cid() {
    let dir = TempDir::new();
    let store = LocalPinStore::new(&dir.0);

    let a = store
      .pin(request(json!({ "projectId": "P1", "nested": { "b": 1, "a": [2, 3] } })))
      .await
      .unwrap();
    let b = store
      .pin(request(json!({ "nested": { "a": [2, 3], "b": 1 }, "projectId": "P1" })))
      .await
      .unwrap();
    let c = store.pin(request(json!({ "projectId": "P2" }))).await.unwrap();

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert!(is_local_cid(&a));
    assert_eq!(
      a,
      LocalPinStore::cid_for(&json!({ "nested": { "a": [2, 3], "b": 1 }, "projectId": "P1" }))
    );
  }

  #[tokio::test]
  async fn pinned_document_reads_back() {
    let dir = TempDir::new();
    let store = LocalPinStore::new(&dir.0);
    let content = json!({ "submissionId": "x", "tokensAwarded": "250" });

    let cid = store.pin(request(content.clone())).await.unwrap();
    assert_eq!(store.get(&cid).await.unwrap(), Some(content));
    assert!(dir.0.join(format!("{cid}.json")).exists());
  }

  #[tokio::test]
  async fn get_unknown_and_invalid_cids() {
    let dir = TempDir::new();
    let store = LocalPinStore::new(&dir.0);

    let unknown = LocalPinStore::cid_for(&json!({ "never": "pinned" }));
    assert_eq!(store.get(&unknown).await.unwrap(), None);
    assert!(matches!(store.get("../etc/passwd").await, Err(Error::Validation(_))));
  }
}
