//! The submission lifecycle controller.
//!
//! ```text
//!            submit_new / resubmit
//!                    │
//!                    ▼
//!               ┌─────────┐  approve_submission   ┌──────────┐
//!               │ Pending │──────────────────────▶│ Approved │
//!               └─────────┘  (pin → mint → record) └──────────┘
//!                    │
//!                    │ request_more_data
//!                    ▼
//!              ┌────────────┐
//!              │ Needs Data │  (terminal; resubmit creates a new Pending)
//!              └────────────┘
//! ```
//!
//! The controller is the only writer to its store. Approval is a three-step
//! operation whose first two steps have external side effects; the store is
//! only touched once both have succeeded.

use std::{
  collections::HashSet,
  sync::{Mutex, PoisonError},
};

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  mint::{ChainExecutor, MintOrchestrator},
  pinning::{ApprovalRecord, EvidencePinner},
  store::SubmissionStore,
  submission::{
    Approval, Area, Coordinate, EcosystemType, EvidenceFile, Submission,
    SubmissionFields, TokenAmount,
  },
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Contributor form input. Numeric fields arrive as raw text and are coerced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
  /// Blank or absent ⇒ the next project serial is assigned.
  #[serde(default)]
  pub project_id:     Option<String>,
  #[serde(default)]
  pub wallet:         Option<String>,
  pub ecosystem_type: EcosystemType,
  #[serde(default, deserialize_with = "text_or_number")]
  pub biomass:        Option<String>,
  #[serde(default, deserialize_with = "text_or_number")]
  pub soil_carbon:    Option<String>,
  #[serde(default)]
  pub latitude:       String,
  #[serde(default)]
  pub longitude:      String,
  /// Fewer than three vertices ⇒ no area.
  #[serde(default)]
  pub area:           Option<Vec<Coordinate>>,
  #[serde(default)]
  pub files:          Vec<EvidenceFile>,
  #[serde(default)]
  pub description:    String,
}

/// Changes a contributor makes when resubmitting returned evidence. Absent
/// fields carry over from the returned entry; `files` are appended.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resubmission {
  #[serde(default, deserialize_with = "text_or_number")]
  pub biomass:     Option<String>,
  #[serde(default, deserialize_with = "text_or_number")]
  pub soil_carbon: Option<String>,
  #[serde(default)]
  pub latitude:    Option<String>,
  #[serde(default)]
  pub longitude:   Option<String>,
  #[serde(default)]
  pub area:        Option<Vec<Coordinate>>,
  #[serde(default)]
  pub files:       Vec<EvidenceFile>,
  #[serde(default)]
  pub description: Option<String>,
}

/// Form fields arrive as text from some clients and as numbers from others.
fn text_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
  Ok(match Option::<serde_json::Value>::deserialize(d)? {
    Some(serde_json::Value::String(s)) => Some(s),
    Some(serde_json::Value::Number(n)) => Some(n.to_string()),
    _ => None,
  })
}

/// Parse an optional non-negative quantity; anything else becomes `None`.
pub fn coerce_quantity(raw: Option<&str>) -> Option<f64> {
  raw
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .and_then(|s| s.parse::<f64>().ok())
    .filter(|v| v.is_finite() && *v >= 0.0)
}

// ─── Outputs ─────────────────────────────────────────────────────────────────

/// The result of a successful approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalOutcome {
  pub cid:        String,
  pub tx_hash:    String,
  pub submission: Submission,
}

// ─── Controller ──────────────────────────────────────────────────────────────

pub struct LifecycleController<S, P, E> {
  store:     S,
  pinner:    P,
  minter:    MintOrchestrator<E>,
  /// Every approval mints to this address.
  recipient: String,
  in_flight: Mutex<HashSet<Uuid>>,
}

/// Removes an id from the in-flight set when the reviewer action finishes,
/// however it finishes.
struct InFlight<'a> {
  set: &'a Mutex<HashSet<Uuid>>,
  id:  Uuid,
}

impl Drop for InFlight<'_> {
  fn drop(&mut self) {
    self
      .set
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(&self.id);
  }
}

impl<S, P, E> LifecycleController<S, P, E>
where
  S: SubmissionStore,
  P: EvidencePinner,
  E: ChainExecutor,
{
  pub fn new(
    store: S,
    pinner: P,
    minter: MintOrchestrator<E>,
    recipient: impl Into<String>,
  ) -> Self {
    Self {
      store,
      pinner,
      minter,
      recipient: recipient.into(),
      in_flight: Mutex::new(HashSet::new()),
    }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn minter(&self) -> &MintOrchestrator<E> { &self.minter }

  pub fn recipient(&self) -> &str { &self.recipient }

  // ── Contributor actions ───────────────────────────────────────────────────

  /// Create a fresh pending submission from contributor input.
  pub async fn submit_new(&self, input: NewSubmission) -> Result<Submission> {
    let project_id = match input.project_id.as_deref().map(str::trim) {
      Some(id) if !id.is_empty() => id.to_owned(),
      _ => self
        .store
        .allocate_project_serial()
        .await
        .map_err(Error::store)?
        .to_string(),
    };

    let fields = SubmissionFields {
      project_id,
      wallet: input.wallet.filter(|w| !w.trim().is_empty()),
      ecosystem_type: input.ecosystem_type,
      biomass: coerce_quantity(input.biomass.as_deref()),
      soil_carbon: coerce_quantity(input.soil_carbon.as_deref()),
      latitude: input.latitude.trim().to_owned(),
      longitude: input.longitude.trim().to_owned(),
      area: input.area.and_then(Area::new),
      files: input.files,
      description: input.description,
    };

    let submission = self
      .store
      .add(Submission::pending(fields, 0))
      .await
      .map_err(Error::store)?;
    info!(
      id = %submission.id,
      project_id = %submission.fields.project_id,
      "submission created"
    );
    Ok(submission)
  }

  /// Create a new pending submission from a returned (`Needs Data`) one,
  /// carrying its fields and revision count. The returned entry is left as
  /// it is.
  pub async fn resubmit(&self, id: Uuid, changes: Resubmission) -> Result<Submission> {
    let previous = self
      .store
      .get(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(id))?;
    if previous.review_note().is_none() {
      return Err(Error::Validation(format!(
        "submission {id} is {}; only returned submissions can be resubmitted",
        previous.status()
      )));
    }

    let mut fields = previous.fields;
    if let Some(raw) = changes.biomass {
      fields.biomass = coerce_quantity(Some(&raw));
    }
    if let Some(raw) = changes.soil_carbon {
      fields.soil_carbon = coerce_quantity(Some(&raw));
    }
    if let Some(lat) = changes.latitude {
      fields.latitude = lat.trim().to_owned();
    }
    if let Some(lng) = changes.longitude {
      fields.longitude = lng.trim().to_owned();
    }
    if let Some(points) = changes.area {
      fields.area = Area::new(points);
    }
    if let Some(description) = changes.description {
      fields.description = description;
    }
    fields.files.extend(changes.files);

    let submission = self
      .store
      .add(Submission::pending(fields, previous.revisions))
      .await
      .map_err(Error::store)?;
    info!(id = %submission.id, previous = %id, revisions = submission.revisions, "submission resubmitted");
    Ok(submission)
  }

  // ── Reviewer actions ──────────────────────────────────────────────────────

  /// Pin the approval record, mint against its CID, then record the
  /// approval.
  ///
  /// A pinning or mint failure leaves the store untouched (a pinned record
  /// without a mint is harmless). A store failure after the mint is a
  /// [`Error::StateInconsistency`].
  pub async fn approve_submission(
    &self,
    id: Uuid,
    token_amount: &str,
  ) -> Result<ApprovalOutcome> {
    let amount = TokenAmount::parse(token_amount)?;
    let _guard = self.claim(id)?;

    let submission = self.pending_submission(id).await?;
    let approved_at = Utc::now();
    let record = ApprovalRecord::new(&submission, amount.clone(), approved_at);

    let cid = self.pinner.pin(record.to_pin_request()?).await.inspect_err(|e| {
      warn!(%id, error = %e, "pinning failed; submission left pending");
    })?;
    info!(%id, %cid, "approval record pinned");

    let receipt = self
      .minter
      .mint(&self.recipient, amount.as_str(), &cid)
      .await
      .inspect_err(|e| {
        warn!(%id, %cid, error = %e, "mint failed; submission left pending, pin orphaned");
      })?;

    let approval = Approval {
      tokens_awarded: amount,
      ipfs_cid: cid.clone(),
      tx_hash: receipt.tx_hash.clone(),
      approved_at,
    };

    let detail = match self.store.approve(id, approval).await {
      Ok(Some(submission)) => {
        info!(%id, %cid, tx_hash = %receipt.tx_hash, "submission approved");
        return Ok(ApprovalOutcome { cid, tx_hash: receipt.tx_hash, submission });
      }
      Ok(None) => "submission was no longer pending".to_owned(),
      Err(e) => format!("store rejected the approval: {e}"),
    };

    error!(
      %id,
      %cid,
      tx_hash = %receipt.tx_hash,
      %detail,
      "INCIDENT: tokens minted but approval not recorded"
    );
    Err(Error::StateInconsistency { id, cid, tx_hash: receipt.tx_hash, detail })
  }

  /// Return a pending submission to its contributor with a note.
  pub async fn request_more_data(&self, id: Uuid, note: &str) -> Result<Submission> {
    let note = note.trim();
    if note.is_empty() {
      return Err(Error::Validation("a review note is required".into()));
    }
    let _guard = self.claim(id)?;

    match self
      .store
      .request_more(id, note.to_owned())
      .await
      .map_err(Error::store)?
    {
      Some(submission) => {
        info!(%id, revisions = submission.revisions, "more data requested");
        Ok(submission)
      }
      None => Err(self.not_pending_error(id).await),
    }
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  /// Reserve `id` for one reviewer action. Approval and request-more on the
  /// same id are mutually exclusive until the guard drops.
  fn claim(&self, id: Uuid) -> Result<InFlight<'_>> {
    let mut set = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
    if !set.insert(id) {
      return Err(Error::ApprovalInFlight(id));
    }
    Ok(InFlight { set: &self.in_flight, id })
  }

  #[cfg(test)]
  fn is_in_flight(&self, id: Uuid) -> bool {
    self
      .in_flight
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .contains(&id)
  }

  async fn pending_submission(&self, id: Uuid) -> Result<Submission> {
    match self.store.get(id).await.map_err(Error::store)? {
      Some(s) if s.is_pending() => Ok(s),
      Some(s) => Err(Error::NotPending { id, status: s.status() }),
      None => Err(Error::NotFound(id)),
    }
  }

  async fn not_pending_error(&self, id: Uuid) -> Error {
    match self.store.get(id).await {
      Ok(Some(s)) => Error::NotPending { id, status: s.status() },
      Ok(None) => Error::NotFound(id),
      Err(e) => Error::store(e),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::{
      Arc,
      atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
  };

  use tokio::sync::{Mutex as AsyncMutex, Notify, watch};

  use super::*;
  use crate::{
    ledger::Ledger,
    mint::{MintOutcome, MintRequest},
    pinning::PinRequest,
    submission::SubmissionStatus,
  };

  // ── Stubs ─────────────────────────────────────────────────────────────────

  #[derive(Debug, thiserror::Error)]
  #[error("stub store: {0}")]
  struct StubStoreError(String);

  /// In-memory store. `steal_on_approve` simulates a competing writer that
  /// moves the entry out of `pending` before the approval lands.
  struct MemStore {
    ledger:           AsyncMutex<Ledger>,
    changes:          watch::Sender<u64>,
    steal_on_approve: bool,
    /// When set, `request_more` parks until notified.
    request_gate:     Option<Arc<Notify>>,
    request_calls:    AtomicUsize,
  }

  impl MemStore {
    fn new() -> Self {
      Self {
        ledger:           AsyncMutex::new(Ledger::new()),
        changes:          watch::channel(0).0,
        steal_on_approve: false,
        request_gate:     None,
        request_calls:    AtomicUsize::new(0),
      }
    }

    fn bump(&self) { self.changes.send_modify(|v| *v += 1); }
  }

  impl SubmissionStore for MemStore {
    type Error = StubStoreError;

    async fn add(&self, submission: Submission) -> Result<Submission, StubStoreError> {
      let mut ledger = self.ledger.lock().await;
      let added = ledger
        .add(submission)
        .map_err(|e| StubStoreError(e.to_string()))?
        .clone();
      self.bump();
      Ok(added)
    }

    async fn approve(
      &self,
      id: Uuid,
      approval: Approval,
    ) -> Result<Option<Submission>, StubStoreError> {
      let mut ledger = self.ledger.lock().await;
      if self.steal_on_approve {
        ledger.request_more(id, "taken".into());
      }
      let out = ledger.approve(id, approval).cloned();
      self.bump();
      Ok(out)
    }

    async fn request_more(
      &self,
      id: Uuid,
      note: String,
    ) -> Result<Option<Submission>, StubStoreError> {
      self.request_calls.fetch_add(1, Ordering::SeqCst);
      if let Some(gate) = &self.request_gate {
        gate.notified().await;
      }
      let out = self.ledger.lock().await.request_more(id, note).cloned();
      self.bump();
      Ok(out)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Submission>, StubStoreError> {
      Ok(self.ledger.lock().await.get(id).cloned())
    }

    async fn snapshot(&self) -> Result<Ledger, StubStoreError> {
      Ok(self.ledger.lock().await.clone())
    }

    async fn allocate_project_serial(&self) -> Result<u64, StubStoreError> {
      Ok(self.ledger.lock().await.allocate_project_serial())
    }

    fn subscribe(&self) -> watch::Receiver<u64> { self.changes.subscribe() }
  }

  struct StubPinner {
    cid:   Option<String>,
    calls: AtomicUsize,
    last:  std::sync::Mutex<Option<PinRequest>>,
  }

  impl StubPinner {
    fn ok(cid: &str) -> Self {
      Self { cid: Some(cid.into()), calls: AtomicUsize::new(0), last: Default::default() }
    }

    fn failing() -> Self {
      Self { cid: None, calls: AtomicUsize::new(0), last: Default::default() }
    }
  }

  impl EvidencePinner for StubPinner {
    async fn pin(&self, request: PinRequest) -> Result<String> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      *self.last.lock().unwrap() = Some(request);
      self
        .cid
        .clone()
        .ok_or_else(|| Error::Pinning("401 Unauthorized".into()))
    }
  }

  struct StubChain {
    outcome: MintOutcome,
    calls:   AtomicUsize,
    /// When set, execution parks until notified.
    gate:    Option<Arc<Notify>>,
  }

  impl StubChain {
    fn minting(tx: &str) -> Self {
      Self {
        outcome: MintOutcome::Minted { tx_hash: tx.into() },
        calls:   AtomicUsize::new(0),
        gate:    None,
      }
    }

    fn failing(output: &str) -> Self {
      Self {
        outcome: MintOutcome::Failed { output: output.into() },
        calls:   AtomicUsize::new(0),
        gate:    None,
      }
    }
  }

  impl ChainExecutor for StubChain {
    async fn execute(&self, request: &MintRequest) -> Result<MintOutcome> {
      assert_eq!(request.recipient, RECIPIENT);
      self.calls.fetch_add(1, Ordering::SeqCst);
      if let Some(gate) = &self.gate {
        gate.notified().await;
      }
      Ok(self.outcome.clone())
    }
  }

  const RECIPIENT: &str = "0x6c3aa30bdd2dE5383f8aF12CA3B3bEb8a9A2F255";
  const TX: &str = "0xabc0000000000000000000000000000000000000000000000000000000000def";

  type Controller = LifecycleController<MemStore, StubPinner, StubChain>;

  fn controller(store: MemStore, pinner: StubPinner, chain: StubChain) -> Controller {
    LifecycleController::new(store, pinner, MintOrchestrator::new(chain), RECIPIENT)
  }

  fn scenario_input() -> NewSubmission {
    NewSubmission {
      project_id: Some("P1".into()),
      ecosystem_type: EcosystemType::Mangrove,
      latitude: "10".into(),
      longitude: "20".into(),
      ..Default::default()
    }
  }

  async fn pending_ids(c: &Controller) -> Vec<Uuid> {
    c.store().snapshot().await.unwrap().pending().iter().map(|s| s.id).collect()
  }

  // ── submit_new ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn submitted_entry_is_pending() {
    let c = controller(MemStore::new(), StubPinner::ok("bafy123"), StubChain::minting(TX));
    let s = c.submit_new(scenario_input()).await.unwrap();

    assert_eq!(s.status(), SubmissionStatus::Pending);
    assert_eq!(s.fields.project_id, "P1");
    assert_eq!(pending_ids(&c).await, vec![s.id]);
  }

  #[tokio::test]
  async fn blank_project_id_gets_a_serial() {
    let c = controller(MemStore::new(), StubPinner::ok("bafy123"), StubChain::minting(TX));

    let mut input = scenario_input();
    input.project_id = Some("   ".into());
    let first = c.submit_new(input.clone()).await.unwrap();
    input.project_id = None;
    let second = c.submit_new(input).await.unwrap();
    let named = c.submit_new(scenario_input()).await.unwrap();

    assert_eq!(first.fields.project_id, "1");
    assert_eq!(second.fields.project_id, "2");
    assert_eq!(named.fields.project_id, "P1");
    assert_eq!(c.store().snapshot().await.unwrap().next_project_serial(), 3);
  }

  #[tokio::test]
  async fn malformed_numbers_are_coerced_not_rejected() {
    let c = controller(MemStore::new(), StubPinner::ok("bafy123"), StubChain::minting(TX));
    let mut input = scenario_input();
    input.biomass = Some("12.5".into());
    input.soil_carbon = Some("lots".into());
    input.area = Some(vec![Coordinate(1.0, 1.0), Coordinate(2.0, 2.0)]);

    let s = c.submit_new(input).await.unwrap();
    assert_eq!(s.fields.biomass, Some(12.5));
    assert_eq!(s.fields.soil_carbon, None);
    assert_eq!(s.fields.area, None);
  }

  #[test]
  fn numeric_form_fields_accept_numbers_and_text() {
    let input: NewSubmission = serde_json::from_value(serde_json::json!({
      "ecosystemType": "Forest",
      "biomass":       12.5,
      "soilCarbon":    "3",
    }))
    .unwrap();
    assert_eq!(input.biomass.as_deref(), Some("12.5"));
    assert_eq!(input.soil_carbon.as_deref(), Some("3"));
    assert_eq!(input.project_id, None);
  }

  #[test]
  fn coerce_quantity_cases() {
    assert_eq!(coerce_quantity(None), None);
    assert_eq!(coerce_quantity(Some("")), None);
    assert_eq!(coerce_quantity(Some(" 4 ")), Some(4.0));
    assert_eq!(coerce_quantity(Some("-1")), None);
    assert_eq!(coerce_quantity(Some("NaN")), None);
    assert_eq!(coerce_quantity(Some("inf")), None);
  }

  // ── approve_submission ────────────────────────────────────────────────────

  #[tokio::test]
  async fn approve_scenario_records_cid_and_tx() {
    let c = controller(MemStore::new(), StubPinner::ok("bafy123"), StubChain::minting(TX));
    let s = c.submit_new(scenario_input()).await.unwrap();

    let out = c.approve_submission(s.id, "250").await.unwrap();
    assert_eq!(out.cid, "bafy123");
    assert_eq!(out.tx_hash, TX);

    let ledger = c.store().snapshot().await.unwrap();
    assert!(ledger.pending().is_empty());
    assert_eq!(ledger.approvals().len(), 1);
    let approved = &ledger.approvals()[0];
    assert_eq!(approved.id, s.id);
    assert_eq!(approved.tokens_awarded().unwrap().as_str(), "250");
    assert_eq!(approved.ipfs_cid(), Some("bafy123"));
    assert_eq!(approved.tx_hash(), Some(TX));
    assert_eq!(approved.fields, s.fields);

    let pinned = c.pinner.last.lock().unwrap().clone().unwrap();
    assert_eq!(pinned.content["submissionId"], s.id.to_string());
    assert_eq!(pinned.content["tokensAwarded"], "250");
  }

  #[tokio::test]
  async fn pinning_failure_changes_nothing_and_skips_mint() {
    let c = controller(MemStore::new(), StubPinner::failing(), StubChain::minting(TX));
    let s = c.submit_new(scenario_input()).await.unwrap();
    let before = c.store().snapshot().await.unwrap();

    let err = c.approve_submission(s.id, "250").await.unwrap_err();
    assert!(matches!(err, Error::Pinning(_)));
    assert_eq!(c.store().snapshot().await.unwrap(), before);
    assert_eq!(c.minter().executor().calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn mint_failure_leaves_submission_pending() {
    let c = controller(
      MemStore::new(),
      StubPinner::ok("bafy123"),
      StubChain::failing("Error: execution reverted"),
    );
    let s = c.submit_new(scenario_input()).await.unwrap();
    let before = c.store().snapshot().await.unwrap();

    match c.approve_submission(s.id, "250").await {
      Err(Error::MintExecution { output, .. }) => {
        assert_eq!(output, "Error: execution reverted")
      }
      other => panic!("expected mint execution error, got {other:?}"),
    }
    assert_eq!(c.store().snapshot().await.unwrap(), before);
    assert_eq!(pending_ids(&c).await, vec![s.id]);
  }

  #[tokio::test]
  async fn invalid_amount_touches_nothing() {
    let c = controller(MemStore::new(), StubPinner::ok("bafy123"), StubChain::minting(TX));
    let s = c.submit_new(scenario_input()).await.unwrap();

    assert!(matches!(
      c.approve_submission(s.id, "-3").await,
      Err(Error::Validation(_))
    ));
    assert_eq!(c.pinner.calls.load(Ordering::SeqCst), 0);
    assert_eq!(pending_ids(&c).await, vec![s.id]);
  }

  #[tokio::test]
  async fn approving_non_pending_is_rejected_before_pinning() {
    let c = controller(MemStore::new(), StubPinner::ok("bafy123"), StubChain::minting(TX));
    let s = c.submit_new(scenario_input()).await.unwrap();
    c.approve_submission(s.id, "250").await.unwrap();

    assert!(matches!(
      c.approve_submission(s.id, "250").await,
      Err(Error::NotPending { status: SubmissionStatus::Approved, .. })
    ));
    assert!(matches!(
      c.approve_submission(Uuid::new_v4(), "250").await,
      Err(Error::NotFound(_))
    ));
    assert_eq!(c.pinner.calls.load(Ordering::SeqCst), 1);
    assert_eq!(c.minter().executor().calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn lost_pending_entry_after_mint_is_an_incident() {
    let mut store = MemStore::new();
    store.steal_on_approve = true;
    let c = controller(store, StubPinner::ok("bafy123"), StubChain::minting(TX));
    let s = c.submit_new(scenario_input()).await.unwrap();

    match c.approve_submission(s.id, "250").await {
      Err(Error::StateInconsistency { id, cid, tx_hash, .. }) => {
        assert_eq!(id, s.id);
        assert_eq!(cid, "bafy123");
        assert_eq!(tx_hash, TX);
      }
      other => panic!("expected state inconsistency, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn concurrent_approval_of_same_id_is_rejected() {
    let gate = Arc::new(Notify::new());
    let mut chain = StubChain::minting(TX);
    chain.gate = Some(gate.clone());
    let c = Arc::new(controller(MemStore::new(), StubPinner::ok("bafy123"), chain));
    let s = c.submit_new(scenario_input()).await.unwrap();

    let first = tokio::spawn({
      let c = c.clone();
      async move { c.approve_submission(s.id, "250").await }
    });
    while c.minter().executor().calls.load(Ordering::SeqCst) == 0 {
      tokio::time::sleep(Duration::from_millis(1)).await;
    }

    assert!(matches!(
      c.approve_submission(s.id, "250").await,
      Err(Error::ApprovalInFlight(_))
    ));
    assert!(matches!(
      c.request_more_data(s.id, "wait").await,
      Err(Error::ApprovalInFlight(_))
    ));

    gate.notify_one();
    first.await.unwrap().unwrap();
    assert_eq!(c.minter().executor().calls.load(Ordering::SeqCst), 1);
    assert!(!c.is_in_flight(s.id));
  }

  #[tokio::test]
  async fn approval_waits_out_a_request_more_in_progress() {
    let gate = Arc::new(Notify::new());
    let mut store = MemStore::new();
    store.request_gate = Some(gate.clone());
    let c = Arc::new(controller(store, StubPinner::ok("bafy123"), StubChain::minting(TX)));
    let s = c.submit_new(scenario_input()).await.unwrap();

    let returning = tokio::spawn({
      let c = c.clone();
      async move { c.request_more_data(s.id, "add soil samples").await }
    });
    while c.store().request_calls.load(Ordering::SeqCst) == 0 {
      tokio::time::sleep(Duration::from_millis(1)).await;
    }

    assert!(matches!(
      c.approve_submission(s.id, "250").await,
      Err(Error::ApprovalInFlight(_))
    ));
    assert_eq!(c.pinner.calls.load(Ordering::SeqCst), 0);
    assert_eq!(c.minter().executor().calls.load(Ordering::SeqCst), 0);

    gate.notify_one();
    let returned = returning.await.unwrap().unwrap();
    assert_eq!(returned.status(), SubmissionStatus::NeedsData);
    assert!(!c.is_in_flight(s.id));
  }

  // ── request_more_data / resubmit ──────────────────────────────────────────

  #[tokio::test]
  async fn request_more_scenario() {
    let c = controller(MemStore::new(), StubPinner::ok("bafy123"), StubChain::minting(TX));
    let s = c.submit_new(scenario_input()).await.unwrap();

    let returned = c.request_more_data(s.id, "add soil samples").await.unwrap();
    assert_eq!(returned.id, s.id);
    assert_eq!(returned.status(), SubmissionStatus::NeedsData);
    assert_eq!(returned.review_note(), Some("add soil samples"));
    assert_eq!(returned.revisions, 1);

    let ledger = c.store().snapshot().await.unwrap();
    assert!(ledger.pending().is_empty());
    assert_eq!(ledger.feedback()[0].id, s.id);

    assert!(matches!(
      c.request_more_data(s.id, "again").await,
      Err(Error::NotPending { status: SubmissionStatus::NeedsData, .. })
    ));
    assert!(matches!(
      c.request_more_data(s.id, "  ").await,
      Err(Error::Validation(_))
    ));
  }

  #[tokio::test]
  async fn resubmit_carries_fields_and_revisions() {
    let c = controller(MemStore::new(), StubPinner::ok("bafy123"), StubChain::minting(TX));
    let mut input = scenario_input();
    input.biomass = Some("10".into());
    input.files = vec![EvidenceFile { name: "a.jpg".into(), size: 1 }];
    let s = c.submit_new(input).await.unwrap();
    c.request_more_data(s.id, "add soil samples").await.unwrap();

    let again = c
      .resubmit(
        s.id,
        Resubmission {
          soil_carbon: Some("4.5".into()),
          files: vec![EvidenceFile { name: "core.csv".into(), size: 2 }],
          ..Default::default()
        },
      )
      .await
      .unwrap();

    assert_ne!(again.id, s.id);
    assert!(again.is_pending());
    assert_eq!(again.revisions, 1);
    assert_eq!(again.fields.project_id, "P1");
    assert_eq!(again.fields.biomass, Some(10.0));
    assert_eq!(again.fields.soil_carbon, Some(4.5));
    assert_eq!(again.fields.files.len(), 2);

    let ledger = c.store().snapshot().await.unwrap();
    assert_eq!(ledger.feedback()[0].id, s.id);
    assert_eq!(ledger.pending()[0].id, again.id);
    assert!(ledger.is_consistent());

    c.request_more_data(again.id, "still thin").await.unwrap();
    assert_eq!(c.store().get(again.id).await.unwrap().unwrap().revisions, 2);
  }

  #[tokio::test]
  async fn resubmit_requires_returned_entry() {
    let c = controller(MemStore::new(), StubPinner::ok("bafy123"), StubChain::minting(TX));
    let s = c.submit_new(scenario_input()).await.unwrap();
    assert!(matches!(
      c.resubmit(s.id, Resubmission::default()).await,
      Err(Error::Validation(_))
    ));
  }

  #[tokio::test]
  async fn every_mutation_notifies_observers() {
    let c = controller(MemStore::new(), StubPinner::ok("bafy123"), StubChain::minting(TX));
    let mut rx = c.store().subscribe();
    let before = *rx.borrow_and_update();

    c.submit_new(scenario_input()).await.unwrap();
    assert!(rx.has_changed().unwrap());
    assert!(*rx.borrow_and_update() > before);
  }
}
