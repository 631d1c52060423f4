//! [`SqliteStore`]: the SQLite implementation of [`SubmissionStore`].

use std::{path::Path, sync::Arc};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value};
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, warn};
use uuid::Uuid;

use bluevault_core::{
  ledger::{Ledger, SCHEMA_VERSION},
  store::SubmissionStore,
  submission::{Approval, Submission},
};

use crate::{
  Result,
  encode::{decode_row, encode_dt, encode_ledger},
  schema::SCHEMA,
};

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "bluevault-submissions";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A BlueVault submission store backed by one row of a SQLite file.
///
/// Cloning is cheap; clones share the connection, the in-memory ledger and
/// the change channel.
#[derive(Clone)]
pub struct SqliteStore {
  conn:      tokio_rusqlite::Connection,
  namespace: Arc<str>,
  ledger:    Arc<Mutex<Ledger>>,
  changes:   Arc<watch::Sender<u64>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` under [`DEFAULT_NAMESPACE`].
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with_namespace(path, DEFAULT_NAMESPACE).await
  }

  pub async fn open_with_namespace(
    path: impl AsRef<Path>,
    namespace: &str,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, namespace).await
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, DEFAULT_NAMESPACE).await
  }

  pub fn namespace(&self) -> &str { &self.namespace }

  async fn init(conn: tokio_rusqlite::Connection, namespace: &str) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;

    let ledger = load(&conn, namespace).await?;
    debug!(
      namespace,
      pending = ledger.pending().len(),
      approvals = ledger.approvals().len(),
      feedback = ledger.feedback().len(),
      "submission store opened"
    );

    Ok(Self {
      conn,
      namespace: namespace.into(),
      ledger: Arc::new(Mutex::new(ledger)),
      changes: Arc::new(watch::channel(0).0),
    })
  }

  /// Run `f` against the ledger under the lock. When it reports a change,
  /// the new state is persisted and subscribers are notified before the lock
  /// is released.
  async fn transition<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut Ledger) -> Result<(T, bool)> + Send,
    T: Send,
  {
    let mut ledger = self.ledger.lock().await;
    let (out, changed) = f(&mut ledger)?;
    if changed {
      self.persist(&ledger).await;
      self.changes.send_modify(|rev| *rev += 1);
    }
    Ok(out)
  }

  /// Write the full ledger to its row. Failures are logged, not returned:
  /// the in-memory ledger stays authoritative and the next successful write
  /// catches the row up.
  async fn persist(&self, ledger: &Ledger) {
    let body = match encode_ledger(ledger) {
      Ok(body) => body,
      Err(e) => {
        error!(namespace = %self.namespace, error = %e, "failed to encode ledger");
        return;
      }
    };
    let namespace = self.namespace.to_string();
    let at = encode_dt(Utc::now());

    let written = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO state_blobs (namespace, version, body, updated_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(namespace) DO UPDATE SET
             version    = excluded.version,
             body       = excluded.body,
             updated_at = excluded.updated_at",
          rusqlite::params![namespace, SCHEMA_VERSION, body, at],
        )?;
        Ok(())
      })
      .await;

    if let Err(e) = written {
      error!(namespace = %self.namespace, error = %e, "failed to persist ledger");
    }
  }
}

/// Read the namespace's row. A missing row is an empty ledger; so is an
/// unreadable one, with a warning.
async fn load(conn: &tokio_rusqlite::Connection, namespace: &str) -> Result<Ledger> {
  let ns = namespace.to_owned();
  let row: Option<(Value, Value)> = conn
    .call(move |conn| {
      let row = conn
        .query_row(
          "SELECT version, body FROM state_blobs WHERE namespace = ?1",
          rusqlite::params![ns],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
      Ok(row)
    })
    .await?;

  let Some((version, body)) = row else {
    return Ok(Ledger::new());
  };

  match decode_row(version, body) {
    Ok(ledger) => Ok(ledger),
    Err(e) => {
      warn!(namespace, error = %e, "discarding unreadable persisted state; starting empty");
      Ok(Ledger::new())
    }
  }
}

// ─── SubmissionStore impl ────────────────────────────────────────────────────

impl SubmissionStore for SqliteStore {
  type Error = crate::Error;

  async fn add(&self, submission: Submission) -> Result<Submission> {
    self
      .transition(|ledger| Ok((ledger.add(submission)?.clone(), true)))
      .await
  }

  async fn approve(&self, id: Uuid, approval: Approval) -> Result<Option<Submission>> {
    self
      .transition(|ledger| {
        let approved = ledger.approve(id, approval).cloned();
        let changed = approved.is_some();
        Ok((approved, changed))
      })
      .await
  }

  async fn request_more(&self, id: Uuid, note: String) -> Result<Option<Submission>> {
    self
      .transition(|ledger| {
        let returned = ledger.request_more(id, note).cloned();
        let changed = returned.is_some();
        Ok((returned, changed))
      })
      .await
  }

  async fn get(&self, id: Uuid) -> Result<Option<Submission>> {
    Ok(self.ledger.lock().await.get(id).cloned())
  }

  async fn snapshot(&self) -> Result<Ledger> { Ok(self.ledger.lock().await.clone()) }

  async fn allocate_project_serial(&self) -> Result<u64> {
    self
      .transition(|ledger| Ok((ledger.allocate_project_serial(), true)))
      .await
  }

  fn subscribe(&self) -> watch::Receiver<u64> { self.changes.subscribe() }
}
