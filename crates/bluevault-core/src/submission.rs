//! Submission types: the unit of evidence a contributor sends for review.
//!
//! Field names serialise in camelCase so persisted blobs and API payloads
//! keep the shape reviewers' tooling already reads.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Classification ──────────────────────────────────────────────────────────

/// The restoration ecosystem a project belongs to.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum EcosystemType {
  #[default]
  Mangrove,
  Forest,
  #[serde(rename = "Seagrass Meadows")]
  #[strum(to_string = "Seagrass Meadows", serialize = "seagrass")]
  SeagrassMeadows,
  Wetland,
}

// ─── Evidence ────────────────────────────────────────────────────────────────

/// Metadata for an uploaded evidence file. File content never enters the
/// store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceFile {
  pub name: String,
  /// Size in bytes.
  pub size: u64,
}

/// A `[latitude, longitude]` pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate(pub f64, pub f64);

impl Coordinate {
  pub fn lat(&self) -> f64 { self.0 }

  pub fn lng(&self) -> f64 { self.1 }
}

/// A project boundary polygon. Always holds at least three vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Coordinate>", into = "Vec<Coordinate>")]
pub struct Area(Vec<Coordinate>);

impl Area {
  pub const MIN_VERTICES: usize = 3;

  /// Returns `None` when fewer than [`Area::MIN_VERTICES`] points are given.
  pub fn new(points: Vec<Coordinate>) -> Option<Self> {
    (points.len() >= Self::MIN_VERTICES).then_some(Self(points))
  }

  pub fn vertices(&self) -> &[Coordinate] { &self.0 }
}

impl TryFrom<Vec<Coordinate>> for Area {
  type Error = String;

  fn try_from(points: Vec<Coordinate>) -> std::result::Result<Self, String> {
    let n = points.len();
    Self::new(points)
      .ok_or_else(|| format!("an area needs at least 3 vertices, got {n}"))
  }
}

impl From<Area> for Vec<Coordinate> {
  fn from(area: Area) -> Self { area.0 }
}

// ─── Token amount ────────────────────────────────────────────────────────────

/// A positive decimal token quantity, kept as text so no precision is lost on
/// its way to the chain.
///
/// Normalised on construction: `"0250.50"` and `"250.5"` are the same amount.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenAmount(String);

impl TokenAmount {
  pub fn parse(raw: &str) -> Result<Self> {
    let raw = raw.trim();
    let (int, frac) = match raw.split_once('.') {
      Some((i, f)) => (i, f),
      None => (raw, ""),
    };
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if raw.is_empty() || (int.is_empty() && frac.is_empty()) {
      return Err(Error::Validation("token amount is missing".into()));
    }
    if !digits(int) || !digits(frac) {
      return Err(Error::Validation(format!(
        "token amount {raw:?} is not a decimal number"
      )));
    }

    let int = int.trim_start_matches('0');
    let frac = frac.trim_end_matches('0');
    if int.is_empty() && frac.is_empty() {
      return Err(Error::Validation("token amount must be positive".into()));
    }

    let int = if int.is_empty() { "0" } else { int };
    let normalised = if frac.is_empty() {
      int.to_owned()
    } else {
      format!("{int}.{frac}")
    };
    Ok(Self(normalised))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for TokenAmount {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl FromStr for TokenAmount {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

impl TryFrom<String> for TokenAmount {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { Self::parse(&s) }
}

impl From<TokenAmount> for String {
  fn from(t: TokenAmount) -> Self { t.0 }
}

// ─── Fields ──────────────────────────────────────────────────────────────────

/// Everything the contributor supplied. Carried verbatim through every
/// lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionFields {
  /// Human-assigned or serial project identifier; not globally unique.
  pub project_id:     String,
  /// Contributor wallet address, if one was connected.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub wallet:         Option<String>,
  pub ecosystem_type: EcosystemType,
  /// Above-ground biomass in tons.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub biomass:        Option<f64>,
  /// Soil organic carbon in tons.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub soil_carbon:    Option<f64>,
  pub latitude:       String,
  pub longitude:      String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub area:           Option<Area>,
  #[serde(default)]
  pub files:          Vec<EvidenceFile>,
  #[serde(default)]
  pub description:    String,
}

// ─── Lifecycle state ─────────────────────────────────────────────────────────

/// The flat status label of a submission.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
)]
pub enum SubmissionStatus {
  Pending,
  Approved,
  #[serde(rename = "Needs Data")]
  #[strum(to_string = "Needs Data")]
  NeedsData,
}

/// The lifecycle state of a submission. Each variant carries only the fields
/// valid in that state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum SubmissionState {
  Pending,
  #[serde(rename_all = "camelCase")]
  Approved {
    tokens_awarded: TokenAmount,
    ipfs_cid:       String,
    tx_hash:        String,
    approved_at:    DateTime<Utc>,
  },
  #[serde(rename = "Needs Data", rename_all = "camelCase")]
  NeedsData { review_note: String },
}

impl SubmissionState {
  pub fn status(&self) -> SubmissionStatus {
    match self {
      Self::Pending => SubmissionStatus::Pending,
      Self::Approved { .. } => SubmissionStatus::Approved,
      Self::NeedsData { .. } => SubmissionStatus::NeedsData,
    }
  }
}

/// The enrichment a reviewer approval adds to a pending submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Approval {
  pub tokens_awarded: TokenAmount,
  pub ipfs_cid:       String,
  pub tx_hash:        String,
  pub approved_at:    DateTime<Utc>,
}

impl From<Approval> for SubmissionState {
  fn from(a: Approval) -> Self {
    Self::Approved {
      tokens_awarded: a.tokens_awarded,
      ipfs_cid:       a.ipfs_cid,
      tx_hash:        a.tx_hash,
      approved_at:    a.approved_at,
    }
  }
}

// ─── Submission ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
  /// Generated at creation; never changes.
  pub id:         Uuid,
  pub created_at: DateTime<Utc>,
  #[serde(flatten)]
  pub fields:     SubmissionFields,
  /// How many times this line of evidence was sent back for more data.
  #[serde(default)]
  pub revisions:  u32,
  #[serde(flatten)]
  pub state:      SubmissionState,
}

impl Submission {
  /// A fresh pending submission with a new id.
  pub fn pending(fields: SubmissionFields, revisions: u32) -> Self {
    Self {
      id: Uuid::new_v4(),
      created_at: Utc::now(),
      fields,
      revisions,
      state: SubmissionState::Pending,
    }
  }

  pub fn status(&self) -> SubmissionStatus { self.state.status() }

  pub fn is_pending(&self) -> bool { matches!(self.state, SubmissionState::Pending) }

  pub fn ipfs_cid(&self) -> Option<&str> {
    match &self.state {
      SubmissionState::Approved { ipfs_cid, .. } => Some(ipfs_cid),
      _ => None,
    }
  }

  pub fn tx_hash(&self) -> Option<&str> {
    match &self.state {
      SubmissionState::Approved { tx_hash, .. } => Some(tx_hash),
      _ => None,
    }
  }

  pub fn tokens_awarded(&self) -> Option<&TokenAmount> {
    match &self.state {
      SubmissionState::Approved { tokens_awarded, .. } => Some(tokens_awarded),
      _ => None,
    }
  }

  pub fn review_note(&self) -> Option<&str> {
    match &self.state {
      SubmissionState::NeedsData { review_note } => Some(review_note),
      _ => None,
    }
  }
}
