//! Client settings: command-line flags over environment over the optional
//! TOML file over defaults.
//!
//! ```toml
//! url  = "http://localhost:3001"
//! role = "reviewer"
//! ```

use std::path::Path;

use anyhow::{Context as _, Result};
use serde::Deserialize;

pub const DEFAULT_URL: &str = "http://localhost:3001";

/// Who is driving the client. Only reviewers may approve, return or mint;
/// the check happens here, not on the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[default]
  Contributor,
  Reviewer,
}

/// Shape of the optional TOML config file.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
  #[serde(default)]
  pub url:  Option<String>,
  #[serde(default)]
  pub role: Option<Role>,
}

impl ConfigFile {
  pub fn read(path: &Path) -> Result<Self> {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
  pub base_url: String,
  pub role:     Role,
}

impl Settings {
  /// `url` and `role` are the flag-or-env values clap resolved.
  pub fn resolve(url: Option<String>, role: Option<Role>, file: ConfigFile) -> Self {
    Self {
      base_url: url
        .or(file.url)
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_URL.to_owned()),
      role:     role.or(file.role).unwrap_or_default(),
    }
  }

  pub fn require_reviewer(&self, action: &str) -> Result<()> {
    if self.role != Role::Reviewer {
      anyhow::bail!("`{action}` is a reviewer action; run with --role reviewer");
    }
    Ok(())
  }
}
