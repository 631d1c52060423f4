//! Server configuration.
//!
//! Layered from an optional TOML file under `BLUEVAULT_*` environment
//! variables. Nested keys use `__`, e.g. `BLUEVAULT_MINT__TIMEOUT_SECS=90`.
//!
//! ```toml
//! recipient  = "0x6c3aa30bdd2dE5383f8aF12CA3B3bEb8a9A2F255"
//! port       = 3001
//! store_path = "~/.local/share/bluevault/bluevault.db"
//!
//! [pinning]
//! backend = "pinata"
//! jwt     = "eyJ…"
//!
//! [mint]
//! executor    = "script"
//! network     = "polygon_amoy"
//! working_dir = "/srv/bluevault-contracts"
//! ```

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context as _, bail};
use bluevault_mint::{AnyExecutor, DEFAULT_NETWORK, HttpExecutor, ScriptExecutor};
use bluevault_pinning::{AnyPinner, DEFAULT_PINATA_URL, LocalPinStore, PinataPinner};
use bluevault_store_sqlite::DEFAULT_NAMESPACE;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "BLUEVAULT";

// ─── Top level ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default = "default_namespace")]
  pub namespace:  String,
  /// Every approval mints to this address.
  pub recipient:  String,
  /// Allow cross-origin requests from any origin.
  #[serde(default = "default_true")]
  pub cors:       bool,
  #[serde(default)]
  pub pinning:    PinningConfig,
  #[serde(default)]
  pub mint:       MintConfig,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 3001 }

fn default_store_path() -> PathBuf { PathBuf::from("bluevault.db") }

fn default_namespace() -> String { DEFAULT_NAMESPACE.into() }

fn default_true() -> bool { true }

// ─── Pinning ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinningBackend {
  Pinata,
  #[default]
  Local,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PinningConfig {
  #[serde(default)]
  pub backend:  PinningBackend,
  /// Pinata JWT; required for the `pinata` backend.
  #[serde(default)]
  pub jwt:      Option<String>,
  #[serde(default = "default_pinata_url")]
  pub base_url: String,
  /// Directory for the `local` backend.
  #[serde(default = "default_pin_dir")]
  pub dir:      PathBuf,
}

impl Default for PinningConfig {
  fn default() -> Self {
    Self {
      backend:  PinningBackend::default(),
      jwt:      None,
      base_url: default_pinata_url(),
      dir:      default_pin_dir(),
    }
  }
}

fn default_pinata_url() -> String { DEFAULT_PINATA_URL.into() }

fn default_pin_dir() -> PathBuf { PathBuf::from("pins") }

impl PinningConfig {
  pub fn build(&self) -> anyhow::Result<AnyPinner> {
    Ok(match self.backend {
      PinningBackend::Pinata => {
        let Some(jwt) = self.jwt.as_deref().filter(|j| !j.trim().is_empty()) else {
          bail!("pinning.jwt is required for the pinata backend");
        };
        AnyPinner::Pinata(
          PinataPinner::new(jwt)
            .context("failed to build Pinata client")?
            .with_base_url(&self.base_url),
        )
      }
      PinningBackend::Local => AnyPinner::Local(LocalPinStore::new(expand_tilde(&self.dir))),
    })
  }
}

// ─── Minting ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
  #[default]
  Script,
  Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MintConfig {
  #[serde(default)]
  pub executor:     ExecutorKind,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  /// Hardhat network for the default script command.
  #[serde(default = "default_network")]
  pub network:      String,
  /// Overrides the hardhat command entirely.
  #[serde(default)]
  pub program:      Option<String>,
  #[serde(default)]
  pub args:         Vec<String>,
  #[serde(default)]
  pub working_dir:  Option<PathBuf>,
  /// Full mint URL for the `http` executor.
  #[serde(default)]
  pub endpoint:     Option<String>,
}

impl Default for MintConfig {
  fn default() -> Self {
    Self {
      executor:     ExecutorKind::default(),
      timeout_secs: default_timeout_secs(),
      network:      default_network(),
      program:      None,
      args:         Vec::new(),
      working_dir:  None,
      endpoint:     None,
    }
  }
}

fn default_timeout_secs() -> u64 { 60 }

fn default_network() -> String { DEFAULT_NETWORK.into() }

impl MintConfig {
  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }

  pub fn build(&self) -> anyhow::Result<AnyExecutor> {
    Ok(match self.executor {
      ExecutorKind::Script => {
        let script = match &self.program {
          Some(program) => ScriptExecutor::new(program, self.args.iter().cloned()),
          None => ScriptExecutor::hardhat(&self.network),
        };
        AnyExecutor::Script(match &self.working_dir {
          Some(dir) => script.in_dir(expand_tilde(dir)),
          None => script,
        })
      }
      ExecutorKind::Http => {
        let Some(endpoint) = self.endpoint.as_deref() else {
          bail!("mint.endpoint is required for the http executor");
        };
        AnyExecutor::Http(
          HttpExecutor::new(endpoint)
            .context("failed to build mint HTTP client")?
            .with_remote_timeout(self.timeout()),
        )
      }
    })
  }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

impl ServerConfig {
  /// Read `path` (if it exists) and overlay the process environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    Self::from_sources(config::File::from(path).required(false), None)
  }

  fn from_sources<F>(
    file: F,
    env: Option<config::Map<String, String>>,
  ) -> anyhow::Result<Self>
  where
    F: config::Source + Send + Sync + 'static,
  {
    let settings = config::Config::builder()
      .add_source(file)
      .add_source(
        config::Environment::with_prefix(ENV_PREFIX)
          .prefix_separator("_")
          .separator("__")
          .source(env),
      )
      .build()
      .context("failed to read configuration")?;

    let cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    if cfg.recipient.trim().is_empty() {
      bail!("recipient must not be empty");
    }
    Ok(cfg)
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
