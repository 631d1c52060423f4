//! `bluevault`: command-line client for contributors and reviewers.
//!
//! # Usage
//!
//! ```text
//! bluevault submit --project-id P1 --ecosystem mangrove --lat 10 --lng 20
//! bluevault list
//! bluevault --role reviewer approve <id> --tokens 250
//! bluevault --role reviewer request-more <id> --note "add soil samples"
//! bluevault resubmit <id> --soil-carbon 4.5 --file core-samples.csv
//! ```

mod client;
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use bluevault_core::{
  lifecycle::{NewSubmission, Resubmission},
  submission::{Coordinate, EcosystemType, EvidenceFile, Submission},
};
use clap::{Parser, Subcommand, ValueEnum};
use client::ApiClient;
use config::{ConfigFile, Role, Settings};
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "bluevault", about = "Submit and review blue-carbon evidence")]
struct Args {
  /// Path to a TOML config file (url, role).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the BlueVault server (default: http://localhost:3001).
  #[arg(long, env = "BLUEVAULT_URL")]
  url: Option<String>,

  /// Act as a contributor or a reviewer.
  #[arg(long, env = "BLUEVAULT_ROLE", value_enum)]
  role: Option<Role>,

  /// Print raw JSON instead of a summary.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Check that the server is up.
  Health,
  /// List submissions, optionally only one partition.
  List {
    #[arg(long, value_enum)]
    status: Option<StatusFilter>,
  },
  /// Show one submission.
  Show { id: Uuid },
  /// Submit new evidence for review.
  Submit {
    /// Left blank, the server assigns the next serial.
    #[arg(long)]
    project_id:  Option<String>,
    #[arg(long)]
    ecosystem:   EcosystemType,
    #[arg(long, allow_hyphen_values = true)]
    lat:         String,
    #[arg(long, allow_hyphen_values = true)]
    lng:         String,
    /// Above-ground biomass in tons.
    #[arg(long)]
    biomass:     Option<String>,
    /// Soil organic carbon in tons.
    #[arg(long)]
    soil_carbon: Option<String>,
    #[arg(long)]
    wallet:      Option<String>,
    /// Boundary vertices as `lat,lng lat,lng lat,lng…` (at least three).
    #[arg(long, allow_hyphen_values = true)]
    area:        Option<String>,
    /// Evidence file; only its name and size are sent.
    #[arg(long = "file", value_name = "PATH")]
    files:       Vec<PathBuf>,
    #[arg(long, default_value = "")]
    description: String,
  },
  /// Send returned evidence back for review as a new submission.
  Resubmit {
    id:          Uuid,
    #[arg(long)]
    biomass:     Option<String>,
    #[arg(long)]
    soil_carbon: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    lat:         Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    lng:         Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    area:        Option<String>,
    #[arg(long = "file", value_name = "PATH")]
    files:       Vec<PathBuf>,
    #[arg(long)]
    description: Option<String>,
  },
  /// Approve a pending submission: pin its record and mint tokens.
  Approve {
    id:     Uuid,
    #[arg(long)]
    tokens: String,
  },
  /// Return a pending submission to its contributor.
  RequestMore {
    id:   Uuid,
    #[arg(long)]
    note: String,
  },
  /// Mint directly against an evidence CID.
  Mint {
    #[arg(long)]
    recipient: String,
    #[arg(long)]
    amount:    String,
    #[arg(long)]
    ipfs_hash: String,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StatusFilter {
  Pending,
  Approved,
  NeedsData,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  let file_cfg = match &args.config {
    Some(path) => ConfigFile::read(path)?,
    None => ConfigFile::default(),
  };
  let settings = Settings::resolve(args.url, args.role, file_cfg);
  let client = ApiClient::new(&settings.base_url)?;

  match args.command {
    Command::Health => {
      let health = client.health().await?;
      println!("{}: {}", health.status, health.message);
    }

    Command::List { status } => {
      let ledger = client.list().await?;
      let partitions = [
        (StatusFilter::Pending, "Pending", ledger.pending()),
        (StatusFilter::Approved, "Approved", ledger.approvals()),
        (StatusFilter::NeedsData, "Needs Data", ledger.feedback()),
      ];
      for (filter, title, subs) in partitions {
        if status.is_some_and(|s| s != filter) {
          continue;
        }
        if args.json {
          println!("{}", serde_json::to_string_pretty(subs)?);
          continue;
        }
        println!("── {title} ({}) ──", subs.len());
        for s in subs {
          println!("{}", summary_line(s));
        }
      }
    }

    Command::Show { id } => print_submission(&client.get(id).await?, args.json)?,

    Command::Submit {
      project_id,
      ecosystem,
      lat,
      lng,
      biomass,
      soil_carbon,
      wallet,
      area,
      files,
      description,
    } => {
      let input = NewSubmission {
        project_id,
        wallet,
        ecosystem_type: ecosystem,
        biomass,
        soil_carbon,
        latitude: lat,
        longitude: lng,
        area: area.as_deref().map(parse_area).transpose()?,
        files: evidence_files(&files).await?,
        description,
      };
      let created = client.submit(&input).await?;
      print_submission(&created, args.json)?;
    }

    Command::Resubmit {
      id,
      biomass,
      soil_carbon,
      lat,
      lng,
      area,
      files,
      description,
    } => {
      let changes = Resubmission {
        biomass,
        soil_carbon,
        latitude: lat,
        longitude: lng,
        area: area.as_deref().map(parse_area).transpose()?,
        files: evidence_files(&files).await?,
        description,
      };
      let created = client.resubmit(id, &changes).await?;
      print_submission(&created, args.json)?;
    }

    Command::Approve { id, tokens } => {
      settings.require_reviewer("approve")?;
      let outcome = client.approve(id, &tokens).await?;
      if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
      } else {
        println!("approved {} ({} tokens)", outcome.submission.fields.project_id, tokens);
        println!("  ipfs: {}", outcome.cid);
        println!("  tx:   {}", outcome.tx_hash);
      }
    }

    Command::RequestMore { id, note } => {
      settings.require_reviewer("request-more")?;
      let returned = client.request_more(id, &note).await?;
      print_submission(&returned, args.json)?;
    }

    Command::Mint { recipient, amount, ipfs_hash } => {
      settings.require_reviewer("mint")?;
      let reply = client.mint(&recipient, &amount, &ipfs_hash).await?;
      println!("{}", reply.transaction_hash);
    }
  }

  Ok(())
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn summary_line(s: &Submission) -> String {
  let mut line = format!(
    "{}  {:<12} {:<17} rev {}",
    s.id,
    s.fields.project_id,
    s.fields.ecosystem_type.to_string(),
    s.revisions
  );
  if let (Some(tokens), Some(tx)) = (s.tokens_awarded(), s.tx_hash()) {
    line.push_str(&format!("  {tokens} BVT  {tx}"));
  }
  if let Some(note) = s.review_note() {
    line.push_str(&format!("  “{note}”"));
  }
  line
}

fn print_submission(s: &Submission, json: bool) -> Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(s)?);
    return Ok(());
  }
  println!("{}", summary_line(s));
  println!("  status:    {}", s.status());
  println!("  location:  {}, {}", s.fields.latitude, s.fields.longitude);
  if let Some(b) = s.fields.biomass {
    println!("  biomass:   {b} t");
  }
  if let Some(c) = s.fields.soil_carbon {
    println!("  soil C:    {c} t");
  }
  for f in &s.fields.files {
    println!("  file:      {} ({} bytes)", f.name, f.size);
  }
  if let Some(cid) = s.ipfs_cid() {
    println!("  ipfs:      {cid}");
  }
  Ok(())
}

/// Parse `lat,lng lat,lng …`.
fn parse_area(raw: &str) -> Result<Vec<Coordinate>> {
  let points = raw
    .split_whitespace()
    .map(|pair| {
      let (lat, lng) = pair
        .split_once(',')
        .with_context(|| format!("area vertex {pair:?} is not `lat,lng`"))?;
      Ok(Coordinate(
        lat.trim().parse().with_context(|| format!("bad latitude in {pair:?}"))?,
        lng.trim().parse().with_context(|| format!("bad longitude in {pair:?}"))?,
      ))
    })
    .collect::<Result<Vec<_>>>()?;
  if points.len() < 3 {
    bail!("an area needs at least three vertices, got {}", points.len());
  }
  Ok(points)
}

async fn evidence_files(paths: &[PathBuf]) -> Result<Vec<EvidenceFile>> {
  let mut files = Vec::with_capacity(paths.len());
  for path in paths {
    let meta = tokio::fs::metadata(path)
      .await
      .with_context(|| format!("reading {}", path.display()))?;
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .with_context(|| format!("{} has no file name", path.display()))?;
    files.push(EvidenceFile { name, size: meta.len() });
  }
  Ok(files)
}
