//! The stdout protocol of the legacy mint script.
//!
//! A successful run prints either `Transaction hash: 0x<64 hex>` or
//! `SUCCESS:<tx id>`. The labelled hash wins when both appear.

const HASH_LABEL: &str = "Transaction hash:";
const SUCCESS_LABEL: &str = "SUCCESS:";

/// Extract the transaction id from mint script output, if it reports one.
pub fn parse_legacy_output(stdout: &str) -> Option<String> {
  labelled_hash(stdout)
    .or_else(|| success_token(stdout))
    .map(str::to_owned)
}

fn labelled_hash(out: &str) -> Option<&str> {
  out.match_indices(HASH_LABEL).find_map(|(at, _)| {
    let rest = out[at + HASH_LABEL.len()..].trim_start_matches([' ', '\t']);
    let candidate = rest.get(..66)?;
    let digits = candidate.strip_prefix("0x")?;
    let well_formed = digits.chars().all(|c| c.is_ascii_hexdigit())
      && !rest[66..].starts_with(|c: char| c.is_ascii_hexdigit());
    well_formed.then_some(candidate)
  })
}

/// The first whitespace-delimited token after the label.
fn success_token(out: &str) -> Option<&str> {
  out
    .match_indices(SUCCESS_LABEL)
    .find_map(|(at, _)| out[at + SUCCESS_LABEL.len()..].split_whitespace().next())
}
