//! Conversions between the in-memory [`Ledger`] and its persisted row.

use bluevault_core::ledger::{Ledger, SCHEMA_VERSION};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;

use crate::{Error, Result};

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn encode_ledger(ledger: &Ledger) -> Result<String> {
  Ok(serde_json::to_string(ledger)?)
}

/// Decode a persisted row. Anything other than a consistent ledger at the
/// current schema version is an error.
pub fn decode_ledger(version: u32, body: &str) -> Result<Ledger> {
  if version != SCHEMA_VERSION {
    return Err(Error::VersionMismatch { found: version, expected: SCHEMA_VERSION });
  }
  let ledger: Ledger = serde_json::from_str(body)?;
  if !ledger.is_consistent() {
    return Err(Error::Inconsistent);
  }
  Ok(ledger)
}

/// Decode the raw `version` and `body` columns. SQLite does not enforce
/// column types, so a hand-edited row may hold anything.
pub fn decode_row(version: Value, body: Value) -> Result<Ledger> {
  let version = match version {
    Value::Integer(v) => u32::try_from(v)
      .map_err(|_| Error::Malformed(format!("schema version {v} is out of range")))?,
    other => {
      return Err(Error::Malformed(format!(
        "schema version is {}, not an integer",
        other.data_type()
      )));
    }
  };
  let body = match body {
    Value::Text(text) => text,
    Value::Blob(bytes) => String::from_utf8(bytes)
      .map_err(|_| Error::Malformed("body is not valid UTF-8".into()))?,
    other => {
      return Err(Error::Malformed(format!("body is {}, not text", other.data_type())));
    }
  };
  decode_ledger(version, &body)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_ledger_roundtrips() {
    let body = encode_ledger(&Ledger::new()).unwrap();
    assert_eq!(decode_ledger(SCHEMA_VERSION, &body).unwrap(), Ledger::new());
  }

  #[test]
  fn wrong_version_is_rejected() {
    let body = encode_ledger(&Ledger::new()).unwrap();
    assert!(matches!(
      decode_ledger(SCHEMA_VERSION + 1, &body),
      Err(Error::VersionMismatch { .. })
    ));
  }

  #[test]
  fn garbage_is_rejected() {
    assert!(matches!(decode_ledger(SCHEMA_VERSION, "{not json"), Err(Error::Json(_))));
    assert!(matches!(decode_ledger(SCHEMA_VERSION, "[1, 2]"), Err(Error::Json(_))));
  }

  #[test]
  fn mistyped_columns_are_malformed() {
    let body = encode_ledger(&Ledger::new()).unwrap();
    for (version, body) in [
      (Value::Integer(-1), Value::Text(body.clone())),
      (Value::Integer(i64::from(u32::MAX) + 1), Value::Text(body.clone())),
      (Value::Text("one".into()), Value::Text(body.clone())),
      (Value::Integer(SCHEMA_VERSION.into()), Value::Blob(vec![0xff, 0x00])),
      (Value::Integer(SCHEMA_VERSION.into()), Value::Null),
    ] {
      assert!(matches!(decode_row(version, body), Err(Error::Malformed(_))));
    }
  }

  #[test]
  fn utf8_blob_body_decodes() {
    let body = encode_ledger(&Ledger::new()).unwrap();
    let ledger =
      decode_row(Value::Integer(SCHEMA_VERSION.into()), Value::Blob(body.into_bytes())).unwrap();
    assert_eq!(ledger, Ledger::new());
  }
}
