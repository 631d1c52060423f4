//! SQLite backend for the BlueVault submission store.
//!
//! The whole ledger lives in memory behind an async lock and is written back
//! to a single namespaced row after every mutation. Database access runs on
//! [`tokio_rusqlite`]'s dedicated thread so it never blocks the runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{DEFAULT_NAMESPACE, SqliteStore};
