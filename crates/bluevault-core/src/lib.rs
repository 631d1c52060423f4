//! Core types and trait definitions for BlueVault.
//!
//! This crate owns the submission data model, the partitioned ledger that
//! backs every store, and the lifecycle controller that couples approval to
//! evidence pinning and token minting. It is free of HTTP and database
//! dependencies; backends plug in through the traits in [`store`],
//! [`pinning`] and [`mint`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
#![allow(async_fn_in_trait)]

pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod mint;
pub mod pinning;
pub mod store;
pub mod submission;

pub use error::{Error, Result};
