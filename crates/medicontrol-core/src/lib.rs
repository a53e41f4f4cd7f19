//! Core types and trait definitions for the MediControl inventory.
//!
//! This crate has no HTTP or database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in trait impls (stabilised in Rust
// 1.75). Suppress the advisory lint about `Send` bounds on returned futures.
#![allow(async_fn_in_trait)]

pub mod category;
pub mod error;
pub mod medication;
pub mod movement;
pub mod registry;
pub mod sale;
pub mod store;

mod serde_ext;

pub use error::{Error, ErrorKind, Result, StoreError};
