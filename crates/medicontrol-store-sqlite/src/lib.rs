//! SQLite backend for the MediControl inventory.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. SQL text is not embedded here: it is
//! loaded from a directory of `.sql` files into a [`QueryRegistry`].

mod encode;
mod schema;
mod store;

pub mod error;
pub mod queries;
pub mod seed;

pub use error::{Error, Result};
pub use queries::{CRITICAL_QUERIES, QueryRegistry};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
