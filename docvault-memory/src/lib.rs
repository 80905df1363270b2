//! In-memory backend for docvault.
//!
//! This crate provides a thread-safe, in-memory implementation of the `Connector` and
//! `SessionBackend` traits. It is meant for tests and local development: it needs no running
//! database yet behaves like one for every operation the record store performs.
//!
//! # Features
//!
//! - **Shared clusters** - Sessions dialed for the same servers string see the same data
//! - **Filter evaluation** - Equality, comparison and logical operators on BSON documents
//! - **Session accounting** - Dials and open session copies are counted for inspection
//! - **Unreachable hosts** - Simulated dial failures for configured hosts
//!
//! # Quick Start
//!
//! ```ignore
//! use docvault::prelude::*;
//! use docvault::memory::MemoryConnector;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RecordStore::new(MemoryConnector::new());
//!
//!     let mut user = User { id: None, name: "Alice".to_string() };
//!     store.create(&mut user).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docvault_memory;

pub mod store;
pub(crate) mod evaluator;

pub use store::{MemoryConnector, MemoryConnectorBuilder, MemorySession};
