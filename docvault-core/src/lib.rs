//! A minimal record mapping layer over a document database.
//!
//! This crate is the core of the docvault project and provides:
//!
//! - **Record traits** ([`record`]) - The contract every storable type implements, plus identifier helpers
//! - **Configuration** ([`config`]) - Per record type connection and crypto settings
//! - **Field encryption** ([`crypto`]) - AES encryption of fields declared with `#[record(encrypt = "aes")]`
//! - **Backend abstraction** ([`backend`]) - Traits for implementing database connectors and sessions
//! - **Connection registry** ([`registry`]) - One cached master session per server set
//! - **Collections** ([`collection`]) - Collection handles bound to a live session
//! - **Record store** ([`store`]) - The create/find/update/destroy operations
//! - **Pagination** ([`page`]) - Skip and limit for multi-record queries
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docvault::prelude::*;
//! use docvault::bson::oid::ObjectId;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize, RecordFields)]
//! pub struct User {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     #[record(id)]
//!     pub id: Option<ObjectId>,
//!     pub name: String,
//! }
//!
//! impl Record for User {
//!     fn collection_name() -> &'static str {
//!         "users"
//!     }
//!
//!     fn db_config() -> ConnectionConfig {
//!         ConnectionConfig::new("localhost", "app")
//!     }
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docvault_core;

pub mod backend;
pub mod collection;
pub mod config;
pub mod crypto;
pub mod error;
pub mod page;
pub mod record;
pub mod registry;
pub mod store;
