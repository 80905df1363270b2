//! Main docvault crate providing a unified interface for record storage.
//!
//! This crate is the primary entry point for users of docvault. It re-exports the core types
//! from the sub-crates, the `RecordFields` derive and the available backends.
//!
//! # Features
//!
//! - **Typed records** - Plain Serde structs mapped to one collection each
//! - **Transparent field encryption** - `String` fields tagged `#[record(encrypt = "aes")]` are
//!   stored as AES-GCM ciphertext and decrypted on read
//! - **Shared connections** - One master session per server set, copied for every operation
//! - **Multiple backends** - In-memory for tests, MongoDB behind the `mongodb` feature
//!
//! # Quick Start
//!
//! ```ignore
//! use docvault::{prelude::*, memory::MemoryConnector};
//! use docvault::bson::{doc, oid::ObjectId};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize, RecordFields)]
//! pub struct Customer {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     #[record(id)]
//!     pub id: Option<ObjectId>,
//!     pub name: String,
//!     #[record(encrypt = "aes")]
//!     pub card_number: String,
//! }
//!
//! impl Record for Customer {
//!     fn collection_name() -> &'static str {
//!         "customers"
//!     }
//!
//!     fn db_config() -> ConnectionConfig {
//!         ConnectionConfig::new("localhost:27017", "shop")
//!             .with_crypto(CryptoConfig::new("7E892875A52C59A3B588306B13C31FBD"))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> RecordStoreResult<()> {
//!     let store = RecordStore::new(MemoryConnector::new());
//!
//!     let mut customer = Customer {
//!         name: "Alice".to_string(),
//!         card_number: "4111 1111 1111 1111".to_string(),
//!         ..Default::default()
//!     };
//!     store.create(&mut customer).await?;
//!
//!     let mut found = Customer::default();
//!     store.find_by(doc! { "name": "Alice" }, &mut found).await?;
//!     assert_eq!(found.card_number, "4111 1111 1111 1111");
//!
//!     store.destroy(&found).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory clusters for development and testing
//! - [`mongodb`] - MongoDB through the official driver (requires `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as docvault;

pub mod prelude;

pub use docvault_core::{backend, collection, config, crypto, error, page, record, registry, store};
pub use docvault_macros::RecordFields;

// Re-export BSON types for convenience
pub use bson;

/// In-memory backend.
pub mod memory {
    pub use docvault_memory::{MemoryConnector, MemoryConnectorBuilder, MemorySession};
}

/// MongoDB backend.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docvault_mongodb::{MongoConnector, MongoConnectorBuilder, MongoSession};
}
