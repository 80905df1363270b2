//! MongoDB backend implementation for docvault.
//!
//! This crate provides a MongoDB-based implementation of the `Connector` and `SessionBackend`
//! traits on top of the official async driver.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docvault = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! [`MongoConnector::dial`](docvault_core::backend::Connector::dial) accepts either a bare host
//! list (`db1:27017,db2:27017`) or a full `mongodb://` / `mongodb+srv://` connection string in
//! `ConnectionConfig::servers`. The configured timeout bounds both connecting and server
//! selection, and the dial pings the deployment so an unreachable cluster fails immediately.
//!
//! # Example
//!
//! ```ignore
//! use docvault::{prelude::*, mongodb::MongoConnector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connector = MongoConnector::builder().app_name("billing").build().await?;
//!     let store = RecordStore::new(connector);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docvault_mongodb;

pub mod connector;
pub mod session;

pub use connector::{MongoConnector, MongoConnectorBuilder};
pub use session::MongoSession;
