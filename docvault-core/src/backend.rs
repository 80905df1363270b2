//! Storage backend abstraction for the record store.
//!
//! This module defines the traits that separate the CRUD engine from a concrete database
//! driver:
//!
//! - [`Connector`]: dials a new master session for a [`ConnectionConfig`]
//! - [`SessionBackend`]: a live session able to copy itself and run single-collection
//!   operations
//! - [`ConnectorBuilder`]: factory trait for creating connector instances
//!
//! Implementations must be thread-safe (`Send + Sync`); the connection registry shares master
//! sessions across tasks and hands out copies through [`SessionBackend::copy`].
//!
//! # Examples
//!
//! ```ignore
//! use docvault::backend::{Connector, SessionBackend};
//! use docvault::bson::doc;
//!
//! let master = connector.dial(&config).await?;
//! let session = master.copy();
//! session.insert_one("app", "users", doc! { "name": "Alice" }).await?;
//! ```

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use std::fmt::Debug;

use crate::{config::ConnectionConfig, error::RecordStoreResult, page::Pagination};

/// A live connection to a set of servers.
///
/// A master session is created once per server set by [`Connector::dial`]; every operation then
/// runs on a cheap [`copy`](SessionBackend::copy) that is [`close`](SessionBackend::close)d when
/// the operation ends.
///
/// Every data operation addresses a collection by `(database, collection)` name. Documents carry
/// their identifier under `_id`.
#[async_trait]
pub trait SessionBackend: Send + Sync + Debug + 'static {
    /// Returns an independent lightweight copy of this session. No network dial is performed.
    fn copy(&self) -> Self
    where
        Self: Sized;

    /// Releases this session copy. Called exactly once per copy.
    fn close(&mut self);

    /// Inserts a single document.
    async fn insert_one(
        &self,
        database: &str,
        collection: &str,
        document: Document,
    ) -> RecordStoreResult<()>;

    /// Returns the first document matching `filter`, or `None`.
    async fn find_one(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> RecordStoreResult<Option<Document>>;

    /// Returns all documents matching `filter`, skipping and then limiting per `page`.
    async fn find_many(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        page: Pagination,
    ) -> RecordStoreResult<Vec<Document>>;

    /// Sets `fields` on the document identified by `id`.
    ///
    /// Returns `false` if no document has that identifier.
    async fn update_by_id(
        &self,
        database: &str,
        collection: &str,
        id: ObjectId,
        fields: Document,
    ) -> RecordStoreResult<bool>;

    /// Deletes the document identified by `id`.
    ///
    /// Returns `false` if no document has that identifier.
    async fn delete_by_id(
        &self,
        database: &str,
        collection: &str,
        id: ObjectId,
    ) -> RecordStoreResult<bool>;

    /// Drops a collection and every document in it.
    async fn drop_collection(&self, database: &str, collection: &str) -> RecordStoreResult<()>;
}

/// Dials master sessions.
#[async_trait]
pub trait Connector: Send + Sync + Debug + 'static {
    type Session: SessionBackend;

    /// Establishes a new connection to the servers in `config`, honouring its timeout and TLS
    /// flag.
    ///
    /// # Errors
    ///
    /// - [`RecordStoreError::InvalidAddress`](crate::error::RecordStoreError::InvalidAddress)
    ///   if `config.servers` cannot be parsed
    /// - [`RecordStoreError::Connection`](crate::error::RecordStoreError::Connection) if no
    ///   server answers within the timeout
    async fn dial(&self, config: &ConnectionConfig) -> RecordStoreResult<Self::Session>;
}

/// Factory trait for creating connector instances.
///
/// Each backend crate exposes a builder implementing this trait.
///
/// # Example
///
/// ```ignore
/// let connector = MongoConnector::builder().app_name("billing").build().await?;
/// ```
#[async_trait]
pub trait ConnectorBuilder {
    type Connector: Connector;

    /// Builds and initializes the connector.
    async fn build(self) -> RecordStoreResult<Self::Connector>;
}
