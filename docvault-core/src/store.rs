//! Record store: create, read, update and delete for any [`Record`].
//!
//! [`RecordStore`] owns a [`ConnectionRegistry`] and routes every call through the record
//! type's [`Record::db_config`] and [`Record::collection_name`]. Each operation acquires its
//! own session copy, which is released when the operation returns, whether it succeeded or not.
//!
//! Fields declared with `#[record(encrypt = "aes")]` are encrypted before `create` and
//! `update` write them and decrypted after `find`, `find_by`, `create` and `update` read them.
//! [`RecordStore::find_many`] returns stored values as they are; see its documentation.
//!
//! # Example
//!
//! ```ignore
//! use docvault::{prelude::*, memory::MemoryConnector};
//!
//! let store = RecordStore::new(MemoryConnector::new());
//!
//! let mut user = User { name: "Alice".into(), email: "alice@example.com".into(), ..Default::default() };
//! store.create(&mut user).await?;
//!
//! let mut found = User { id: user.id, ..Default::default() };
//! store.find(&mut found).await?;
//! assert_eq!(found.email, "alice@example.com");
//! ```

use bson::{Document, doc};
use tracing::{debug, instrument};

use crate::{
    backend::Connector,
    collection::resolve_collection,
    crypto::{decrypt_fields, encrypt_fields},
    error::{RecordStoreError, RecordStoreResult},
    page::Pagination,
    record::{ID_KEY, Record, RecordExt, fetch_identifier, generate_identifier},
    registry::ConnectionRegistry,
};

/// The CRUD engine.
///
/// A store is meant to be created once and shared (e.g. behind an `Arc`); all methods take
/// `&self` and may run concurrently.
#[derive(Debug)]
pub struct RecordStore<C: Connector> {
    registry: ConnectionRegistry<C>,
}

impl<C: Connector> RecordStore<C> {
    /// Creates a new record store dialing through `connector`.
    pub fn new(connector: C) -> Self {
        Self { registry: ConnectionRegistry::new(connector) }
    }

    /// Returns the connection registry backing this store.
    pub fn registry(&self) -> &ConnectionRegistry<C> {
        &self.registry
    }

    /// Stores `record` as a new document.
    ///
    /// Encrypted fields are encrypted on a working copy, a fresh identifier is generated, the
    /// document is inserted and then read back into `record`. Afterwards `record` carries its
    /// identifier and plaintext values.
    ///
    /// # Errors
    ///
    /// Encryption errors abort before anything is written. Connection, backend and read-back
    /// errors are propagated.
    #[instrument(level = "debug", skip_all, fields(collection = R::collection_name()))]
    pub async fn create<R: Record>(&self, record: &mut R) -> RecordStoreResult<()> {
        let session = self.registry.acquire(&R::db_config()).await?;

        let mut sealed = record.clone();
        encrypt_fields(&mut sealed)?;
        let id = generate_identifier(&mut sealed);

        let collection = resolve_collection::<R, _>(&*session)?;
        collection.insert(sealed.to_document()?).await?;
        record.set_id(id);
        debug!(%id, "record inserted");

        let stored = collection
            .find_id(id)
            .await?
            .ok_or_else(|| not_found::<R>())?;
        *record = open::<R>(stored)?;

        Ok(())
    }

    /// Loads the document identified by `record`'s identifier into `record`.
    ///
    /// # Errors
    ///
    /// - [`RecordStoreError::InvalidIdentifier`] if the identifier is unset
    /// - [`RecordStoreError::RecordNotFound`] if no document has that identifier; `record` is
    ///   left untouched
    #[instrument(level = "debug", skip_all, fields(collection = R::collection_name()))]
    pub async fn find<R: Record>(&self, record: &mut R) -> RecordStoreResult<()> {
        let id = fetch_identifier(record)?;
        let session = self.registry.acquire(&R::db_config()).await?;

        let stored = resolve_collection::<R, _>(&*session)?
            .find_id(id)
            .await?
            .ok_or_else(|| not_found::<R>())?;
        *record = open::<R>(stored)?;

        Ok(())
    }

    /// Loads the first document matching `filter` into `record`.
    ///
    /// `filter` is passed to the database unchanged, e.g. `doc! { "name": "Alice" }`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::RecordNotFound`] if nothing matches; `record` is left
    /// untouched.
    #[instrument(level = "debug", skip_all, fields(collection = R::collection_name()))]
    pub async fn find_by<R: Record>(&self, filter: Document, record: &mut R) -> RecordStoreResult<()> {
        let session = self.registry.acquire(&R::db_config()).await?;

        let stored = resolve_collection::<R, _>(&*session)?
            .find_one(filter)
            .await?
            .ok_or_else(|| not_found::<R>())?;
        *record = open::<R>(stored)?;

        Ok(())
    }

    /// Replaces the contents of `records` with every document matching `filter`, skipping and
    /// then limiting per `page`.
    ///
    /// Encrypted fields are **not** decrypted: the returned records hold the stored
    /// ciphertext. Existing callers depend on this, so it is kept as part of the contract.
    /// Decrypt individual records with
    /// [`decrypt_fields`](crate::crypto::decrypt_fields) when the plaintext is needed.
    #[instrument(level = "debug", skip_all, fields(collection = R::collection_name()))]
    pub async fn find_many<R: Record>(
        &self,
        filter: Document,
        records: &mut Vec<R>,
        page: Pagination,
    ) -> RecordStoreResult<()> {
        let session = self.registry.acquire(&R::db_config()).await?;

        let found = resolve_collection::<R, _>(&*session)?
            .find_many(filter, page)
            .await?
            .into_iter()
            .map(R::from_document)
            .collect::<RecordStoreResult<Vec<R>>>()?;
        debug!(count = found.len(), "records loaded");
        *records = found;

        Ok(())
    }

    /// Writes every field of `record` to its stored document, then reads the document back
    /// into `record`. The identifier is never changed.
    ///
    /// # Errors
    ///
    /// - [`RecordStoreError::InvalidIdentifier`] if the identifier is unset
    /// - encryption errors, before anything is written
    /// - [`RecordStoreError::RecordNotFound`] if no document has the identifier
    #[instrument(level = "debug", skip_all, fields(collection = R::collection_name()))]
    pub async fn update<R: Record>(&self, record: &mut R) -> RecordStoreResult<()> {
        let id = fetch_identifier(record)?;
        let session = self.registry.acquire(&R::db_config()).await?;

        let mut sealed = record.clone();
        encrypt_fields(&mut sealed)?;
        let mut fields = sealed.to_document()?;
        fields.remove(ID_KEY);

        let collection = resolve_collection::<R, _>(&*session)?;
        if !collection.update_id(id, doc! { "$set": fields }).await? {
            return Err(not_found::<R>());
        }
        debug!(%id, "record updated");

        let stored = collection
            .find_id(id)
            .await?
            .ok_or_else(|| not_found::<R>())?;
        *record = open::<R>(stored)?;

        Ok(())
    }

    /// Deletes the document identified by `record`'s identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::RecordNotFound`] if no document had that identifier.
    #[instrument(level = "debug", skip_all, fields(collection = R::collection_name()))]
    pub async fn destroy<R: Record>(&self, record: &R) -> RecordStoreResult<()> {
        let id = fetch_identifier(record)?;
        let session = self.registry.acquire(&R::db_config()).await?;

        if !resolve_collection::<R, _>(&*session)?.remove_id(id).await? {
            return Err(not_found::<R>());
        }
        debug!(%id, "record deleted");

        Ok(())
    }
}

/// Deserializes a stored document and decrypts its encrypted fields.
fn open<R: Record>(stored: Document) -> RecordStoreResult<R> {
    let mut record = R::from_document(stored)?;
    decrypt_fields(&mut record)?;
    Ok(record)
}

fn not_found<R: Record>() -> RecordStoreError {
    RecordStoreError::RecordNotFound(R::collection_name().to_string())
}
