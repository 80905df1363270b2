//! Core traits for record representation, identifiers and serialization.
//!
//! A storable type implements two traits:
//!
//! - [`RecordFields`], normally derived with `#[derive(RecordFields)]`, exposes the identifier
//!   field and the fields marked for encryption.
//! - [`Record`], written by hand, routes the type to a collection and a connection
//!   configuration.
//!
//! # Example
//!
//! ```ignore
//! use docvault::prelude::*;
//! use docvault::bson::oid::ObjectId;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, RecordFields)]
//! pub struct User {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     #[record(id)]
//!     pub id: Option<ObjectId>,
//!     pub name: String,
//!     #[record(encrypt = "aes")]
//!     pub email: String,
//! }
//!
//! impl Record for User {
//!     fn collection_name() -> &'static str {
//!         "users"
//!     }
//!
//!     fn db_config() -> ConnectionConfig {
//!         ConnectionConfig::from_env().expect("mongodb environment")
//!     }
//! }
//! ```

use bson::{
    Bson, Document,
    de::deserialize_from_document,
    oid::ObjectId,
    ser::serialize_to_document,
};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    config::ConnectionConfig,
    error::{RecordStoreError, RecordStoreResult},
};

/// Name of the identifier key in persisted documents.
pub const ID_KEY: &str = "_id";

/// Callback invoked once per encrypted field with the field name and its value.
pub type FieldVisitor<'a> = dyn FnMut(&'static str, &mut String) -> RecordStoreResult<()> + 'a;

/// Field-level capabilities of a record, generated by `#[derive(RecordFields)]`.
pub trait RecordFields {
    /// Returns the identifier, or `None` if the record has not been stored yet.
    fn id(&self) -> Option<&ObjectId>;

    /// Assigns the identifier.
    fn set_id(&mut self, id: ObjectId);

    /// Calls `visitor` for every `String` field declared with `#[record(encrypt = "aes")]`,
    /// in declaration order. Stops at the first error.
    fn visit_encrypted_fields(&mut self, visitor: &mut FieldVisitor<'_>) -> RecordStoreResult<()>;
}

/// Core trait that all records stored through a record store must implement.
///
/// The identifier field must serialize as `_id` and be skipped when `None`, so a brand-new
/// record never persists an empty identifier:
///
/// ```ignore
/// #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
/// #[record(id)]
/// pub id: Option<ObjectId>,
/// ```
pub trait Record:
    RecordFields + Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
    /// Returns the name of the collection this record type is stored in.
    fn collection_name() -> &'static str;

    /// Returns the configuration used to connect to this record type's database.
    fn db_config() -> ConnectionConfig;
}

/// Serialization helpers, implemented for every [`Record`].
pub trait RecordExt: Record {
    /// Converts this record to the document persisted in the collection.
    ///
    /// The `_id` key always mirrors [`RecordFields::id`]: present when set, absent otherwise.
    fn to_document(&self) -> RecordStoreResult<Document>;

    /// Creates a record from a stored document.
    fn from_document(document: Document) -> RecordStoreResult<Self>;
}

impl<R: Record> RecordExt for R {
    fn to_document(&self) -> RecordStoreResult<Document> {
        let mut document = serialize_to_document(self)?;

        match self.id() {
            Some(id) => {
                document.insert(ID_KEY, Bson::ObjectId(*id));
            }
            None => {
                document.remove(ID_KEY);
            }
        }

        Ok(document)
    }

    fn from_document(document: Document) -> RecordStoreResult<Self> {
        Ok(deserialize_from_document(document)?)
    }
}

/// Reads the identifier of `record`.
///
/// # Errors
///
/// Returns [`RecordStoreError::InvalidIdentifier`] if the identifier is unset.
pub fn fetch_identifier<R: Record>(record: &R) -> RecordStoreResult<ObjectId> {
    record.id().copied().ok_or_else(|| {
        RecordStoreError::InvalidIdentifier(format!(
            "record in collection {} has no identifier",
            R::collection_name()
        ))
    })
}

/// Assigns a freshly generated identifier to `record` and returns it.
pub fn generate_identifier<R: RecordFields + ?Sized>(record: &mut R) -> ObjectId {
    let id = ObjectId::new();
    record.set_id(id);
    id
}
