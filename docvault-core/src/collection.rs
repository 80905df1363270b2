//! Collection handles bound to a live session.
//!
//! A [`CollectionHandle`] pairs a session with the database and collection a record type is
//! routed to. Handles are obtained with [`resolve_collection`] and only live as long as the
//! session they borrow.
//!
//! # Example
//!
//! ```ignore
//! let session = store.registry().acquire(&User::db_config()).await?;
//! let users = resolve_collection::<User, _>(&session)?;
//! let raw = users.find_one(doc! { "name": "Alice" }).await?;
//! ```

use bson::{Document, oid::ObjectId};

use crate::{
    backend::SessionBackend,
    error::{RecordStoreError, RecordStoreResult},
    page::Pagination,
    record::{ID_KEY, Record},
};

/// A collection within a database, reachable through a borrowed session.
#[derive(Debug)]
pub struct CollectionHandle<'a, S: SessionBackend> {
    database: String,
    name: String,
    session: &'a S,
}

impl<'a, S: SessionBackend> CollectionHandle<'a, S> {
    /// Creates a handle for `database.name`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::CollectionNotResolved`] if either name is empty.
    pub fn new(session: &'a S, database: &str, name: &str) -> RecordStoreResult<Self> {
        if database.is_empty() || name.is_empty() {
            return Err(RecordStoreError::CollectionNotResolved(format!(
                "{database:?}.{name:?}"
            )));
        }

        Ok(Self {
            database: database.to_string(),
            name: name.to_string(),
            session,
        })
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name of the database holding this collection.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Inserts a single document.
    pub async fn insert(&self, document: Document) -> RecordStoreResult<()> {
        self.session
            .insert_one(&self.database, &self.name, document)
            .await
    }

    /// Returns the first document matching `filter`.
    pub async fn find_one(&self, filter: Document) -> RecordStoreResult<Option<Document>> {
        self.session
            .find_one(&self.database, &self.name, filter)
            .await
    }

    /// Returns the document identified by `id`.
    pub async fn find_id(&self, id: ObjectId) -> RecordStoreResult<Option<Document>> {
        let mut filter = Document::new();
        filter.insert(ID_KEY, id);
        self.find_one(filter).await
    }

    /// Returns every document matching `filter`, paginated.
    pub async fn find_many(&self, filter: Document, page: Pagination) -> RecordStoreResult<Vec<Document>> {
        self.session
            .find_many(&self.database, &self.name, filter, page)
            .await
    }

    /// Sets `fields` on the document identified by `id`; returns `false` if none matched.
    pub async fn update_id(&self, id: ObjectId, fields: Document) -> RecordStoreResult<bool> {
        self.session
            .update_by_id(&self.database, &self.name, id, fields)
            .await
    }

    /// Removes the document identified by `id`; returns `false` if none existed.
    pub async fn remove_id(&self, id: ObjectId) -> RecordStoreResult<bool> {
        self.session
            .delete_by_id(&self.database, &self.name, id)
            .await
    }

    /// Drops the whole collection.
    pub async fn drop_collection(&self) -> RecordStoreResult<()> {
        self.session
            .drop_collection(&self.database, &self.name)
            .await
    }
}

/// Resolves the collection record type `R` is stored in, using `R::db_config().database`
/// and `R::collection_name()`.
///
/// # Errors
///
/// Returns [`RecordStoreError::CollectionNotResolved`] if either name is empty.
pub fn resolve_collection<R: Record, S: SessionBackend>(
    session: &S,
) -> RecordStoreResult<CollectionHandle<'_, S>> {
    CollectionHandle::new(session, &R::db_config().database, R::collection_name())
}
