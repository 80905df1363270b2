use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Document, doc, oid::ObjectId};
use mongodb::{
    Client, Collection,
    error::{Error as DriverError, ErrorKind},
    options::FindOptions,
};
use tracing::trace;

use docvault_core::{
    backend::SessionBackend,
    error::{RecordStoreError, RecordStoreResult},
    page::Pagination,
};


/// Maps a driver error: failures to reach the deployment become
/// [`RecordStoreError::Connection`], everything else [`RecordStoreError::Backend`].
pub(crate) fn map_driver_error(error: DriverError) -> RecordStoreError {
    match *error.kind {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => {
            RecordStoreError::Connection(error.to_string())
        },
        _ => RecordStoreError::Backend(error.to_string()),
    }
}


/// Builds the find options for a paged query. Results come back in `_id` order, which for
/// generated identifiers is insertion order.
pub(crate) fn find_options(page: Pagination) -> FindOptions {
    let mut options = FindOptions::default();

    options.sort = Some(doc! { "_id": 1 });
    options.skip = page.skip;
    options.limit = page.limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));

    options
}


/// A session onto a MongoDB deployment.
///
/// The driver's [`Client`] already pools connections, so a copy shares the pool and closing a
/// copy releases nothing.
#[derive(Debug, Clone)]
pub struct MongoSession {
    client: Client,
}

impl MongoSession {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Returns the underlying driver client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn collection(&self, database: &str, collection: &str) -> Collection<Document> {
        self.client
            .database(database)
            .collection(collection)
    }
}

#[async_trait]
impl SessionBackend for MongoSession {
    fn copy(&self) -> Self {
        self.clone()
    }

    fn close(&mut self) {}

    async fn insert_one(
        &self,
        database: &str,
        collection: &str,
        document: Document,
    ) -> RecordStoreResult<()> {
        let result = self.collection(database, collection)
            .insert_one(document)
            .await
            .map_err(map_driver_error)?;

        trace!(database, collection, id = %result.inserted_id, "inserted document");

        Ok(())
    }

    async fn find_one(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> RecordStoreResult<Option<Document>> {
        self.collection(database, collection)
            .find_one(filter)
            .await
            .map_err(map_driver_error)
    }

    async fn find_many(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        page: Pagination,
    ) -> RecordStoreResult<Vec<Document>> {
        let collection = self.collection(database, collection);

        collection
            .find(filter)
            .with_options(find_options(page))
            .await
            .map_err(map_driver_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(map_driver_error)
    }

    async fn update_by_id(
        &self,
        database: &str,
        collection: &str,
        id: ObjectId,
        fields: Document,
    ) -> RecordStoreResult<bool> {
        let result = self.collection(database, collection)
            .update_one(doc! { "_id": id }, fields)
            .await
            .map_err(map_driver_error)?;

        Ok(result.matched_count > 0)
    }

    async fn delete_by_id(
        &self,
        database: &str,
        collection: &str,
        id: ObjectId,
    ) -> RecordStoreResult<bool> {
        let result = self.collection(database, collection)
            .delete_one(doc! { "_id": id })
            .await
            .map_err(map_driver_error)?;

        Ok(result.deleted_count > 0)
    }

    async fn drop_collection(&self, database: &str, collection: &str) -> RecordStoreResult<()> {
        self.collection(database, collection)
            .drop()
            .await
            .map_err(map_driver_error)
    }
}
