//! In-memory connector and session implementation.
//!
//! Every distinct servers string dialed through a [`MemoryConnector`] gets its own cluster, a
//! set of collections held in memory behind an async-aware read-write lock. Sessions dialed for
//! the same servers string share that cluster, so data written through one session copy is
//! visible to every other.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document, doc, oid::ObjectId};
use tracing::{debug, trace};

use docvault_core::{
    backend::{Connector, ConnectorBuilder, SessionBackend},
    config::ConnectionConfig,
    error::{RecordStoreError, RecordStoreResult},
    page::Pagination,
    record::ID_KEY,
};

use crate::evaluator::FilterEvaluator;

type CollectionKey = (String, String);
type CollectionMap = HashMap<CollectionKey, Vec<Document>>;


/// Shared state behind every session dialed for one servers string.
#[derive(Debug, Default)]
struct Cluster {
    /// `(database, collection)` -> documents in insertion order
    collections: RwLock<CollectionMap>,
    /// Session copies handed out and not yet closed
    open_sessions: AtomicUsize,
}

fn key(database: &str, collection: &str) -> CollectionKey {
    (database.to_string(), collection.to_string())
}


/// Connector producing [`MemorySession`]s.
///
/// Hosts registered with [`MemoryConnectorBuilder::unreachable`] simulate servers that never
/// answer: dialing a servers string made up only of such hosts fails with
/// `RecordStoreError::Connection("no reachable servers")`.
///
/// # Example
///
/// ```ignore
/// use docvault::memory::MemoryConnector;
/// use docvault::backend::ConnectorBuilder;
///
/// let connector = MemoryConnector::builder()
///     .unreachable("invalid_server")
///     .build()
///     .await?;
/// ```
#[derive(Debug, Default)]
pub struct MemoryConnector {
    clusters: RwLock<HashMap<String, Arc<Cluster>>>,
    unreachable: HashSet<String>,
    dials: AtomicUsize,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> MemoryConnectorBuilder {
        MemoryConnectorBuilder::default()
    }

    /// Returns how many times [`dial`](Connector::dial) succeeded.
    pub fn dial_count(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    /// Returns the number of open session copies on the cluster for `servers`.
    pub async fn open_sessions(&self, servers: &str) -> usize {
        self.clusters
            .read()
            .await
            .get(servers)
            .map(|cluster| cluster.open_sessions.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Session = MemorySession;

    async fn dial(&self, config: &ConnectionConfig) -> RecordStoreResult<Self::Session> {
        let hosts = config.server_list()?;

        if hosts.iter().all(|host| self.unreachable.contains(host)) {
            return Err(RecordStoreError::Connection("no reachable servers".to_string()));
        }

        let cluster = self.clusters
            .write()
            .await
            .entry(config.servers.clone())
            .or_default()
            .clone();

        self.dials.fetch_add(1, Ordering::SeqCst);
        debug!(servers = %config.servers, hosts = hosts.len(), "dialed in-memory cluster");

        Ok(MemorySession {
            cluster,
            state: SessionState::Master,
        })
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Master,
    Open,
    Closed,
}

/// A session onto an in-memory cluster.
///
/// The session returned by [`MemoryConnector::dial`] is the master; [`copy`](SessionBackend::copy)
/// hands out copies that are counted until [`close`](SessionBackend::close)d.
#[derive(Debug)]
pub struct MemorySession {
    cluster: Arc<Cluster>,
    state: SessionState,
}

impl MemorySession {
    /// Returns the number of open session copies on this session's cluster.
    pub fn open_sessions(&self) -> usize {
        self.cluster.open_sessions.load(Ordering::SeqCst)
    }

    /// Returns the number of documents stored in a collection.
    pub async fn count(&self, database: &str, collection: &str) -> usize {
        self.cluster
            .collections
            .read()
            .await
            .get(&key(database, collection))
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// Applies an update document to `target`.
///
/// Operator documents support `$set` and `$unset`; a document without operators replaces every
/// field except `_id`. The update is applied to a copy, so `target` is untouched on error.
fn apply_update(target: &mut Document, update: Document) -> RecordStoreResult<()> {
    let is_operator = update.keys().next().is_some_and(|key| key.starts_with('$'));

    if !is_operator {
        let id = target.get(ID_KEY).cloned();
        *target = update;
        if let Some(id) = id {
            target.insert(ID_KEY, id);
        }
        return Ok(());
    }

    let mut updated = target.clone();

    for (op, operand) in update {
        let Bson::Document(fields) = operand else {
            return Err(RecordStoreError::Backend(format!("{op} requires a document")));
        };

        match op.as_str() {
            "$set" => {
                for (field, value) in fields {
                    updated.insert(field, value);
                }
            },
            "$unset" => {
                for (field, _) in fields {
                    updated.remove(&field);
                }
            },
            other => {
                return Err(RecordStoreError::Backend(format!("unsupported update operator {other}")));
            },
        }
    }

    *target = updated;

    Ok(())
}

#[async_trait]
impl SessionBackend for MemorySession {
    fn copy(&self) -> Self {
        self.cluster.open_sessions.fetch_add(1, Ordering::SeqCst);

        Self {
            cluster: self.cluster.clone(),
            state: SessionState::Open,
        }
    }

    fn close(&mut self) {
        if self.state == SessionState::Open {
            self.cluster.open_sessions.fetch_sub(1, Ordering::SeqCst);
            self.state = SessionState::Closed;
        }
    }

    async fn insert_one(
        &self,
        database: &str,
        collection: &str,
        mut document: Document,
    ) -> RecordStoreResult<()> {
        let id = match document.get(ID_KEY) {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                document.insert(ID_KEY, id.clone());
                id
            },
        };

        let mut collections = self.cluster.collections.write().await;
        let documents = collections
            .entry(key(database, collection))
            .or_default();

        if documents.iter().any(|existing| existing.get(ID_KEY) == Some(&id)) {
            return Err(RecordStoreError::Backend(format!(
                "duplicate key {id} in {database}.{collection}"
            )));
        }

        trace!(database, collection, %id, "inserted document");
        documents.push(document);

        Ok(())
    }

    async fn find_one(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> RecordStoreResult<Option<Document>> {
        let collections = self.cluster.collections.read().await;
        let Some(documents) = collections.get(&key(database, collection)) else {
            return Ok(None);
        };

        for document in documents {
            if FilterEvaluator::new(document).matches(&filter)? {
                return Ok(Some(document.clone()));
            }
        }

        Ok(None)
    }

    async fn find_many(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        page: Pagination,
    ) -> RecordStoreResult<Vec<Document>> {
        let collections = self.cluster.collections.read().await;
        let Some(documents) = collections.get(&key(database, collection)) else {
            return Ok(vec![]);
        };

        let matched = FilterEvaluator::filter_documents(documents, &filter)?;

        Ok(page.apply(matched))
    }

    async fn update_by_id(
        &self,
        database: &str,
        collection: &str,
        id: ObjectId,
        fields: Document,
    ) -> RecordStoreResult<bool> {
        let mut collections = self.cluster.collections.write().await;
        let Some(documents) = collections.get_mut(&key(database, collection)) else {
            return Ok(false);
        };

        let filter = doc! { "_id": id };
        for document in documents.iter_mut() {
            if FilterEvaluator::new(document).matches(&filter)? {
                apply_update(document, fields)?;
                return Ok(true);
            }
        }

        Ok(false)
    }

    async fn delete_by_id(
        &self,
        database: &str,
        collection: &str,
        id: ObjectId,
    ) -> RecordStoreResult<bool> {
        let mut collections = self.cluster.collections.write().await;
        let Some(documents) = collections.get_mut(&key(database, collection)) else {
            return Ok(false);
        };

        let target = Bson::ObjectId(id);
        match documents.iter().position(|document| document.get(ID_KEY) == Some(&target)) {
            Some(index) => {
                documents.remove(index);
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn drop_collection(&self, database: &str, collection: &str) -> RecordStoreResult<()> {
        self.cluster
            .collections
            .write()
            .await
            .remove(&key(database, collection));

        Ok(())
    }
}


/// Builder for constructing [`MemoryConnector`] instances.
#[derive(Debug, Default)]
pub struct MemoryConnectorBuilder {
    unreachable: HashSet<String>,
}

impl MemoryConnectorBuilder {
    /// Marks `host` as unreachable. Dialing a servers string whose hosts are all unreachable
    /// fails.
    pub fn unreachable(mut self, host: impl Into<String>) -> Self {
        self.unreachable.insert(host.into());
        self
    }
}

#[async_trait]
impl ConnectorBuilder for MemoryConnectorBuilder {
    type Connector = MemoryConnector;

    async fn build(self) -> RecordStoreResult<Self::Connector> {
        Ok(MemoryConnector {
            unreachable: self.unreachable,
            ..MemoryConnector::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DB: &str = "test";
    const COLL: &str = "items";

    async fn session() -> MemorySession {
        MemoryConnector::new()
            .dial(&ConnectionConfig::new("localhost", DB))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn unreachable_hosts_fail_to_dial() {
        let connector = MemoryConnector::builder()
            .unreachable("invalid_server")
            .build()
            .await
            .unwrap();

        let err = connector
            .dial(&ConnectionConfig::new("invalid_server", DB))
            .await
            .unwrap_err();
        assert_eq!(err, RecordStoreError::Connection("no reachable servers".into()));

        connector
            .dial(&ConnectionConfig::new("invalid_server,localhost", DB))
            .await
            .unwrap();
        assert_eq!(connector.dial_count(), 1);
    }

    #[tokio::test]
    async fn malformed_servers_are_rejected() {
        let err = MemoryConnector::new()
            .dial(&ConnectionConfig::new("", DB))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordStoreError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn sessions_for_the_same_servers_share_data() {
        let connector = MemoryConnector::new();
        let config = ConnectionConfig::new("localhost", DB);

        let first = connector.dial(&config).await.unwrap();
        let second = connector.dial(&config).await.unwrap();
        let other = connector.dial(&ConnectionConfig::new("otherhost", DB)).await.unwrap();

        first.insert_one(DB, COLL, doc! { "n": 1 }).await.unwrap();

        assert_eq!(second.count(DB, COLL).await, 1);
        assert_eq!(other.count(DB, COLL).await, 0);
    }

    #[tokio::test]
    async fn copies_are_counted_until_closed() {
        let master = session().await;
        assert_eq!(master.open_sessions(), 0);

        let mut copy = master.copy();
        let mut another = copy.copy();
        assert_eq!(master.open_sessions(), 2);

        copy.close();
        copy.close();
        assert_eq!(master.open_sessions(), 1);

        another.close();
        assert_eq!(master.open_sessions(), 0);
    }

    #[tokio::test]
    async fn insert_generates_missing_ids_and_rejects_duplicates() {
        let session = session().await;
        session.insert_one(DB, COLL, doc! { "n": 1 }).await.unwrap();

        let stored = session.find_one(DB, COLL, doc! { "n": 1 }).await.unwrap().unwrap();
        let id = stored.get_object_id(ID_KEY).unwrap();

        let err = session
            .insert_one(DB, COLL, doc! { "_id": id, "n": 2 })
            .await
            .unwrap_err();
        assert!(matches!(err, RecordStoreError::Backend(_)));
        assert_eq!(session.count(DB, COLL).await, 1);
    }

    #[tokio::test]
    async fn find_many_keeps_insertion_order_and_pages() {
        let session = session().await;
        for n in 1..=3 {
            session.insert_one(DB, COLL, doc! { "n": n, "kind": "a" }).await.unwrap();
        }
        session.insert_one(DB, COLL, doc! { "n": 4, "kind": "b" }).await.unwrap();

        let numbers = |docs: Vec<Document>| {
            docs.iter().map(|d| d.get_i32("n").unwrap()).collect::<Vec<_>>()
        };

        let all = session.find_many(DB, COLL, doc! { "kind": "a" }, Pagination::all()).await.unwrap();
        assert_eq!(numbers(all), vec![1, 2, 3]);

        let skipped = session.find_many(DB, COLL, doc! { "kind": "a" }, Pagination::new(1, 0)).await.unwrap();
        assert_eq!(numbers(skipped), vec![2, 3]);

        let limited = session.find_many(DB, COLL, doc! {}, Pagination::new(0, 1)).await.unwrap();
        assert_eq!(numbers(limited), vec![1]);

        let missing = session.find_many(DB, "nothing", doc! {}, Pagination::all()).await.unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn update_by_id_sets_fields() {
        let session = session().await;
        let id = ObjectId::new();
        session.insert_one(DB, COLL, doc! { "_id": id, "n": 1, "tag": "x" }).await.unwrap();

        let updated = session
            .update_by_id(DB, COLL, id, doc! { "$set": { "n": 2 }, "$unset": { "tag": "" } })
            .await
            .unwrap();
        assert!(updated);

        let stored = session.find_one(DB, COLL, doc! { "_id": id }).await.unwrap().unwrap();
        assert_eq!(stored, doc! { "_id": id, "n": 2 });

        let missing = session
            .update_by_id(DB, COLL, ObjectId::new(), doc! { "$set": { "n": 3 } })
            .await
            .unwrap();
        assert!(!missing);

        let err = session
            .update_by_id(DB, COLL, id, doc! { "$inc": { "n": 1 } })
            .await
            .unwrap_err();
        assert!(matches!(err, RecordStoreError::Backend(_)));
    }

    #[tokio::test]
    async fn rejected_update_leaves_the_document_unchanged() {
        let session = session().await;
        let id = ObjectId::new();
        session.insert_one(DB, COLL, doc! { "_id": id, "n": 1 }).await.unwrap();

        let err = session
            .update_by_id(DB, COLL, id, doc! { "$set": { "n": 2 }, "$inc": { "n": 1 } })
            .await
            .unwrap_err();
        assert!(matches!(err, RecordStoreError::Backend(_)));

        let stored = session.find_one(DB, COLL, doc! { "_id": id }).await.unwrap().unwrap();
        assert_eq!(stored.get_i32("n").unwrap(), 1);
    }

    #[tokio::test]
    async fn replacement_update_keeps_the_id() {
        let session = session().await;
        let id = ObjectId::new();
        session.insert_one(DB, COLL, doc! { "_id": id, "n": 1 }).await.unwrap();

        session.update_by_id(DB, COLL, id, doc! { "m": 5 }).await.unwrap();

        let stored = session.find_one(DB, COLL, doc! { "_id": id }).await.unwrap().unwrap();
        assert_eq!(stored.get_i32("m").unwrap(), 5);
        assert!(stored.get("n").is_none());
    }

    #[tokio::test]
    async fn delete_and_drop() {
        let session = session().await;
        let id = ObjectId::new();
        session.insert_one(DB, COLL, doc! { "_id": id }).await.unwrap();
        session.insert_one(DB, COLL, doc! { "n": 1 }).await.unwrap();

        assert!(session.delete_by_id(DB, COLL, id).await.unwrap());
        assert!(!session.delete_by_id(DB, COLL, id).await.unwrap());
        assert_eq!(session.count(DB, COLL).await, 1);

        session.drop_collection(DB, COLL).await.unwrap();
        assert_eq!(session.count(DB, COLL).await, 0);
    }
}
