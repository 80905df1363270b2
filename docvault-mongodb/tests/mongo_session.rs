//! Integration tests against a live deployment.
//!
//! Run with `MONGODB_SERVERS=localhost:27017 MONGODB_NAME=docvault_test cargo test -- --ignored`.

use bson::{doc, oid::ObjectId};
use docvault_core::{
    backend::{Connector, SessionBackend},
    config::ConnectionConfig,
    error::RecordStoreError,
    page::Pagination,
};
use docvault_mongodb::MongoConnector;
use std::time::Duration;

fn config() -> ConnectionConfig {
    ConnectionConfig::from_env().expect("MONGODB_SERVERS and MONGODB_NAME must be set")
}

#[tokio::test]
#[ignore = "requires a running mongodb"]
async fn crud_round_trip() {
    let config = config();
    let master = MongoConnector::new().dial(&config).await.unwrap();
    let session = master.copy();
    let db = config.database.as_str();
    let coll = "docvault_session_test";

    session.drop_collection(db, coll).await.unwrap();

    let id = ObjectId::new();
    session.insert_one(db, coll, doc! { "_id": id, "n": 1 }).await.unwrap();
    session.insert_one(db, coll, doc! { "n": 2 }).await.unwrap();

    let found = session.find_one(db, coll, doc! { "_id": id }).await.unwrap().unwrap();
    assert_eq!(found.get_i32("n").unwrap(), 1);

    let page = session.find_many(db, coll, doc! {}, Pagination::new(1, 0)).await.unwrap();
    assert_eq!(page.len(), 1);

    assert!(session.update_by_id(db, coll, id, doc! { "$set": { "n": 5 } }).await.unwrap());
    assert!(!session.update_by_id(db, coll, ObjectId::new(), doc! { "$set": { "n": 5 } }).await.unwrap());

    assert!(session.delete_by_id(db, coll, id).await.unwrap());
    assert!(!session.delete_by_id(db, coll, id).await.unwrap());

    session.drop_collection(db, coll).await.unwrap();
}

#[tokio::test]
#[ignore = "requires network access"]
async fn unreachable_servers_fail_within_the_timeout() {
    let config = ConnectionConfig::new("invalid_server", "docvault_test")
        .with_timeout(Duration::from_millis(500));

    let err = MongoConnector::new().dial(&config).await.unwrap_err();

    assert!(matches!(err, RecordStoreError::Connection(_)));
}
