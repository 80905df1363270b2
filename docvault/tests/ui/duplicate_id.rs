#![allow(dead_code)]

use docvault::{RecordFields, bson::oid::ObjectId};

#[derive(RecordFields)]
struct TwoIdentifiers {
    #[record(id)]
    id: Option<ObjectId>,
    #[record(id)]
    other: Option<ObjectId>,
}

fn main() {}
