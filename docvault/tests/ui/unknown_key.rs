#![allow(dead_code)]

use docvault::{RecordFields, bson::oid::ObjectId};

#[derive(RecordFields)]
struct UnknownKey {
    #[record(id)]
    id: Option<ObjectId>,
    #[record(index)]
    name: String,
}

fn main() {}
