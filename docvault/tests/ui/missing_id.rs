#![allow(dead_code)]

use docvault::RecordFields;

#[derive(RecordFields)]
struct NoIdentifier {
    name: String,
}

fn main() {}
