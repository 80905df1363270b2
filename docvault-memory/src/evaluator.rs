//! Filter evaluation for in-memory document matching.
//!
//! This module evaluates MongoDB-style filter documents against stored BSON documents. The
//! supported subset covers what record lookups use in practice:
//!
//! - implicit equality (`{ "name": "Alice" }`), matching array elements too
//! - dotted paths into embedded documents (`{ "address.city": "Berlin" }`)
//! - `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`, `$exists`, `$not`
//! - `$and`, `$or`, `$nor`
//!
//! Any other operator is reported as a backend error rather than silently ignored.

use std::cmp::Ordering;
use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use docvault_core::error::{RecordStoreError, RecordStoreResult};


/// Type-erased, comparable representation of BSON values.
///
/// Integers compare exactly with each other and numerically with floats, so `1_i32` equals
/// `1.0_f64`. Embedded documents compare field by field in order.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Number(f64),
    DateTime(DateTime),
    ObjectId(ObjectId),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(Vec<(&'a str, Comparable<'a>)>),
    /// Any BSON type without a meaningful comparison; never equal to anything.
    Opaque,
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Int(i64::from(*value)),
            Bson::Int64(value) => Comparable::Int(*value),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<Vec<_>>()
            ),
            _ => Comparable::Opaque,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Int(a), Comparable::Int(b)) => a == b,
            (Comparable::Int(a), Comparable::Number(b))
            | (Comparable::Number(b), Comparable::Int(a)) => *a as f64 == *b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Int(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Number(b)) => (*a as f64).partial_cmp(b),
            (Comparable::Number(a), Comparable::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}


pub(crate) struct FilterEvaluator<'a> {
    document: &'a Document,
}

impl<'a> FilterEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Returns `true` if the document satisfies every clause of `filter`.
    pub fn matches(&self, filter: &Document) -> RecordStoreResult<bool> {
        for (key, condition) in filter {
            let matched = match key.as_str() {
                "$and" => {
                    let mut all = true;
                    for clause in clauses(key, condition)? {
                        all &= self.matches(clause)?;
                    }
                    all
                },
                "$or" => {
                    let mut any = false;
                    for clause in clauses(key, condition)? {
                        any |= self.matches(clause)?;
                    }
                    any
                },
                "$nor" => {
                    let mut any = false;
                    for clause in clauses(key, condition)? {
                        any |= self.matches(clause)?;
                    }
                    !any
                },
                op if op.starts_with('$') => return Err(unsupported(op)),
                path => matches_condition(lookup(self.document, path), condition)?,
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Returns the documents from `documents` matching `filter`, in their original order.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        filter: &Document,
    ) -> RecordStoreResult<Vec<Document>> {
        let mut matched = Vec::new();

        for document in documents {
            if FilterEvaluator::new(document).matches(filter)? {
                matched.push(document.clone());
            }
        }

        Ok(matched)
    }
}

fn clauses<'f>(op: &str, condition: &'f Bson) -> RecordStoreResult<Vec<&'f Document>> {
    condition
        .as_array()
        .ok_or_else(|| RecordStoreError::Backend(format!("{op} requires an array")))?
        .iter()
        .map(|clause| {
            clause
                .as_document()
                .ok_or_else(|| RecordStoreError::Backend(format!("{op} clauses must be documents")))
        })
        .collect()
}

fn unsupported(op: &str) -> RecordStoreError {
    RecordStoreError::Backend(format!("unsupported query operator {op}"))
}

/// Resolves a dotted path inside a document.
fn lookup<'d>(document: &'d Document, path: &str) -> Option<&'d Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

fn is_operator_document(condition: &Bson) -> bool {
    condition
        .as_document()
        .and_then(|doc| doc.keys().next())
        .is_some_and(|key| key.starts_with('$'))
}

fn matches_condition(value: Option<&Bson>, condition: &Bson) -> RecordStoreResult<bool> {
    let Some(operators) = condition.as_document().filter(|_| is_operator_document(condition)) else {
        return Ok(equals(value, condition));
    };

    for (op, operand) in operators {
        let matched = match op.as_str() {
            "$eq" => equals(value, operand),
            "$ne" => !equals(value, operand),
            "$gt" => compare(value, operand, |o| o == Ordering::Greater),
            "$gte" => compare(value, operand, |o| o != Ordering::Less),
            "$lt" => compare(value, operand, |o| o == Ordering::Less),
            "$lte" => compare(value, operand, |o| o != Ordering::Greater),
            "$in" => any_of(value, op, operand)?,
            "$nin" => !any_of(value, op, operand)?,
            "$exists" => value.is_some() == truthy(operand),
            "$not" => !matches_condition(value, operand)?,
            other => return Err(unsupported(other)),
        };

        if !matched {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Equality with MongoDB semantics: a missing field equals `null`, and an array field matches
/// if it equals the expected value or contains it.
fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    let expected = Comparable::from(expected);

    match value {
        None => expected == Comparable::Null,
        Some(Bson::Array(items)) => {
            let items = items.iter().map(Comparable::from).collect::<Vec<_>>();
            items.iter().any(|item| item == &expected) || Comparable::Array(items) == expected
        },
        Some(value) => Comparable::from(value) == expected,
    }
}

fn compare(value: Option<&Bson>, operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    let operand = Comparable::from(operand);

    match value {
        Some(Bson::Array(items)) => items
            .iter()
            .any(|item| Comparable::from(item).partial_cmp(&operand).is_some_and(&accept)),
        Some(value) => Comparable::from(value)
            .partial_cmp(&operand)
            .is_some_and(accept),
        None => false,
    }
}

fn any_of(value: Option<&Bson>, op: &str, operand: &Bson) -> RecordStoreResult<bool> {
    Ok(operand
        .as_array()
        .ok_or_else(|| RecordStoreError::Backend(format!("{op} requires an array")))?
        .iter()
        .any(|candidate| equals(value, candidate)))
}

fn truthy(operand: &Bson) -> bool {
    match operand {
        Bson::Boolean(value) => *value,
        Bson::Null => false,
        Bson::Int32(value) => *value != 0,
        Bson::Int64(value) => *value != 0,
        Bson::Double(value) => *value != 0.0,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn sample() -> Document {
        doc! {
            "_id": ObjectId::new(),
            "name": "Alice",
            "age": 31,
            "tags": ["admin", "ops"],
            "address": { "city": "Berlin" },
        }
    }

    fn check(filter: Document) -> bool {
        FilterEvaluator::new(&sample()).matches(&filter).unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(check(doc! {}));
    }

    #[test]
    fn implicit_equality() {
        assert!(check(doc! { "name": "Alice" }));
        assert!(!check(doc! { "name": "Bob" }));
        assert!(check(doc! { "age": 31_i64 }));
        assert!(check(doc! { "missing": Bson::Null }));
    }

    #[test]
    fn object_ids_compare_by_value() {
        let id = ObjectId::new();
        let document = doc! { "_id": id };

        assert!(FilterEvaluator::new(&document).matches(&doc! { "_id": id }).unwrap());
        assert!(!FilterEvaluator::new(&document).matches(&doc! { "_id": ObjectId::new() }).unwrap());
    }

    #[test]
    fn large_integers_compare_exactly() {
        let document = doc! { "big": 9_007_199_254_740_993_i64, "small": 3 };
        let evaluator = FilterEvaluator::new(&document);

        assert!(!evaluator.matches(&doc! { "big": 9_007_199_254_740_992_i64 }).unwrap());
        assert!(evaluator.matches(&doc! { "big": 9_007_199_254_740_993_i64 }).unwrap());
        assert!(evaluator.matches(&doc! { "big": { "$gt": 9_007_199_254_740_992_i64 } }).unwrap());
        assert!(evaluator.matches(&doc! { "small": 3.0 }).unwrap());
        assert!(evaluator.matches(&doc! { "small": { "$lt": 3.5 } }).unwrap());
    }

    #[test]
    fn embedded_documents_compare_in_field_order() {
        assert!(check(doc! { "address": { "city": "Berlin" } }));

        let document = doc! { "address": { "city": "Berlin", "zip": "10115" } };
        let evaluator = FilterEvaluator::new(&document);

        assert!(evaluator.matches(&doc! { "address": { "city": "Berlin", "zip": "10115" } }).unwrap());
        assert!(!evaluator.matches(&doc! { "address": { "zip": "10115", "city": "Berlin" } }).unwrap());
    }

    #[test]
    fn arrays_match_their_elements() {
        assert!(check(doc! { "tags": "ops" }));
        assert!(check(doc! { "tags": ["admin", "ops"] }));
        assert!(!check(doc! { "tags": "dev" }));
    }

    #[test]
    fn dotted_paths_reach_embedded_documents() {
        assert!(check(doc! { "address.city": "Berlin" }));
        assert!(!check(doc! { "address.zip": { "$exists": true } }));
    }

    #[test]
    fn comparison_operators() {
        assert!(check(doc! { "age": { "$gt": 30, "$lte": 31 } }));
        assert!(!check(doc! { "age": { "$lt": 31 } }));
        assert!(check(doc! { "name": { "$ne": "Bob" } }));
        assert!(check(doc! { "name": { "$in": ["Bob", "Alice"] } }));
        assert!(check(doc! { "name": { "$nin": ["Bob"] } }));
        assert!(check(doc! { "age": { "$not": { "$gt": 40 } } }));
    }

    #[test]
    fn logical_operators() {
        assert!(check(doc! { "$or": [{ "name": "Bob" }, { "age": 31 }] }));
        assert!(!check(doc! { "$and": [{ "name": "Alice" }, { "age": 30 }] }));
        assert!(check(doc! { "$nor": [{ "name": "Bob" }] }));
    }

    #[test]
    fn unknown_operators_are_rejected() {
        let err = FilterEvaluator::new(&sample())
            .matches(&doc! { "name": { "$regex": "^A" } })
            .unwrap_err();
        assert!(matches!(err, RecordStoreError::Backend(_)));
    }
}
