//! Match-document evaluation for in-memory filtering.
//!
//! This module understands the subset of the query language the proxies and their
//! callers produce: exact field matches (array fields match when any element does),
//! dotted paths, `$and`/`$or`/`$nor`, and the field operators `$eq`, `$ne`, `$gt`,
//! `$gte`, `$lt`, `$lte`, `$in`, `$nin`, `$all`, `$exists`, `$size` and `$not`.
//! Anything else is rejected with [`MemoryStoreError::UnknownOperator`].

use std::cmp::Ordering;

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use crate::error::{MemoryStoreError, MemoryStoreResult};

/// Type-erased, comparable representation of BSON values.
///
/// Integers of both widths compare exactly as `i64`; doubles compare numerically with
/// integers. Embedded documents are equal only with the same fields in the same order.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Array(Vec<Comparable<'a>>),
    Map(Vec<(&'a str, Comparable<'a>)>),
    /// Binary, regex and the rest: only equal to themselves.
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Int(i64::from(*value)),
            Bson::Int64(value) => Comparable::Int(*value),
            Bson::Double(value) => Comparable::Double(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
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
            other => Comparable::Other(other),
        }
    }
}

impl Comparable<'_> {
    /// Position of the value's type in the store's cross-type sort order.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 1,
            Comparable::Int(_) | Comparable::Double(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Map(_) => 4,
            Comparable::Array(_) => 5,
            Comparable::Other(_) => 6,
            Comparable::ObjectId(_) => 7,
            Comparable::Bool(_) => 8,
            Comparable::DateTime(_) => 9,
        }
    }

    /// Total order for sorting: by type first, then by value.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match self.rank().cmp(&other.rank()) {
            Ordering::Equal => self.partial_cmp(other).unwrap_or(Ordering::Equal),
            ordering => ordering,
        }
    }
}

/// Compares an integer with a double without rounding the integer.
fn int_double_cmp(int: i64, double: f64) -> Option<Ordering> {
    if double.is_nan() {
        return None;
    }
    // 2^63 as f64; every double at or above it exceeds i64::MAX
    if double >= 9_223_372_036_854_775_808.0 {
        return Some(Ordering::Less);
    }
    if double < -9_223_372_036_854_775_808.0 {
        return Some(Ordering::Greater);
    }

    let whole = double.trunc();

    Some(
        int.cmp(&(whole as i64))
            .then_with(|| 0.0_f64.partial_cmp(&(double - whole)).unwrap_or(Ordering::Equal)),
    )
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Int(a), Comparable::Int(b)) => a == b,
            (Comparable::Double(a), Comparable::Double(b)) => a == b,
            (Comparable::Int(a), Comparable::Double(b)) => int_double_cmp(*a, *b).is_some_and(Ordering::is_eq),
            (Comparable::Double(a), Comparable::Int(b)) => int_double_cmp(*b, *a).is_some_and(Ordering::is_eq),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Int(b)) => a.partial_cmp(b),
            (Comparable::Double(a), Comparable::Double(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Double(b)) => int_double_cmp(*a, *b),
            (Comparable::Double(a), Comparable::Int(b)) => int_double_cmp(*b, *a).map(Ordering::reverse),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a dotted path through nested documents and array indices.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;

    for part in parts {
        current = match current {
            Bson::Document(doc) => doc.get(part)?,
            Bson::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Numeric value of a BSON number.
pub(crate) fn number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Truthiness as used by `$exists` and projections.
pub(crate) fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null | Bson::Undefined => false,
        other => number(other).is_none_or(|n| n != 0.0),
    }
}

/// The document if every key of it is an `$operator`.
pub(crate) fn operator_document(value: &Bson) -> Option<&Document> {
    match value {
        Bson::Document(doc) if !doc.is_empty() && doc.keys().all(|k| k.starts_with('$')) => Some(doc),
        _ => None,
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Whether the document satisfies every clause of `filter`.
    pub fn evaluate(&self, filter: &Document) -> MemoryStoreResult<bool> {
        for (key, condition) in filter {
            let matched = match key.as_str() {
                "$and" => {
                    let mut all = true;
                    for clause in clauses(key, condition)? {
                        if !self.evaluate(clause)? {
                            all = false;
                            break;
                        }
                    }
                    all
                },
                "$or" => self.any(clauses(key, condition)?)?,
                "$nor" => !self.any(clauses(key, condition)?)?,
                op if op.starts_with('$') => {
                    return Err(MemoryStoreError::UnknownOperator(op.to_string()));
                },
                path => matches_condition(lookup(self.document, path), condition)?,
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn any(&self, clauses: Vec<&Document>) -> MemoryStoreResult<bool> {
        for clause in clauses {
            if self.evaluate(clause)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Indices of the documents matching `filter`, in storage order.
    pub fn matching_positions(
        documents: &[Document],
        filter: &Document,
    ) -> MemoryStoreResult<Vec<usize>> {
        let mut positions = Vec::new();

        for (position, document) in documents.iter().enumerate() {
            if DocumentEvaluator::new(document).evaluate(filter)? {
                positions.push(position);
            }
        }

        Ok(positions)
    }
}

fn clauses<'b>(op: &str, condition: &'b Bson) -> MemoryStoreResult<Vec<&'b Document>> {
    match condition {
        Bson::Array(items) if !items.is_empty() => items
            .iter()
            .map(|item| {
                item.as_document()
                    .ok_or_else(|| MemoryStoreError::BadValue(format!("{op} entries must be documents")))
            })
            .collect(),
        _ => Err(MemoryStoreError::BadValue(format!("{op} must be a nonempty array"))),
    }
}

/// Whether a field value satisfies a literal or an operator document.
pub(crate) fn matches_condition(value: Option<&Bson>, condition: &Bson) -> MemoryStoreResult<bool> {
    let Some(operators) = operator_document(condition) else {
        return Ok(equals(value, condition));
    };

    for (op, operand) in operators {
        if !matches_operator(value, op, operand)? {
            return Ok(false);
        }
    }

    Ok(true)
}

fn matches_operator(value: Option<&Bson>, op: &str, operand: &Bson) -> MemoryStoreResult<bool> {
    Ok(match op {
        "$eq" => equals(value, operand),
        "$ne" => !equals(value, operand),
        "$gt" => compares(value, operand, Ordering::is_gt),
        "$gte" => compares(value, operand, Ordering::is_ge),
        "$lt" => compares(value, operand, Ordering::is_lt),
        "$lte" => compares(value, operand, Ordering::is_le),
        "$in" => list(op, operand)?
            .iter()
            .any(|candidate| equals(value, candidate)),
        "$nin" => !list(op, operand)?
            .iter()
            .any(|candidate| equals(value, candidate)),
        "$all" => list(op, operand)?
            .iter()
            .all(|candidate| equals(value, candidate)),
        "$exists" => value.is_some() == truthy(operand),
        "$size" => match (value, number(operand)) {
            (Some(Bson::Array(items)), Some(size)) => items.len() as f64 == size,
            (_, None) => return Err(MemoryStoreError::BadValue("$size needs a number".into())),
            _ => false,
        },
        "$not" => !matches_condition(value, operand)?,
        other => return Err(MemoryStoreError::UnknownOperator(other.to_string())),
    })
}

fn list<'b>(op: &str, operand: &'b Bson) -> MemoryStoreResult<&'b Vec<Bson>> {
    operand
        .as_array()
        .ok_or_else(|| MemoryStoreError::BadValue(format!("{op} needs an array")))
}

/// Equality match. A missing field equals `null`; an array field matches when the
/// whole array or any element equals `expected`.
pub(crate) fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    let expected_value = Comparable::from(expected);

    match value {
        None => matches!(expected_value, Comparable::Null),
        Some(value) => {
            Comparable::from(value) == expected_value
                || matches!(
                    value,
                    Bson::Array(items) if items.iter().any(|item| Comparable::from(item) == expected_value)
                )
        },
    }
}

fn compares(value: Option<&Bson>, operand: &Bson, accept: fn(Ordering) -> bool) -> bool {
    let operand = Comparable::from(operand);
    let check = |value: &Bson| {
        Comparable::from(value)
            .partial_cmp(&operand)
            .is_some_and(accept)
    };

    match value {
        Some(Bson::Array(items)) => items.iter().any(check),
        Some(value) => check(value),
        None => false,
    }
}

/// Sorts by an ordered `{ field: 1 | -1 }` specification.
pub(crate) fn sort_documents(documents: &mut [Document], sort: &Document) {
    documents.sort_by(|a, b| compare_documents(a, b, sort));
}

pub(crate) fn compare_documents(a: &Document, b: &Document, sort: &Document) -> Ordering {
    for (field, direction) in sort {
        let left = lookup(a, field).map(Comparable::from).unwrap_or(Comparable::Null);
        let right = lookup(b, field).map(Comparable::from).unwrap_or(Comparable::Null);
        let ordering = left.sort_cmp(&right);
        let ordering = if number(direction).is_some_and(|d| d < 0.0) {
            ordering.reverse()
        } else {
            ordering
        };

        if ordering.is_ne() {
            return ordering;
        }
    }

    Ordering::Equal
}

/// Applies an inclusion or exclusion projection to top-level fields.
pub(crate) fn project(document: Document, projection: &Document) -> Document {
    if projection.is_empty() {
        return document;
    }

    let inclusive = projection
        .iter()
        .any(|(key, value)| truthy(value) && (key != "_id" || projection.len() == 1));

    document
        .into_iter()
        .filter(|(key, _)| match projection.get(key) {
            Some(flag) => truthy(flag),
            None => !inclusive || key == "_id",
        })
        .collect()
}
