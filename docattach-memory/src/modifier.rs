//! Update-operator application for in-memory documents.

use bson::{Bson, Document};

use crate::{
    error::{MemoryStoreError, MemoryStoreResult},
    evaluator::{Comparable, equals, lookup, matches_condition, number, operator_document},
};

/// Applies an operator document to `document` in place.
///
/// `inserting` is set when the document is being created by an upsert, which is the
/// only time `$setOnInsert` has an effect. Returns whether anything changed.
pub(crate) fn apply_operators(
    document: &mut Document,
    update: &Document,
    inserting: bool,
) -> MemoryStoreResult<bool> {
    let before = document.clone();

    for (op, fields) in update {
        let fields = fields
            .as_document()
            .ok_or_else(|| MemoryStoreError::BadValue(format!("{op} needs a document of fields")))?;

        for (path, argument) in fields {
            apply_operator(document, op, path, argument, inserting)?;
        }
    }

    if before.contains_key("_id") && document.get("_id") != before.get("_id") {
        return Err(MemoryStoreError::ImmutableId);
    }

    Ok(*document != before)
}

fn apply_operator(
    document: &mut Document,
    op: &str,
    path: &str,
    argument: &Bson,
    inserting: bool,
) -> MemoryStoreResult<()> {
    match op {
        "$set" => set_path(document, path, argument.clone()),
        "$setOnInsert" if inserting => set_path(document, path, argument.clone()),
        "$setOnInsert" => Ok(()),
        "$unset" => {
            unset_path(document, path);
            Ok(())
        },
        "$inc" => {
            let value = match lookup(document, path) {
                Some(current) => arithmetic(op, current, argument, i64::checked_add, |a, b| a + b)?,
                None => numeric_argument(op, argument)?.clone(),
            };
            set_path(document, path, value)
        },
        "$mul" => {
            let zero = Bson::Int32(0);
            let current = lookup(document, path).unwrap_or(&zero);
            let value = arithmetic(op, current, argument, i64::checked_mul, |a, b| a * b)?;
            set_path(document, path, value)
        },
        "$min" | "$max" => {
            let replace = match lookup(document, path) {
                Some(current) => {
                    let ordering = Comparable::from(argument).sort_cmp(&Comparable::from(current));
                    if op == "$min" { ordering.is_lt() } else { ordering.is_gt() }
                },
                None => true,
            };

            if replace {
                set_path(document, path, argument.clone())?;
            }
            Ok(())
        },
        "$rename" => {
            let target = argument
                .as_str()
                .ok_or_else(|| MemoryStoreError::BadValue("$rename target must be a string".into()))?;

            if let Some(value) = unset_path(document, path) {
                set_path(document, target, value)?;
            }
            Ok(())
        },
        "$push" => {
            let items = match argument.as_document().and_then(|each| each.get("$each")) {
                Some(Bson::Array(items)) => items.clone(),
                Some(_) => return Err(MemoryStoreError::BadValue("$each needs an array".into())),
                None => vec![argument.clone()],
            };
            append(document, op, path, items, false)
        },
        "$addToSet" => {
            let items = match argument.as_document().and_then(|each| each.get("$each")) {
                Some(Bson::Array(items)) => items.clone(),
                Some(_) => return Err(MemoryStoreError::BadValue("$each needs an array".into())),
                None => vec![argument.clone()],
            };
            append(document, op, path, items, true)
        },
        "$pop" => {
            let from_front = number(argument).is_some_and(|n| n < 0.0);

            if let Some(items) = array_at(document, op, path)? {
                if from_front {
                    if !items.is_empty() {
                        items.remove(0);
                    }
                } else {
                    items.pop();
                }
            }
            Ok(())
        },
        "$pull" => {
            let Some(items) = array_at(document, op, path)? else {
                return Ok(());
            };

            let mut kept = Vec::with_capacity(items.len());
            for item in items.drain(..) {
                let pulled = match operator_document(argument) {
                    Some(_) => matches_condition(Some(&item), argument)?,
                    None => Comparable::from(&item) == Comparable::from(argument),
                };
                if !pulled {
                    kept.push(item);
                }
            }
            *items = kept;
            Ok(())
        },
        "$pullAll" => {
            let pulled = argument
                .as_array()
                .ok_or_else(|| MemoryStoreError::BadValue("$pullAll needs an array".into()))?
                .clone();

            if let Some(items) = array_at(document, op, path)? {
                items.retain(|item| !pulled.iter().any(|p| Comparable::from(item) == Comparable::from(p)));
            }
            Ok(())
        },
        other => Err(MemoryStoreError::UnknownOperator(other.to_string())),
    }
}

fn numeric_argument<'b>(op: &str, argument: &'b Bson) -> MemoryStoreResult<&'b Bson> {
    match number(argument) {
        Some(_) => Ok(argument),
        None => Err(MemoryStoreError::BadValue(format!("{op} needs a numeric argument"))),
    }
}

/// Integer arithmetic stays integral (widening on overflow); any double makes a double.
fn arithmetic(
    op: &str,
    current: &Bson,
    argument: &Bson,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> MemoryStoreResult<Bson> {
    let bad = || MemoryStoreError::BadValue(format!("cannot apply {op} to a non-numeric value"));

    Ok(match (current, argument) {
        (Bson::Int32(a), Bson::Int32(b)) => {
            let result = int_op(i64::from(*a), i64::from(*b)).ok_or_else(bad)?;
            i32::try_from(result)
                .map(Bson::Int32)
                .unwrap_or(Bson::Int64(result))
        },
        (Bson::Int32(_) | Bson::Int64(_), Bson::Int32(_) | Bson::Int64(_)) => {
            let a = current.as_i64().or_else(|| current.as_i32().map(i64::from)).ok_or_else(bad)?;
            let b = argument.as_i64().or_else(|| argument.as_i32().map(i64::from)).ok_or_else(bad)?;
            Bson::Int64(int_op(a, b).ok_or_else(bad)?)
        },
        _ => Bson::Double(float_op(
            number(current).ok_or_else(bad)?,
            number(argument).ok_or_else(bad)?,
        )),
    })
}

fn append(
    document: &mut Document,
    op: &str,
    path: &str,
    values: Vec<Bson>,
    unique: bool,
) -> MemoryStoreResult<()> {
    if lookup(document, path).is_none() {
        set_path(document, path, Bson::Array(Vec::new()))?;
    }

    if let Some(items) = array_at(document, op, path)? {
        for value in values {
            if !unique || !equals(Some(&Bson::Array(items.clone())), &value) {
                items.push(value);
            }
        }
    }

    Ok(())
}

/// The array at `path`, `None` if the field is absent, an error if it is not an array.
fn array_at<'d>(
    document: &'d mut Document,
    op: &str,
    path: &str,
) -> MemoryStoreResult<Option<&'d mut Vec<Bson>>> {
    match lookup_mut(document, path) {
        None => Ok(None),
        Some(Bson::Array(items)) => Ok(Some(items)),
        Some(_) => Err(MemoryStoreError::BadValue(format!("{op} needs an array at '{path}'"))),
    }
}

fn lookup_mut<'d>(document: &'d mut Document, path: &str) -> Option<&'d mut Bson> {
    let (parent, leaf) = match path.rsplit_once('.') {
        Some((parent, leaf)) => (parent_mut(document, parent)?, leaf),
        None => (document, path),
    };

    parent.get_mut(leaf)
}

fn parent_mut<'d>(document: &'d mut Document, path: &str) -> Option<&'d mut Document> {
    let mut current = document;

    for part in path.split('.') {
        current = match current.get_mut(part)? {
            Bson::Document(doc) => doc,
            _ => return None,
        };
    }

    Some(current)
}

/// Sets a dotted path, creating intermediate documents as needed.
pub(crate) fn set_path(document: &mut Document, path: &str, value: Bson) -> MemoryStoreResult<()> {
    let mut current = document;
    let mut parts = path.split('.').peekable();

    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            current.insert(part, value);
            return Ok(());
        }

        if !current.contains_key(part) {
            current.insert(part, Document::new());
        }

        current = match current.get_mut(part) {
            Some(Bson::Document(doc)) => doc,
            _ => {
                return Err(MemoryStoreError::BadValue(format!(
                    "cannot create field in non-document at '{path}'"
                )));
            },
        };
    }

    Ok(())
}

/// Removes a dotted path and returns the value it held.
pub(crate) fn unset_path(document: &mut Document, path: &str) -> Option<Bson> {
    match path.rsplit_once('.') {
        Some((parent, leaf)) => parent_mut(document, parent)?.remove(leaf),
        None => document.remove(path),
    }
}
