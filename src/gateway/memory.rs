//! In-process [`DocumentStore`]
//!
//! Keeps collections in a map behind an async `RwLock`. Understands the
//! subset of MongoDB query language the tool surface is usually driven
//! with: equality and comparison filters, `$and`/`$or`, the `$set`,
//! `$unset` and `$inc` update operators, and the `$match`, `$sort`,
//! `$skip`, `$limit`, `$project` and `$count` pipeline stages. Anything
//! else fails the way the server would, with an error message.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use mongodb::bson::{oid::ObjectId, Bson, Document};
use tokio::sync::RwLock;
use tracing::debug;

use super::store::{BoxFuture, DocumentStore, StoreError, StoreResult};

/// Document store that lives in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<BTreeMap<String, Vec<Document>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in `collection`
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, |docs| docs.len())
    }
}

impl DocumentStore for MemoryStore {
    fn find<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
    ) -> BoxFuture<'a, StoreResult<Vec<Document>>> {
        Box::pin(async move {
            let collections = self.collections.read().await;
            let Some(docs) = collections.get(collection) else {
                return Ok(Vec::new());
            };
            let mut found = Vec::new();
            for doc in docs {
                if matches_filter(doc, &filter)? {
                    found.push(doc.clone());
                }
            }
            Ok(found)
        })
    }

    fn aggregate<'a>(
        &'a self,
        collection: &'a str,
        pipeline: Vec<Document>,
    ) -> BoxFuture<'a, StoreResult<Vec<Document>>> {
        Box::pin(async move {
            let mut docs = self
                .collections
                .read()
                .await
                .get(collection)
                .cloned()
                .unwrap_or_default();
            for stage in &pipeline {
                docs = apply_stage(docs, stage)?;
            }
            Ok(docs)
        })
    }

    fn insert_one<'a>(
        &'a self,
        collection: &'a str,
        document: Document,
    ) -> BoxFuture<'a, StoreResult<Bson>> {
        Box::pin(async move {
            let mut ids = self.insert_many(collection, vec![document]).await?;
            ids.pop()
                .ok_or_else(|| StoreError::new("insert produced no identifier"))
        })
    }

    fn insert_many<'a>(
        &'a self,
        collection: &'a str,
        documents: Vec<Document>,
    ) -> BoxFuture<'a, StoreResult<Vec<Bson>>> {
        Box::pin(async move {
            if documents.is_empty() {
                return Err(StoreError::new("documents must be a non-empty list"));
            }
            let mut collections = self.collections.write().await;
            let docs = collections.entry(collection.to_string()).or_default();

            let mut prepared = Vec::with_capacity(documents.len());
            for document in documents {
                let document = with_object_id(document);
                let id = document.get("_id").cloned().unwrap_or(Bson::Null);
                let duplicate = docs
                    .iter()
                    .chain(prepared.iter())
                    .any(|existing: &Document| existing.get("_id") == Some(&id));
                if duplicate {
                    return Err(StoreError::new(format!(
                        "E11000 duplicate key error collection: {collection} index: _id_ dup key: {{ _id: {id} }}"
                    )));
                }
                prepared.push(document);
            }

            let ids = prepared
                .iter()
                .map(|doc| doc.get("_id").cloned().unwrap_or(Bson::Null))
                .collect();
            docs.extend(prepared);
            Ok(ids)
        })
    }

    fn update_many<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
        update: Document,
    ) -> BoxFuture<'a, StoreResult<u64>> {
        Box::pin(async move {
            validate_update(&update)?;
            let mut collections = self.collections.write().await;
            let Some(docs) = collections.get_mut(collection) else {
                return Ok(0);
            };

            let mut modified = 0;
            for doc in docs.iter_mut() {
                if !matches_filter(doc, &filter)? {
                    continue;
                }
                let mut updated = doc.clone();
                apply_update(&mut updated, &update)?;
                if updated != *doc {
                    *doc = updated;
                    modified += 1;
                }
            }
            debug!("update_many on {} modified {} document(s)", collection, modified);
            Ok(modified)
        })
    }

    fn delete_many<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
    ) -> BoxFuture<'a, StoreResult<u64>> {
        Box::pin(async move {
            let mut collections = self.collections.write().await;
            let Some(docs) = collections.get_mut(collection) else {
                return Ok(0);
            };

            let mut kept = Vec::with_capacity(docs.len());
            let mut deleted = 0;
            for doc in docs.drain(..) {
                if matches_filter(&doc, &filter)? {
                    deleted += 1;
                } else {
                    kept.push(doc);
                }
            }
            *docs = kept;
            Ok(deleted)
        })
    }

    fn create_collection<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            if name.is_empty() {
                return Err(StoreError::new("Invalid collection name: empty string"));
            }
            let mut collections = self.collections.write().await;
            if collections.contains_key(name) {
                return Err(StoreError::new(format!("Collection {name} already exists")));
            }
            collections.insert(name.to_string(), Vec::new());
            Ok(())
        })
    }

    fn list_collection_names(&self) -> BoxFuture<'_, StoreResult<Vec<String>>> {
        Box::pin(async move { Ok(self.collections.read().await.keys().cloned().collect()) })
    }
}

/// Put a generated ObjectId first when the document has no `_id`
fn with_object_id(document: Document) -> Document {
    if document.contains_key("_id") {
        return document;
    }
    let mut with_id = Document::new();
    with_id.insert("_id", ObjectId::new());
    for (key, value) in document {
        with_id.insert(key, value);
    }
    with_id
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

fn matches_filter(doc: &Document, filter: &Document) -> StoreResult<bool> {
    for (key, condition) in filter {
        let matched = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in sub_filters(key, condition)? {
                    all &= matches_filter(doc, clause)?;
                }
                all
            }
            "$or" => {
                let mut any = false;
                for clause in sub_filters(key, condition)? {
                    any |= matches_filter(doc, clause)?;
                }
                any
            }
            op if op.starts_with('$') => {
                return Err(StoreError::new(format!("unknown top level operator: {op}")));
            }
            path => matches_condition(lookup(doc, path), condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn sub_filters<'a>(operator: &str, value: &'a Bson) -> StoreResult<Vec<&'a Document>> {
    let Bson::Array(items) = value else {
        return Err(StoreError::new(format!("{operator} must be an array")));
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(doc) => Ok(doc),
            _ => Err(StoreError::new(format!(
                "{operator} argument's entries must be objects"
            ))),
        })
        .collect()
}

fn is_operator_document(value: &Bson) -> bool {
    matches!(value, Bson::Document(doc) if doc.keys().next().is_some_and(|k| k.starts_with('$')))
}

fn matches_condition(value: Option<&Bson>, condition: &Bson) -> StoreResult<bool> {
    let Bson::Document(operators) = condition else {
        return Ok(equals(value, condition));
    };
    if !is_operator_document(condition) {
        return Ok(equals(value, condition));
    }

    for (op, operand) in operators {
        let ok = match op.as_str() {
            "$eq" => equals(value, operand),
            "$ne" => !equals(value, operand),
            "$gt" => compares(value, operand, |o| o == Ordering::Greater),
            "$gte" => compares(value, operand, |o| o != Ordering::Less),
            "$lt" => compares(value, operand, |o| o == Ordering::Less),
            "$lte" => compares(value, operand, |o| o != Ordering::Greater),
            "$in" => match operand {
                Bson::Array(candidates) => candidates.iter().any(|c| equals(value, c)),
                _ => return Err(StoreError::new("$in needs an array")),
            },
            "$nin" => match operand {
                Bson::Array(candidates) => !candidates.iter().any(|c| equals(value, c)),
                _ => return Err(StoreError::new("$nin needs an array")),
            },
            "$exists" => value.is_some() == truthy(operand),
            other => return Err(StoreError::new(format!("unknown operator: {other}"))),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Equality with numeric widening; arrays match when any element does.
fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    match value {
        None => matches!(expected, Bson::Null),
        Some(Bson::Array(items)) if !matches!(expected, Bson::Array(_)) => {
            items.iter().any(|item| bson_eq(item, expected))
        }
        Some(actual) => bson_eq(actual, expected),
    }
}

fn compares(value: Option<&Bson>, operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    value
        .and_then(|actual| compare(actual, operand))
        .is_some_and(accept)
}

fn bson_eq(a: &Bson, b: &Bson) -> bool {
    match compare(a, b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null => false,
        other => as_f64(other).map_or(true, |n| n != 0.0),
    }
}

/// Resolve a dotted path such as `address.city`
fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

fn validate_update(update: &Document) -> StoreResult<()> {
    if update.is_empty() {
        return Err(StoreError::new("Update document must not be empty"));
    }
    if update.keys().any(|k| !k.starts_with('$')) {
        return Err(StoreError::new("update only works with $ operators"));
    }
    Ok(())
}

fn apply_update(doc: &mut Document, update: &Document) -> StoreResult<()> {
    for (op, fields) in update {
        let Bson::Document(fields) = fields else {
            return Err(StoreError::new(format!(
                "Modifiers operate on fields but we found type {:?} instead",
                fields.element_type()
            )));
        };
        for (path, operand) in fields {
            match op.as_str() {
                "$set" => set_path(doc, path, operand.clone())?,
                "$unset" => unset_path(doc, path),
                "$inc" => {
                    let current = lookup(doc, path).cloned();
                    let next = increment(path, current.as_ref(), operand)?;
                    set_path(doc, path, next)?;
                }
                other => {
                    return Err(StoreError::new(format!(
                        "Unknown modifier: {other}. Expected a valid update modifier or pipeline-style update specified as an array"
                    )))
                }
            }
        }
    }
    Ok(())
}

fn increment(path: &str, current: Option<&Bson>, by: &Bson) -> StoreResult<Bson> {
    if as_f64(by).is_none() {
        return Err(StoreError::new(format!(
            "Cannot increment with non-numeric argument: {{{path}: {by}}}"
        )));
    }
    let Some(current) = current else {
        return Ok(by.clone());
    };
    let result = match (current, by) {
        (Bson::Int32(a), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(i64::from(*a) + i64::from(*b)),
        },
        (Bson::Int32(a), Bson::Int64(b)) => Bson::Int64(i64::from(*a).saturating_add(*b)),
        (Bson::Int64(a), Bson::Int32(b)) => Bson::Int64(a.saturating_add(i64::from(*b))),
        (Bson::Int64(a), Bson::Int64(b)) => Bson::Int64(a.saturating_add(*b)),
        (a, b) => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => Bson::Double(x + y),
            _ => {
                return Err(StoreError::new(format!(
                    "Cannot apply $inc to a value of non-numeric type. Field '{path}' has non-numeric type {:?}",
                    a.element_type()
                )))
            }
        },
    };
    Ok(result)
}

fn set_path(doc: &mut Document, path: &str, value: Bson) -> StoreResult<()> {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            let child = doc
                .entry(head.to_string())
                .or_insert_with(|| Bson::Document(Document::new()));
            match child {
                Bson::Document(inner) => set_path(inner, rest, value),
                other => Err(StoreError::new(format!(
                    "Cannot create field '{rest}' in element {{{head}: {other}}}"
                ))),
            }
        }
    }
}

fn unset_path(doc: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = doc.get_mut(head) {
                unset_path(inner, rest);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

fn apply_stage(docs: Vec<Document>, stage: &Document) -> StoreResult<Vec<Document>> {
    if stage.len() != 1 {
        return Err(StoreError::new(
            "A pipeline stage specification object must contain exactly one field.",
        ));
    }
    let Some((name, spec)) = stage.iter().next() else {
        return Ok(docs);
    };

    match name.as_str() {
        "$match" => {
            let filter = stage_document(name, spec)?;
            let mut kept = Vec::new();
            for doc in docs {
                if matches_filter(&doc, filter)? {
                    kept.push(doc);
                }
            }
            Ok(kept)
        }
        "$limit" => Ok(docs.into_iter().take(stage_count(name, spec)?).collect()),
        "$skip" => Ok(docs.into_iter().skip(stage_count(name, spec)?).collect()),
        "$sort" => {
            let keys = stage_document(name, spec)?;
            let mut sorted = docs;
            sorted.sort_by(|a, b| {
                for (field, direction) in keys {
                    let ordering = match (lookup(a, field), lookup(b, field)) {
                        (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
                        (None, Some(_)) => Ordering::Less,
                        (Some(_), None) => Ordering::Greater,
                        (None, None) => Ordering::Equal,
                    };
                    let ordering = if as_f64(direction).is_some_and(|d| d < 0.0) {
                        ordering.reverse()
                    } else {
                        ordering
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
            Ok(sorted)
        }
        "$project" => {
            let projection = stage_document(name, spec)?;
            Ok(docs.iter().map(|doc| project(doc, projection)).collect())
        }
        "$count" => {
            let Bson::String(field) = spec else {
                return Err(StoreError::new("the count field must be a non-empty string"));
            };
            if docs.is_empty() {
                return Ok(Vec::new());
            }
            let mut counted = Document::new();
            counted.insert(field.clone(), Bson::Int64(docs.len() as i64));
            Ok(vec![counted])
        }
        other => Err(StoreError::new(format!(
            "Unrecognized pipeline stage name: '{other}'"
        ))),
    }
}

fn stage_document<'a>(name: &str, spec: &'a Bson) -> StoreResult<&'a Document> {
    match spec {
        Bson::Document(doc) => Ok(doc),
        _ => Err(StoreError::new(format!(
            "the {name} stage specification must be an object"
        ))),
    }
}

fn stage_count(name: &str, spec: &Bson) -> StoreResult<usize> {
    as_f64(spec)
        .filter(|n| *n >= 0.0 && n.fract() == 0.0)
        .map(|n| n as usize)
        .ok_or_else(|| StoreError::new(format!("invalid argument to {name} stage")))
}

/// Inclusion projection; `_id` is kept unless explicitly excluded.
fn project(doc: &Document, projection: &Document) -> Document {
    let mut projected = Document::new();
    let keep_id = projection.get("_id").map_or(true, truthy);
    if keep_id {
        if let Some(id) = doc.get("_id") {
            projected.insert("_id", id.clone());
        }
    }
    for (field, include) in projection {
        if field == "_id" || !truthy(include) {
            continue;
        }
        if let Some(value) = lookup(doc, field) {
            projected.insert(field.clone(), value.clone());
        }
    }
    projected
}
