//! In-memory driver implementation.
//!
//! Documents live in insertion order per namespace behind async-aware read-write
//! locks. Every driver call takes the lock once, so each call is atomic with respect to
//! every other call, which is stronger than the single-document atomicity the proxies
//! rely on.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use futures::stream::{self, StreamExt};
use mea::rwlock::RwLock;
use tracing::{debug, trace};

use docattach_core::{
    binding::{Endpoint, Namespace},
    driver::{Connector, DocumentStream, SharedDriver, StoreDriver},
    error::AttachResult,
    options::{FindOptions, IndexKeys, IndexOptions, InsertOptions, UpdateOptions, UpdateOutcome},
    update::UpdateDoc,
};

use crate::{
    error::{MemoryStoreError, MemoryStoreResult},
    evaluator::{
        Comparable, DocumentEvaluator, compare_documents, operator_document, project, sort_documents,
        truthy,
    },
    modifier::{apply_operators, set_path},
};

type CollectionMap = HashMap<Namespace, Vec<Document>>;
type IndexNames = HashMap<Namespace, Vec<String>>;

/// Thread-safe in-memory document store.
///
/// `InMemoryStore` is cloneable and clones share the same data. It is a [`StoreDriver`]
/// and also a [`Connector`] that hands itself out for every endpoint.
///
/// # Example
///
/// ```ignore
/// use docattach_memory::InMemoryStore;
/// use docattach_core::{attach::Attachment, binding::Namespace};
/// use bson::doc;
///
/// let store = InMemoryStore::builder()
///     .documents(Namespace::new("app", "widget"), vec![doc! { "_id": 42, "color": "red" }])
///     .build();
///
/// let widgets = Attachment::<Widget>::new(store.clone());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// namespace -> documents in insertion order
    collections: Arc<RwLock<CollectionMap>>,
    /// Index names per namespace. Indexes are recorded, not enforced.
    indexes: Arc<RwLock<IndexNames>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Snapshot of a collection's documents in insertion order.
    pub async fn documents(&self, namespace: &Namespace) -> Vec<Document> {
        self.collections
            .read()
            .await
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }

    /// Names of the indexes created on a collection.
    pub async fn index_names(&self, namespace: &Namespace) -> Vec<String> {
        self.indexes
            .read()
            .await
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }

    async fn find_and_modify(&self, database: &str, target: &Bson, command: &Document) -> AttachResult<Document> {
        let collection = target
            .as_str()
            .ok_or_else(|| MemoryStoreError::BadValue("collection name must be a string".into()))?;
        let namespace = Namespace::new(database, collection);
        let query = command.get_document("query").cloned().unwrap_or_default();
        let remove = command.get("remove").is_some_and(truthy);
        let return_new = command.get("new").is_some_and(truthy);
        let upsert = command.get("upsert").is_some_and(truthy);
        let update = match command.get("update") {
            Some(Bson::Document(update)) => Some(UpdateDoc::classify(update.clone())?),
            Some(_) => return Err(MemoryStoreError::BadValue("update must be a document".into()).into()),
            None => None,
        };

        if remove == update.is_some() {
            return Err(MemoryStoreError::BadValue(
                "findAndModify needs exactly one of update or remove".into(),
            )
            .into());
        }

        let mut collections = self.collections.write().await;
        let documents = collections.entry(namespace.clone()).or_default();
        let mut positions = DocumentEvaluator::matching_positions(documents, &query)?;

        if let Ok(sort) = command.get_document("sort") {
            positions.sort_by(|&a, &b| compare_documents(&documents[a], &documents[b], sort));
        }

        let (value, last_error) = match (positions.first().copied(), update) {
            (Some(position), None) => {
                let previous = documents.remove(position);
                (Bson::Document(previous), doc! { "n": 1 })
            },
            (Some(position), Some(update)) => {
                let previous = documents[position].clone();
                let mut next = previous.clone();
                apply_update(&mut next, &update)?;
                documents[position] = next.clone();

                let value = if return_new { next } else { previous };
                (Bson::Document(value), doc! { "n": 1, "updatedExisting": true })
            },
            (None, Some(update)) if upsert => {
                let created = upsert_document(&query, &update)?;
                let id = created.get("_id").cloned().unwrap_or(Bson::Null);
                ensure_unique(&namespace, documents, &id)?;
                documents.push(created.clone());

                let value = if return_new { Bson::Document(created) } else { Bson::Null };
                (value, doc! { "n": 1, "updatedExisting": false, "upserted": id })
            },
            (None, _) => (Bson::Null, doc! { "n": 0, "updatedExisting": false }),
        };

        let value = match (value, command.get_document("fields")) {
            (Bson::Document(document), Ok(fields)) => Bson::Document(project(document, fields)),
            (value, _) => value,
        };

        debug!(namespace = %namespace, remove, "findAndModify");

        Ok(doc! {
            "lastErrorObject": last_error,
            "value": value,
            "ok": 1.0,
        })
    }
}

#[async_trait]
impl StoreDriver for InMemoryStore {
    async fn find(
        &self,
        namespace: &Namespace,
        filter: Document,
        options: FindOptions,
    ) -> AttachResult<DocumentStream> {
        let mut matched = {
            let collections = self.collections.read().await;
            let Some(documents) = collections.get(namespace) else {
                return Ok(stream::empty().boxed());
            };

            DocumentEvaluator::matching_positions(documents, &filter)?
                .into_iter()
                .map(|position| documents[position].clone())
                .collect::<Vec<_>>()
        };

        if let Some(sort) = &options.sort {
            sort_documents(&mut matched, sort);
        }

        let skip = options
            .skip
            .and_then(|skip| usize::try_from(skip).ok())
            .unwrap_or(0);
        // A negative limit means a single batch of that size; zero means no limit.
        let limit = match options.limit {
            Some(limit) if limit != 0 => usize::try_from(limit.unsigned_abs()).unwrap_or(usize::MAX),
            _ => usize::MAX,
        };
        let projection = options.projection.unwrap_or_default();

        trace!(namespace = %namespace, matched = matched.len(), "memory find");

        let results: Vec<AttachResult<Document>> = matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|document| Ok(project(document, &projection)))
            .collect();

        Ok(stream::iter(results).boxed())
    }

    async fn find_one(&self, namespace: &Namespace, filter: Document) -> AttachResult<Option<Document>> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(namespace) else {
            return Ok(None);
        };

        for document in documents {
            if DocumentEvaluator::new(document).evaluate(&filter)? {
                return Ok(Some(document.clone()));
            }
        }

        Ok(None)
    }

    async fn insert_many(
        &self,
        namespace: &Namespace,
        documents: Vec<Document>,
        options: InsertOptions,
    ) -> AttachResult<Vec<Bson>> {
        let ordered = options.ordered.unwrap_or(true);
        let mut collections = self.collections.write().await;
        let stored = collections.entry(namespace.clone()).or_default();
        let mut ids = Vec::with_capacity(documents.len());
        let mut failure = None;

        for document in documents {
            let (id, document) = with_id_first(document);

            match ensure_unique(namespace, stored, &id) {
                Ok(()) => {
                    stored.push(document);
                    ids.push(id);
                },
                Err(err) if ordered => return Err(err.into()),
                Err(err) => {
                    failure.get_or_insert(err);
                },
            }
        }

        trace!(namespace = %namespace, inserted = ids.len(), "memory insert");

        match failure {
            Some(err) => Err(err.into()),
            None => Ok(ids),
        }
    }

    async fn update(
        &self,
        namespace: &Namespace,
        filter: Document,
        update: UpdateDoc,
        options: UpdateOptions,
    ) -> AttachResult<UpdateOutcome> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(namespace.clone()).or_default();
        let positions = DocumentEvaluator::matching_positions(documents, &filter)?;

        if positions.is_empty() {
            if !options.upsert {
                return Ok(UpdateOutcome::default());
            }

            let created = upsert_document(&filter, &update)?;
            let id = created.get("_id").cloned().unwrap_or(Bson::Null);
            ensure_unique(namespace, documents, &id)?;
            documents.push(created);

            debug!(namespace = %namespace, id = %id, "memory upsert inserted");

            return Ok(UpdateOutcome {
                matched: 0,
                modified: 0,
                upserted_id: Some(id),
            });
        }

        let targets = if options.multi && !update.is_replacement() {
            &positions[..]
        } else {
            &positions[..1]
        };
        let mut modified = 0;

        for &position in targets {
            let mut next = documents[position].clone();

            if apply_update(&mut next, &update)? {
                modified += 1;
            }

            documents[position] = next;
        }

        trace!(namespace = %namespace, matched = targets.len(), modified, "memory update");

        Ok(UpdateOutcome {
            matched: targets.len() as u64,
            modified,
            upserted_id: None,
        })
    }

    async fn remove(&self, namespace: &Namespace, filter: Document) -> AttachResult<u64> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(namespace) else {
            return Ok(0);
        };

        let positions = DocumentEvaluator::matching_positions(documents, &filter)?;
        let mut position = 0;

        documents.retain(|_| {
            let keep = positions.binary_search(&position).is_err();
            position += 1;
            keep
        });

        Ok(positions.len() as u64)
    }

    async fn count(&self, namespace: &Namespace, filter: Document) -> AttachResult<u64> {
        let collections = self.collections.read().await;

        Ok(match collections.get(namespace) {
            Some(documents) => DocumentEvaluator::matching_positions(documents, &filter)?.len() as u64,
            None => 0,
        })
    }

    async fn create_index(
        &self,
        namespace: &Namespace,
        keys: IndexKeys,
        options: IndexOptions,
    ) -> AttachResult<String> {
        let name = options.name.unwrap_or_else(|| keys.default_name());
        let mut indexes = self.indexes.write().await;
        let names = indexes.entry(namespace.clone()).or_default();

        if !names.contains(&name) {
            names.push(name.clone());
        }

        Ok(name)
    }

    async fn run_command(&self, database: &str, command: Document) -> AttachResult<Document> {
        let Some((name, target)) = command.iter().next() else {
            return Err(MemoryStoreError::NoSuchCommand(String::new()).into());
        };

        match name.as_str() {
            "findAndModify" | "findandmodify" => self.find_and_modify(database, target, &command).await,
            "count" => {
                let collection = target
                    .as_str()
                    .ok_or_else(|| MemoryStoreError::BadValue("collection name must be a string".into()))?;
                let query = command.get_document("query").cloned().unwrap_or_default();
                let n = self.count(&Namespace::new(database, collection), query).await?;
                let n = i64::try_from(n).unwrap_or(i64::MAX);

                Ok(doc! { "n": n, "ok": 1.0 })
            },
            "ping" => Ok(doc! { "ok": 1.0 }),
            other => Err(MemoryStoreError::NoSuchCommand(other.to_string()).into()),
        }
    }
}

#[async_trait]
impl Connector for InMemoryStore {
    async fn connect(&self, _endpoint: &Endpoint) -> AttachResult<SharedDriver> {
        Ok(Arc::new(self.clone()))
    }
}

/// Connector that keeps one [`InMemoryStore`] per endpoint.
///
/// Attachments pointing at different hosts or ports see different data, the same way
/// they would against real servers.
#[derive(Default, Clone, Debug)]
pub struct InMemoryConnector {
    stores: Arc<RwLock<HashMap<Endpoint, InMemoryStore>>>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store behind `endpoint`, created empty on first use.
    pub async fn store(&self, endpoint: &Endpoint) -> InMemoryStore {
        if let Some(store) = self.stores.read().await.get(endpoint) {
            return store.clone();
        }

        self.stores
            .write()
            .await
            .entry(endpoint.clone())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    async fn connect(&self, endpoint: &Endpoint) -> AttachResult<SharedDriver> {
        Ok(Arc::new(self.store(endpoint).await))
    }
}

/// Builder for [`InMemoryStore`] with pre-seeded collections.
#[derive(Default, Debug)]
pub struct InMemoryStoreBuilder {
    seed: CollectionMap,
}

impl InMemoryStoreBuilder {
    /// Adds documents to a collection. Documents without `_id` get an [`ObjectId`].
    pub fn documents(mut self, namespace: Namespace, documents: Vec<Document>) -> Self {
        self.seed
            .entry(namespace)
            .or_default()
            .extend(documents.into_iter().map(|document| with_id_first(document).1));
        self
    }

    pub fn build(self) -> InMemoryStore {
        InMemoryStore {
            collections: Arc::new(RwLock::new(self.seed)),
            indexes: Arc::default(),
        }
    }
}

fn apply_update(document: &mut Document, update: &UpdateDoc) -> MemoryStoreResult<bool> {
    match update {
        UpdateDoc::Operators(operators) => apply_operators(document, operators, false),
        UpdateDoc::Replacement(replacement) => replace(document, replacement),
    }
}

/// Replaces every field but `_id`, which cannot change.
fn replace(existing: &mut Document, replacement: &Document) -> MemoryStoreResult<bool> {
    let id = existing.get("_id").cloned();

    if let (Some(id), Some(new_id)) = (&id, replacement.get("_id")) {
        if Comparable::from(id) != Comparable::from(new_id) {
            return Err(MemoryStoreError::ImmutableId);
        }
    }

    let mut next = Document::new();
    if let Some(id) = id {
        next.insert("_id", id);
    }
    for (key, value) in replacement {
        if key != "_id" {
            next.insert(key.clone(), value.clone());
        }
    }

    let changed = next != *existing;
    *existing = next;

    Ok(changed)
}

/// The document an upsert creates: the filter's equality fields with the update applied.
fn upsert_document(filter: &Document, update: &UpdateDoc) -> MemoryStoreResult<Document> {
    let mut document = Document::new();

    for (key, value) in filter {
        if !key.starts_with('$') && operator_document(value).is_none() {
            set_path(&mut document, key, value.clone())?;
        }
    }

    match update {
        UpdateDoc::Operators(operators) => {
            apply_operators(&mut document, operators, true)?;
        },
        UpdateDoc::Replacement(replacement) => {
            let id = document.remove("_id");
            document = replacement.clone();
            if let (Some(id), false) = (id, document.contains_key("_id")) {
                document.insert("_id", id);
            }
        },
    }

    Ok(with_id_first(document).1)
}

/// Moves `_id` to the front, generating an [`ObjectId`] when it is missing.
fn with_id_first(mut document: Document) -> (Bson, Document) {
    let id = document
        .remove("_id")
        .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));
    let mut ordered = doc! { "_id": id.clone() };

    for (key, value) in document {
        ordered.insert(key, value);
    }

    (id, ordered)
}

fn ensure_unique(namespace: &Namespace, documents: &[Document], id: &Bson) -> MemoryStoreResult<()> {
    let candidate = Comparable::from(id);
    let taken = documents
        .iter()
        .filter_map(|document| document.get("_id"))
        .any(|existing| Comparable::from(existing) == candidate);

    if taken {
        return Err(MemoryStoreError::DuplicateKey {
            namespace: namespace.to_string(),
            id: id.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docattach_core::{error::AttachError, options::IndexDirection};
    use futures::TryStreamExt;
    use rstest::{fixture, rstest};

    #[fixture]
    fn widgets() -> Namespace {
        Namespace::new("app", "widgets")
    }

    async fn seeded(namespace: &Namespace) -> InMemoryStore {
        InMemoryStore::builder()
            .documents(
                namespace.clone(),
                vec![
                    doc! { "_id": 3, "x": 1, "color": "red" },
                    doc! { "_id": 1, "x": 1, "color": "blue" },
                    doc! { "_id": 2, "x": 2 },
                ],
            )
            .build()
    }

    fn memory_error(err: &AttachError) -> Option<&MemoryStoreError> {
        err.driver_error::<MemoryStoreError>()
    }

    #[rstest]
    #[tokio::test]
    async fn test_find_with_options(widgets: Namespace) {
        let store = seeded(&widgets).await;
        let found: Vec<Document> = store
            .find(
                &widgets,
                doc! { "x": 1 },
                FindOptions::builder()
                    .sort(doc! { "_id": 1 })
                    .projection(doc! { "_id": 1 })
                    .build(),
            )
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(found, vec![doc! { "_id": 1 }, doc! { "_id": 3 }]);

        let page: Vec<Document> = store
            .find(&widgets, doc! {}, FindOptions::builder().skip(1).limit(1).build())
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(page, vec![doc! { "_id": 1, "x": 1, "color": "blue" }]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_unknown_collection_is_empty(widgets: Namespace) {
        let store = InMemoryStore::new();

        assert_eq!(store.count(&widgets, doc! {}).await.unwrap(), 0);
        assert_eq!(store.find_one(&widgets, doc! {}).await.unwrap(), None);
        assert_eq!(store.remove(&widgets, doc! {}).await.unwrap(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn test_insert_rejects_duplicate_ids(widgets: Namespace) {
        let store = seeded(&widgets).await;
        let err = store
            .insert_many(&widgets, vec![doc! { "_id": 4 }, doc! { "_id": 1_i64 }, doc! { "_id": 5 }], InsertOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(memory_error(&err), Some(MemoryStoreError::DuplicateKey { .. })));
        assert_eq!(store.count(&widgets, doc! {}).await.unwrap(), 4);

        let unordered = InsertOptions {
            ordered: Some(false),
            ..InsertOptions::default()
        };
        store
            .insert_many(&widgets, vec![doc! { "_id": 1 }, doc! { "_id": 6 }], unordered)
            .await
            .unwrap_err();

        assert_eq!(store.count(&widgets, doc! {}).await.unwrap(), 5);
    }

    #[rstest]
    #[tokio::test]
    async fn test_large_integer_ids_stay_distinct(widgets: Namespace) {
        let store = InMemoryStore::new();
        let low = 9_007_199_254_740_992_i64;
        let high = low + 1;

        store
            .insert_many(&widgets, vec![doc! { "_id": low }, doc! { "_id": high }], InsertOptions::default())
            .await
            .unwrap();

        assert_eq!(store.count(&widgets, doc! { "_id": high }).await.unwrap(), 1);
        assert_eq!(
            store.find_one(&widgets, doc! { "_id": high }).await.unwrap(),
            Some(doc! { "_id": high })
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_insert_generates_ids_first(widgets: Namespace) {
        let store = InMemoryStore::new();
        let ids = store
            .insert_many(&widgets, vec![doc! { "x": 1 }], InsertOptions::default())
            .await
            .unwrap();
        let stored = store.documents(&widgets).await;

        assert!(matches!(ids[0], Bson::ObjectId(_)));
        assert_eq!(stored[0].keys().next().map(String::as_str), Some("_id"));
    }

    #[rstest]
    #[case(UpdateOptions::default(), 1, 1)]
    #[case(UpdateOptions::multi(), 2, 2)]
    #[tokio::test]
    async fn test_update_first_or_all(
        widgets: Namespace,
        #[case] options: UpdateOptions,
        #[case] matched: u64,
        #[case] tagged: u64,
    ) {
        let store = seeded(&widgets).await;
        let outcome = store
            .update(&widgets, doc! { "x": 1 }, UpdateDoc::set(doc! { "tag": true }), options)
            .await
            .unwrap();

        assert_eq!(outcome.matched, matched);
        assert_eq!(store.count(&widgets, doc! { "tag": true }).await.unwrap(), tagged);
    }

    #[rstest]
    #[tokio::test]
    async fn test_replacement_keeps_id(widgets: Namespace) {
        let store = seeded(&widgets).await;

        store
            .update(&widgets, doc! { "_id": 2 }, UpdateDoc::Replacement(doc! { "y": 9 }), UpdateOptions::default())
            .await
            .unwrap();

        assert_eq!(
            store.find_one(&widgets, doc! { "_id": 2 }).await.unwrap(),
            Some(doc! { "_id": 2, "y": 9 })
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_upsert_seeds_from_filter(widgets: Namespace) {
        let store = InMemoryStore::new();
        let outcome = store
            .update(
                &widgets,
                doc! { "_id": 42, "missing": { "$exists": false } },
                UpdateDoc::Operators(doc! { "$setOnInsert": { "_id": 42 }, "$set": { "color": "red" } }),
                UpdateOptions::upsert(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.upserted_id, Some(Bson::Int32(42)));
        assert_eq!(store.documents(&widgets).await, vec![doc! { "_id": 42, "color": "red" }]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_failed_update_leaves_document_untouched(widgets: Namespace) {
        let store = seeded(&widgets).await;
        let err = store
            .update(
                &widgets,
                doc! { "_id": 3 },
                UpdateDoc::Operators(doc! { "$set": { "y": 1 }, "$inc": { "color": 1 } }),
                UpdateOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(memory_error(&err), Some(MemoryStoreError::BadValue(_))));
        assert_eq!(store.count(&widgets, doc! { "y": 1 }).await.unwrap(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn test_remove_matching(widgets: Namespace) {
        let store = seeded(&widgets).await;

        assert_eq!(store.remove(&widgets, doc! { "x": 1 }).await.unwrap(), 2);
        assert_eq!(store.documents(&widgets).await, vec![doc! { "_id": 2, "x": 2 }]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_find_and_modify_returns_pre_image(widgets: Namespace) {
        let store = seeded(&widgets).await;
        let command = doc! {
            "findAndModify": "widgets",
            "query": { "_id": 3 },
            "update": { "$unset": { "color": 1 } },
        };

        let first = store.run_command("app", command.clone()).await.unwrap();
        let second = store.run_command("app", command).await.unwrap();

        assert_eq!(
            first.get_document("value").unwrap().get("color"),
            Some(&Bson::String("red".into()))
        );
        assert_eq!(second.get_document("value").unwrap().get("color"), None);
    }

    #[rstest]
    #[tokio::test]
    async fn test_find_and_modify_remove_and_miss(widgets: Namespace) {
        let store = seeded(&widgets).await;

        let removed = store
            .run_command("app", doc! { "findandmodify": "widgets", "query": { "x": 1 }, "sort": { "_id": 1 }, "remove": true })
            .await
            .unwrap();
        let missed = store
            .run_command("app", doc! { "findAndModify": "widgets", "query": { "_id": 99 }, "update": { "$set": { "a": 1 } } })
            .await
            .unwrap();

        assert_eq!(removed.get_document("value").unwrap().get_i32("_id").unwrap(), 1);
        assert_eq!(missed.get("value"), Some(&Bson::Null));
        assert_eq!(store.count(&widgets, doc! {}).await.unwrap(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn test_commands(widgets: Namespace) {
        let store = seeded(&widgets).await;

        let count = store
            .run_command("app", doc! { "count": "widgets", "query": { "x": 1 } })
            .await
            .unwrap();
        let err = store
            .run_command("app", doc! { "shutdown": 1 })
            .await
            .unwrap_err();

        assert_eq!(count.get_i64("n").unwrap(), 2);
        assert_eq!(memory_error(&err), Some(&MemoryStoreError::NoSuchCommand("shutdown".into())));
    }

    #[rstest]
    #[tokio::test]
    async fn test_create_index_records_name(widgets: Namespace) {
        let store = InMemoryStore::new();
        let keys = IndexKeys::compound(vec![("score", IndexDirection::Descending), ("name", IndexDirection::Ascending)]);

        let name = store
            .create_index(&widgets, keys.clone(), IndexOptions::default())
            .await
            .unwrap();
        store
            .create_index(&widgets, keys, IndexOptions::default())
            .await
            .unwrap();

        assert_eq!(name, "score_-1_name_1");
        assert_eq!(store.index_names(&widgets).await, vec!["score_-1_name_1".to_string()]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_connector_keeps_one_store_per_endpoint(widgets: Namespace) {
        let connector = InMemoryConnector::new();
        let local = connector.connect(&Endpoint::default()).await.unwrap();
        let again = connector.connect(&Endpoint::default()).await.unwrap();
        let other = connector.connect(&Endpoint::new("elsewhere", 27017)).await.unwrap();

        local
            .insert_many(&widgets, vec![doc! { "_id": 1 }], InsertOptions::default())
            .await
            .unwrap();

        assert_eq!(again.count(&widgets, doc! {}).await.unwrap(), 1);
        assert_eq!(other.count(&widgets, doc! {}).await.unwrap(), 0);
    }
}
