//! Collection-scoped query and mutation access.
//!
//! A [`CollectionProxy`] wraps a whole collection. The type parameter `M` is the host
//! model the collection is attached to (`()` when the proxy was built without one); it
//! is only needed for [`ResultMode::HostQuery`], which hands matching identifiers back
//! to the host framework.
//!
//! # Example
//!
//! ```ignore
//! let widgets = Widget::collection().await?;
//!
//! widgets.insert_one(doc! { "_id": 1, "x": 1 }).await?;
//! let ids = widgets.matching_ids(doc! { "x": 1 }).await?;
//! let query_set = widgets.filter_host(doc! { "x": 1 }).await?;
//! ```

use std::{fmt, marker::PhantomData};

use bson::{Bson, Document, doc, oid::ObjectId};
use futures::{TryStreamExt, future};
use tracing::{debug, warn};

use crate::{
    binding::{Binding, Namespace},
    driver::{DocumentStream, SharedDriver},
    error::{AttachError, AttachResult},
    model::HostQuery,
    options::{FindOptions, IndexKeys, IndexOptions, InsertOptions, UpdateOptions, UpdateOutcome},
    update::UpdateDoc,
};

/// How `filter` results are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultMode {
    /// A lazy stream of the matching documents.
    #[default]
    Raw,
    /// The identifiers of the matches, sorted, turned into a host-framework query.
    HostQuery,
    /// Typed documents. Not implemented.
    Documents,
}

/// Result of [`CollectionProxy::filter_as`].
pub enum FilterResult<Q> {
    Raw(DocumentStream),
    HostQuery(Q),
}

impl<Q> FilterResult<Q> {
    pub fn into_raw(self) -> Option<DocumentStream> {
        match self {
            FilterResult::Raw(stream) => Some(stream),
            FilterResult::HostQuery(_) => None,
        }
    }

    pub fn into_host_query(self) -> Option<Q> {
        match self {
            FilterResult::HostQuery(query) => Some(query),
            FilterResult::Raw(_) => None,
        }
    }
}

impl<Q: fmt::Debug> fmt::Debug for FilterResult<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterResult::Raw(_) => f.write_str("FilterResult::Raw(..)"),
            FilterResult::HostQuery(query) => f.debug_tuple("FilterResult::HostQuery").field(query).finish(),
        }
    }
}

/// Everything a collection factory needs to build a collection proxy.
#[derive(Debug, Clone)]
pub struct CollectionSeed {
    /// Binding without a document identifier.
    pub binding: Binding,
    pub driver: SharedDriver,
}

/// Proxy for a whole collection.
///
/// # Type Parameters
///
/// * `M` - Host model type the collection belongs to, `()` for none
pub struct CollectionProxy<M = ()> {
    binding: Binding,
    driver: SharedDriver,
    _model: PhantomData<fn() -> M>,
}

impl<M> CollectionProxy<M> {
    pub fn new(binding: Binding, driver: SharedDriver) -> Self {
        Self {
            binding,
            driver,
            _model: PhantomData,
        }
    }

    /// Default collection factory used by attachments.
    pub fn from_seed(seed: CollectionSeed) -> Self {
        Self::new(seed.binding, seed.driver)
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    fn namespace(&self) -> &Namespace {
        self.binding.namespace()
    }

    /// Lazily streams every document matching `spec`.
    pub async fn filter(&self, spec: Document) -> AttachResult<DocumentStream> {
        debug!(namespace = %self.namespace(), filter = ?spec, "filtering collection");

        self.driver
            .find(self.namespace(), spec, FindOptions::default())
            .await
    }

    /// Streams every document in the collection.
    pub async fn all(&self) -> AttachResult<DocumentStream> {
        self.filter(doc! {}).await
    }

    /// Identifiers of every document matching `spec`, sorted ascending.
    pub async fn matching_ids(&self, spec: Document) -> AttachResult<Vec<Bson>> {
        self.driver
            .find(
                self.namespace(),
                spec,
                FindOptions::builder()
                    .projection(doc! { "_id": 1 })
                    .sort(doc! { "_id": 1 })
                    .build(),
            )
            .await?
            .try_filter_map(|mut document| future::ready(Ok(document.remove("_id"))))
            .try_collect()
            .await
    }

    /// Inserts a single document and returns its identifier.
    pub async fn insert_one(&self, document: Document) -> AttachResult<Bson> {
        let (id, document) = with_generated_id(document);

        debug!(namespace = %self.namespace(), id = %id, "inserting document");

        self.driver
            .insert_many(self.namespace(), vec![document], InsertOptions::default())
            .await?;

        Ok(id)
    }

    /// Inserts documents and returns their identifiers in input order.
    ///
    /// Documents without an `_id` get a fresh [`ObjectId`]; keep the returned value if
    /// you need to find the document again, nothing else records it.
    pub async fn insert(&self, documents: Vec<Document>, options: InsertOptions) -> AttachResult<Vec<Bson>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let documents: Vec<Document> = documents
            .into_iter()
            .map(|document| with_generated_id(document).1)
            .collect();

        debug!(namespace = %self.namespace(), count = documents.len(), "inserting documents");

        self.driver
            .insert_many(self.namespace(), documents, options)
            .await
    }

    /// Inserts `attrs` if it has no `_id`, otherwise replaces the document with that
    /// `_id` (creating it if needed). Returns the identifier.
    pub async fn upsert_one(&self, attrs: Document) -> AttachResult<Bson> {
        let Some(id) = attrs.get("_id").cloned() else {
            return self.insert_one(attrs).await;
        };

        let replacement = UpdateDoc::classify(attrs)?;

        if !replacement.is_replacement() {
            return Err(AttachError::InvalidUpdate(
                "upsert_one takes a whole document, not operators".into(),
            ));
        }

        self.driver
            .update(
                self.namespace(),
                doc! { "_id": id.clone() },
                replacement,
                UpdateOptions::upsert(),
            )
            .await?;

        Ok(id)
    }

    /// Forwards a match and an update document to the store.
    ///
    /// An operator document (`{ "$set": ... }`) updates fields in place; a plain
    /// document replaces the first match wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`AttachError::InvalidUpdate`] for mixed documents and for a replacement
    /// combined with `multi`.
    pub async fn update(
        &self,
        spec: Document,
        update: Document,
        options: UpdateOptions,
    ) -> AttachResult<UpdateOutcome> {
        let update = UpdateDoc::classify(update)?;

        if update.is_replacement() && options.multi {
            return Err(AttachError::InvalidUpdate(
                "a replacement document cannot be applied to multiple documents".into(),
            ));
        }

        debug!(namespace = %self.namespace(), filter = ?spec, update = ?update.as_document(), "updating collection");

        self.driver
            .update(self.namespace(), spec, update, options)
            .await
    }

    /// Sets `attrs` on exactly the document with `id`.
    pub async fn update_one(&self, id: impl Into<Bson>, attrs: Document) -> AttachResult<UpdateOutcome> {
        let id = id.into();

        if attrs.is_empty() {
            return Ok(UpdateOutcome::default());
        }

        self.driver
            .update(
                self.namespace(),
                doc! { "_id": id },
                UpdateDoc::set(attrs),
                UpdateOptions::default(),
            )
            .await
    }

    /// Deletes every document matching `spec`.
    ///
    /// An empty `spec` means "everything" and is refused unless `confirm` is set.
    pub async fn remove(&self, spec: Document, confirm: bool) -> AttachResult<u64> {
        if spec.is_empty() {
            if !confirm {
                return Err(AttachError::UnconfirmedRemoveAll(self.namespace().to_string()));
            }

            warn!(namespace = %self.namespace(), "removing every document in collection");
        }

        self.driver.remove(self.namespace(), spec).await
    }

    /// Creates an index from a field name or ordered `(field, direction)` pairs.
    pub async fn create_index(
        &self,
        keys: impl Into<IndexKeys>,
        options: IndexOptions,
    ) -> AttachResult<String> {
        let keys = keys.into();

        if keys.is_empty() {
            return Err(AttachError::InvalidIndex("index needs at least one key".into()));
        }

        self.driver
            .create_index(self.namespace(), keys, options)
            .await
    }

    /// Number of documents in the collection.
    pub async fn count(&self) -> AttachResult<u64> {
        self.count_matching(doc! {}).await
    }

    pub async fn count_matching(&self, spec: Document) -> AttachResult<u64> {
        self.driver.count(self.namespace(), spec).await
    }
}

impl<M: HostQuery> CollectionProxy<M> {
    /// Filters with an explicit result mode.
    ///
    /// # Errors
    ///
    /// [`ResultMode::Documents`] always fails with [`AttachError::Unsupported`].
    pub async fn filter_as(&self, spec: Document, mode: ResultMode) -> AttachResult<FilterResult<M::QuerySet>> {
        match mode {
            ResultMode::Raw => Ok(FilterResult::Raw(self.filter(spec).await?)),
            ResultMode::HostQuery => Ok(FilterResult::HostQuery(self.filter_host(spec).await?)),
            ResultMode::Documents => Err(AttachError::Unsupported(
                "documents result mode is not implemented",
            )),
        }
    }

    /// Hands the sorted identifiers of every match to the host framework's primary-key query.
    pub async fn filter_host(&self, spec: Document) -> AttachResult<M::QuerySet> {
        Ok(M::filter_pk_in(self.matching_ids(spec).await?))
    }

    pub async fn all_as(&self, mode: ResultMode) -> AttachResult<FilterResult<M::QuerySet>> {
        self.filter_as(doc! {}, mode).await
    }
}

impl<M> Clone for CollectionProxy<M> {
    fn clone(&self) -> Self {
        Self::new(self.binding.clone(), self.driver.clone())
    }
}

impl<M> fmt::Debug for CollectionProxy<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionProxy")
            .field("binding", &self.binding)
            .field("model", &std::any::type_name::<M>())
            .finish()
    }
}

/// Puts a fresh `ObjectId` in front of documents that have no `_id`.
fn with_generated_id(document: Document) -> (Bson, Document) {
    if let Some(id) = document.get("_id") {
        return (id.clone(), document);
    }

    let id = Bson::ObjectId(ObjectId::new());
    let mut with_id = doc! { "_id": id.clone() };
    for (key, value) in document {
        with_id.insert(key, value);
    }

    (id, with_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{binding::Endpoint, model::HostModel, testing::RefusingDriver};
    use rstest::rstest;
    use std::sync::Arc;

    struct Widget;

    impl HostModel for Widget {
        fn app_label() -> &'static str {
            "app"
        }

        fn model_name() -> &'static str {
            "widgets"
        }

        fn primary_key(&self) -> Option<Bson> {
            None
        }
    }

    impl HostQuery for Widget {
        type QuerySet = Vec<Bson>;

        fn filter_pk_in(pks: Vec<Bson>) -> Self::QuerySet {
            pks
        }
    }

    fn proxy() -> CollectionProxy<Widget> {
        CollectionProxy::new(
            Binding::new(Endpoint::default(), Namespace::new("app", "widgets")),
            Arc::new(RefusingDriver),
        )
    }

    #[tokio::test]
    async fn test_remove_all_requires_confirmation() {
        let err = proxy().remove(doc! {}, false).await.unwrap_err();

        assert!(matches!(err, AttachError::UnconfirmedRemoveAll(ref ns) if ns == "app.widgets"));
    }

    #[tokio::test]
    async fn test_confirmed_remove_all_reaches_store() {
        let err = proxy().remove(doc! {}, true).await.unwrap_err();

        assert!(matches!(err, AttachError::Driver(_)));
    }

    #[tokio::test]
    async fn test_documents_mode_is_unsupported() {
        let err = proxy()
            .filter_as(doc! { "x": 1 }, ResultMode::Documents)
            .await
            .unwrap_err();

        assert!(matches!(err, AttachError::Unsupported(_)));
    }

    #[rstest]
    #[case(doc! { "$set": { "a": 1 } }, UpdateOptions::default(), false)]
    #[case(doc! { "a": 1 }, UpdateOptions::multi(), true)]
    #[case(doc! { "$set": { "a": 1 }, "b": 1 }, UpdateOptions::default(), true)]
    #[tokio::test]
    async fn test_update_guards(#[case] update: Document, #[case] options: UpdateOptions, #[case] guarded: bool) {
        let err = proxy()
            .update(doc! { "x": 1 }, update, options)
            .await
            .unwrap_err();

        assert_eq!(matches!(err, AttachError::InvalidUpdate(_)), guarded);
    }

    #[tokio::test]
    async fn test_empty_insert_is_noop() {
        assert!(proxy().insert(vec![], InsertOptions::default()).await.unwrap().is_empty());
    }

    #[rstest]
    fn test_generated_id_comes_first() {
        let (id, document) = with_generated_id(doc! { "x": 1 });

        assert!(matches!(id, Bson::ObjectId(_)));
        assert_eq!(document.keys().next().map(String::as_str), Some("_id"));
        assert_eq!(document.get("_id"), Some(&id));
        assert_eq!(
            with_generated_id(doc! { "_id": 7 }),
            (Bson::Int32(7), doc! { "_id": 7 })
        );
    }
}
