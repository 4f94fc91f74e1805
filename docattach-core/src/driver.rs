//! Document-store driver abstraction.
//!
//! This module defines the seam between the proxies and a concrete document store.
//! Each proxy operation maps onto exactly one [`StoreDriver`] call, so the trait is a
//! thin mirror of the driver primitives the proxies need: find, find-one, insert,
//! update, remove, count, create-index and a generic database command.
//!
//! # Traits
//!
//! - [`StoreDriver`]: store operations scoped to a [`Namespace`]
//! - [`Connector`]: produces a driver handle for an [`Endpoint`]
//!
//! # Examples
//!
//! ```ignore
//! use docattach::driver::Connector;
//! use docattach::binding::{Endpoint, Namespace};
//! use bson::doc;
//!
//! let driver = connector.connect(&Endpoint::default()).await?;
//! let widgets = Namespace::new("app", "widgets");
//!
//! driver.insert_many(&widgets, vec![doc! { "_id": 1, "x": 1 }], Default::default()).await?;
//! assert_eq!(driver.count(&widgets, doc! {}).await?, 1);
//! ```

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document};
use futures::stream::BoxStream;

use crate::{
    binding::{Endpoint, Namespace},
    error::AttachResult,
    options::{FindOptions, IndexKeys, IndexOptions, InsertOptions, UpdateOptions, UpdateOutcome},
    update::UpdateDoc,
};

/// A lazy sequence of documents fetched from the store in batches.
///
/// The stream can be consumed once.
pub type DocumentStream = BoxStream<'static, AttachResult<Document>>;

/// A shareable driver handle.
pub type SharedDriver = Arc<dyn StoreDriver>;

/// Abstract interface for a document store.
///
/// # Thread Safety
///
/// Implementations must be usable from several tasks at once. Single-document
/// atomicity (an update or a `findAndModify` touching one document) must be provided by
/// the implementation; nothing above this trait adds locking.
///
/// # Error Handling
///
/// Failures reported by the store are returned as
/// [`AttachError::Driver`](crate::error::AttachError::Driver) wrapping the
/// implementation's own error value, never translated.
#[async_trait]
pub trait StoreDriver: Send + Sync + Debug {
    /// Finds every document matching `filter`.
    ///
    /// # Arguments
    ///
    /// * `namespace` - Database and collection to search
    /// * `filter` - Match specification; the empty document matches everything
    /// * `options` - Projection, sort, skip, limit and batch size
    async fn find(
        &self,
        namespace: &Namespace,
        filter: Document,
        options: FindOptions,
    ) -> AttachResult<DocumentStream>;

    /// Returns the first document matching `filter`, if any.
    async fn find_one(&self, namespace: &Namespace, filter: Document) -> AttachResult<Option<Document>>;

    /// Inserts documents and returns their identifiers in input order.
    ///
    /// Documents reaching the driver always carry an `_id`; inserting an `_id` that is
    /// already present is a store error.
    async fn insert_many(
        &self,
        namespace: &Namespace,
        documents: Vec<Document>,
        options: InsertOptions,
    ) -> AttachResult<Vec<Bson>>;

    /// Applies an operator update or a replacement to the documents matching `filter`.
    ///
    /// A replacement only ever touches one document.
    async fn update(
        &self,
        namespace: &Namespace,
        filter: Document,
        update: UpdateDoc,
        options: UpdateOptions,
    ) -> AttachResult<UpdateOutcome>;

    /// Deletes every document matching `filter` and returns how many went away.
    async fn remove(&self, namespace: &Namespace, filter: Document) -> AttachResult<u64>;

    /// Counts the documents matching `filter`.
    async fn count(&self, namespace: &Namespace, filter: Document) -> AttachResult<u64>;

    /// Creates an index and returns its name.
    async fn create_index(
        &self,
        namespace: &Namespace,
        keys: IndexKeys,
        options: IndexOptions,
    ) -> AttachResult<String>;

    /// Runs a database command such as `findAndModify` and returns the raw reply.
    async fn run_command(&self, database: &str, command: Document) -> AttachResult<Document>;
}

#[async_trait]
impl<D> StoreDriver for Arc<D>
where
    D: StoreDriver + ?Sized,
{
    async fn find(
        &self,
        namespace: &Namespace,
        filter: Document,
        options: FindOptions,
    ) -> AttachResult<DocumentStream> {
        (**self).find(namespace, filter, options).await
    }

    async fn find_one(&self, namespace: &Namespace, filter: Document) -> AttachResult<Option<Document>> {
        (**self).find_one(namespace, filter).await
    }

    async fn insert_many(
        &self,
        namespace: &Namespace,
        documents: Vec<Document>,
        options: InsertOptions,
    ) -> AttachResult<Vec<Bson>> {
        (**self)
            .insert_many(namespace, documents, options)
            .await
    }

    async fn update(
        &self,
        namespace: &Namespace,
        filter: Document,
        update: UpdateDoc,
        options: UpdateOptions,
    ) -> AttachResult<UpdateOutcome> {
        (**self)
            .update(namespace, filter, update, options)
            .await
    }

    async fn remove(&self, namespace: &Namespace, filter: Document) -> AttachResult<u64> {
        (**self).remove(namespace, filter).await
    }

    async fn count(&self, namespace: &Namespace, filter: Document) -> AttachResult<u64> {
        (**self).count(namespace, filter).await
    }

    async fn create_index(
        &self,
        namespace: &Namespace,
        keys: IndexKeys,
        options: IndexOptions,
    ) -> AttachResult<String> {
        (**self)
            .create_index(namespace, keys, options)
            .await
    }

    async fn run_command(&self, database: &str, command: Document) -> AttachResult<Document> {
        (**self).run_command(database, command).await
    }
}

/// Factory for driver handles.
///
/// An attachment asks its connector for a handle every time a proxy is built.
/// Implementations may hand out pooled handles as long as every handle behaves like a
/// fresh connection to the same endpoint.
#[async_trait]
pub trait Connector: Send + Sync + Debug {
    async fn connect(&self, endpoint: &Endpoint) -> AttachResult<SharedDriver>;
}

#[async_trait]
impl<C> Connector for Arc<C>
where
    C: Connector + ?Sized,
{
    async fn connect(&self, endpoint: &Endpoint) -> AttachResult<SharedDriver> {
        (**self).connect(endpoint).await
    }
}
