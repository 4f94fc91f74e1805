//! Attaching documents and collections to host models.
//!
//! An [`Attachment`] is declared once per model type. It resolves the binding from the
//! model's metadata and builds a fresh proxy on every access:
//!
//! - [`Attachment::document`] takes a model instance and returns a document proxy bound
//!   to the instance's primary key;
//! - [`Attachment::collection`] returns a collection proxy that carries the model type.
//!
//! Database and collection names default to the model's app label and model name. The
//! endpoint is resolved per access from the attachment's own host/port, then the
//! process-wide [`settings`](crate::settings), then `localhost:27017`.
//!
//! Both proxy types can be swapped by passing factories to the builder, which is how
//! test doubles or specialised proxies are plugged in without touching call sites.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::LazyLock;
//! use docattach::prelude::*;
//! use docattach::mongodb::MongoDbConnector;
//!
//! static WIDGET_DOCS: LazyLock<Attachment<Widget>> = LazyLock::new(|| {
//!     Attachment::builder(MongoDbConnector::default())
//!         .database("inventory")
//!         .build()
//! });
//!
//! impl Attached for Widget {
//!     type Document = DocumentProxy;
//!     type Collection = CollectionProxy<Widget>;
//!
//!     fn attachment() -> &'static Attachment<Self> { &WIDGET_DOCS }
//! }
//!
//! let color = widget.document().await?.get_or("color", "unknown").await?;
//! let widgets = Widget::collection().await?;
//! ```

use std::{fmt, marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    binding::{Binding, Namespace},
    collection::{CollectionProxy, CollectionSeed},
    document::{DocumentProxy, DocumentSeed},
    driver::Connector,
    error::{AttachError, AttachResult},
    model::HostModel,
    settings,
};

/// Builds a document proxy from a seed.
pub type DocumentFactory<D> = Arc<dyn Fn(DocumentSeed) -> D + Send + Sync>;

/// Builds a collection proxy from a seed.
pub type CollectionFactory<C> = Arc<dyn Fn(CollectionSeed) -> C + Send + Sync>;

/// Attachment of a document store to the host model `M`.
///
/// # Type Parameters
///
/// * `M` - The host model
/// * `D` - Document proxy type built for instances
/// * `C` - Collection proxy type built for the model type
pub struct Attachment<M, D = DocumentProxy, C = CollectionProxy<M>> {
    database: Option<String>,
    collection: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    connector: Arc<dyn Connector>,
    document_factory: DocumentFactory<D>,
    collection_factory: CollectionFactory<C>,
    _model: PhantomData<fn() -> M>,
}

impl<M: HostModel> Attachment<M> {
    /// Attachment with default names, endpoint and proxy types.
    pub fn new(connector: impl Connector + 'static) -> Self {
        Self::builder(connector).build()
    }

    pub fn builder(connector: impl Connector + 'static) -> AttachmentBuilder<M> {
        AttachmentBuilder {
            database: None,
            collection: None,
            host: None,
            port: None,
            connector: Arc::new(connector),
            document_factory: Arc::new(DocumentProxy::from_seed),
            collection_factory: Arc::new(CollectionProxy::<M>::from_seed),
            _model: PhantomData,
        }
    }
}

impl<M: HostModel, D, C> Attachment<M, D, C> {
    /// Database name: the configured override or the model's app label.
    pub fn database_name(&self) -> &str {
        self.database
            .as_deref()
            .unwrap_or_else(|| M::app_label())
    }

    /// Collection name: the configured override or the model's name.
    pub fn collection_name(&self) -> &str {
        self.collection
            .as_deref()
            .unwrap_or_else(|| M::model_name())
    }

    /// The collection-scoped binding as it resolves right now.
    pub fn binding(&self) -> Binding {
        Binding::new(
            settings::resolve_endpoint(self.host.as_deref(), self.port),
            Namespace::new(self.database_name(), self.collection_name()),
        )
    }

    /// Builds a document proxy for `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`AttachError::MissingPrimaryKey`] for an unsaved instance, or the
    /// connector's error if no driver handle can be obtained.
    pub async fn document(&self, instance: &M) -> AttachResult<D> {
        let id = instance
            .primary_key()
            .ok_or(AttachError::MissingPrimaryKey(M::model_name()))?;
        let binding = self.binding().with_document_id(id.clone());
        let driver = self.connector.connect(binding.endpoint()).await?;

        debug!(binding = %binding, "attaching document");

        Ok((self.document_factory)(DocumentSeed { binding, id, driver }))
    }

    /// Builds a collection proxy for the model type.
    pub async fn collection(&self) -> AttachResult<C> {
        let binding = self.binding();
        let driver = self.connector.connect(binding.endpoint()).await?;

        debug!(binding = %binding, "attaching collection");

        Ok((self.collection_factory)(CollectionSeed { binding, driver }))
    }
}

impl<M, D, C> fmt::Debug for Attachment<M, D, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("model", &std::any::type_name::<M>())
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connector", &self.connector)
            .finish()
    }
}

/// Builder for [`Attachment`].
pub struct AttachmentBuilder<M, D = DocumentProxy, C = CollectionProxy<M>> {
    database: Option<String>,
    collection: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    connector: Arc<dyn Connector>,
    document_factory: DocumentFactory<D>,
    collection_factory: CollectionFactory<C>,
    _model: PhantomData<fn() -> M>,
}

impl<M, D, C> AttachmentBuilder<M, D, C> {
    /// Overrides the database name (default: the model's app label).
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Overrides the collection name (default: the model's name).
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Replaces the document proxy type.
    pub fn document_factory<D2, F>(self, factory: F) -> AttachmentBuilder<M, D2, C>
    where
        F: Fn(DocumentSeed) -> D2 + Send + Sync + 'static,
    {
        AttachmentBuilder {
            database: self.database,
            collection: self.collection,
            host: self.host,
            port: self.port,
            connector: self.connector,
            document_factory: Arc::new(factory),
            collection_factory: self.collection_factory,
            _model: PhantomData,
        }
    }

    /// Replaces the collection proxy type.
    pub fn collection_factory<C2, F>(self, factory: F) -> AttachmentBuilder<M, D, C2>
    where
        F: Fn(CollectionSeed) -> C2 + Send + Sync + 'static,
    {
        AttachmentBuilder {
            database: self.database,
            collection: self.collection,
            host: self.host,
            port: self.port,
            connector: self.connector,
            document_factory: self.document_factory,
            collection_factory: Arc::new(factory),
            _model: PhantomData,
        }
    }

    pub fn build(self) -> Attachment<M, D, C> {
        Attachment {
            database: self.database,
            collection: self.collection,
            host: self.host,
            port: self.port,
            connector: self.connector,
            document_factory: self.document_factory,
            collection_factory: self.collection_factory,
            _model: PhantomData,
        }
    }
}

/// A host model with a declared attachment.
pub trait Attached: HostModel + Sized {
    type Document: Send + 'static;
    type Collection: Send + 'static;

    fn attachment() -> &'static Attachment<Self, Self::Document, Self::Collection>;
}

/// Instance-scoped and type-scoped accessors for attached models.
#[async_trait]
pub trait AttachedExt: Attached {
    /// The document bound to this instance's primary key.
    async fn document(&self) -> AttachResult<Self::Document> {
        Self::attachment().document(self).await
    }

    /// The collection bound to this model type.
    async fn collection() -> AttachResult<Self::Collection> {
        Self::attachment().collection().await
    }
}

impl<M: Attached> AttachedExt for M {}
