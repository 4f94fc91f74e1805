use std::{collections::HashMap, future::IntoFuture, sync::Arc, time::Duration};

use async_trait::async_trait;
use bson::{Bson, Document};
use futures::{Stream, StreamExt, stream};
use mea::rwlock::RwLock;
use mongodb::{Client, Collection as MongoCollection, options::ClientOptions};
use tracing::{debug, warn};

use docattach_core::{
    binding::{Endpoint, Namespace},
    driver::{Connector, DocumentStream, SharedDriver, StoreDriver},
    error::{AttachError, AttachResult},
    options::{FindOptions, IndexKeys, IndexOptions, InsertOptions, UpdateOptions, UpdateOutcome},
    settings,
    update::UpdateDoc,
};

use crate::options::{bound_client, find_options, index_model, insert_options, ordered_ids};

/// [`StoreDriver`] over one MongoDB client.
///
/// Every call is bounded by `timeout`; a call that does not finish in time fails with
/// [`AttachError::Timeout`]. Driver failures are wrapped as [`AttachError::Driver`]
/// holding the `mongodb::error::Error`.
#[derive(Debug, Clone)]
pub struct MongoDbDriver {
    client: Client,
    timeout: Duration,
}

impl MongoDbDriver {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn get_collection(&self, namespace: &Namespace) -> MongoCollection<Document> {
        self.client
            .database(&namespace.database)
            .collection(&namespace.collection)
    }

    async fn bounded<T, F>(&self, operation: &'static str, action: F) -> AttachResult<T>
    where
        F: IntoFuture<Output = mongodb::error::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, action.into_future()).await {
            Ok(result) => result.map_err(AttachError::driver),
            Err(_) => {
                warn!(operation, timeout = ?self.timeout, "store call timed out");

                Err(AttachError::Timeout(self.timeout))
            },
        }
    }
}

#[async_trait]
impl StoreDriver for MongoDbDriver {
    async fn find(
        &self,
        namespace: &Namespace,
        filter: Document,
        options: FindOptions,
    ) -> AttachResult<DocumentStream> {
        let cursor = self
            .bounded(
                "find",
                self.get_collection(namespace)
                    .find(filter)
                    .with_options(find_options(options)),
            )
            .await?;

        Ok(bounded_stream(cursor, self.timeout))
    }

    async fn find_one(&self, namespace: &Namespace, filter: Document) -> AttachResult<Option<Document>> {
        self.bounded("find_one", self.get_collection(namespace).find_one(filter))
            .await
    }

    async fn insert_many(
        &self,
        namespace: &Namespace,
        documents: Vec<Document>,
        options: InsertOptions,
    ) -> AttachResult<Vec<Bson>> {
        let result = self
            .bounded(
                "insert_many",
                self.get_collection(namespace)
                    .insert_many(documents)
                    .with_options(insert_options(options)),
            )
            .await?;

        Ok(ordered_ids(result.inserted_ids))
    }

    async fn update(
        &self,
        namespace: &Namespace,
        filter: Document,
        update: UpdateDoc,
        options: UpdateOptions,
    ) -> AttachResult<UpdateOutcome> {
        let collection = self.get_collection(namespace);
        let result = match update {
            UpdateDoc::Replacement(replacement) => {
                self.bounded(
                    "replace_one",
                    collection
                        .replace_one(filter, replacement)
                        .upsert(options.upsert),
                )
                .await?
            },
            UpdateDoc::Operators(operators) if options.multi => {
                self.bounded(
                    "update_many",
                    collection
                        .update_many(filter, operators)
                        .upsert(options.upsert),
                )
                .await?
            },
            UpdateDoc::Operators(operators) => {
                self.bounded(
                    "update_one",
                    collection
                        .update_one(filter, operators)
                        .upsert(options.upsert),
                )
                .await?
            },
        };

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn remove(&self, namespace: &Namespace, filter: Document) -> AttachResult<u64> {
        Ok(self
            .bounded("delete_many", self.get_collection(namespace).delete_many(filter))
            .await?
            .deleted_count)
    }

    async fn count(&self, namespace: &Namespace, filter: Document) -> AttachResult<u64> {
        self.bounded(
            "count_documents",
            self.get_collection(namespace).count_documents(filter),
        )
        .await
    }

    async fn create_index(
        &self,
        namespace: &Namespace,
        keys: IndexKeys,
        options: IndexOptions,
    ) -> AttachResult<String> {
        Ok(self
            .bounded(
                "create_index",
                self.get_collection(namespace)
                    .create_index(index_model(&keys, options)),
            )
            .await?
            .index_name)
    }

    async fn run_command(&self, database: &str, command: Document) -> AttachResult<Document> {
        self.bounded(
            "run_command",
            self.client.database(database).run_command(command),
        )
        .await
    }
}

/// Bounds every batch pulled from a cursor, not only the call that opened it.
///
/// The stream ends after yielding a timeout error.
fn bounded_stream<S>(cursor: S, timeout: Duration) -> DocumentStream
where
    S: Stream<Item = mongodb::error::Result<Document>> + Send + Unpin + 'static,
{
    stream::unfold(Some(cursor), move |state| async move {
        let mut cursor = state?;

        match tokio::time::timeout(timeout, cursor.next()).await {
            Ok(Some(Ok(document))) => Some((Ok(document), Some(cursor))),
            Ok(Some(Err(err))) => Some((Err(AttachError::driver(err)), Some(cursor))),
            Ok(None) => None,
            Err(_) => {
                warn!(operation = "get_more", timeout = ?timeout, "store call timed out");

                Some((Err(AttachError::Timeout(timeout)), None))
            },
        }
    })
    .boxed()
}

/// [`Connector`] that keeps one [`Client`] per endpoint.
///
/// A `Client` owns a connection pool, so repeated proxy construction reuses
/// connections instead of opening new ones. The call timeout is read from
/// [`settings`](docattach_core::settings) on every connect.
#[derive(Debug, Clone, Default)]
pub struct MongoDbConnector {
    clients: Arc<RwLock<HashMap<Endpoint, Client>>>,
    app_name: Option<String>,
}

impl MongoDbConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> MongoDbConnectorBuilder {
        MongoDbConnectorBuilder::default()
    }

    async fn client(&self, endpoint: &Endpoint, timeout: Duration) -> AttachResult<Client> {
        if let Some(client) = self.clients.read().await.get(endpoint) {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write().await;

        if let Some(client) = clients.get(endpoint) {
            return Ok(client.clone());
        }

        let mut options = ClientOptions::parse(endpoint.uri())
            .await
            .map_err(|e| AttachError::Connection(e.to_string()))?;
        bound_client(&mut options, timeout, self.app_name.as_deref());

        let client = Client::with_options(options)
            .map_err(|e| AttachError::Connection(e.to_string()))?;

        debug!(endpoint = %endpoint, "created mongodb client");

        clients.insert(endpoint.clone(), client.clone());

        Ok(client)
    }

    /// Shuts down every pooled client.
    pub async fn shutdown(&self) {
        let clients: Vec<Client> = self
            .clients
            .write()
            .await
            .drain()
            .map(|(_, client)| client)
            .collect();

        for client in clients {
            client.shutdown().await;
        }
    }
}

#[async_trait]
impl Connector for MongoDbConnector {
    async fn connect(&self, endpoint: &Endpoint) -> AttachResult<SharedDriver> {
        let timeout = settings::current().timeout_or_default();
        let client = self.client(endpoint, timeout).await?;

        Ok(Arc::new(MongoDbDriver::new(client, timeout)))
    }
}

/// Builder for [`MongoDbConnector`].
#[derive(Debug, Default)]
pub struct MongoDbConnectorBuilder {
    app_name: Option<String>,
}

impl MongoDbConnectorBuilder {
    /// Name reported to the server in the connection handshake.
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn build(self) -> MongoDbConnector {
        MongoDbConnector {
            clients: Arc::default(),
            app_name: self.app_name,
        }
    }
}
