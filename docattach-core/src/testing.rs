//! A driver that refuses every call, for checking that guards fire before the store.

use async_trait::async_trait;
use bson::{Bson, Document};
use thiserror::Error;

use crate::{
    binding::{Endpoint, Namespace},
    driver::{Connector, DocumentStream, SharedDriver, StoreDriver},
    error::{AttachError, AttachResult},
    options::{FindOptions, IndexKeys, IndexOptions, InsertOptions, UpdateOptions, UpdateOutcome},
    update::UpdateDoc,
};

#[derive(Debug, Error)]
#[error("store reached: {0}")]
pub(crate) struct StoreReached(&'static str);

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct RefusingDriver;

fn refuse<T>(call: &'static str) -> AttachResult<T> {
    Err(AttachError::driver(StoreReached(call)))
}

#[async_trait]
impl StoreDriver for RefusingDriver {
    async fn find(&self, _: &Namespace, _: Document, _: FindOptions) -> AttachResult<DocumentStream> {
        refuse("find")
    }

    async fn find_one(&self, _: &Namespace, _: Document) -> AttachResult<Option<Document>> {
        refuse("find_one")
    }

    async fn insert_many(&self, _: &Namespace, _: Vec<Document>, _: InsertOptions) -> AttachResult<Vec<Bson>> {
        refuse("insert_many")
    }

    async fn update(&self, _: &Namespace, _: Document, _: UpdateDoc, _: UpdateOptions) -> AttachResult<UpdateOutcome> {
        refuse("update")
    }

    async fn remove(&self, _: &Namespace, _: Document) -> AttachResult<u64> {
        refuse("remove")
    }

    async fn count(&self, _: &Namespace, _: Document) -> AttachResult<u64> {
        refuse("count")
    }

    async fn create_index(&self, _: &Namespace, _: IndexKeys, _: IndexOptions) -> AttachResult<String> {
        refuse("create_index")
    }

    async fn run_command(&self, _: &str, _: Document) -> AttachResult<Document> {
        refuse("run_command")
    }
}

#[async_trait]
impl Connector for RefusingDriver {
    async fn connect(&self, _: &Endpoint) -> AttachResult<SharedDriver> {
        Ok(std::sync::Arc::new(RefusingDriver))
    }
}
