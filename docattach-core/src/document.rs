//! Mapping-like access to a single attached document.
//!
//! A [`DocumentProxy`] is bound to one document, identified by the host instance's
//! primary key. Reads go through [`DocumentProxy::materialize`], which creates the
//! document (with only its `_id`) the first time it is needed, so reading never fails
//! because the document is missing. Writes are partial updates scoped to the `_id` and
//! upsert, so a write to a document nobody has read yet is not lost. Nothing here
//! performs a read-modify-write of the whole document.
//!
//! # Example
//!
//! ```ignore
//! let doc = widget.document().await?;
//!
//! assert_eq!(doc.get_or("color", "unknown").await?, Bson::from("unknown"));
//! doc.set("color", "red").await?;
//! assert_eq!(doc.delete("color").await?, Some(Bson::from("red")));
//! ```

use bson::{Bson, Document, doc};
use tracing::debug;

use crate::{
    binding::{Binding, Namespace},
    driver::SharedDriver,
    error::{AttachError, AttachResult},
    options::{UpdateOptions, UpdateOutcome},
    update::{Modifier, UpdateDoc},
};

/// Everything a document factory needs to build a document proxy.
#[derive(Debug, Clone)]
pub struct DocumentSeed {
    /// Binding including the document identifier.
    pub binding: Binding,
    /// The identifier, equal to `binding.document_id()`.
    pub id: Bson,
    pub driver: SharedDriver,
}

/// Proxy for one document in the store.
#[derive(Debug, Clone)]
pub struct DocumentProxy {
    binding: Binding,
    id: Bson,
    driver: SharedDriver,
}

impl DocumentProxy {
    pub fn new(binding: Binding, id: impl Into<Bson>, driver: SharedDriver) -> Self {
        let id = id.into();

        Self {
            binding: binding.with_document_id(id.clone()),
            id,
            driver,
        }
    }

    /// Default document factory used by attachments.
    pub fn from_seed(seed: DocumentSeed) -> Self {
        Self {
            binding: seed.binding,
            id: seed.id,
            driver: seed.driver,
        }
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// The document identifier (the host instance's primary key at construction time).
    pub fn id(&self) -> &Bson {
        &self.id
    }

    fn namespace(&self) -> &Namespace {
        self.binding.namespace()
    }

    fn selector(&self) -> Document {
        doc! { "_id": self.id.clone() }
    }

    /// Fetches the whole document, creating `{ _id }` first if it does not exist yet.
    ///
    /// Creation is an upsert that only sets `_id` on insert, so concurrent first reads
    /// create exactly one document.
    pub async fn materialize(&self) -> AttachResult<Document> {
        if let Some(document) = self
            .driver
            .find_one(self.namespace(), self.selector())
            .await?
        {
            return Ok(document);
        }

        debug!(
            namespace = %self.namespace(),
            id = %self.id,
            "creating empty document on first read"
        );

        self.driver
            .update(
                self.namespace(),
                self.selector(),
                Modifier::SetOnInsert.to_update("_id", self.id.clone()),
                UpdateOptions::upsert(),
            )
            .await?;

        Ok(self
            .driver
            .find_one(self.namespace(), self.selector())
            .await?
            .unwrap_or_else(|| self.selector()))
    }

    /// Value of `key`, or `None` if the field is absent.
    ///
    /// A dotted key (`"dims.w"`) is a path into embedded documents and arrays, the same
    /// way the store reads it on writes.
    pub async fn get(&self, key: &str) -> AttachResult<Option<Bson>> {
        Ok(field_at(&self.materialize().await?, key).cloned())
    }

    /// Value of `key`, or `default` if the field is absent.
    pub async fn get_or(&self, key: &str, default: impl Into<Bson>) -> AttachResult<Bson> {
        Ok(self
            .get(key)
            .await?
            .unwrap_or_else(|| default.into()))
    }

    pub async fn contains_key(&self, key: &str) -> AttachResult<bool> {
        Ok(field_at(&self.materialize().await?, key).is_some())
    }

    /// Field names, `_id` included, in stored order.
    pub async fn keys(&self) -> AttachResult<Vec<String>> {
        Ok(self.materialize().await?.keys().cloned().collect())
    }

    pub async fn values(&self) -> AttachResult<Vec<Bson>> {
        Ok(self.materialize().await?.values().cloned().collect())
    }

    pub async fn items(&self) -> AttachResult<Vec<(String, Bson)>> {
        Ok(self.materialize().await?.into_iter().collect())
    }

    /// Number of fields, `_id` included.
    pub async fn len(&self) -> AttachResult<usize> {
        Ok(self.materialize().await?.len())
    }

    /// Sets one field with `$set`.
    pub async fn set(&self, key: &str, value: impl Into<Bson>) -> AttachResult<UpdateOutcome> {
        self.apply_modifier(Modifier::Set, key, value).await
    }

    /// Sets several fields at once with `$set`.
    pub async fn update(&self, fields: Document) -> AttachResult<UpdateOutcome> {
        if fields.is_empty() {
            return Ok(UpdateOutcome::default());
        }

        self.send(UpdateDoc::set(fields)).await
    }

    /// Returns the value of `key` if present; otherwise stores `value` and returns it.
    ///
    /// The write only applies while the field is still absent, so a concurrent writer
    /// that got there first wins and its value is returned.
    pub async fn set_default(&self, key: &str, value: impl Into<Bson>) -> AttachResult<Bson> {
        let value = value.into();

        if let Some(existing) = self.get(key).await? {
            return Ok(existing);
        }

        self.driver
            .update(
                self.namespace(),
                doc! { "_id": self.id.clone(), key: { "$exists": false } },
                Modifier::Set.to_update(key, value.clone()),
                UpdateOptions::default(),
            )
            .await?;

        Ok(self.get(key).await?.unwrap_or(value))
    }

    /// Atomically removes `key` and returns the value it had.
    ///
    /// This is a single `findAndModify` on the server, so of two concurrent deletes of
    /// the same field only one observes the value. Returns `None` when the field (or the
    /// whole document) is absent.
    pub async fn delete(&self, key: &str) -> AttachResult<Option<Bson>> {
        let reply = self
            .driver
            .run_command(self.binding.database(), self.pop_command(key))
            .await?;

        debug!(namespace = %self.namespace(), id = %self.id, key, "popped field");

        Ok(match reply.get("value") {
            Some(Bson::Document(previous)) => field_at(previous, key).cloned(),
            _ => None,
        })
    }

    /// Like [`delete`](Self::delete) but returns `default` when the field is absent.
    pub async fn delete_or(&self, key: &str, default: impl Into<Bson>) -> AttachResult<Bson> {
        Ok(self
            .delete(key)
            .await?
            .unwrap_or_else(|| default.into()))
    }

    fn pop_command(&self, key: &str) -> Document {
        doc! {
            "findAndModify": self.binding.collection(),
            "query": self.selector(),
            "update": { "$unset": { key: 1 } },
        }
    }

    /// Removing an arbitrary field atomically while guaranteeing it is not `_id` has no
    /// safe general algorithm, so this always fails.
    pub async fn pop_item(&self) -> AttachResult<(String, Bson)> {
        Err(AttachError::Unsupported(
            "pop_item: no atomic way to remove an arbitrary non-_id field; use delete(key)",
        ))
    }

    /// Adds `amount` to a numeric field with `$inc`.
    pub async fn increment(&self, key: &str, amount: impl Into<Bson>) -> AttachResult<UpdateOutcome> {
        self.apply_modifier(Modifier::Inc, key, amount).await
    }

    /// Sends `{ "$op": { key: value } }` scoped to this document.
    ///
    /// ```ignore
    /// doc.apply_modifier("push", "tags", "sale").await?;
    /// ```
    pub async fn apply_modifier(
        &self,
        modifier: impl Into<Modifier>,
        key: &str,
        value: impl Into<Bson>,
    ) -> AttachResult<UpdateOutcome> {
        self.send(modifier.into().to_update(key, value)).await
    }

    /// Sends a raw operator document scoped to this document.
    ///
    /// # Errors
    ///
    /// Returns [`AttachError::InvalidUpdate`] for replacement or mixed documents, which
    /// would otherwise wipe every other field of the document.
    pub async fn apply_update(&self, update: Document) -> AttachResult<UpdateOutcome> {
        match UpdateDoc::classify(update)? {
            UpdateDoc::Replacement(_) => Err(AttachError::InvalidUpdate(
                "document updates must use operators".into(),
            )),
            operators => self.send(operators).await,
        }
    }

    async fn send(&self, update: UpdateDoc) -> AttachResult<UpdateOutcome> {
        debug!(namespace = %self.namespace(), id = %self.id, update = ?update.as_document(), "updating document");

        self.driver
            .update(self.namespace(), self.selector(), update, UpdateOptions::upsert())
            .await
    }

    /// Removes the whole document from the collection.
    pub async fn clear(&self) -> AttachResult<u64> {
        self.driver
            .remove(self.namespace(), self.selector())
            .await
    }
}

/// Resolves a dotted path through embedded documents and array indices.
fn field_at<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;

    for part in parts {
        current = match current {
            Bson::Document(embedded) => embedded.get(part)?,
            Bson::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}
