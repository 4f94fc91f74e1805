//! Main docattach crate: attach schemaless documents to relational model records.
//!
//! This crate is the primary entry point for users of docattach. It re-exports the core
//! types and the `HostModel` derive, and provides access to the storage backends.
//!
//! A host model (a row type of a relational framework) gets two extra access points:
//!
//! - a **document** per instance, a mapping-like proxy keyed by the instance's primary key;
//! - a **collection** per model type, for queries, bulk inserts, updates and indexes.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::LazyLock;
//! use docattach::{prelude::*, memory::InMemoryConnector};
//!
//! #[derive(HostModel)]
//! #[host_model(app_label = "app", model_name = "widgets")]
//! pub struct Widget {
//!     pub id: i64,
//! }
//!
//! static WIDGETS: LazyLock<Attachment<Widget>> =
//!     LazyLock::new(|| Attachment::new(InMemoryConnector::new()));
//!
//! impl Attached for Widget {
//!     type Document = DocumentProxy;
//!     type Collection = CollectionProxy<Widget>;
//!
//!     fn attachment() -> &'static Attachment<Self> { &WIDGETS }
//! }
//!
//! #[tokio::main]
//! async fn main() -> AttachResult<()> {
//!     let widget = Widget { id: 42 };
//!     let doc = widget.document().await?;
//!
//!     // The document is created on first read.
//!     assert_eq!(doc.get_or("color", "unknown").await?, "unknown".into());
//!
//!     doc.set("color", "red").await?;
//!     assert_eq!(doc.delete("color").await?, Some("red".into()));
//!
//!     let widgets = Widget::collection().await?;
//!     widgets.insert_one(bson::doc! { "_id": 1, "x": 1 }).await?;
//!     assert_eq!(widgets.count_matching(bson::doc! { "x": 1 }).await?, 1);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! Endpoints resolve per access from the attachment's own host/port, then
//! [`settings`], then `localhost:27017`:
//!
//! ```ignore
//! docattach::settings::configure(StoreSettings::from_env()?);
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory store for development and testing
//! - [`mongodb`] - MongoDB backend (requires `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as docattach;

pub mod prelude;

pub use docattach_core::{attach, binding, collection, document, driver, error, model, options, settings, update};
pub use docattach_macros::HostModel;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docattach_memory::{InMemoryConnector, InMemoryStore, InMemoryStoreBuilder, MemoryStoreError};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docattach_mongodb::{MongoDbConnector, MongoDbConnectorBuilder, MongoDbDriver};
}
