//! In-memory document store for docattach.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreDriver` and
//! `Connector` traits. It understands the query and update language the proxies
//! produce, which makes it the backend of choice for tests and local development.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Match documents** - Equality, comparison, membership and logical operators with dotted paths
//! - **Update operators** - `$set`, `$unset`, `$inc`, `$push`, `$addToSet`, `$setOnInsert` and friends
//! - **Commands** - `findAndModify`, `count` and `ping`
//! - **Per-endpoint stores** - [`InMemoryConnector`] keeps one store per host and port
//!
//! # Quick Start
//!
//! ```ignore
//! use docattach::{prelude::*, memory::InMemoryConnector};
//!
//! #[derive(HostModel)]
//! pub struct Widget {
//!     pub id: i64,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let attachment = Attachment::<Widget>::new(InMemoryConnector::new());
//!     let doc = attachment.document(&Widget { id: 42 }).await?;
//!
//!     doc.set("color", "red").await?;
//!     assert_eq!(doc.delete("color").await?, Some("red".into()));
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docattach_memory;

pub mod error;
pub mod store;
pub(crate) mod evaluator;
pub(crate) mod modifier;

pub use error::MemoryStoreError;
pub use store::{InMemoryConnector, InMemoryStore, InMemoryStoreBuilder};
