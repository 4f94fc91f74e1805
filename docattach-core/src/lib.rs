//! Attach schemaless documents to the records of a relational host framework.
//!
//! This crate is the core of the docattach project and provides:
//!
//! - **Attachments** ([`attach`]) - Per-model declaration that builds document and collection proxies
//! - **Document proxy** ([`document`]) - Mapping-like access to one document keyed by a primary key
//! - **Collection proxy** ([`collection`]) - Query, insert, update, remove and index a whole collection
//! - **Driver seam** ([`driver`]) - Traits a document-store backend implements
//! - **Bindings and settings** ([`binding`], [`settings`]) - Where a proxy points and the process-wide defaults
//! - **Update documents and options** ([`update`], [`options`]) - Typed views of what is sent to the store
//! - **Error handling** ([`error`]) - Guard errors and wrapped driver errors
//!
//! # Example
//!
//! ```ignore
//! use docattach::{prelude::*, memory::InMemoryConnector};
//!
//! #[derive(HostModel)]
//! #[host_model(app_label = "app")]
//! pub struct Widget {
//!     pub id: i64,
//! }
//!
//! let attachment = Attachment::<Widget>::new(InMemoryConnector::default());
//! let doc = attachment.document(&Widget { id: 42 }).await?;
//!
//! doc.set("color", "red").await?;
//! assert_eq!(doc.get("color").await?, Some("red".into()));
//! ```

#[allow(unused_extern_crates)]
extern crate self as docattach_core;

pub mod attach;
pub mod binding;
pub mod collection;
pub mod document;
pub mod driver;
pub mod error;
pub mod model;
pub mod options;
pub mod settings;
pub mod update;

#[cfg(test)]
mod testing;
