//! Convenient re-exports of commonly used types from docattach.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docattach::prelude::*;
//! ```
//!
//! This provides access to:
//! - Attachments and the `HostModel` derive
//! - Document and collection proxies
//! - Update documents, modifiers and options
//! - The driver seam and error types

pub use docattach_core::{
    attach::{Attached, AttachedExt, Attachment, AttachmentBuilder},
    binding::{Binding, Endpoint, Namespace},
    collection::{CollectionProxy, CollectionSeed, FilterResult, ResultMode},
    document::{DocumentProxy, DocumentSeed},
    driver::{Connector, DocumentStream, SharedDriver, StoreDriver},
    model::{HostModel, HostQuery},
    options::{FindOptions, IndexDirection, IndexKeys, IndexOptions, InsertOptions, UpdateOptions, UpdateOutcome},
    settings::StoreSettings,
    update::{Modifier, UpdateDoc},
    error::{AttachError, AttachResult},
};
pub use docattach_macros::HostModel;
