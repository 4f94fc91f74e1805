//! Capabilities consumed from the host relational-model framework.
//!
//! The host framework owns the structured fields of a model. This crate only needs
//! three read-only facts about a model type (its app label, its model name and an
//! instance's primary key) and, for one filter mode, a way to turn a list of primary
//! keys back into the framework's own query set.
//!
//! # Example
//!
//! ```ignore
//! use docattach::model::{HostModel, HostQuery};
//! use bson::Bson;
//!
//! pub struct Widget {
//!     pub id: Option<i64>,
//! }
//!
//! impl HostModel for Widget {
//!     fn app_label() -> &'static str { "shop" }
//!     fn model_name() -> &'static str { "widget" }
//!     fn primary_key(&self) -> Option<Bson> { self.id.map(Bson::Int64) }
//! }
//! ```

use bson::Bson;

/// Read-only metadata of a host model.
pub trait HostModel: Send + Sync + 'static {
    /// Label of the application that owns the model. Default database name.
    fn app_label() -> &'static str;

    /// Lowercase model identifier. Default collection name.
    fn model_name() -> &'static str;

    /// The instance's primary key, or `None` for an instance that was never saved.
    fn primary_key(&self) -> Option<Bson>;
}

/// The host framework's "query by primary-key list" capability.
pub trait HostQuery: HostModel {
    /// Whatever the framework returns for a primary-key filter (usually a lazy query set).
    type QuerySet: Send;

    /// Builds a query over the instances whose primary keys are in `pks`.
    ///
    /// `pks` is sorted ascending by identifier.
    fn filter_pk_in(pks: Vec<Bson>) -> Self::QuerySet;
}
