//! Bindings: what a proxy is scoped to.
//!
//! A [`Binding`] names the store endpoint, database and collection a proxy talks to,
//! plus the document identifier for document-scoped proxies. Bindings are computed once
//! per proxy construction and never change afterwards.

use std::fmt;

use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::settings::{DEFAULT_HOST, DEFAULT_PORT};

/// Network location of a document store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Connection string for this endpoint.
    pub fn uri(&self) -> String {
        format!("mongodb://{}:{}", self.host, self.port)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A database/collection pair.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// The (endpoint, database, collection[, identifier]) tuple a proxy is scoped to.
///
/// Collection proxies carry a binding without a document identifier; document
/// proxies always carry one.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    endpoint: Endpoint,
    namespace: Namespace,
    document_id: Option<Bson>,
}

impl Binding {
    pub fn new(endpoint: Endpoint, namespace: Namespace) -> Self {
        Self {
            endpoint,
            namespace,
            document_id: None,
        }
    }

    /// Narrows this binding to a single document.
    pub fn with_document_id(mut self, id: impl Into<Bson>) -> Self {
        self.document_id = Some(id.into());
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn database(&self) -> &str {
        &self.namespace.database
    }

    pub fn collection(&self) -> &str {
        &self.namespace.collection
    }

    pub fn document_id(&self) -> Option<&Bson> {
        self.document_id.as_ref()
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.endpoint.uri(), self.namespace)?;

        if let Some(id) = &self.document_id {
            write!(f, "#{id}")?;
        }

        Ok(())
    }
}
