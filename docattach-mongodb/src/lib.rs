//! MongoDB backend implementation for docattach.
//!
//! This crate provides a MongoDB-based implementation of the `StoreDriver` and
//! `Connector` traits on top of the official async driver.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docattach = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Pooled clients** - One `mongodb::Client` per endpoint, shared by every proxy
//! - **Bounded calls** - Every store call is bounded by the configured timeout
//! - **Untouched errors** - Driver errors reach callers as the original `mongodb::error::Error`
//!
//! # Connection
//!
//! The connector builds `mongodb://host:port` from the endpoint each attachment resolves,
//! so there is no connection string to pass around.
//!
//! # Example
//!
//! ```ignore
//! use docattach::{prelude::*, mongodb::MongoDbConnector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let attachment = Attachment::<Widget>::new(MongoDbConnector::builder().app_name("inventory").build());
//!     let widgets = attachment.collection().await?;
//!
//!     println!("{} widgets", widgets.count().await?);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docattach_mongodb;

pub(crate) mod options;
pub mod store;

pub use store::{MongoDbConnector, MongoDbConnectorBuilder, MongoDbDriver};
