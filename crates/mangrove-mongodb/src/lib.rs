//! MongoDB query facade for mangrove
//!
//! A fixed menu of find/sort/project/update/delete/aggregate operations
//! against named collections, returning untyped BSON documents.
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use mangrove_mongodb::{QueryFacade, StoreConfig};
//!
//! let config = StoreConfig::default().with_env_overrides();
//! let facade = QueryFacade::connect(&config).await?;
//! let adults = facade
//!     .get_sorted_results("users", doc! { "age": { "$gte": 18 } }, "-age,name")
//!     .await?;
//! ```

pub mod config;
pub mod connection;
pub mod facade;
pub mod query;
pub mod store;
pub mod validation;

pub use config::StoreConfig;
pub use connection::Connection;
pub use facade::QueryFacade;
pub use mangrove_common::{MangroveError, Result};
pub use query::{parse_sort, unset_fields, QuerySpec, UpdateKind};
pub use store::{ChangeInfo, DocumentStore, MongoStore};
pub use validation::{ValidatedCollectionName, ValidatedFieldName};
