//! Data model for KBrowse searches.
//!
//! - [`QueryState`]: the parameters of one search submission and its
//!   shareable link codec
//! - [`SearchRequest`]: the outgoing request built from a query
//! - [`ResultRecord`], [`Progress`], [`ServerError`]: decoded stream objects
//! - [`ServerConfigs`]: server-reported cluster, topic and deserializer options

pub mod configs;
pub mod query;
pub mod record;
pub mod request;

pub use configs::*;
pub use query::*;
pub use record::*;
pub use request::*;

use indexmap::IndexMap;
use serde_json::Value;

/// Fields the client does not interpret, preserved in server order.
pub type UnknownFields = IndexMap<String, Value>;
