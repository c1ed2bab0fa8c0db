//! Persistent parameter cache store.
//!
//! Board and channel records live in two redb tables with JSON-serialized
//! values. The store is pure data access; refresh policy and lifecycle
//! decisions belong to the [`crate::supervisor`] layer.

mod cache;
pub mod schema;

pub use cache::CacheStore;
pub use schema::{BoardRow, ChannelRow};
