//! Mapping-store abstraction for SessionForge.
//!
//! A mapping-store keeps one *record* per key, and each record is a flat
//! map of field names to byte values with an optional record-level TTL.
//! Redis hashes are the reference model: `HGET`, `HMGET`, `HSET`, `HDEL`,
//! `HKEYS`, `DEL` and `EXPIRE` map one-to-one onto [`MappingStore`].
//!
//! # Feature Flags
//!
//! - `redis` (default): [`RedisStore`] via `deadpool-redis`
//!
//! [`MemoryStore`] is always available and mirrors Redis semantics closely
//! enough for tests and single-process deployments.

mod config;
mod error;
mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use config::{PoolConfig, StoreConfig};
pub use error::StoreError;
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis::RedisStore;

use std::future::Future;

/// A concurrency-safe, field-addressable key-value store.
///
/// One record == one session. Implementations must be shareable across
/// tasks (`Send + Sync`), and every returned future must be `Send` so
/// callers can await them inside spawned request handlers.
///
/// Absent records behave like empty ones: reads return nothing, deletes
/// succeed, and [`expire`](Self::expire) does nothing.
pub trait MappingStore: Send + Sync + 'static {
    /// Reads one field of a record.
    fn get_field(
        &self,
        key: &str,
        field: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;

    /// Reads several fields of a record in one round trip.
    ///
    /// The result has exactly one slot per requested field, in order.
    fn get_fields(
        &self,
        key: &str,
        fields: &[&str],
    ) -> impl Future<Output = Result<Vec<Option<Vec<u8>>>, StoreError>> + Send;

    /// Writes one field, overwriting any previous value.
    fn put_field(
        &self,
        key: &str,
        field: &str,
        value: &[u8],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Writes several fields atomically.
    fn put_fields(
        &self,
        key: &str,
        entries: &[(&str, Vec<u8>)],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deletes one field. Deleting an absent field is not an error.
    fn delete_field(
        &self,
        key: &str,
        field: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Lists every field name currently on the record.
    fn field_names(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Deletes the whole record. Deleting an absent record is not an error.
    fn delete_record(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Sets the record's time-to-live in seconds.
    ///
    /// A TTL of `0` expires the record immediately.
    fn expire(
        &self,
        key: &str,
        ttl_secs: u64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
