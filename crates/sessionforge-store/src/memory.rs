//! In-process [`MappingStore`] with Redis-like hash semantics.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{MappingStore, StoreError};

#[derive(Debug, Default)]
struct Record {
    fields: HashMap<String, Vec<u8>>,
    expires_at: Option<Instant>,
}

impl Record {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// A [`MappingStore`] kept in process memory.
///
/// Behaves like a Redis hash keyspace:
/// - writing a field to an absent record creates it without a TTL,
/// - removing the last field removes the record,
/// - `expire(key, 0)` removes the record at once,
/// - expired records vanish on next access.
///
/// Expiry uses `tokio::time::Instant`, so tests running with a paused
/// clock can advance past a TTL deterministically.
///
/// Cloning is cheap and every clone shares the same keyspace.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<String, Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a live record exists under `key`.
    pub async fn contains(&self, key: &str) -> bool {
        let mut records = self.records.lock().await;
        live(&mut records, key).is_some()
    }

    /// Remaining time-to-live of a record.
    ///
    /// `None` if the record is absent or has no TTL.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let mut records = self.records.lock().await;
        let expires_at = live(&mut records, key)?.expires_at?;
        Some(expires_at.saturating_duration_since(Instant::now()))
    }

    /// Number of live records.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let mut records = self.records.lock().await;
        records.retain(|_, record| !record.is_expired(now));
        records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Looks up a record, dropping it first if its TTL has lapsed.
fn live<'a>(
    records: &'a mut HashMap<String, Record>,
    key: &str,
) -> Option<&'a mut Record> {
    let now = Instant::now();
    if records.get(key).is_some_and(|r| r.is_expired(now)) {
        records.remove(key);
        return None;
    }
    records.get_mut(key)
}

/// Looks up a record, creating an empty one without TTL if absent.
fn live_or_create<'a>(
    records: &'a mut HashMap<String, Record>,
    key: &str,
) -> &'a mut Record {
    let now = Instant::now();
    if records.get(key).is_some_and(|r| r.is_expired(now)) {
        records.remove(key);
    }
    records.entry(key.to_string()).or_default()
}

impl MappingStore for MemoryStore {
    async fn get_field(
        &self,
        key: &str,
        field: &str,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let mut records = self.records.lock().await;
        Ok(live(&mut records, key).and_then(|r| r.fields.get(field).cloned()))
    }

    async fn get_fields(
        &self,
        key: &str,
        fields: &[&str],
    ) -> Result<Vec<Option<Vec<u8>>>, StoreError> {
        let mut records = self.records.lock().await;
        let record = live(&mut records, key);
        Ok(match record {
            Some(record) => fields
                .iter()
                .map(|f| record.fields.get(*f).cloned())
                .collect(),
            None => vec![None; fields.len()],
        })
    }

    async fn put_field(
        &self,
        key: &str,
        field: &str,
        value: &[u8],
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        live_or_create(&mut records, key)
            .fields
            .insert(field.to_string(), value.to_vec());
        Ok(())
    }

    async fn put_fields(
        &self,
        key: &str,
        entries: &[(&str, Vec<u8>)],
    ) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut records = self.records.lock().await;
        let record = live_or_create(&mut records, key);
        for (field, value) in entries {
            record.fields.insert((*field).to_string(), value.clone());
        }
        Ok(())
    }

    async fn delete_field(
        &self,
        key: &str,
        field: &str,
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let now_empty = match live(&mut records, key) {
            Some(record) => {
                record.fields.remove(field);
                record.fields.is_empty()
            }
            None => false,
        };
        if now_empty {
            records.remove(key);
        }
        Ok(())
    }

    async fn field_names(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut records = self.records.lock().await;
        Ok(live(&mut records, key)
            .map(|r| r.fields.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_record(&self, key: &str) -> Result<(), StoreError> {
        self.records.lock().await.remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        if ttl_secs == 0 {
            records.remove(key);
            return Ok(());
        }
        if let Some(record) = live(&mut records, key) {
            record.expires_at =
                Some(Instant::now() + Duration::from_secs(ttl_secs));
        }
        Ok(())
    }
}
