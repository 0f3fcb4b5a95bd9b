//! The session entity: metadata plus read-through attribute access.
//!
//! A [`Session`] is a thin handle on one store record. It keeps the three
//! metadata values in memory but never caches attributes: every `get`,
//! `set` and `remove` is one round trip, so writers in other processes
//! are visible immediately (and the last write wins).

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use sessionforge_store::MappingStore;

use crate::manager::Shared;
use crate::{Codec, JsonCodec, SessionError};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where a session is in its lifecycle.
///
/// ```text
///   (not loaded) ──no record──→ New ──invalidate()──→ Invalidated
///        │                                                ↑
///        └──────record found──→ Active ──invalidate()─────┘
/// ```
///
/// "Not loaded" has no variant: until the first get-or-create call on a
/// request there is simply no `Session` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created by this request.
    New,
    /// Hydrated from an existing record.
    Active,
    /// The record was deleted through this handle.
    Invalidated,
}

impl SessionState {
    /// `true` for the states in which attribute operations are meaningful.
    pub fn is_live(self) -> bool {
        matches!(self, Self::New | Self::Active)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "New"),
            Self::Active => write!(f, "Active"),
            Self::Invalidated => write!(f, "Invalidated"),
        }
    }
}

/// The three reserved values of a record.
///
/// Loaded together in one round trip when a session is opened and kept in
/// memory for the rest of the request. Only the refresh and
/// `set_max_inactive_interval` change them afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Metadata {
    /// When the record was first written, epoch milliseconds. Never changes.
    pub(crate) creation_time: i64,

    /// Last time the sliding window moved, epoch milliseconds.
    ///
    /// Not updated on every request: a request inside the window leaves
    /// it alone, which is what keeps reads write-free.
    pub(crate) last_accessed_time: i64,

    /// TTL in seconds, mirrored onto the store record's expiry.
    pub(crate) max_inactive_interval: i64,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One user session, backed by a store record keyed by [`id`](Self::id).
///
/// Obtained from [`SessionManager::open`](crate::SessionManager::open),
/// usually through the request decorator, which makes sure a request
/// holds at most one.
pub struct Session<S: MappingStore, C: Codec = JsonCodec> {
    /// The store key. Also the value of the session cookie.
    id: String,

    /// Where this handle is in the lifecycle.
    state: SessionState,

    /// Fixed at construction: `true` if this request wrote the record.
    is_new: bool,

    /// In-memory copy of the reserved fields.
    meta: Metadata,

    /// Store, codec, config and clock, shared with the manager.
    shared: Arc<Shared<S, C>>,
}

impl<S: MappingStore, C: Codec> fmt::Debug for Session<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("is_new", &self.is_new)
            .field("creation_time", &self.meta.creation_time)
            .field("last_accessed_time", &self.meta.last_accessed_time)
            .field("max_inactive_interval", &self.meta.max_inactive_interval)
            .finish()
    }
}

impl<S: MappingStore, C: Codec> Session<S, C> {
    pub(crate) fn from_parts(
        id: String,
        state: SessionState,
        meta: Metadata,
        shared: Arc<Shared<S, C>>,
    ) -> Self {
        Self {
            id,
            is_new: state == SessionState::New,
            state,
            meta,
            shared,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// `true` only if this request created the record.
    ///
    /// Stays `true` after `invalidate()`; it describes how the session was
    /// obtained, not whether it still exists.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Creation instant, epoch milliseconds.
    pub fn creation_time(&self) -> i64 {
        self.meta.creation_time
    }

    /// Last recorded access, epoch milliseconds.
    ///
    /// Only moves when the sliding-window refresh fires, not on every
    /// request.
    pub fn last_accessed_time(&self) -> i64 {
        self.meta.last_accessed_time
    }

    /// Current TTL in seconds.
    pub fn max_inactive_interval(&self) -> i64 {
        self.meta.max_inactive_interval
    }

    /// Reads an attribute. `Ok(None)` if it is not set.
    pub async fn get<T: DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<Option<T>, SessionError> {
        let raw = self.shared.store.get_field(&self.id, name).await?;
        tracing::debug!(
            session_id = %self.id,
            name,
            found = raw.is_some(),
            "session get"
        );
        match raw {
            Some(bytes) => Ok(Some(self.shared.codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Writes an attribute, replacing any previous value.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<(), SessionError> {
        let bytes = self.shared.codec.encode(value)?;
        self.shared.store.put_field(&self.id, name, &bytes).await?;
        tracing::debug!(session_id = %self.id, name, "session set");
        Ok(())
    }

    /// Deletes an attribute. Removing an absent attribute is a no-op.
    pub async fn remove(&self, name: &str) -> Result<(), SessionError> {
        self.shared.store.delete_field(&self.id, name).await?;
        tracing::debug!(session_id = %self.id, name, "session del");
        Ok(())
    }

    /// Every field name on the record, *including* the three reserved
    /// metadata fields.
    ///
    /// Use [`user_attribute_names`](Self::user_attribute_names) for the
    /// application's attributes only.
    pub async fn attribute_names(&self) -> Result<Vec<String>, SessionError> {
        Ok(self.shared.store.field_names(&self.id).await?)
    }

    /// Field names on the record minus the reserved metadata fields.
    pub async fn user_attribute_names(&self) -> Result<Vec<String>, SessionError> {
        let reserved = &self.shared.config.reserved_fields;
        let mut names = self.attribute_names().await?;
        names.retain(|name| !reserved.contains(name));
        Ok(names)
    }

    /// Changes the TTL and applies it to the store record right away.
    ///
    /// Values `<= 0` expire the record immediately. The in-memory value
    /// keeps whatever was passed in.
    pub async fn set_max_inactive_interval(
        &mut self,
        secs: i64,
    ) -> Result<(), SessionError> {
        self.meta.max_inactive_interval = secs;
        let ttl = u64::try_from(secs).unwrap_or(0);
        self.shared.store.expire(&self.id, ttl).await?;
        tracing::debug!(session_id = %self.id, interval = secs, "session expire");
        Ok(())
    }

    /// Deletes the record. Calling it again is harmless.
    ///
    /// Attribute calls made afterwards hit a record that no longer
    /// exists: reads find nothing and a write creates a bare record with
    /// no metadata, which the next request will treat as absent.
    pub async fn invalidate(&mut self) -> Result<(), SessionError> {
        self.shared.store.delete_record(&self.id).await?;
        self.state = SessionState::Invalidated;
        tracing::debug!(session_id = %self.id, "session invalidate");
        Ok(())
    }

    /// The servlet-era session context accessor. Always fails.
    pub fn session_context(&self) -> Result<(), SessionError> {
        Err(SessionError::Unsupported("session context"))
    }

    /// Records an access at `now` and persists only that field.
    pub(crate) async fn touch(&mut self, now: i64) -> Result<(), SessionError> {
        let field = &self.shared.config.reserved_fields.last_accessed_time;
        let bytes = self.shared.codec.encode(&now)?;
        self.shared.store.put_field(&self.id, field, &bytes).await?;
        self.meta.last_accessed_time = now;
        Ok(())
    }
}
