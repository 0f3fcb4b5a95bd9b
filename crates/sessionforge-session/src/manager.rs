//! The session manager: loads, creates and refreshes sessions.
//!
//! One `SessionManager` is built at startup and cloned into every request.
//! For each request it:
//! - reads the three metadata fields of the record in one round trip,
//! - hydrates an `Active` session when all three are present,
//! - otherwise creates a `New` record under the same id,
//! - refreshes the TTL and cookie once 10% of the TTL has passed since the
//!   last recorded access.
//!
//! # Concurrency note
//!
//! Two requests carrying the same cookie may race through `open`. Both
//! writes are idempotent in effect (same fields, near-identical
//! timestamps), so there is no locking around load-or-create.

use std::fmt;
use std::sync::Arc;

use sessionforge_store::MappingStore;

use crate::cookies::session_cookie;
use crate::session::Metadata;
use crate::{
    Clock, Codec, CodecError, JsonCodec, ResponseCookies, Session, SessionConfig,
    SessionError, SessionState, SystemClock, resolve_session_id,
};

/// State shared by the manager and every session it hands out.
///
/// Sessions hold an `Arc` to this rather than a back-reference to the
/// manager, so a `Session` can outlive the request that created it and
/// still reach the store.
pub(crate) struct Shared<S, C> {
    /// The backing store. Every attribute read or write is one call on it.
    pub(crate) store: Arc<S>,

    /// Cookie settings, reserved field names and the default TTL.
    pub(crate) config: SessionConfig,

    /// Turns attribute values and the three metadata numbers into bytes.
    pub(crate) codec: C,

    /// Source of "now" for creation and refresh timestamps.
    ///
    /// A trait object, not a type parameter, so swapping the clock in
    /// tests doesn't change the manager's type.
    pub(crate) clock: Arc<dyn Clock>,
}

/// Entry point of the session engine.
///
/// ## Lifecycle
///
/// ```text
/// resolve_id() ──→ open() ──┬── record complete ──→ Active ──(stale?)──→ refresh
///                           │
///                           └── record missing ──→ New ──→ persist + TTL + cookie
/// ```
///
/// Cloning is cheap: clones share the store, config, codec and clock.
pub struct SessionManager<S: MappingStore, C: Codec = JsonCodec> {
    shared: Arc<Shared<S, C>>,
}

impl<S: MappingStore, C: Codec> Clone for SessionManager<S, C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: MappingStore, C: Codec> fmt::Debug for SessionManager<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl<S: MappingStore> SessionManager<S> {
    /// A manager with the JSON codec and the system clock.
    pub fn new(store: Arc<S>, config: SessionConfig) -> Self {
        Self::builder(store).config(config).build()
    }

    pub fn builder(store: Arc<S>) -> SessionManagerBuilder<S> {
        SessionManagerBuilder {
            store,
            config: SessionConfig::default(),
            codec: JsonCodec,
            clock: Arc::new(SystemClock),
        }
    }
}

impl<S: MappingStore, C: Codec> SessionManager<S, C> {
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.shared.store
    }

    /// Picks the session id for a request from its cookies, falling back
    /// to `requested_id` and then to a fresh random id.
    pub fn resolve_id<'a, I>(&self, cookies: I, requested_id: Option<&str>) -> String
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        resolve_session_id(cookies, &self.shared.config.cookie.name, requested_id)
    }

    /// Loads the session stored under `id`, or creates it.
    ///
    /// Any cookie the response must carry (on creation or refresh) is
    /// appended to `cookies`.
    ///
    /// # Errors
    /// Store and codec failures are returned as-is. A record whose
    /// metadata can't be decoded is not an error: it is replaced by a new
    /// session under the same id.
    pub async fn open(
        &self,
        id: String,
        cookies: &mut ResponseCookies,
    ) -> Result<Session<S, C>, SessionError> {
        let reserved = &self.shared.config.reserved_fields;
        let values = self
            .shared
            .store
            .get_fields(&id, &reserved.as_array())
            .await?;

        match self.hydrate(&id, values) {
            Some(meta) => {
                let mut session = Session::from_parts(
                    id,
                    SessionState::Active,
                    meta,
                    Arc::clone(&self.shared),
                );
                self.refresh_if_stale(&mut session, cookies).await?;
                Ok(session)
            }
            None => self.create(id, cookies).await,
        }
    }

    /// Turns the three fetched metadata values into [`Metadata`].
    ///
    /// `None` means "treat the record as absent": a field is missing or
    /// unreadable.
    fn hydrate(&self, id: &str, values: Vec<Option<Vec<u8>>>) -> Option<Metadata> {
        let present = values.iter().filter(|v| v.is_some()).count();
        if present < 3 {
            if present > 0 {
                tracing::debug!(session_id = %id, present, "incomplete session record");
            }
            return None;
        }
        let [Some(created), Some(accessed), Some(interval)] =
            <[Option<Vec<u8>>; 3]>::try_from(values).ok()?
        else {
            return None;
        };

        let codec = &self.shared.codec;
        let decoded = (|| -> Result<Metadata, CodecError> {
            Ok(Metadata {
                creation_time: codec.decode(&created)?,
                last_accessed_time: codec.decode(&accessed)?,
                max_inactive_interval: codec.decode(&interval)?,
            })
        })();

        match decoded {
            Ok(meta) => Some(meta),
            Err(e) => {
                tracing::warn!(
                    session_id = %id,
                    error = %e,
                    "unreadable session metadata, starting a new session"
                );
                None
            }
        }
    }

    async fn create(
        &self,
        id: String,
        cookies: &mut ResponseCookies,
    ) -> Result<Session<S, C>, SessionError> {
        let shared = &self.shared;
        let now = shared.clock.now_millis();
        let interval = shared.config.max_inactive_interval_secs;
        let reserved = &shared.config.reserved_fields;

        let entries = [
            (reserved.creation_time.as_str(), shared.codec.encode(&now)?),
            (reserved.last_accessed_time.as_str(), shared.codec.encode(&now)?),
            (
                reserved.max_inactive_interval.as_str(),
                shared.codec.encode(&interval)?,
            ),
        ];
        shared.store.put_fields(&id, &entries).await?;

        let meta = Metadata {
            creation_time: now,
            last_accessed_time: now,
            max_inactive_interval: interval,
        };
        let mut session =
            Session::from_parts(id, SessionState::New, meta, Arc::clone(shared));
        session.set_max_inactive_interval(interval).await?;
        cookies.push(session_cookie(&shared.config.cookie, session.id(), interval));

        tracing::info!(session_id = %session.id(), ttl_secs = interval, "session created");
        Ok(session)
    }

    /// Slides the TTL forward once more than a tenth of it has elapsed
    /// since the last recorded access.
    ///
    /// `I` seconds of TTL give a threshold of `I * 100` milliseconds.
    /// Below it the request costs no writes at all.
    async fn refresh_if_stale(
        &self,
        session: &mut Session<S, C>,
        cookies: &mut ResponseCookies,
    ) -> Result<(), SessionError> {
        let now = self.shared.clock.now_millis();
        let idle_ms = now.saturating_sub(session.last_accessed_time());
        let threshold_ms = session.max_inactive_interval().saturating_mul(100);
        if idle_ms <= threshold_ms {
            tracing::trace!(session_id = %session.id(), idle_ms, "session fresh");
            return Ok(());
        }

        session.touch(now).await?;
        let interval = session.max_inactive_interval();
        session.set_max_inactive_interval(interval).await?;
        cookies.push(session_cookie(
            &self.shared.config.cookie,
            session.id(),
            interval,
        ));

        tracing::debug!(session_id = %session.id(), idle_ms, "session refreshed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for a [`SessionManager`] with a non-default codec or clock.
///
/// ```rust
/// use std::sync::Arc;
/// use sessionforge_session::{ManualClock, SessionConfig, SessionManager};
/// use sessionforge_store::MemoryStore;
///
/// let manager = SessionManager::builder(Arc::new(MemoryStore::new()))
///     .config(SessionConfig::new().with_max_inactive_interval(600))
///     .clock(ManualClock::new(0))
///     .build();
///
/// assert_eq!(manager.config().max_inactive_interval_secs, 600);
/// ```
pub struct SessionManagerBuilder<S, C = JsonCodec> {
    /// The store every session will live in. Required up front.
    store: Arc<S>,

    /// Defaults to [`SessionConfig::default`].
    config: SessionConfig,

    /// Defaults to [`JsonCodec`]. Changing it changes the builder's type,
    /// see [`codec`](Self::codec).
    codec: C,

    /// Defaults to [`SystemClock`].
    clock: Arc<dyn Clock>,
}

impl<S: MappingStore, C: Codec> SessionManagerBuilder<S, C> {
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Swaps the attribute codec.
    pub fn codec<C2: Codec>(self, codec: C2) -> SessionManagerBuilder<S, C2> {
        SessionManagerBuilder {
            store: self.store,
            config: self.config,
            codec,
            clock: self.clock,
        }
    }

    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn build(self) -> SessionManager<S, C> {
        SessionManager {
            shared: Arc::new(Shared {
                store: self.store,
                config: self.config,
                codec: self.codec,
                clock: self.clock,
            }),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
