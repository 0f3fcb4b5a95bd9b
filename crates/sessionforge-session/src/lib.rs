//! Session identity, lifecycle and refresh for SessionForge.
//!
//! This crate turns a mapping-store record into a user session:
//!
//! 1. **Identity**: which record a request belongs to ([`resolve_session_id`])
//! 2. **Lifecycle**: load-or-create plus invalidation ([`SessionManager`], [`Session`])
//! 3. **Sliding window**: the TTL and cookie are refreshed once 10% of the
//!    TTL has passed since the last recorded access
//!
//! # How it fits in the stack
//!
//! ```text
//! Request layer (above)   ← one lazily created session per request
//!     ↕
//! Session layer (this crate)   ← metadata, attributes, cookie issuing
//!     ↕
//! Store layer (below)   ← MappingStore: Redis or in-memory
//! ```

mod clock;
mod codec;
mod config;
mod cookies;
mod error;
mod identity;
mod manager;
mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{Codec, CodecError, JsonCodec};
pub use config::{
    CookieSettings, DEFAULT_COOKIE_DOMAIN, DEFAULT_COOKIE_NAME,
    DEFAULT_CREATION_TIME_FIELD, DEFAULT_LAST_ACCESSED_TIME_FIELD,
    DEFAULT_MAX_INACTIVE_INTERVAL_FIELD, DEFAULT_MAX_INACTIVE_INTERVAL_SECS,
    ReservedFields, SessionConfig,
};
pub use cookies::ResponseCookies;
pub use error::SessionError;
pub use identity::{generate_session_id, resolve_session_id};
pub use manager::{SessionManager, SessionManagerBuilder};
pub use session::{Session, SessionState};
