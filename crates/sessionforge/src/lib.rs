//! # SessionForge
//!
//! Redis-backed HTTP sessions for services that scale horizontally.
//!
//! Every server instance shares one session record per user in Redis (or
//! any other [`MappingStore`](sessionforge_store::MappingStore)), so any
//! instance can serve any request. A request only touches the store once
//! it actually asks for its session, and the session's TTL slides forward
//! at most once per tenth of its lifetime.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sessionforge::prelude::*;
//!
//! # async fn run() -> Result<(), SessionforgeError> {
//! let config = AppConfig::load()?;
//! let store = Arc::new(RedisStore::connect(&config.store).await?);
//! let manager = SessionManager::new(store, config.session);
//!
//! let request = http::Request::new(());
//! let mut request = SessionRequest::new(request, manager);
//! let session = request.session().await?;
//! session.set("hello", "session").await?;
//!
//! let (_request, _session, cookies) = request.into_parts();
//! let mut headers = http::HeaderMap::new();
//! cookies.write_to(&mut headers);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod request;
pub mod telemetry;

pub use config::AppConfig;
pub use error::SessionforgeError;
pub use request::{RequestedSessionId, SessionRequest};

// Re-export the building blocks so users only need `sessionforge`.
pub use sessionforge_session as session;
pub use sessionforge_store as store;

pub mod prelude {
    //! Everything a request handler usually needs.

    pub use crate::{AppConfig, RequestedSessionId, SessionRequest, SessionforgeError};
    pub use sessionforge_session::{
        Codec, JsonCodec, ResponseCookies, Session, SessionConfig, SessionError,
        SessionManager, SessionState,
    };
    #[cfg(feature = "redis")]
    pub use sessionforge_store::RedisStore;
    pub use sessionforge_store::{MappingStore, MemoryStore, StoreConfig, StoreError};
}
