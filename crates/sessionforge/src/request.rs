//! Per-request session access.
//!
//! [`SessionRequest`] wraps an `http::Request` and adds lazy session
//! acquisition on top of it. Nothing touches the store until a handler
//! first asks for its session; after that the same session is returned
//! for the rest of the request.

use std::fmt;
use std::ops::{Deref, DerefMut};

use cookie::Cookie;
use http::Request;
use http::header::COOKIE;
use sessionforge_session::{
    Codec, JsonCodec, ResponseCookies, Session, SessionError, SessionManager,
};
use sessionforge_store::MappingStore;

/// The session id the framework says the client asked for, e.g. one taken
/// from a URL path parameter.
///
/// Insert it into the request extensions before wrapping the request.
/// The session cookie still takes precedence over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedSessionId(pub String);

/// An HTTP request with a lazily created session attached.
///
/// Derefs to the wrapped `http::Request`, so headers, URI, extensions and
/// body are available as usual.
///
/// ```text
/// new() ──→ session() ──→ session() ──→ into_parts()
///             │              │
///             ▼              ▼
///        resolve + open   cached
/// ```
pub struct SessionRequest<B, S: MappingStore, C: Codec = JsonCodec> {
    inner: Request<B>,
    manager: SessionManager<S, C>,
    requested_id: Option<String>,
    session: Option<Session<S, C>>,
    cookies: ResponseCookies,
}

impl<B, S: MappingStore, C: Codec> fmt::Debug for SessionRequest<B, S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRequest")
            .field("method", self.inner.method())
            .field("uri", self.inner.uri())
            .field("requested_id", &self.requested_id)
            .field("session", &self.session)
            .field("cookies", &self.cookies)
            .finish_non_exhaustive()
    }
}

impl<B, S: MappingStore, C: Codec> SessionRequest<B, S, C> {
    /// Wraps `request`. Picks up a [`RequestedSessionId`] extension if
    /// one is present.
    pub fn new(request: Request<B>, manager: SessionManager<S, C>) -> Self {
        let requested_id = request
            .extensions()
            .get::<RequestedSessionId>()
            .map(|r| r.0.clone());
        Self {
            inner: request,
            manager,
            requested_id,
            session: None,
            cookies: ResponseCookies::new(),
        }
    }

    /// Overrides the requested session id.
    pub fn with_requested_id(mut self, id: impl Into<String>) -> Self {
        self.requested_id = Some(id.into());
        self
    }

    /// Returns the request's session, creating it on first call.
    ///
    /// The first call resolves the id from the cookie, loads or creates
    /// the record, and may queue a cookie. Later calls return the same
    /// session without touching the store.
    pub async fn session(&mut self) -> Result<&mut Session<S, C>, SessionError> {
        let session = match self.session.take() {
            Some(session) => session,
            None => {
                let id = self.resolve_id();
                self.manager.open(id, &mut self.cookies).await?
            }
        };
        Ok(self.session.insert(session))
    }

    /// The session, if `session()` was already called on this request.
    ///
    /// Returns `None` before that, even when the client sent a valid
    /// session cookie. Callers who need the stored session must go through
    /// [`session`](Self::session).
    pub fn existing_session(&self) -> Option<&Session<S, C>> {
        self.session.as_ref()
    }

    pub fn existing_session_mut(&mut self) -> Option<&mut Session<S, C>> {
        self.session.as_mut()
    }

    /// `session()` when `create` is `true`, `existing_session_mut()`
    /// otherwise.
    pub async fn session_with(
        &mut self,
        create: bool,
    ) -> Result<Option<&mut Session<S, C>>, SessionError> {
        if create {
            self.session().await.map(Some)
        } else {
            Ok(self.session.as_mut())
        }
    }

    /// Cookies queued for the response so far.
    pub fn response_cookies(&self) -> &ResponseCookies {
        &self.cookies
    }

    pub fn into_inner(self) -> Request<B> {
        self.inner
    }

    /// Splits into the wrapped request, the session (if one was
    /// materialized) and the cookies the response must carry.
    pub fn into_parts(self) -> (Request<B>, Option<Session<S, C>>, ResponseCookies) {
        (self.inner, self.session, self.cookies)
    }

    /// Parses every `Cookie` header and hands the pairs to the manager.
    /// Fragments that don't parse are skipped.
    fn resolve_id(&self) -> String {
        let parsed: Vec<Cookie<'_>> = self
            .inner
            .headers()
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .collect();

        self.manager.resolve_id(
            parsed.iter().map(|c| (c.name(), c.value())),
            self.requested_id.as_deref(),
        )
    }
}

impl<B, S: MappingStore, C: Codec> Deref for SessionRequest<B, S, C> {
    type Target = Request<B>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<B, S: MappingStore, C: Codec> DerefMut for SessionRequest<B, S, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
