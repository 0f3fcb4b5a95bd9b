//! The session cookie and the buffer that carries it to the response.
//!
//! A cookie is only issued when the session is created or when the
//! sliding-window refresh fires. Ordinary requests send nothing back, so
//! the browser's copy expires on the same schedule as the store record.

use cookie::Cookie;
use http::header::{HeaderMap, HeaderValue, SET_COOKIE};

use crate::CookieSettings;

/// Cookies queued for the outbound response.
///
/// The session engine appends to it; the HTTP layer drains it into
/// `Set-Cookie` headers once the handler is done.
#[derive(Debug, Clone, Default)]
pub struct ResponseCookies {
    cookies: Vec<Cookie<'static>>,
}

impl ResponseCookies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cookie: Cookie<'static>) {
        self.cookies.push(cookie);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie<'static>> {
        self.cookies.iter()
    }

    /// The most recently queued cookie with the given name.
    pub fn get(&self, name: &str) -> Option<&Cookie<'static>> {
        self.cookies.iter().rev().find(|c| c.name() == name)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Each cookie rendered as a `Set-Cookie` header value.
    pub fn header_values(&self) -> impl Iterator<Item = String> + '_ {
        self.cookies.iter().map(|c| c.to_string())
    }

    /// Appends one `Set-Cookie` header per queued cookie.
    ///
    /// Existing `Set-Cookie` headers are kept. A cookie that doesn't render
    /// to a valid header value is skipped with a warning.
    pub fn write_to(&self, headers: &mut HeaderMap) {
        for value in self.header_values() {
            match HeaderValue::try_from(value) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(e) => tracing::warn!(error = %e, "dropping unrenderable cookie"),
            }
        }
    }
}

impl IntoIterator for ResponseCookies {
    type Item = Cookie<'static>;
    type IntoIter = std::vec::IntoIter<Cookie<'static>>;

    fn into_iter(self) -> Self::IntoIter {
        self.cookies.into_iter()
    }
}

/// Builds the identifying cookie for a session.
///
/// `max_age_secs` is the session's current TTL.
pub(crate) fn session_cookie(
    settings: &CookieSettings,
    session_id: &str,
    max_age_secs: i64,
) -> Cookie<'static> {
    let mut builder = Cookie::build((settings.name.clone(), session_id.to_string()))
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .max_age(cookie::time::Duration::seconds(max_age_secs));
    if let Some(domain) = &settings.domain {
        builder = builder.domain(domain.clone());
    }
    builder.build()
}
