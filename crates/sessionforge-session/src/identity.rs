//! Session id resolution.
//!
//! Every request ends up with exactly one id. In order of preference:
//!
//! 1. the value of the session cookie (name compared case-insensitively),
//! 2. the id the framework says the client asked for,
//! 3. a freshly minted random id.
//!
//! A stale id is kept, not replaced: if the cookie names a record that has
//! since expired, the new record is created under the same id.

use rand::Rng;

/// Picks the session id for a request. Never fails.
///
/// `cookies` yields `(name, value)` pairs in header order; the first
/// cookie whose name matches `cookie_name` wins. Blank values are
/// ignored at every step.
pub fn resolve_session_id<'a, I>(
    cookies: I,
    cookie_name: &str,
    requested_id: Option<&str>,
) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let from_cookie = cookies
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(cookie_name))
        .map(|(_, value)| value);

    if let Some(id) = from_cookie.filter(|v| !is_blank(v)) {
        return id.to_string();
    }
    if let Some(id) = requested_id.filter(|v| !is_blank(v)) {
        return id.to_string();
    }

    let id = generate_session_id();
    tracing::trace!(session_id = %id, "minted new session id");
    id
}

/// Generates a 32-character uppercase hex id (128 bits of entropy).
///
/// `rand::rng()` is a CSPRNG seeded from the OS, so ids are unguessable
/// and collisions are not a practical concern.
pub fn generate_session_id() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
