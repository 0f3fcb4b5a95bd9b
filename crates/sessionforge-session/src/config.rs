//! Session configuration: cookie settings, reserved field names, TTL.

use serde::{Deserialize, Serialize};

/// Cookie name used when none is configured.
pub const DEFAULT_COOKIE_NAME: &str = "demo_sid";

/// Cookie domain used when none is configured.
pub const DEFAULT_COOKIE_DOMAIN: &str = "127.0.0.1";

/// Default session TTL: 3 hours, in seconds.
pub const DEFAULT_MAX_INACTIVE_INTERVAL_SECS: i64 = 3 * 60 * 60;

pub const DEFAULT_CREATION_TIME_FIELD: &str = "____creationTime";
pub const DEFAULT_LAST_ACCESSED_TIME_FIELD: &str = "____lastAccessedTime";
pub const DEFAULT_MAX_INACTIVE_INTERVAL_FIELD: &str = "____maxInactiveInterval";

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Everything the session engine needs besides the store itself.
///
/// Built once at startup and shared by every request. All fields default
/// to the values above, so a config file only lists overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// The identifying cookie.
    pub cookie: CookieSettings,

    /// Names of the three metadata fields on each record.
    pub reserved_fields: ReservedFields,

    /// TTL given to newly created sessions, in seconds.
    pub max_inactive_interval_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie: CookieSettings::default(),
            reserved_fields: ReservedFields::default(),
            max_inactive_interval_secs: DEFAULT_MAX_INACTIVE_INTERVAL_SECS,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie.name = name.into();
        self
    }

    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie.domain = Some(domain.into());
        self
    }

    /// Issue host-only cookies (no `Domain` attribute).
    pub fn without_cookie_domain(mut self) -> Self {
        self.cookie.domain = None;
        self
    }

    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.cookie.secure = secure;
        self
    }

    pub fn with_max_inactive_interval(mut self, secs: i64) -> Self {
        self.max_inactive_interval_secs = secs;
        self
    }

    pub fn with_reserved_fields(mut self, fields: ReservedFields) -> Self {
        self.reserved_fields = fields;
        self
    }
}

// ---------------------------------------------------------------------------
// CookieSettings
// ---------------------------------------------------------------------------

/// Attributes of the session cookie. Path is always `/` and the cookie is
/// always `HttpOnly`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
    pub name: String,
    pub domain: Option<String>,
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            domain: Some(DEFAULT_COOKIE_DOMAIN.to_string()),
            secure: false,
        }
    }
}

// ---------------------------------------------------------------------------
// ReservedFields
// ---------------------------------------------------------------------------

/// Field names holding session metadata.
///
/// They share the record with user attributes. Nothing stops an
/// application from writing an attribute with one of these names, which
/// would corrupt the session; the leading underscores only make an
/// accidental clash unlikely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservedFields {
    pub creation_time: String,
    pub last_accessed_time: String,
    pub max_inactive_interval: String,
}

impl Default for ReservedFields {
    fn default() -> Self {
        Self {
            creation_time: DEFAULT_CREATION_TIME_FIELD.to_string(),
            last_accessed_time: DEFAULT_LAST_ACCESSED_TIME_FIELD.to_string(),
            max_inactive_interval: DEFAULT_MAX_INACTIVE_INTERVAL_FIELD.to_string(),
        }
    }
}

impl ReservedFields {
    /// The three names in fetch order: creation, last access, TTL.
    pub fn as_array(&self) -> [&str; 3] {
        [
            self.creation_time.as_str(),
            self.last_accessed_time.as_str(),
            self.max_inactive_interval.as_str(),
        ]
    }

    pub fn contains(&self, name: &str) -> bool {
        self.as_array().contains(&name)
    }
}
