//! Connection settings for the backing store.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::StoreError;

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Where and how to reach the store.
///
/// Every field has a default, so a config file only needs to name what it
/// changes. Leaving `pool` unset disables pooling: the store then runs all
/// commands over a single multiplexed connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    /// Logical database index.
    pub database: u32,
    /// Connect and per-command timeout, in milliseconds.
    pub timeout_ms: u64,
    pub pool: Option<PoolConfig>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            database: 0,
            timeout_ms: 2000,
            pool: None,
        }
    }
}

impl StoreConfig {
    /// Creates a config pointing at `host:port` with default settings.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_database(mut self, database: u32) -> Self {
        self.database = database;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = Some(pool);
        self
    }

    /// The connect/command timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Checks the settings for values no backend could use.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.host.trim().is_empty() {
            return Err(StoreError::Config("host must not be empty".into()));
        }
        if self.timeout_ms == 0 {
            return Err(StoreError::Config("timeout_ms must be positive".into()));
        }
        if let Some(pool) = &self.pool {
            pool.validate()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PoolConfig
// ---------------------------------------------------------------------------

/// Connection pool sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Upper bound on open connections.
    pub max_active: usize,
    /// Connections the pool may keep parked. Must not exceed `max_active`.
    pub max_idle: usize,
    /// Connections opened eagerly at startup.
    pub min_idle: usize,
    /// How long to wait for a free connection, in milliseconds.
    /// Negative means wait indefinitely. Independent of `timeout_ms`,
    /// which only starts once a connection is in hand.
    pub max_wait_ms: i64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_active: 8,
            max_idle: 8,
            min_idle: 0,
            max_wait_ms: -1,
        }
    }
}

impl PoolConfig {
    /// `None` when callers should block until a connection frees up.
    pub fn max_wait(&self) -> Option<Duration> {
        u64::try_from(self.max_wait_ms)
            .ok()
            .map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.max_active == 0 {
            return Err(StoreError::Config("pool.max_active must be positive".into()));
        }
        if self.max_idle > self.max_active {
            return Err(StoreError::Config(format!(
                "pool.max_idle ({}) exceeds pool.max_active ({})",
                self.max_idle, self.max_active
            )));
        }
        if self.min_idle > self.max_idle {
            return Err(StoreError::Config(format!(
                "pool.min_idle ({}) exceeds pool.max_idle ({})",
                self.min_idle, self.max_idle
            )));
        }
        Ok(())
    }
}
