//! Redis-backed [`MappingStore`] using `deadpool-redis`.
//!
//! Each session record is a Redis hash. With a `pool` section in the
//! [`StoreConfig`] the store draws connections from a `deadpool` pool;
//! without one it shares a single multiplexed connection, reopened after
//! the server drops it.

use std::time::Duration;

use deadpool_redis::redis::{self, FromRedisValue, aio::ConnectionLike, aio::MultiplexedConnection};
use deadpool_redis::{Pool, PoolError, Runtime};
use tokio::sync::Mutex;

use crate::{MappingStore, PoolConfig, StoreConfig, StoreError};

enum Backend {
    Pooled(Pool),
    Direct(DirectConnection),
}

/// The unpooled mode: one multiplexed connection shared by every task.
///
/// `None` after the connection was found broken; the next command opens
/// a fresh one.
struct DirectConnection {
    client: redis::Client,
    conn: Mutex<Option<MultiplexedConnection>>,
}

impl DirectConnection {
    /// The current connection, opening one if needed.
    async fn get(&self, timeout: Duration) -> Result<MultiplexedConnection, StoreError> {
        let mut slot = self.conn.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let conn = open_direct(&self.client, timeout).await?;
        *slot = Some(conn.clone());
        Ok(conn)
    }

    /// Forgets a broken connection.
    async fn reset(&self) {
        self.conn.lock().await.take();
    }
}

async fn open_direct(
    client: &redis::Client,
    timeout: Duration,
) -> Result<MultiplexedConnection, StoreError> {
    tokio::time::timeout(timeout, client.get_multiplexed_async_connection())
        .await
        .map_err(|_| StoreError::Timeout(timeout))?
        .map_err(StoreError::from)
}

/// A [`MappingStore`] talking to a Redis server.
///
/// Every command is bounded by the configured timeout. Waiting for a
/// pooled connection is bounded by the pool's `max_wait_ms` instead.
/// Failures are returned as-is, except that an unpooled command hitting a
/// dropped connection is sent once more on a new one (every command the
/// store issues is idempotent).
pub struct RedisStore {
    backend: Backend,
    timeout: Duration,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.backend {
            Backend::Pooled(_) => "pooled",
            Backend::Direct(_) => "direct",
        };
        f.debug_struct("RedisStore")
            .field("mode", &mode)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RedisStore {
    /// Connects to Redis using the given settings.
    ///
    /// In pooled mode, `min_idle` connections are opened before this
    /// returns so the first requests don't pay the connect cost.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let url = connection_url(config)?;
        let timeout = config.timeout();

        let backend = match &config.pool {
            Some(pool) => Backend::Pooled(build_pool(&url, pool, timeout).await?),
            None => {
                let client = redis::Client::open(url.as_str())?;
                let conn = open_direct(&client, timeout).await?;
                Backend::Direct(DirectConnection {
                    client,
                    conn: Mutex::new(Some(conn)),
                })
            }
        };

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = config.database,
            pooled = config.pool.is_some(),
            "connected to redis"
        );

        Ok(Self { backend, timeout })
    }

    /// Runs one command.
    async fn run<T: FromRedisValue>(
        &self,
        cmd: &redis::Cmd,
    ) -> Result<T, StoreError> {
        match &self.backend {
            Backend::Pooled(pool) => {
                let mut conn = pool.get().await.map_err(pool_error)?;
                self.query(cmd, &mut conn).await
            }
            Backend::Direct(direct) => {
                let mut conn = direct.get(self.timeout).await?;
                match self.query(cmd, &mut conn).await {
                    Err(StoreError::Connection(e)) => {
                        tracing::warn!(error = %e, "redis connection lost, reconnecting");
                        direct.reset().await;
                        let mut conn = direct.get(self.timeout).await?;
                        self.query(cmd, &mut conn).await
                    }
                    result => result,
                }
            }
        }
    }

    /// Sends `cmd` on `conn`, bounded by the command timeout.
    async fn query<T, C>(&self, cmd: &redis::Cmd, conn: &mut C) -> Result<T, StoreError>
    where
        T: FromRedisValue,
        C: ConnectionLike + Send,
    {
        match tokio::time::timeout(self.timeout, cmd.query_async(conn)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) if e.is_timeout() => Err(StoreError::Timeout(self.timeout)),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

fn pool_error(e: PoolError) -> StoreError {
    match e {
        PoolError::Backend(e) => e.into(),
        other => StoreError::Pool(other.to_string()),
    }
}

/// Builds a `redis://` URL from the settings, escaping the password.
fn connection_url(config: &StoreConfig) -> Result<String, StoreError> {
    let mut url = url::Url::parse(&format!(
        "redis://{}:{}/{}",
        config.host, config.port, config.database
    ))
    .map_err(|e| StoreError::Config(format!("bad host: {e}")))?;

    if let Some(password) = &config.password {
        url.set_password(Some(password.as_str()))
            .map_err(|()| StoreError::Config("cannot set password".into()))?;
    }
    Ok(url.into())
}

async fn build_pool(
    url: &str,
    settings: &PoolConfig,
    timeout: Duration,
) -> Result<Pool, StoreError> {
    let mut pool_config = deadpool_redis::PoolConfig::new(settings.max_active);
    pool_config.timeouts.wait = settings.max_wait();
    pool_config.timeouts.create = Some(timeout);
    pool_config.timeouts.recycle = Some(timeout);

    let mut config = deadpool_redis::Config::from_url(url);
    config.pool = Some(pool_config);
    let pool = config
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| StoreError::Pool(e.to_string()))?;

    // Open `min_idle` connections up front; they return to the pool
    // when the guards drop.
    let mut warm = Vec::with_capacity(settings.min_idle);
    for _ in 0..settings.min_idle {
        warm.push(pool.get().await.map_err(pool_error)?);
    }
    drop(warm);

    tracing::debug!(
        max_active = settings.max_active,
        max_idle = settings.max_idle,
        min_idle = settings.min_idle,
        "redis pool ready"
    );
    Ok(pool)
}

impl MappingStore for RedisStore {
    async fn get_field(
        &self,
        key: &str,
        field: &str,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let mut cmd = redis::cmd("HGET");
        cmd.arg(key).arg(field);
        self.run(&cmd).await
    }

    async fn get_fields(
        &self,
        key: &str,
        fields: &[&str],
    ) -> Result<Vec<Option<Vec<u8>>>, StoreError> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        let mut cmd = redis::cmd("HMGET");
        cmd.arg(key);
        for field in fields {
            cmd.arg(*field);
        }
        let values: Vec<Option<Vec<u8>>> = self.run(&cmd).await?;
        if values.len() != fields.len() {
            return Err(StoreError::Protocol(format!(
                "HMGET returned {} values for {} fields",
                values.len(),
                fields.len()
            )));
        }
        Ok(values)
    }

    async fn put_field(
        &self,
        key: &str,
        field: &str,
        value: &[u8],
    ) -> Result<(), StoreError> {
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key).arg(field).arg(value);
        self.run(&cmd).await
    }

    async fn put_fields(
        &self,
        key: &str,
        entries: &[(&str, Vec<u8>)],
    ) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        // A single HSET with several pairs is atomic.
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in entries {
            cmd.arg(*field).arg(value.as_slice());
        }
        self.run(&cmd).await
    }

    async fn delete_field(
        &self,
        key: &str,
        field: &str,
    ) -> Result<(), StoreError> {
        let mut cmd = redis::cmd("HDEL");
        cmd.arg(key).arg(field);
        self.run(&cmd).await
    }

    async fn field_names(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut cmd = redis::cmd("HKEYS");
        cmd.arg(key);
        self.run(&cmd).await
    }

    async fn delete_record(&self, key: &str) -> Result<(), StoreError> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        self.run(&cmd).await
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut cmd = redis::cmd("EXPIRE");
        cmd.arg(key).arg(ttl_secs);
        self.run(&cmd).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_url_plain() {
        let config = StoreConfig::new("10.0.0.5", 6380).with_database(2);

        assert_eq!(connection_url(&config).unwrap(), "redis://10.0.0.5:6380/2");
    }

    #[test]
    fn test_connection_url_escapes_password() {
        let config = StoreConfig::default().with_password("p@ss:word");

        let url = connection_url(&config).unwrap();

        assert_eq!(url, "redis://:p%40ss%3Aword@127.0.0.1:6379/0");
    }
}
