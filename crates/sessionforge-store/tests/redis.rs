//! Integration tests for the Redis store.
//!
//! The `live` tests talk to a real Redis server. They are skipped unless
//! `SESSIONFORGE_TEST_REDIS_HOST` is set, e.g.
//! `SESSIONFORGE_TEST_REDIS_HOST=127.0.0.1 cargo test -p sessionforge-store`.
//!
//! The `wire` tests always run. They point the store at a small in-process
//! server that speaks just enough RESP to answer the store's commands, and
//! can stall replies or hang up on demand.

#[cfg(feature = "redis")]
mod live {
    use std::time::Duration;

    use sessionforge_store::{MappingStore, PoolConfig, RedisStore, StoreConfig, StoreError};

    /// Returns a config for the test server, or `None` to skip.
    fn test_config() -> Option<StoreConfig> {
        let host = std::env::var("SESSIONFORGE_TEST_REDIS_HOST").ok()?;
        let port = std::env::var("SESSIONFORGE_TEST_REDIS_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(6379);
        Some(StoreConfig::new(host, port).with_database(15))
    }

    /// A key no other test run will collide with.
    fn unique_key(prefix: &str) -> String {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("sessionforge-test:{prefix}:{nanos}")
    }

    async fn exercise_hash_commands(store: &RedisStore) {
        let key = unique_key("hash");

        store
            .put_fields(&key, &[("a", b"1".to_vec()), ("b", b"2".to_vec())])
            .await
            .expect("HSET pairs");
        store.put_field(&key, "c", b"3").await.expect("HSET");

        let values = store.get_fields(&key, &["a", "missing", "c"]).await.unwrap();
        assert_eq!(values, vec![Some(b"1".to_vec()), None, Some(b"3".to_vec())]);

        let mut names = store.field_names(&key).await.unwrap();
        names.sort();
        assert_eq!(names, vec!["a", "b", "c"]);

        store.delete_field(&key, "b").await.unwrap();
        store.delete_field(&key, "b").await.expect("second HDEL is a no-op");
        assert_eq!(store.get_field(&key, "b").await.unwrap(), None);

        store.expire(&key, 60).await.unwrap();
        store.delete_record(&key).await.unwrap();
        store.delete_record(&key).await.expect("second DEL is a no-op");
        assert!(store.field_names(&key).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_redis_direct_connection_hash_commands() {
        let Some(config) = test_config() else { return };
        let store = RedisStore::connect(&config).await.expect("should connect");

        exercise_hash_commands(&store).await;
    }

    #[tokio::test]
    async fn test_redis_pooled_connection_hash_commands() {
        let Some(config) = test_config() else { return };
        let config = config.with_pool(PoolConfig {
            max_active: 4,
            max_idle: 4,
            min_idle: 2,
            max_wait_ms: 1000,
        });
        let store = RedisStore::connect(&config).await.expect("should connect");

        exercise_hash_commands(&store).await;
    }

    #[tokio::test]
    async fn test_redis_expire_zero_deletes_record() {
        let Some(config) = test_config() else { return };
        let store = RedisStore::connect(&config).await.unwrap();
        let key = unique_key("expire");
        store.put_field(&key, "a", b"1").await.unwrap();

        store.expire(&key, 0).await.unwrap();

        assert_eq!(store.get_field(&key, "a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_redis_unreachable_host_fails_fast() {
        // Port 1 on localhost is closed on any sane test machine.
        let config = StoreConfig::new("127.0.0.1", 1).with_timeout(Duration::from_millis(500));

        let result = RedisStore::connect(&config).await;

        assert!(
            matches!(result, Err(StoreError::Connection(_) | StoreError::Timeout(_))),
            "expected connection failure, got {result:?}"
        );
    }
}

#[cfg(feature = "redis")]
mod wire {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use sessionforge_store::{MappingStore, PoolConfig, RedisStore, StoreConfig, StoreError};
    use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

    // -- Fake server ------------------------------------------------------

    /// How the fake server treats each connection.
    #[derive(Debug, Clone, Copy, Default)]
    struct Behaviour {
        /// Pause before answering every HGET.
        hget_delay: Duration,
        /// Hang up on the first connection right after its first HGET reply.
        drop_first_connection: bool,
    }

    struct FakeRedis {
        addr: SocketAddr,
        accepted: Arc<AtomicUsize>,
    }

    impl FakeRedis {
        async fn start(behaviour: Behaviour) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let accepted = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&accepted);

            tokio::spawn(async move {
                while let Ok((socket, _)) = listener.accept().await {
                    let nth = counter.fetch_add(1, Ordering::SeqCst);
                    let hang_up = behaviour.drop_first_connection && nth == 0;
                    tokio::spawn(serve(socket, behaviour.hget_delay, hang_up));
                }
            });

            Self { addr, accepted }
        }

        fn config(&self) -> StoreConfig {
            StoreConfig::new(self.addr.ip().to_string(), self.addr.port())
        }

        /// Connections accepted so far.
        fn connections(&self) -> usize {
            self.accepted.load(Ordering::SeqCst)
        }
    }

    /// Answers HGET with nil, PING with PONG (or its argument), and
    /// everything else (setup commands included) with `+OK`.
    async fn serve(socket: TcpStream, hget_delay: Duration, hang_up_after_hget: bool) {
        let (read, mut write) = socket.into_split();
        let mut reader = BufReader::new(read);

        while let Some(args) = read_command(&mut reader).await {
            let name = args
                .first()
                .map(|a| String::from_utf8_lossy(a).to_ascii_uppercase())
                .unwrap_or_default();
            let reply = match name.as_str() {
                "HGET" => {
                    tokio::time::sleep(hget_delay).await;
                    b"$-1\r\n".to_vec()
                }
                "PING" => match args.get(1) {
                    Some(arg) => bulk(arg),
                    None => b"+PONG\r\n".to_vec(),
                },
                _ => b"+OK\r\n".to_vec(),
            };
            if write.write_all(&reply).await.is_err() {
                return;
            }
            if name == "HGET" && hang_up_after_hget {
                return;
            }
        }
    }

    /// Reads one RESP array of bulk strings. `None` on EOF or garbage.
    async fn read_command<R: AsyncBufRead + Unpin>(reader: &mut R) -> Option<Vec<Vec<u8>>> {
        let mut line = String::new();
        if reader.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
        let count: usize = line.trim_end().strip_prefix('*')?.parse().ok()?;

        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            line.clear();
            reader.read_line(&mut line).await.ok()?;
            let len: usize = line.trim_end().strip_prefix('$')?.parse().ok()?;
            let mut buf = vec![0; len + 2];
            reader.read_exact(&mut buf).await.ok()?;
            buf.truncate(len);
            args.push(buf);
        }
        Some(args)
    }

    fn bulk(data: &[u8]) -> Vec<u8> {
        let mut out = format!("${}\r\n", data.len()).into_bytes();
        out.extend_from_slice(data);
        out.extend_from_slice(b"\r\n");
        out
    }

    fn single_connection_pool(max_wait_ms: i64) -> PoolConfig {
        PoolConfig {
            max_active: 1,
            max_idle: 1,
            min_idle: 0,
            max_wait_ms,
        }
    }

    // =====================================================================
    // Command timeout
    // =====================================================================

    #[tokio::test]
    async fn test_get_field_slow_reply_returns_timeout() {
        let server = FakeRedis::start(Behaviour {
            hget_delay: Duration::from_millis(500),
            ..Behaviour::default()
        })
        .await;
        let config = server.config().with_timeout(Duration::from_millis(100));
        let store = RedisStore::connect(&config).await.unwrap();

        let result = store.get_field("k", "a").await;

        assert!(
            matches!(result, Err(StoreError::Timeout(t)) if t == Duration::from_millis(100)),
            "expected timeout, got {result:?}"
        );
    }

    // =====================================================================
    // Reconnect (direct mode)
    // =====================================================================

    #[tokio::test]
    async fn test_direct_connection_dropped_by_server_reconnects() {
        let server = FakeRedis::start(Behaviour {
            drop_first_connection: true,
            ..Behaviour::default()
        })
        .await;
        let config = server.config().with_timeout(Duration::from_millis(1000));
        let store = RedisStore::connect(&config).await.unwrap();

        assert_eq!(store.get_field("k", "a").await.unwrap(), None);
        // Let the client notice the hang-up.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let after_drop = store.get_field("k", "a").await;
        let again = store.get_field("k", "a").await;

        assert!(matches!(after_drop, Ok(None)), "got {after_drop:?}");
        assert!(matches!(again, Ok(None)), "got {again:?}");
        assert_eq!(server.connections(), 2);
    }

    // =====================================================================
    // Pool wait
    // =====================================================================

    #[tokio::test]
    async fn test_pool_unbounded_wait_outlasts_command_timeout() {
        let server = FakeRedis::start(Behaviour {
            hget_delay: Duration::from_millis(200),
            ..Behaviour::default()
        })
        .await;
        let config = server
            .config()
            .with_timeout(Duration::from_millis(300))
            .with_pool(single_connection_pool(-1));
        let store = RedisStore::connect(&config).await.unwrap();

        // The second call waits ~200 ms for the only connection, then
        // needs another ~200 ms for its own command.
        let (a, b) = tokio::join!(store.get_field("k", "a"), store.get_field("k", "b"));

        assert!(matches!(a, Ok(None)), "got {a:?}");
        assert!(matches!(b, Ok(None)), "got {b:?}");
        assert_eq!(server.connections(), 1);
    }

    #[tokio::test]
    async fn test_pool_bounded_wait_exhausted_returns_pool_error() {
        let server = FakeRedis::start(Behaviour {
            hget_delay: Duration::from_millis(300),
            ..Behaviour::default()
        })
        .await;
        let config = server
            .config()
            .with_timeout(Duration::from_millis(1000))
            .with_pool(single_connection_pool(50));
        let store = RedisStore::connect(&config).await.unwrap();

        let (a, b) = tokio::join!(store.get_field("k", "a"), store.get_field("k", "b"));

        assert!(matches!(a, Ok(None)), "got {a:?}");
        assert!(matches!(b, Err(StoreError::Pool(_))), "got {b:?}");
    }
}
