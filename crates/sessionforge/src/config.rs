//! Application configuration: store connection plus session settings.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use sessionforge_session::SessionConfig;
use sessionforge_store::StoreConfig;

/// Default location of the optional config file (extension resolved by
/// the `config` crate, e.g. `config/sessionforge.toml`).
pub const DEFAULT_CONFIG_PATH: &str = "config/sessionforge";

/// Prefix of environment overrides, e.g. `SESSIONFORGE__STORE__HOST`.
pub const ENV_PREFIX: &str = "SESSIONFORGE";

/// Everything needed to stand up the session engine.
///
/// ```toml
/// [store]
/// host = "10.0.0.5"
/// port = 6379
/// timeout_ms = 2000
///
/// [store.pool]
/// max_active = 16
///
/// [session.cookie]
/// domain = "example.com"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    /// Loads defaults, then `config/sessionforge.*` if present, then
    /// `SESSIONFORGE__*` environment variables (a `.env` file is read
    /// first).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Like [`load`](Self::load) with a different file path.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app: AppConfig = config.try_deserialize()?;
        app.store
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        tracing::debug!(
            host = %app.store.host,
            port = app.store.port,
            pooled = app.store.pool.is_some(),
            "configuration loaded"
        );
        Ok(app)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let config = AppConfig::load_from("does/not/exist/sessionforge").unwrap();

        assert_eq!(config.store.port, 6379);
        assert_eq!(config.session.cookie.name, "demo_sid");
        assert_eq!(config.session.max_inactive_interval_secs, 10_800);
    }

    #[test]
    fn test_load_from_toml_overrides_selected_fields() {
        let dir = std::env::temp_dir().join(format!(
            "sessionforge-config-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sessionforge.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[store]
host = "10.0.0.5"
database = 2

[store.pool]
max_active = 16
max_idle = 4

[session]
max_inactive_interval_secs = 600

[session.cookie]
name = "sid"
"#
        )
        .unwrap();

        let stem = dir.join("sessionforge");
        let config = AppConfig::load_from(stem.to_str().unwrap()).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(config.store.host, "10.0.0.5");
        assert_eq!(config.store.port, 6379);
        assert_eq!(config.store.database, 2);
        let pool = config.store.pool.unwrap();
        assert_eq!(pool.max_active, 16);
        assert_eq!(pool.max_idle, 4);
        assert_eq!(config.session.max_inactive_interval_secs, 600);
        assert_eq!(config.session.cookie.name, "sid");
        assert_eq!(config.session.cookie.domain.as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn test_load_from_invalid_pool_is_rejected() {
        let dir = std::env::temp_dir().join(format!(
            "sessionforge-bad-pool-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("sessionforge.toml"),
            "[store.pool]\nmax_active = 0\n",
        )
        .unwrap();

        let stem = dir.join("sessionforge");
        let result = AppConfig::load_from(stem.to_str().unwrap());
        std::fs::remove_dir_all(&dir).ok();

        assert!(result.is_err());
    }
}
