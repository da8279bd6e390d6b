//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Signing secrets are loaded from env vars (`ACCESS_TOKEN_SECRET`,
//! `REFRESH_TOKEN_SECRET`) or `*_secret_file` paths, never stored in the
//! TOML directly to avoid leaking secrets. A missing secret is a fatal
//! startup error — the codec profiles are built once here, never
//! per request.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use common::Secret;
use serde::Deserialize;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub tokens: TokensConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Token profile settings
#[derive(Debug, Deserialize)]
pub struct TokensConfig {
    #[serde(default = "default_access_lifetime")]
    pub access_lifetime_secs: u64,
    #[serde(default = "default_refresh_lifetime")]
    pub refresh_lifetime_secs: u64,
    /// Path to a file containing the access secret (alternative to the
    /// ACCESS_TOKEN_SECRET env var)
    #[serde(default)]
    pub access_secret_file: Option<PathBuf>,
    /// Path to a file containing the refresh secret (alternative to the
    /// REFRESH_TOKEN_SECRET env var)
    #[serde(default)]
    pub refresh_secret_file: Option<PathBuf>,
    #[serde(skip)]
    pub access_secret: Option<Secret<String>>,
    #[serde(skip)]
    pub refresh_secret: Option<Secret<String>>,
}

impl TokensConfig {
    pub fn access_lifetime(&self) -> Duration {
        Duration::from_secs(self.access_lifetime_secs)
    }

    pub fn refresh_lifetime(&self) -> Duration {
        Duration::from_secs(self.refresh_lifetime_secs)
    }
}

fn default_max_connections() -> usize {
    1000
}

/// 15 minutes
fn default_access_lifetime() -> u64 {
    900
}

/// 7 days
fn default_refresh_lifetime() -> u64 {
    604_800
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment
    /// variables.
    ///
    /// Secret resolution order per profile:
    /// 1. env var (`ACCESS_TOKEN_SECRET` / `REFRESH_TOKEN_SECRET`)
    /// 2. `*_secret_file` path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if config.tokens.access_lifetime_secs == 0 || config.tokens.refresh_lifetime_secs == 0 {
            return Err(common::Error::Config(
                "token lifetimes must be greater than 0".into(),
            ));
        }

        // The short-lived token must actually be the short-lived one
        if config.tokens.access_lifetime_secs >= config.tokens.refresh_lifetime_secs {
            return Err(common::Error::Config(format!(
                "access_lifetime_secs ({}) must be less than refresh_lifetime_secs ({})",
                config.tokens.access_lifetime_secs, config.tokens.refresh_lifetime_secs
            )));
        }

        config.tokens.access_secret = resolve_secret(
            "ACCESS_TOKEN_SECRET",
            config.tokens.access_secret_file.as_deref(),
        )?;
        config.tokens.refresh_secret = resolve_secret(
            "REFRESH_TOKEN_SECRET",
            config.tokens.refresh_secret_file.as_deref(),
        )?;

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("session-token-service.toml")
    }
}

/// Env var takes precedence over the secret file.
fn resolve_secret(
    env_var: &str,
    secret_file: Option<&Path>,
) -> common::Result<Option<Secret<String>>> {
    if let Ok(value) = std::env::var(env_var) {
        return Ok(Some(Secret::new(value)));
    }
    if let Some(file) = secret_file {
        let value = std::fs::read_to_string(file).map_err(|e| {
            common::Error::Config(format!("failed to read {}: {e}", file.display()))
        })?;
        let value = value.trim().to_owned();
        if !value.is_empty() {
            return Ok(Some(Secret::new(value)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn valid_toml() -> &'static str {
        r#"
[server]
listen_addr = "127.0.0.1:8080"

[tokens]
access_lifetime_secs = 900
refresh_lifetime_secs = 604800
"#
    }

    fn write_config(dir_name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(dir_name);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_valid_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("ACCESS_TOKEN_SECRET") };
        unsafe { remove_env("REFRESH_TOKEN_SECRET") };

        let path = write_config("token-service-test-valid", valid_toml());
        let config = Config::load(&path).unwrap();

        assert_eq!(config.server.listen_addr.port(), 8080);
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.tokens.access_lifetime_secs, 900);
        assert_eq!(config.tokens.refresh_lifetime_secs, 604_800);
        assert!(config.tokens.access_secret.is_none());
        assert!(config.tokens.refresh_secret.is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let path = write_config("token-service-test-invalid", "not valid {{{{ toml");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_secrets_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let path = write_config("token-service-test-env", valid_toml());

        unsafe { set_env("ACCESS_TOKEN_SECRET", "access-env-secret") };
        unsafe { set_env("REFRESH_TOKEN_SECRET", "refresh-env-secret") };
        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.tokens.access_secret.as_ref().unwrap().expose(),
            "access-env-secret"
        );
        assert_eq!(
            config.tokens.refresh_secret.as_ref().unwrap().expose(),
            "refresh-env-secret"
        );
        unsafe { remove_env("ACCESS_TOKEN_SECRET") };
        unsafe { remove_env("REFRESH_TOKEN_SECRET") };
    }

    #[test]
    fn test_secret_from_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = std::env::temp_dir().join("token-service-test-secretfile");
        std::fs::create_dir_all(&dir).unwrap();
        let secret_path = dir.join("access_secret");
        std::fs::write(&secret_path, "file-secret\n").unwrap();

        let toml_content = format!(
            r#"
[server]
listen_addr = "127.0.0.1:8080"

[tokens]
access_secret_file = "{}"
"#,
            secret_path.display()
        );
        let config_path = dir.join("config.toml");
        std::fs::write(&config_path, &toml_content).unwrap();

        unsafe { remove_env("ACCESS_TOKEN_SECRET") };
        unsafe { remove_env("REFRESH_TOKEN_SECRET") };
        let config = Config::load(&config_path).unwrap();
        assert_eq!(
            config.tokens.access_secret.as_ref().unwrap().expose(),
            "file-secret"
        );
    }

    #[test]
    fn test_env_overrides_secret_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = std::env::temp_dir().join("token-service-test-env-override");
        std::fs::create_dir_all(&dir).unwrap();
        let secret_path = dir.join("access_secret");
        std::fs::write(&secret_path, "file-secret").unwrap();

        let toml_content = format!(
            r#"
[server]
listen_addr = "127.0.0.1:8080"

[tokens]
access_secret_file = "{}"
"#,
            secret_path.display()
        );
        let config_path = dir.join("config.toml");
        std::fs::write(&config_path, &toml_content).unwrap();

        unsafe { set_env("ACCESS_TOKEN_SECRET", "env-wins") };
        let config = Config::load(&config_path).unwrap();
        assert_eq!(
            config.tokens.access_secret.as_ref().unwrap().expose(),
            "env-wins"
        );
        unsafe { remove_env("ACCESS_TOKEN_SECRET") };
    }

    #[test]
    fn test_access_lifetime_must_be_shorter() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let toml_content = r#"
[server]
listen_addr = "127.0.0.1:8080"

[tokens]
access_lifetime_secs = 604800
refresh_lifetime_secs = 900
"#;
        let path = write_config("token-service-test-lifetimes", toml_content);
        let result = Config::load(&path);
        assert!(result.is_err(), "inverted lifetimes must be rejected");
        let err = format!("{}", result.unwrap_err());
        assert!(
            err.contains("must be less than"),
            "error message should explain the issue, got: {err}"
        );
    }

    #[test]
    fn test_zero_lifetime_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let toml_content = r#"
[server]
listen_addr = "127.0.0.1:8080"

[tokens]
access_lifetime_secs = 0
"#;
        let path = write_config("token-service-test-zero-lifetime", toml_content);
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_zero_max_connections_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let toml_content = r#"
[server]
listen_addr = "127.0.0.1:8080"
max_connections = 0

[tokens]
"#;
        let path = write_config("token-service-test-zero-maxconn", toml_content);
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/should-lose.toml") };
        let path = Config::resolve_path(Some("/cli/wins.toml"));
        assert_eq!(
            path,
            PathBuf::from("/cli/wins.toml"),
            "CLI arg must take precedence over CONFIG_PATH env var"
        );
        unsafe { remove_env("CONFIG_PATH") };
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("session-token-service.toml"));
    }
}
