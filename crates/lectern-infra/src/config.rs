//! Configuration loader for Lectern.
//!
//! Reads `config.toml` from the data directory (`~/.lectern/` unless
//! `LECTERN_DATA_DIR` says otherwise) or from an explicit path, and
//! deserializes it into [`AppConfig`]. A missing or malformed file falls
//! back to defaults.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use lectern_types::config::AppConfig;

pub const DATA_DIR_ENV: &str = "LECTERN_DATA_DIR";
pub const MODEL_API_KEY_ENV: &str = "LECTERN_MODEL_API_KEY";
pub const SEARCH_API_KEY_ENV: &str = "LECTERN_SEARCH_API_KEY";

/// Resolve the data directory: `LECTERN_DATA_DIR`, else `~/.lectern`.
pub fn resolve_data_dir() -> PathBuf {
    data_dir_from(std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
}

fn data_dir_from(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".lectern")
        })
}

/// Load configuration from `path`, or `{data_dir}/config.toml` when `None`.
pub async fn load_config(path: Option<&Path>, data_dir: &Path) -> AppConfig {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.join("config.toml"));

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %config_path.display(), "no config file found, using defaults");
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!(path = %config_path.display(), error = %err, "failed to read config, using defaults");
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => {
            tracing::debug!(path = %config_path.display(), "loaded config");
            config
        }
        Err(err) => {
            tracing::warn!(path = %config_path.display(), error = %err, "failed to parse config, using defaults");
            AppConfig::default()
        }
    }
}

/// Environment variable first, then the value from the config file.
/// Blank values count as absent.
pub fn resolve_api_key(env_var: &str, from_file: Option<&str>) -> Option<SecretString> {
    let from_env = std::env::var(env_var).ok();
    pick_key(from_env.as_deref(), from_file)
}

fn pick_key(from_env: Option<&str>, from_file: Option<&str>) -> Option<SecretString> {
    [from_env, from_file]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|k| !k.is_empty())
        .map(|k| SecretString::from(k.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_types::config::HistoryBackend;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(None, tmp.path()).await;
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.history.max_turns, 20);
    }

    #[tokio::test]
    async fn test_valid_file_in_data_dir() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[server]
port = 9100

[history]
backend = "memory"
ttl_secs = 600
"#,
        )
        .await
        .unwrap();

        let config = load_config(None, tmp.path()).await;
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.history.backend, HistoryBackend::Memory);
        assert_eq!(config.history.ttl_secs, 600);
    }

    #[tokio::test]
    async fn test_explicit_path_wins() {
        let tmp = TempDir::new().unwrap();
        let custom = tmp.path().join("custom.toml");
        tokio::fs::write(&custom, "[model]\nmodel = \"deepseek-chat\"\n")
            .await
            .unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "[model]\nmodel = \"ignored\"\n")
            .await
            .unwrap();

        let config = load_config(Some(&custom), tmp.path()).await;
        assert_eq!(config.model.default_model(), "deepseek-chat");
    }

    #[tokio::test]
    async fn test_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();
        let config = load_config(None, tmp.path()).await;
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_key_precedence() {
        let key = pick_key(Some("env-key"), Some("file-key")).unwrap();
        assert_eq!(key.expose_secret(), "env-key");
        let key = pick_key(Some("  "), Some("file-key")).unwrap();
        assert_eq!(key.expose_secret(), "file-key");
        assert!(pick_key(None, Some("")).is_none());
        assert!(pick_key(None, None).is_none());
    }

    #[test]
    fn test_data_dir_resolution() {
        assert_eq!(
            data_dir_from(Some(PathBuf::from("/srv/lectern"))),
            PathBuf::from("/srv/lectern")
        );
        assert!(data_dir_from(None).ends_with(".lectern"));
        assert!(data_dir_from(Some(PathBuf::new())).ends_with(".lectern"));
    }
}
