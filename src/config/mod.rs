// src/config/mod.rs
mod models;

pub use models::*;

use std::path::Path;

/// Load configuration from a file (YAML or JSON)
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let parse_error = |reason: String| ConfigError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let settings: Settings = match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&contents).map_err(|e| parse_error(e.to_string()))?
        }
        _ => serde_json::from_str(&contents).map_err(|e| parse_error(e.to_string()))?,
    };

    settings.validate()?;
    Ok(settings)
}

/// Layer `PONG_*` environment variables over `base`.
///
/// Nested keys use a double underscore, e.g. `PONG_SERVER__PORT=9000` or
/// `PONG_SERVER__METRICS__ENABLED=false`.
pub fn apply_env_overrides(base: Settings) -> Result<Settings, ConfigError> {
    let layered = ::config::Config::builder()
        .add_source(::config::Config::try_from(&base)?)
        .add_source(
            ::config::Environment::with_prefix("PONG")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(layered.try_deserialize()?)
}

/// Defaults, then the optional file, then the environment.
pub async fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let base = match path {
        Some(path) => load_config(path).await?,
        None => Settings::default(),
    };

    let settings = apply_env_overrides(base)?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    // The process environment is shared by every test in this module.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}", uuid::Uuid::new_v4(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.controller.instances, 2);
        assert_eq!(settings.controller.interval_ms, 1000);
    }

    #[tokio::test]
    async fn test_load_yaml_config() {
        let path = temp_file(
            "pong.yaml",
            "server:\n  port: 9100\n  metrics:\n    enabled: false\ncontroller:\n  instances: 3\n",
        );

        let settings = load_config(&path).await.unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.server.port, 9100);
        assert!(!settings.server.metrics.enabled);
        assert_eq!(settings.server.metrics.path, "/metrics");
        assert_eq!(settings.controller.instances, 3);
        assert_eq!(settings.controller.interval_ms, 1000);
    }

    #[tokio::test]
    async fn test_load_json_config() {
        let path = temp_file("pong.json", r#"{"controller": {"interval_ms": 250}}"#);

        let settings = load_config(&path).await.unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.controller.interval_ms, 250);
        assert_eq!(settings.server.host, "127.0.0.1");
    }

    #[tokio::test]
    async fn test_load_config_rejects_single_instance() {
        let path = temp_file("pong.yaml", "controller:\n  instances: 1\n");

        let result = load_config(&path).await;
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_load_config_missing_file() {
        let result = load_config("/nonexistent/pong.yaml").await;
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_env_layer_keeps_base_values() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut base = Settings::default();
        base.server.port = 9200;
        base.controller.server_binary = Some(PathBuf::from("/opt/pong/pong-server"));

        let layered = apply_env_overrides(base).unwrap();

        assert_eq!(layered.server.port, 9200);
        assert_eq!(
            layered.controller.server_binary,
            Some(PathBuf::from("/opt/pong/pong-server"))
        );
    }

    #[test]
    fn test_env_overrides_win_over_base() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut base = Settings::default();
        base.server.port = 9200;
        base.server.host = "0.0.0.0".to_string();

        std::env::set_var("PONG_SERVER__PORT", "9311");
        std::env::set_var("PONG_CONTROLLER__STATE_FILE", "/tmp/pong-session-override.json");
        std::env::set_var("PONG_SERVER__METRICS__ENABLED", "false");
        let layered = apply_env_overrides(base);
        std::env::remove_var("PONG_SERVER__PORT");
        std::env::remove_var("PONG_CONTROLLER__STATE_FILE");
        std::env::remove_var("PONG_SERVER__METRICS__ENABLED");

        let layered = layered.unwrap();
        assert_eq!(layered.server.port, 9311);
        assert_eq!(
            layered.controller.state_file,
            PathBuf::from("/tmp/pong-session-override.json")
        );
        assert!(!layered.server.metrics.enabled);
        assert_eq!(layered.server.host, "0.0.0.0");
        assert_eq!(layered.controller.instances, 2);
    }
}
