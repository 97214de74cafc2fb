use serde::Deserialize;

use std::{env, fs, path::Path, path::PathBuf, time::Duration};

use crate::error::StartupError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub notes: NotesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub max_body_bytes: usize,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub expose_openapi: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
            max_body_bytes: 1024 * 1024,
            request_timeout: Duration::from_secs(30),
            expose_openapi: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./notes.db"),
            max_connections: 8,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    pub missing_row_policy: MissingRowPolicy,
}

/// What update and delete report when no row matches the id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingRowPolicy {
    /// Succeed anyway; the statement simply affected zero rows.
    #[default]
    Ignore,
    /// Answer 404 Not Found.
    NotFound,
}

impl Config {
    pub fn from_yaml(contents: &str) -> Result<Self, StartupError> {
        serde_yaml::from_str(contents).map_err(|e| StartupError::Config(e.to_string()))
    }

    /// Applies `NOTE_SERVICE_*` overrides. `lookup` abstracts the environment
    /// so overrides can be exercised without touching process state.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), StartupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("NOTE_SERVICE_ADDR") {
            self.server.addr = addr;
        }

        if let Some(path) = lookup("NOTE_SERVICE_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }

        if let Some(limit) = lookup("NOTE_SERVICE_MAX_BODY_BYTES") {
            self.server.max_body_bytes = limit.parse::<usize>().map_err(|e| {
                StartupError::Config(format!("failed to parse NOTE_SERVICE_MAX_BODY_BYTES: {e}"))
            })?;
        }

        if let Some(strict) = lookup("NOTE_SERVICE_STRICT_MISSING") {
            self.notes.missing_row_policy = match strict.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => MissingRowPolicy::NotFound,
                "0" | "false" | "no" => MissingRowPolicy::Ignore,
                other => {
                    return Err(StartupError::Config(format!(
                        "invalid NOTE_SERVICE_STRICT_MISSING value '{other}'"
                    )));
                }
            };
        }

        Ok(())
    }
}

pub fn load_config() -> Result<Config, StartupError> {
    // Retrieve env variable
    let config_path =
        env::var("NOTE_SERVICE_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

    let mut config = if Path::new(&config_path).exists() {
        let contents = fs::read_to_string(&config_path)
            .map_err(|e| StartupError::Config(format!("{config_path}: {e}")))?;
        tracing::info!("Loaded configuration from '{}'", config_path);
        Config::from_yaml(&contents)?
    } else {
        tracing::info!(
            "Config file '{}' not found, using defaults and environment variables",
            config_path
        );
        Config::default()
    };

    config.apply_env_overrides(|key| env::var(key).ok())?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    #[test]
    fn defaults_listen_on_8080_with_local_db() {
        let config = Config::default();
        assert_eq!(config.server.addr, "0.0.0.0:8080");
        assert_eq!(config.server.max_body_bytes, 1_048_576);
        assert_eq!(config.database.path, PathBuf::from("./notes.db"));
        assert_eq!(config.notes.missing_row_policy, MissingRowPolicy::Ignore);
        assert!(!config.server.expose_openapi);
    }

    #[test]
    fn partial_yaml_keeps_remaining_defaults() {
        let config = Config::from_yaml(
            "server:\n  addr: 127.0.0.1:9000\n  request_timeout: 5s\nnotes:\n  missing_row_policy: not_found\n",
        )
        .unwrap();

        assert_eq!(config.server.addr, "127.0.0.1:9000");
        assert_eq!(config.server.request_timeout, Duration::from_secs(5));
        assert_eq!(config.server.max_body_bytes, 1_048_576);
        assert_eq!(config.database.busy_timeout, Duration::from_secs(5));
        assert_eq!(config.notes.missing_row_policy, MissingRowPolicy::NotFound);
    }

    #[test]
    fn invalid_yaml_is_a_config_error() {
        let err = Config::from_yaml("server: [not, a, map]").unwrap_err();
        assert!(matches!(err, StartupError::Config(_)));
    }

    #[test]
    fn env_overrides_replace_fields() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("NOTE_SERVICE_ADDR", "127.0.0.1:3000"),
            ("NOTE_SERVICE_DB_PATH", "/tmp/other.db"),
            ("NOTE_SERVICE_MAX_BODY_BYTES", "2048"),
            ("NOTE_SERVICE_STRICT_MISSING", "true"),
        ]);

        let mut config = Config::default();
        config
            .apply_env_overrides(|key| vars.get(key).map(|v| (*v).to_string()))
            .unwrap();

        assert_eq!(config.server.addr, "127.0.0.1:3000");
        assert_eq!(config.database.path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.server.max_body_bytes, 2048);
        assert_eq!(config.notes.missing_row_policy, MissingRowPolicy::NotFound);
    }

    #[test]
    fn malformed_env_override_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env_overrides(|key| {
                (key == "NOTE_SERVICE_MAX_BODY_BYTES").then(|| "lots".to_string())
            })
            .unwrap_err();
        assert!(matches!(err, StartupError::Config(_)));
    }
}
