//! Run configuration loading, validation, and management for ContReAct.
//!
//! A run is described by one TOML file. Environment variables override the
//! backend host and model; the Telegram bot token is only ever read from the
//! environment. Everything is validated before the first cycle runs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the Telegram bot token.
pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
/// Environment variable overriding `backend.host`.
pub const HOST_ENV: &str = "CONTREACT_OLLAMA_HOST";
/// Environment variable overriding `model_name`.
pub const MODEL_ENV: &str = "CONTREACT_MODEL";

/// The root configuration of one experimental run.
#[derive(Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Identifier of the run; scopes memory and names the event log
    pub run_id: String,

    /// Model to drive the agent with
    pub model_name: String,

    /// Number of cycles to execute
    pub cycle_count: u32,

    #[serde(default)]
    pub backend: BackendConfig,

    /// Generation options passed to the backend verbatim
    #[serde(default)]
    pub model_options: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub diversity: DiversityConfig,

    #[serde(default)]
    pub operator: OperatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "http://localhost:11434".into()
}
fn default_request_timeout() -> u64 {
    300
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Which memory store backs the agent's notebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBackendKind {
    #[default]
    File,
    InMemory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub backend: MemoryBackendKind,

    /// JSON-lines file used by the `file` backend
    #[serde(default = "default_memory_path")]
    pub path: PathBuf,
}

fn default_memory_path() -> PathBuf {
    PathBuf::from("data/memory.jsonl")
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: MemoryBackendKind::default(),
            path: default_memory_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory receiving `<run_id>.jsonl`
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiversityConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Embedding model served by the backend
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_true() -> bool {
    true
}
fn default_embedding_model() -> String {
    "all-minilm".into()
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            embedding_model: default_embedding_model(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Telegram user ids allowed to answer
    #[serde(default)]
    pub authorized_users: Vec<i64>,

    /// Minutes to wait for a reply; zero or negative waits forever
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: i64,

    /// Long-poll timeout passed to `getUpdates`
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Filled from the environment, never from the file
    #[serde(skip)]
    pub bot_token: Option<String>,
}

fn default_timeout_minutes() -> i64 {
    5
}
fn default_poll_timeout() -> u64 {
    30
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            authorized_users: Vec::new(),
            timeout_minutes: default_timeout_minutes(),
            poll_timeout_secs: default_poll_timeout(),
            bot_token: None,
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("enabled", &self.enabled)
            .field("authorized_users", &self.authorized_users)
            .field("timeout_minutes", &self.timeout_minutes)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("bot_token", &redact(&self.bot_token))
            .finish()
    }
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("run_id", &self.run_id)
            .field("model_name", &self.model_name)
            .field("cycle_count", &self.cycle_count)
            .field("backend", &self.backend)
            .field("model_options", &self.model_options)
            .field("memory", &self.memory)
            .field("logging", &self.logging)
            .field("diversity", &self.diversity)
            .field("operator", &self.operator)
            .finish()
    }
}

impl RunConfig {
    /// Load a run configuration, applying environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Like [`load_from`](Self::load_from) with an explicit environment lookup.
    pub fn load_with_env(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config = Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;
        config.apply_env(env);
        config.validate()?;

        tracing::info!(
            path = %path.display(),
            run_id = %config.run_id,
            model = %config.model_name,
            cycles = config.cycle_count,
            "Loaded run configuration"
        );
        Ok(config)
    }

    /// Parse a configuration without environment overrides or validation.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(host) = env(HOST_ENV).filter(|h| !h.is_empty()) {
            self.backend.host = host;
        }
        if let Some(model) = env(MODEL_ENV).filter(|m| !m.is_empty()) {
            self.model_name = model;
        }
        self.operator.telegram.bot_token = env(TELEGRAM_TOKEN_ENV).filter(|t| !t.is_empty());
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run_id.trim().is_empty() {
            return Err(ConfigError::ValidationError("run_id must not be empty".into()));
        }
        if self.model_name.trim().is_empty() {
            return Err(ConfigError::ValidationError("model_name must not be empty".into()));
        }
        if self.cycle_count == 0 {
            return Err(ConfigError::ValidationError("cycle_count must be greater than 0".into()));
        }
        if self.backend.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "backend.request_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.diversity.enabled && self.diversity.embedding_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "diversity.embedding_model must not be empty when diversity is enabled".into(),
            ));
        }
        let telegram = &self.operator.telegram;
        if telegram.enabled && telegram.authorized_users.is_empty() {
            return Err(ConfigError::ValidationError(
                "operator.telegram.authorized_users must list at least one user when telegram is enabled".into(),
            ));
        }
        Ok(())
    }

    /// Path of this run's event log.
    pub fn event_log_path(&self) -> PathBuf {
        self.logging.log_dir.join(format!("{}.jsonl", self.run_id))
    }

    /// Generate a starter config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        let mut model_options = serde_json::Map::new();
        model_options.insert("temperature".into(), serde_json::json!(0.7));
        model_options.insert("seed".into(), serde_json::json!(42));
        Self {
            run_id: "contreact-run-001".into(),
            model_name: "llama3:latest".into(),
            cycle_count: 10,
            backend: BackendConfig::default(),
            model_options,
            memory: MemoryConfig::default(),
            logging: LoggingConfig::default(),
            diversity: DiversityConfig::default(),
            operator: OperatorConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
run_id = "exp-a"
model_name = "llama3:latest"
cycle_count = 3
"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn default_config_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.operator.telegram.enabled);
        assert_eq!(config.operator.telegram.timeout_minutes, 5);
    }

    #[test]
    fn minimal_file_gets_defaults() {
        let file = write_config(MINIMAL);
        let config = RunConfig::load_with_env(file.path(), no_env).unwrap();
        assert_eq!(config.run_id, "exp-a");
        assert_eq!(config.backend.host, "http://localhost:11434");
        assert_eq!(config.memory.backend, MemoryBackendKind::File);
        assert!(config.diversity.enabled);
        assert!(config.model_options.is_empty());
        assert_eq!(config.event_log_path(), PathBuf::from("logs/exp-a.jsonl"));
    }

    #[test]
    fn model_options_pass_through() {
        let file = write_config(&format!("{MINIMAL}\n[model_options]\ntemperature = 0.4\nseed = 7\nnum_ctx = 8192\n"));
        let config = RunConfig::load_with_env(file.path(), no_env).unwrap();
        assert_eq!(config.model_options["seed"], 7);
        assert_eq!(config.model_options["num_ctx"], 8192);
        assert_eq!(config.model_options["temperature"], 0.4);
    }

    #[test]
    fn zero_cycles_rejected() {
        let config = RunConfig {
            cycle_count: 0,
            ..RunConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn telegram_without_users_rejected() {
        let file = write_config(&format!("{MINIMAL}\n[operator.telegram]\nenabled = true\n"));
        let err = RunConfig::load_with_env(file.path(), no_env).unwrap_err();
        assert!(err.to_string().contains("authorized_users"));
    }

    #[test]
    fn unknown_memory_backend_rejected() {
        let file = write_config(&format!("{MINIMAL}\n[memory]\nbackend = \"redis\"\n"));
        assert!(matches!(
            RunConfig::load_with_env(file.path(), no_env),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let file = write_config(MINIMAL);
        let config = RunConfig::load_with_env(file.path(), |key| match key {
            HOST_ENV => Some("http://gpu-box:11434".into()),
            MODEL_ENV => Some("qwen2.5:7b".into()),
            TELEGRAM_TOKEN_ENV => Some("123:abc".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.backend.host, "http://gpu-box:11434");
        assert_eq!(config.model_name, "qwen2.5:7b");
        assert_eq!(config.operator.telegram.bot_token.as_deref(), Some("123:abc"));
    }

    #[test]
    fn debug_redacts_bot_token() {
        let mut config = RunConfig::default();
        config.operator.telegram.bot_token = Some("123:super-secret".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = RunConfig::load_with_env(Path::new("/nonexistent/run.toml"), no_env);
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn default_toml_roundtrips() {
        let toml_str = RunConfig::default_toml();
        assert!(toml_str.contains("llama3:latest"));
        let parsed = RunConfig::from_toml_str(&toml_str).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.cycle_count, 10);
        assert!(!toml_str.contains("bot_token"));
    }
}
