use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_REPLY_ENDPOINT: &str = "https://api.line.me/v2/bot/message/reply";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config failed: {0}")]
    Read(String),
    #[error("parse config failed: {0}")]
    Parse(String),
    #[error("schema load failed: {0}")]
    SchemaLoad(String),
    #[error("schema validation failed: {0}")]
    SchemaValidation(String),
    #[error("unsupported config: {0}")]
    UnsupportedConfig(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: Server,
    pub store: Store,
    pub line: Line,
    #[serde(default)]
    pub bot: Bot,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub listen_addr: String,
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    #[serde(rename = "type")]
    pub kind: String,
    pub sqlite_path: Option<String>,
}

/// Messaging channel credentials and the reply API target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    #[serde(default)]
    pub channel_secret: String,
    #[serde(default)]
    pub channel_access_token: String,
    #[serde(default = "default_reply_endpoint")]
    pub reply_endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bot {
    /// Offset used to decide "today" for dates and month queries.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

impl Default for Bot {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_callback_path() -> String {
    "/callback".to_string()
}

fn default_reply_endpoint() -> String {
    DEFAULT_REPLY_ENDPOINT.to_string()
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_utc_offset_minutes() -> i32 {
    8 * 60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

pub fn load_and_validate(path: &str) -> Result<Config, ConfigError> {
    load_with_env(path, |key| std::env::var(key).ok())
}

/// Same as [`load_and_validate`], with environment lookups routed through `env`.
pub fn load_with_env<F>(path: &str, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let config_text =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
    let value: serde_yaml::Value =
        serde_yaml::from_str(&config_text).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let instance = serde_json::to_value(value).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_against_schema(&instance)?;

    let mut cfg: Config =
        serde_json::from_value(instance).map_err(|e| ConfigError::Parse(e.to_string()))?;
    apply_env_overrides(&mut cfg, env)?;
    validate_runtime_support(&cfg)?;
    Ok(cfg)
}

fn apply_env_overrides<F>(cfg: &mut Config, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = env("LINE_CHANNEL_SECRET").filter(|v| !v.trim().is_empty()) {
        cfg.line.channel_secret = v;
    }
    if let Some(v) = env("LINE_CHANNEL_ACCESS_TOKEN").filter(|v| !v.trim().is_empty()) {
        cfg.line.channel_access_token = v;
    }
    if let Some(port) = env("PORT").filter(|v| !v.trim().is_empty()) {
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|e| ConfigError::UnsupportedConfig(format!("PORT={port}: {e}")))?;
        let host = cfg
            .server
            .listen_addr
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        cfg.server.listen_addr = format!("{host}:{port}");
    }
    Ok(())
}

fn validate_against_schema(instance: &serde_json::Value) -> Result<(), ConfigError> {
    let schema_path = [
        std::path::PathBuf::from("config/config.schema.json"),
        std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .join("config/config.schema.json"),
    ]
    .into_iter()
    .find(|p| p.exists())
    .ok_or_else(|| {
        ConfigError::SchemaLoad(
            "config schema not found at config/config.schema.json or workspace config path"
                .to_string(),
        )
    })?;

    let schema_text =
        std::fs::read_to_string(schema_path).map_err(|e| ConfigError::SchemaLoad(e.to_string()))?;
    let schema: serde_json::Value =
        serde_json::from_str(&schema_text).map_err(|e| ConfigError::SchemaLoad(e.to_string()))?;

    let validator =
        jsonschema::validator_for(&schema).map_err(|e| ConfigError::SchemaLoad(e.to_string()))?;
    if let Err(first) = validator.validate(instance) {
        return Err(ConfigError::SchemaValidation(first.to_string()));
    }
    Ok(())
}

fn validate_runtime_support(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.store.kind != "memory" && cfg.store.kind != "sqlite" {
        return Err(ConfigError::UnsupportedConfig(format!(
            "store.type={} is not implemented; supported: memory, sqlite",
            cfg.store.kind
        )));
    }
    if cfg.store.kind == "memory" && cfg.store.sqlite_path.is_some() {
        return Err(ConfigError::UnsupportedConfig(
            "store.sqlite_path is not supported when store.type=memory".to_string(),
        ));
    }
    if cfg.store.kind == "sqlite"
        && cfg
            .store
            .sqlite_path
            .as_ref()
            .map(|v| v.trim().is_empty())
            .unwrap_or(true)
    {
        return Err(ConfigError::UnsupportedConfig(
            "store.sqlite_path is required when store.type=sqlite".to_string(),
        ));
    }
    if !cfg.server.callback_path.starts_with('/') {
        return Err(ConfigError::UnsupportedConfig(
            "server.callback_path must start with '/'".to_string(),
        ));
    }
    if cfg.line.channel_secret.trim().is_empty() {
        return Err(ConfigError::UnsupportedConfig(
            "line.channel_secret is required (or set LINE_CHANNEL_SECRET)".to_string(),
        ));
    }
    if cfg.line.channel_access_token.trim().is_empty() {
        return Err(ConfigError::UnsupportedConfig(
            "line.channel_access_token is required (or set LINE_CHANNEL_ACCESS_TOKEN)"
                .to_string(),
        ));
    }
    if cfg.line.timeout_ms == 0 {
        return Err(ConfigError::UnsupportedConfig(
            "line.timeout_ms must be >= 1".to_string(),
        ));
    }
    if cfg.bot.utc_offset_minutes.abs() > 14 * 60 {
        return Err(ConfigError::UnsupportedConfig(format!(
            "bot.utc_offset_minutes={} is outside +/-840",
            cfg.bot.utc_offset_minutes
        )));
    }
    if cfg.logging.format != "text" && cfg.logging.format != "json" {
        return Err(ConfigError::UnsupportedConfig(format!(
            "logging.format={} is not implemented; supported: text, json",
            cfg.logging.format
        )));
    }
    Ok(())
}
