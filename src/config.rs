//! Application configuration, loaded from a TOML file (§6).
//!
//! Every field has a spec-mandated default so the service can start with no
//! config file at all; `AppConfig::load` only overrides what the file sets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_ws_port() -> u16 {
    9000
}
fn default_api_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_store_url() -> String {
    "sqlite://csms.db?mode=rwc".to_string()
}
fn default_mqtt_broker_url() -> String {
    "mqtt://127.0.0.1:1883".to_string()
}
fn default_mqtt_qos() -> u8 {
    1
}
fn default_mqtt_offline_timeout_seconds() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub ws_port: u16,
    pub api_port: u16,
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            ws_port: default_ws_port(),
            api_port: default_api_port(),
            shutdown_timeout_seconds: 10,
        }
    }
}

impl ServerConfig {
    pub fn ws_listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.ws_port)
    }

    pub fn api_listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.api_port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { url: default_store_url() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub broker_url: String,
    pub qos: u8,
    /// Gap in traffic after which a charger is treated as disconnected (§5's "synthesized
    /// disconnect"), separate from the session-level heartbeat watchdog.
    pub offline_timeout_seconds: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_url: default_mqtt_broker_url(),
            qos: default_mqtt_qos(),
            offline_timeout_seconds: default_mqtt_offline_timeout_seconds(),
        }
    }
}

/// Session/Router timing knobs, all enumerated in §5.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub heartbeat_interval_seconds: u64,
    pub offline_timeout_seconds: u64,
    pub call_timeout_seconds: u64,
    pub dedup_window_seconds: u64,
    pub session_stale_timeout_hours: u64,
    pub authorize_cache_ttl_seconds: u64,
    pub outbound_queue_depth: usize,
    pub inbound_buffer_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_seconds: 60,
            offline_timeout_seconds: 90,
            call_timeout_seconds: 30,
            dedup_window_seconds: 120,
            session_stale_timeout_hours: 24,
            authorize_cache_ttl_seconds: 300,
            outbound_queue_depth: 64,
            inbound_buffer_depth: 256,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub mqtt: MqttConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.display().to_string(), e.to_string()))?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {0}: {1}")]
    Read(String, String),
    #[error("could not parse config file: {0}")]
    Parse(String),
}

/// `$XDG_CONFIG_HOME/csms/config.toml`, falling back to `~/.config/csms/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("csms")
        .join("config.toml")
}
