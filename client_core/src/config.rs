//! Client configuration.
//!
//! Defaults are compiled in; a JSON file named by `CAMPUS_CLIENT_CONFIG` may
//! override any subset of fields.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::toasts::ToastSettings;

pub const CONFIG_ENV_VAR: &str = "CAMPUS_CLIENT_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root of the simulation service, e.g. `http://127.0.0.1:3000`.
    pub base_url: String,
    pub ws_path: String,
    pub reconnect_delay_ms: u64,
    pub request_timeout_ms: u64,
    pub event_log_limit: usize,
    pub toast_limit: usize,
    pub toast_enter_ms: u64,
    pub toast_lifetime_ms: u64,
    pub toast_exit_ms: u64,
    /// Role the operator speaks as in agent chat.
    pub chat_role: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            ws_path: "/ws/simulation".to_string(),
            reconnect_delay_ms: 2_000,
            request_timeout_ms: 10_000,
            event_log_limit: 100,
            toast_limit: 5,
            toast_enter_ms: 16,
            toast_lifetime_ms: 6_000,
            toast_exit_ms: 300,
            chat_role: "teacher".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read client config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse client config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid client config: {0}")]
    Invalid(String),
}

impl ClientConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ClientConfig::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url must be http(s), got {}",
                self.base_url
            )));
        }
        if self.event_log_limit == 0 {
            return Err(ConfigError::Invalid("event_log_limit must be > 0".into()));
        }
        if self.toast_limit == 0 {
            return Err(ConfigError::Invalid("toast_limit must be > 0".into()));
        }
        Ok(())
    }

    pub fn api_base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// WebSocket URL of the push channel, derived from `base_url`.
    pub fn channel_url(&self) -> String {
        let base = self.api_base();
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        if self.ws_path.starts_with('/') {
            format!("{ws_base}{}", self.ws_path)
        } else {
            format!("{ws_base}/{}", self.ws_path)
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn toast_settings(&self) -> ToastSettings {
        ToastSettings {
            limit: self.toast_limit,
            enter_delay: Duration::from_millis(self.toast_enter_ms),
            lifetime: Duration::from_millis(self.toast_lifetime_ms),
            exit_duration: Duration::from_millis(self.toast_exit_ms),
        }
    }
}

/// Load the config named by [`CONFIG_ENV_VAR`], or the defaults when unset.
pub fn load_client_config() -> Result<ClientConfig, ConfigError> {
    match env::var(CONFIG_ENV_VAR) {
        Ok(path) if !path.trim().is_empty() => {
            let path = PathBuf::from(path);
            let config = ClientConfig::from_file(&path)?;
            tracing::info!(
                target: "campus::config",
                path = %path.display(),
                "client_config.loaded=file"
            );
            Ok(config)
        }
        _ => {
            tracing::info!(target: "campus::config", "client_config.loaded=builtin");
            Ok(ClientConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ClientConfig::default();
        config.validate().unwrap();
        assert_eq!(config.reconnect_delay(), Duration::from_secs(2));
        assert_eq!(config.event_log_limit, 100);
        assert_eq!(config.toast_settings().limit, 5);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            ClientConfig::from_json_str(r#"{"base_url": "https://campus.test/"}"#).unwrap();
        assert_eq!(config.api_base(), "https://campus.test");
        assert_eq!(config.channel_url(), "wss://campus.test/ws/simulation");
        assert_eq!(config.toast_lifetime_ms, 6_000);
    }

    #[test]
    fn channel_url_follows_scheme() {
        let config = ClientConfig::default();
        assert_eq!(config.channel_url(), "ws://127.0.0.1:3000/ws/simulation");
    }

    #[test]
    fn rejects_unusable_values() {
        assert!(matches!(
            ClientConfig::from_json_str(r#"{"base_url": "ftp://x"}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ClientConfig::from_json_str(r#"{"toast_limit": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ClientConfig::from_json_str("{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ClientConfig::from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
