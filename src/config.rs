//! Client configuration: JSON file on disk, environment overrides, built-in defaults.

use std::{env, fs, io::ErrorKind, path::PathBuf, str::FromStr, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::connection::DEFAULT_RETRY_DELAY;

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/client.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "ESCAPE_CLIENT_CONFIG_PATH";

const SERVER_URL_ENV: &str = "ESCAPE_SERVER_URL";
const SOCKET_PATH_ENV: &str = "ESCAPE_SOCKET_PATH";
const ROOM_ENV: &str = "ESCAPE_ROOM";
const PLAYER_NAME_ENV: &str = "ESCAPE_PLAYER_NAME";
const RETRY_DELAY_ENV: &str = "ESCAPE_RETRY_DELAY_MS";
const RESET_STRATEGY_ENV: &str = "ESCAPE_RESET_STRATEGY";

const DEFAULT_SERVER_URL: &str = "http://localhost:5050";
const DEFAULT_SOCKET_PATH: &str = "/socket.io";

/// How a finished room is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetStrategy {
    /// HTTP reload of the room page with the `reset=1` marker.
    Reload,
    /// `replay` event over the push transport.
    Transport,
}

impl Default for ResetStrategy {
    fn default() -> Self {
        if cfg!(feature = "http-reset") {
            ResetStrategy::Reload
        } else {
            ResetStrategy::Transport
        }
    }
}

impl FromStr for ResetStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reload" => Ok(ResetStrategy::Reload),
            "transport" | "replay" => Ok(ResetStrategy::Transport),
            other => Err(format!("unknown reset strategy `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration of the client.
pub struct ClientConfig {
    /// Base HTTP(S) URL of the game server.
    pub server_url: String,
    /// Mount path of the Socket.IO endpoint.
    pub socket_path: String,
    /// Room to join, if known before the command line is read.
    pub room: Option<String>,
    /// Display name suggested for `/auth` when none is typed.
    pub player_name: Option<String>,
    /// Fixed reconnect backoff.
    pub retry_delay: Duration,
    /// Reset path used by the replay control.
    pub reset_strategy: ResetStrategy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
            room: None,
            player_name: None,
            retry_delay: DEFAULT_RETRY_DELAY,
            reset_strategy: ResetStrategy::default(),
        }
    }
}

impl ClientConfig {
    /// Load the configuration from disk, falling back to defaults, then apply env overrides.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded client config");
                    raw.into()
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };
        config.with_env_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup`; blank values are ignored.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = get(SERVER_URL_ENV) {
            self.server_url = url;
        }
        if let Some(path) = get(SOCKET_PATH_ENV) {
            self.socket_path = path;
        }
        if let Some(room) = get(ROOM_ENV) {
            self.room = Some(room);
        }
        if let Some(name) = get(PLAYER_NAME_ENV) {
            self.player_name = Some(name);
        }
        if let Some(raw) = get(RETRY_DELAY_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.retry_delay = Duration::from_millis(ms),
                Err(err) => warn!(value = %raw, error = %err, "ignoring invalid retry delay"),
            }
        }
        if let Some(raw) = get(RESET_STRATEGY_ENV) {
            match raw.parse::<ResetStrategy>() {
                Ok(strategy) => self.reset_strategy = strategy,
                Err(err) => warn!(value = %raw, error = %err, "ignoring invalid reset strategy"),
            }
        }
        self.normalized()
    }

    /// Engine.IO WebSocket endpoint derived from [`Self::server_url`] and [`Self::socket_path`].
    pub fn socket_url(&self) -> String {
        let base = self.server_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        let path = self.socket_path.trim_matches('/');
        format!("{base}/{path}/?EIO=4&transport=websocket")
    }

    /// Room page URL carrying the reset marker.
    pub fn reset_url(&self, room: &str) -> String {
        format!(
            "{}/room/{}?reset=1",
            self.server_url.trim_end_matches('/'),
            room
        )
    }

    fn normalized(mut self) -> Self {
        if !cfg!(feature = "http-reset") && self.reset_strategy == ResetStrategy::Reload {
            warn!("reload reset needs the `http-reset` feature; using the replay event instead");
            self.reset_strategy = ResetStrategy::Transport;
        }
        self
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    server_url: Option<String>,
    socket_path: Option<String>,
    room: Option<String>,
    player_name: Option<String>,
    retry_delay_ms: Option<u64>,
    reset_strategy: Option<ResetStrategy>,
}

impl From<RawConfig> for ClientConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = ClientConfig::default();
        Self {
            server_url: value.server_url.unwrap_or(defaults.server_url),
            socket_path: value.socket_path.unwrap_or(defaults.socket_path),
            room: value.room,
            player_name: value.player_name,
            retry_delay: value
                .retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
            reset_strategy: value.reset_strategy.unwrap_or(defaults.reset_strategy),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn socket_url_switches_scheme_and_appends_engine_query() {
        let config = ClientConfig {
            server_url: "https://escape.example.org/".into(),
            ..ClientConfig::default()
        };
        assert_eq!(
            config.socket_url(),
            "wss://escape.example.org/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            ClientConfig::default().socket_url(),
            "ws://localhost:5050/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn reset_url_targets_the_room_page() {
        assert_eq!(
            ClientConfig::default().reset_url("A1"),
            "http://localhost:5050/room/A1?reset=1"
        );
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let vars = HashMap::from([
            (SERVER_URL_ENV, "http://10.0.0.2:5050"),
            (ROOM_ENV, "B2"),
            (RETRY_DELAY_ENV, "250"),
            (RESET_STRATEGY_ENV, "transport"),
            (PLAYER_NAME_ENV, "  "),
        ]);
        let config = ClientConfig::default()
            .with_env_overrides(|key| vars.get(key).map(|value| value.to_string()));

        assert_eq!(config.server_url, "http://10.0.0.2:5050");
        assert_eq!(config.room.as_deref(), Some("B2"));
        assert_eq!(config.retry_delay, Duration::from_millis(250));
        assert_eq!(config.reset_strategy, ResetStrategy::Transport);
        assert!(config.player_name.is_none());
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let vars = HashMap::from([(RETRY_DELAY_ENV, "soon"), (RESET_STRATEGY_ENV, "reboot")]);
        let config = ClientConfig::default()
            .with_env_overrides(|key| vars.get(key).map(|value| value.to_string()));
        assert_eq!(config.retry_delay, DEFAULT_RETRY_DELAY);
        assert_eq!(config.reset_strategy, ResetStrategy::default());
    }

    #[test]
    fn raw_config_fills_missing_fields_with_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"room": "C3", "reset_strategy": "transport"}"#).unwrap();
        let config = ClientConfig::from(raw);
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.room.as_deref(), Some("C3"));
        assert_eq!(config.reset_strategy, ResetStrategy::Transport);
    }
}
