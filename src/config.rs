//! Configuration management for the memory server.
//!
//! Settings are loaded from a TOML file and then overridden by command-line
//! arguments. Every field has a default, so a missing or partial file is
//! still a valid configuration.

use crate::state::GameMode;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub game: GameSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Network and static asset settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address to bind to (e.g. "127.0.0.1:8080")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Directory served under `/static/`
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// `max-age` for static assets in seconds
    #[serde(default = "default_static_max_age")]
    pub static_max_age_secs: u64,
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_static_max_age() -> u64 {
    60
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            static_dir: default_static_dir(),
            static_max_age_secs: default_static_max_age(),
        }
    }
}

/// Session defaults, limits and reaping thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSettings {
    #[serde(default = "default_pair_count")]
    pub default_pair_count: usize,
    /// Larger requests are clamped
    #[serde(default = "default_max_pair_count")]
    pub max_pair_count: usize,
    #[serde(default)]
    pub default_mode: GameMode,
    /// 0 means unlimited
    #[serde(default)]
    pub default_max_players: usize,
    /// How long a finished game stays around
    #[serde(default = "default_finished_grace")]
    pub finished_grace_secs: u64,
    /// How long a game without players stays around
    #[serde(default = "default_idle")]
    pub idle_secs: u64,
    /// How long clients show a mismatched pair before hiding it
    #[serde(default = "default_mismatch_reveal")]
    pub mismatch_reveal_ms: u64,
    /// Fixed RNG seed; drawn from OS entropy when absent
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_pair_count() -> usize {
    10
}

fn default_max_pair_count() -> usize {
    100
}

fn default_finished_grace() -> u64 {
    300
}

fn default_idle() -> u64 {
    600
}

fn default_mismatch_reveal() -> u64 {
    1000
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            default_pair_count: default_pair_count(),
            max_pair_count: default_max_pair_count(),
            default_mode: GameMode::default(),
            default_max_players: 0,
            finished_grace_secs: default_finished_grace(),
            idle_secs: default_idle(),
            mismatch_reveal_ms: default_mismatch_reveal(),
            rng_seed: None,
        }
    }
}

impl GameSettings {
    pub fn finished_grace(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.finished_grace_secs as i64)
    }

    pub fn idle_threshold(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.idle_secs as i64)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl AppConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from a file. Returns `None` when the file does
    /// not exist; the caller falls back to the defaults.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path).map(Some)
    }

    /// Apply command-line overrides.
    pub fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(bind) = &args.bind {
            self.server.bind_address = bind.clone();
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
        if let Some(seed) = args.seed {
            self.game.rng_seed = Some(seed);
        }
    }
}

/// Command line arguments.
#[derive(Debug, Clone, Parser)]
#[command(name = "memory-server", about = "Multiplayer card-matching game server")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Bind address (e.g. 127.0.0.1:8080)
    #[arg(short, long, value_name = "ADDRESS")]
    pub bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Fixed RNG seed for reproducible decks and ids
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_file_is_defaults() {
        let config = AppConfig::from_toml_str("", Path::new("config.toml")).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.game.default_pair_count, 10);
        assert_eq!(config.game.default_mode, GameMode::Classic);
        assert_eq!(config.game.rng_seed, None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file() {
        let text = r#"
            [game]
            default_pair_count = 6
            default_mode = "rush"
            idle_secs = 30
        "#;
        let config = AppConfig::from_toml_str(text, Path::new("config.toml")).unwrap();
        assert_eq!(config.game.default_pair_count, 6);
        assert_eq!(config.game.default_mode, GameMode::Rush);
        assert_eq!(config.game.idle_threshold(), chrono::Duration::seconds(30));
        assert_eq!(config.game.finished_grace_secs, 300);
    }

    #[test]
    fn test_bad_file_is_error() {
        let result = AppConfig::from_toml_str("[game\n", Path::new("broken.toml"));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file_is_none() {
        let path = std::env::temp_dir().join("memory-session-no-such-dir/config.toml");
        assert!(matches!(AppConfig::load(&path), Ok(None)));
    }

    #[test]
    fn test_load_existing_file() {
        let path = std::env::temp_dir().join(format!("memory-session-{}.toml", std::process::id()));
        std::fs::write(&path, "[server]\nbind_address = \"0.0.0.0:1234\"\n").unwrap();
        let config = AppConfig::load(&path).unwrap().unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:1234");
    }

    #[test]
    fn test_cli_overrides() {
        let args = CliArgs::parse_from([
            "memory-server",
            "--bind",
            "0.0.0.0:9000",
            "--json-logs",
            "--seed",
            "42",
        ]);
        let mut config = AppConfig::default();
        config.apply_cli(&args);
        assert_eq!(config.server.bind_address, "0.0.0.0:9000");
        assert!(config.logging.json_format);
        assert_eq!(config.game.rng_seed, Some(42));
        assert_eq!(config.logging.level, "info");
    }
}
