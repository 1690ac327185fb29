//! Configuration management for veil.
//!
//! Loads settings from a TOML file or falls back to defaults. Every field has a
//! serde default, so a partial file only overrides what it names.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// System-wide config file path
pub const CONFIG_PATH: &str = "/etc/veil/config.toml";

/// Environment variable that points at an alternative config file
pub const CONFIG_ENV: &str = "VEIL_CONFIG";

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Ollama backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Executable spawned as `<binary> serve` when the backend is down
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Probe (and spawn if needed) before serving requests
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Number of readiness probes after a spawn
    #[serde(default = "default_startup_attempts")]
    pub startup_attempts: u32,

    #[serde(default = "default_startup_interval")]
    pub startup_interval_secs: u64,

    /// Hard limit on a single generate call. Bounds abandoned workers too.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "gemma2:2b".to_string()
}

fn default_binary() -> String {
    "ollama".to_string()
}

fn default_auto_start() -> bool {
    true
}

fn default_probe_timeout() -> u64 {
    2
}

fn default_startup_attempts() -> u32 {
    20
}

fn default_startup_interval() -> u64 {
    1
}

fn default_request_timeout() -> u64 {
    300
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            binary: default_binary(),
            auto_start: default_auto_start(),
            probe_timeout_secs: default_probe_timeout(),
            startup_attempts: default_startup_attempts(),
            startup_interval_secs: default_startup_interval(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl OllamaConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn startup_interval(&self) -> Duration {
        Duration::from_secs(self.startup_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reachability probe URL (model listing)
    pub fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url.trim_end_matches('/'))
    }

    pub fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

/// Sanitize pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizeConfig {
    /// How long a request waits for the completion before answering 408
    #[serde(default = "default_sanitize_timeout")]
    pub timeout_secs: u64,
}

fn default_sanitize_timeout() -> u64 {
    60
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_sanitize_timeout(),
        }
    }
}

impl SanitizeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Full veil configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub sanitize: SanitizeConfig,
}

impl Config {
    /// Load config from an explicit path, `$VEIL_CONFIG`, or the system path.
    ///
    /// A missing or broken file is not fatal: defaults are used instead.
    pub fn load(explicit: Option<&Path>) -> Self {
        let candidate = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(Into::into))
            .unwrap_or_else(|| CONFIG_PATH.into());

        Self::load_from_path(&candidate).unwrap_or_else(|e| {
            warn!("Config not loaded, using defaults: {:#}", e);
            Config::default()
        })
    }

    /// Load config from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.ollama.model, "gemma2:2b");
        assert_eq!(config.ollama.startup_attempts, 20);
        assert_eq!(config.ollama.probe_timeout(), Duration::from_secs(2));
        assert!(config.ollama.auto_start);
        assert_eq!(config.sanitize.timeout_secs, 60);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[ollama]\nmodel = \"mistral:7b-instruct\"\n\n[sanitize]\ntimeout_secs = 5"
        )
        .unwrap();

        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.ollama.model, "mistral:7b-instruct");
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.sanitize.timeout_secs, 5);
        assert_eq!(config.server.port, 5001);
    }

    #[test]
    fn test_broken_file_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();

        assert!(Config::load_from_path(file.path()).is_err());
        let config = Config::load(Some(file.path()));
        assert_eq!(config.server.port, 5001);
    }

    #[test]
    fn test_urls_tolerate_trailing_slash() {
        let ollama = OllamaConfig {
            base_url: "http://127.0.0.1:11434/".to_string(),
            ..OllamaConfig::default()
        };
        assert_eq!(ollama.tags_url(), "http://127.0.0.1:11434/api/tags");
        assert_eq!(ollama.generate_url(), "http://127.0.0.1:11434/api/generate");
    }
}
