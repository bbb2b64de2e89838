//! Configuration types for siteproxy

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::{ProxyError, ProxyResult};

/// Template written when no configuration file exists yet
const DEFAULT_CONFIG: &str = include_str!("../siteproxy.yaml");

/// Directory under the home directory that holds the default config
const CONFIG_DIR: &str = ".siteproxy";

/// File name of the default config
const CONFIG_FILE: &str = "siteproxy.yaml";

/// Default SSH port of the review server's command interface
pub const DEFAULT_SSH_PORT: u16 = 29418;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Monitored sites keyed by name
    #[serde(default)]
    pub sites: BTreeMap<String, SiteConfig>,
    /// Probe settings
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// HTTP API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ProxyConfig {
    /// Load configuration from a YAML or TOML file, chosen by extension
    pub fn load(path: &Path) -> ProxyResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&content),
            Some("yaml") | Some("yml") | None => Self::from_yaml(&content),
            Some(other) => Err(ProxyError::Config(format!(
                "Unsupported config format: .{}",
                other
            ))),
        }
    }

    /// Load configuration, writing the default template first if the file is missing
    ///
    /// Without an explicit path, `~/.siteproxy/siteproxy.yaml` is used.
    pub fn load_or_init(path: Option<&Path>) -> ProxyResult<Self> {
        let path = match path {
            Some(p) => expand_tilde(p),
            None => default_config_path()?,
        };

        if !path.exists() {
            write_default_config(&path)?;
            info!(path = %path.display(), "Created default configuration");
        }

        Self::load(&path)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> ProxyResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> ProxyResult<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Connection parameters of one site as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Human-readable location label
    #[serde(default)]
    pub location: String,
    /// Importance in (0.0, 1.0]; 0 or missing means 1.0
    #[serde(default)]
    pub weight: Option<f64>,
    /// HTTP endpoint of the site
    #[serde(default)]
    pub http: HttpSettings,
    /// Remote command channel
    pub ssh: SshSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshSettings {
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    /// Path to the identity file used for the connection
    #[serde(default)]
    pub key: Option<String>,
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

/// Probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// SSH connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Upper bound for a single remote command in seconds
    pub command_timeout_secs: u64,
    /// SSH client binary
    pub ssh_binary: String,
    /// Command namespace of the review server (e.g. `gerrit`)
    pub command_prefix: String,
    /// Background refresh interval for the daemon; 0 disables it
    pub refresh_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            command_timeout_secs: 10,
            ssh_binary: "ssh".to_string(),
            command_prefix: "gerrit".to_string(),
            refresh_interval_secs: 0,
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Address to bind the REST API server
    pub address: String,
    /// Port for the REST API server
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 9090,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Location of the default configuration file
pub fn default_config_path() -> ProxyResult<PathBuf> {
    home_dir()
        .map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
        .ok_or_else(|| ProxyError::Config("Cannot determine home directory".to_string()))
}

fn write_default_config(path: &Path) -> ProxyResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_CONFIG)?;
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Expand a leading `~` to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_parses() {
        let config = ProxyConfig::from_yaml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.sites.len(), 2);
        assert_eq!(config.api.port, 9090);
        assert_eq!(config.monitor.command_prefix, "gerrit");
    }

    #[test]
    fn test_yaml_defaults() {
        let yaml = r#"
sites:
  east:
    http:
      url: "https://east.example.com"
    ssh:
      host: "east.example.com"
"#;
        let config = ProxyConfig::from_yaml(yaml).unwrap();
        let east = &config.sites["east"];
        assert_eq!(east.ssh.port, DEFAULT_SSH_PORT);
        assert!(east.weight.is_none());
        assert!(east.ssh.user.is_none());
        assert_eq!(config.monitor.connect_timeout_secs, 5);
        assert_eq!(config.monitor.command_timeout_secs, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_parse() {
        let toml_str = r#"
[sites.west]
location = "West"
weight = 0.5

[sites.west.http]
url = "https://west.example.com"

[sites.west.ssh]
host = "west.example.com"
port = 2222
user = "bot"

[api]
port = 8088
"#;
        let config = ProxyConfig::from_toml(toml_str).unwrap();
        let west = &config.sites["west"];
        assert_eq!(west.weight, Some(0.5));
        assert_eq!(west.ssh.port, 2222);
        assert_eq!(config.api.port, 8088);
        assert_eq!(config.api.address, "0.0.0.0");
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxy.toml");
        std::fs::write(&path, "[sites.a.ssh]\nhost = \"a.example.com\"\n").unwrap();

        let config = ProxyConfig::load(&path).unwrap();
        assert!(config.sites.contains_key("a"));

        let bad = dir.path().join("proxy.ini");
        std::fs::write(&bad, "").unwrap();
        assert!(matches!(ProxyConfig::load(&bad), Err(ProxyError::Config(_))));
    }

    #[test]
    fn test_load_or_init_writes_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("siteproxy.yaml");

        let config = ProxyConfig::load_or_init(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(config.sites.len(), 2);
    }

    #[test]
    fn test_invalid_yaml() {
        let result = ProxyConfig::from_yaml("sites: [1, 2");
        assert!(matches!(result, Err(ProxyError::Config(_))));
    }

    #[test]
    fn test_expand_tilde_passthrough() {
        let path = Path::new("/etc/siteproxy.yaml");
        assert_eq!(expand_tilde(path), PathBuf::from("/etc/siteproxy.yaml"));
    }
}
