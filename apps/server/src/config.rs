use std::net::SocketAddr;
use std::time::Duration;
use std::{env, fmt, fs, io, path};

use heartcheck::probe::heartbleed::service_port;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", .path.display())]
    ReadFailed { path: path::PathBuf, source: io::Error },
    #[error("could not write {}: {source}", .path.display())]
    WriteFailed { path: path::PathBuf, source: io::Error },
    #[error("could not parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("could not serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("no config path available, set XDG_CONFIG_HOME or HOME")]
    ConfigPathUnavailable,
    #[error("{field}: invalid duration {value:?}: {source}")]
    Duration { field: &'static str, value: String, source: humantime::DurationError },
    #[error("server.listen: invalid address {value:?}: {source}")]
    Address { value: String, source: std::net::AddrParseError },
    #[error("probe.service: unsupported service {0:?}")]
    UnknownService(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: Server,
    pub cache: Cache,
    pub probe: Probe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    /// `host:port`, or `:port` for every interface.
    pub listen: String,
    pub redirect_url: String,
    pub request_timeout: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Cache {
    /// Local database path, `:memory:`, or a `libsql://`/`https://` URL.
    pub database: String,
    pub auth_token: String,
    pub expiry: String,
    pub keepalive: bool,
    pub keepalive_interval: String,
    pub pool_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Probe {
    pub service: String,
    pub payload: String,
    pub timeout: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8082".into(),
            redirect_url: "http://localhost".into(),
            request_timeout: "30s".into(),
        }
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            database: "heartcheck.db".into(),
            auth_token: String::new(),
            expiry: "10m".into(),
            keepalive: false,
            keepalive_interval: "1m".into(),
            pool_size: 16,
        }
    }
}

impl Default for Probe {
    fn default() -> Self {
        Self {
            service: "https".into(),
            payload: "heartbleed.mozilla.com".into(),
            timeout: "10s".into(),
        }
    }
}

/// Validated, typed view of a [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub listen: SocketAddr,
    pub redirect_url: String,
    pub request_timeout: Duration,
    pub expiry: Duration,
    pub keepalive: Option<Duration>,
    pub probe_timeout: Duration,
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().is_none_or(|ext| ext != "toml") {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/heartcheck/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("heartcheck/config.toml"))
}

fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|source| ConfigError::Duration {
        field,
        value: value.to_owned(),
        source,
    })
}

fn parse_listen(value: &str) -> Result<SocketAddr, ConfigError> {
    let full = if value.starts_with(':') { format!("0.0.0.0{value}") } else { value.to_owned() };
    full.parse().map_err(|source| ConfigError::Address { value: value.to_owned(), source })
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let token = if self.cache.auth_token.is_empty() { "(none)" } else { "(set)" };

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Server")?;
        write_1(f, "Listen Address", &self.server.listen)?;
        write_1(f, "Redirect URL", &self.server.redirect_url)?;
        write_1(f, "Request Timeout", &self.server.request_timeout)?;
        write_title_1(f, "Cache")?;
        write_1(f, "Database", &self.cache.database)?;
        write_1(f, "Auth Token", &token)?;
        write_1(f, "Expiry", &self.cache.expiry)?;
        write_1(f, "Keepalive", &self.cache.keepalive)?;
        write_1(f, "Keepalive Interval", &self.cache.keepalive_interval)?;
        write_1(f, "Pool Size", &self.cache.pool_size)?;
        write_title_1(f, "Probe")?;
        write_1(f, "Service", &self.probe.service)?;
        write_1(f, "Payload", &self.probe.payload)?;
        write_1(f, "Timeout", &self.probe.timeout)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/heartcheck/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```ignore
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| ConfigError::ReadFailed { path: config_path.clone(), source })?;
            Ok(toml::from_str(raw_string.as_str())?)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;
        let write_failed = |source| ConfigError::WriteFailed { path: path.to_path_buf(), source };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }

        fs::write(path, config_str).map_err(write_failed)
    }

    /// Check every field and convert the stringly parts.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        if service_port(&self.probe.service).is_none() {
            return Err(ConfigError::UnknownService(self.probe.service.clone()));
        }

        let keepalive_interval = parse_duration("cache.keepalive_interval", &self.cache.keepalive_interval)?;

        Ok(Settings {
            listen: parse_listen(&self.server.listen)?,
            redirect_url: self.server.redirect_url.clone(),
            request_timeout: parse_duration("server.request_timeout", &self.server.request_timeout)?,
            expiry: parse_duration("cache.expiry", &self.cache.expiry)?,
            keepalive: self.cache.keepalive.then_some(keepalive_interval),
            probe_timeout: parse_duration("probe.timeout", &self.probe.timeout)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_resolve() {
        let settings = Config::default().settings().unwrap();
        assert_eq!(settings.listen, "0.0.0.0:8082".parse::<SocketAddr>().unwrap());
        assert_eq!(settings.expiry, Duration::from_secs(600));
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.probe_timeout, Duration::from_secs(10));
        assert_eq!(settings.keepalive, None);
        assert_eq!(settings.redirect_url, "http://localhost");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            listen = ":9000"

            [cache]
            expiry = "1h 30m"
            keepalive = true
            "#,
        )
        .unwrap();

        let settings = config.settings().unwrap();
        assert_eq!(settings.listen, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(settings.expiry, Duration::from_secs(90 * 60));
        assert_eq!(settings.keepalive, Some(Duration::from_secs(60)));
        assert_eq!(config.probe.payload, "heartbleed.mozilla.com");
    }

    #[test]
    fn test_bad_values_are_reported() {
        let mut config = Config::default();
        config.cache.expiry = "ten minutes".into();
        assert!(matches!(config.settings(), Err(ConfigError::Duration { field: "cache.expiry", .. })));

        let mut config = Config::default();
        config.server.listen = "nowhere".into();
        assert!(matches!(config.settings(), Err(ConfigError::Address { .. })));

        let mut config = Config::default();
        config.probe.service = "gopher".into();
        assert!(matches!(config.settings(), Err(ConfigError::UnknownService(_))));
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/heartcheck");

        let created = Config::from_config(Some(&path)).unwrap();
        let written = dir.path().join("nested/heartcheck.toml");
        assert!(written.exists());

        let reread = Config::from_config(Some(&written)).unwrap();
        assert_eq!(reread.cache.database, created.cache.database);
        assert_eq!(reread.server.listen, created.server.listen);
    }

    #[test]
    fn test_display_hides_auth_token() {
        let mut config = Config::default();
        config.cache.auth_token = "s3cret".into();
        let shown = config.to_string();
        assert!(shown.contains("Auth Token: (set)"));
        assert!(!shown.contains("s3cret"));
    }
}
