use anyhow::Context;
use codenote_core::http::HttpConfig;
use codenote_core::http::server::DEFAULT_BODY_LIMIT;
use codenote_core::services::{DEFAULT_RETENTION_DAYS, DEFAULT_SWEEP_INTERVAL, MAX_RETENTION_DAYS};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub static_dir: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub retention_days: i64,
    pub sweep_interval_secs: u64,
    pub log_format: LogFormat,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    storage: StorageSection,
    #[serde(default)]
    logging: LoggingSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    cors_origins: Vec<String>,
    #[serde(default)]
    static_dir: Option<PathBuf>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StorageSection {
    #[serde(default)]
    db_path: Option<PathBuf>,
    #[serde(default = "default_retention_days")]
    retention_days: i64,
    #[serde(default = "default_sweep_interval_secs")]
    sweep_interval_secs: u64,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            db_path: None,
            retention_days: default_retention_days(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct LoggingSection {
    #[serde(default)]
    format: LogFormat,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_retention_days() -> i64 {
    DEFAULT_RETENTION_DAYS
}

fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL.as_secs()
}

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = match load_from_file()? {
            Some(file_config) => Self::from(file_config),
            None => Self::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let parsed: FileConfig = toml::from_str(contents)?;
        let config = Self::from(parsed);
        config.validate()?;
        Ok(config)
    }

    fn from_env() -> Self {
        let host = env::var("CODENOTE_HOST").unwrap_or_else(|_| default_host());
        let port = env::var("CODENOTE_PORT")
            .or_else(|_| env::var("PORT"))
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or_else(default_port);
        let cors_origins = env::var("CODENOTE_CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let static_dir = env::var("CODENOTE_STATIC_DIR").ok().map(PathBuf::from);
        let db_path = env::var("CODENOTE_DB_PATH").ok().map(PathBuf::from);
        let retention_days = env::var("CODENOTE_RETENTION_DAYS")
            .ok()
            .and_then(|value| value.parse::<i64>().ok())
            .unwrap_or_else(default_retention_days);
        let sweep_interval_secs = env::var("CODENOTE_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or_else(default_sweep_interval_secs);
        let log_format = match env::var("CODENOTE_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Self {
            host,
            port,
            cors_origins,
            static_dir,
            db_path,
            retention_days,
            sweep_interval_secs,
            log_format,
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !(1..=MAX_RETENTION_DAYS).contains(&self.retention_days) {
            anyhow::bail!(
                "retention_days must be between 1 and {}, got {}",
                MAX_RETENTION_DAYS,
                self.retention_days
            );
        }
        self.retention()?;
        if self.sweep_interval_secs == 0 {
            anyhow::bail!("sweep_interval_secs must be at least 1");
        }
        Ok(())
    }

    pub fn retention(&self) -> anyhow::Result<chrono::Duration> {
        chrono::TimeDelta::try_days(self.retention_days)
            .with_context(|| format!("retention_days {} is out of range", self.retention_days))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins: self.cors_origins.clone(),
            static_dir: self.static_dir.clone(),
            body_limit_bytes: DEFAULT_BODY_LIMIT,
        }
    }
}

impl From<FileConfig> for ServerConfig {
    fn from(file: FileConfig) -> Self {
        Self {
            host: file.server.host,
            port: file.server.port,
            cors_origins: file.server.cors_origins,
            static_dir: file.server.static_dir,
            db_path: file.storage.db_path,
            retention_days: file.storage.retention_days,
            sweep_interval_secs: file.storage.sweep_interval_secs,
            log_format: file.logging.format,
        }
    }
}

fn load_from_file() -> anyhow::Result<Option<FileConfig>> {
    let path = match env::var("CODENOTE_SERVER_CONFIG") {
        Ok(path) => Some(path),
        Err(_) if Path::new("codenote.toml").exists() => Some("codenote.toml".to_string()),
        Err(_) => None,
    };

    let Some(path) = path else {
        return Ok(None);
    };

    let contents =
        fs::read_to_string(&path).with_context(|| format!("Failed to read config {}", path))?;
    let parsed: FileConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse config {}", path))?;
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.retention_days, 31);
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.db_path.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let config = ServerConfig::from_toml_str(
            r#"
            [server]
            port = 8080
            cors_origins = ["http://localhost:5173"]
            static_dir = "public"

            [storage]
            db_path = "/tmp/codenote.db"
            retention_days = 7
            sweep_interval_secs = 5

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.retention().unwrap(), chrono::Duration::days(7));
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/codenote.db")));
        assert_eq!(config.log_format, LogFormat::Json);

        let http = config.http_config();
        assert_eq!(http.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(http.static_dir, Some(PathBuf::from("public")));
        assert_eq!(http.body_limit_bytes, DEFAULT_BODY_LIMIT);
    }

    #[test]
    fn rejects_non_positive_retention() {
        let err = ServerConfig::from_toml_str("[storage]\nretention_days = 0\n").unwrap_err();
        assert!(err.to_string().contains("retention_days"));
    }

    #[test]
    fn rejects_retention_beyond_the_cap() {
        for days in [MAX_RETENTION_DAYS + 1, 100_000_000, i64::MAX] {
            let contents = format!("[storage]\nretention_days = {days}\n");
            let err = ServerConfig::from_toml_str(&contents).unwrap_err();
            assert!(err.to_string().contains("retention_days"), "{days}: {err}");
        }

        let contents = format!("[storage]\nretention_days = {MAX_RETENTION_DAYS}\n");
        let config = ServerConfig::from_toml_str(&contents).unwrap();
        assert_eq!(
            config.retention().unwrap(),
            chrono::Duration::days(MAX_RETENTION_DAYS)
        );
    }
}
