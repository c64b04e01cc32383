use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

fn default_listen_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    9000
}

fn default_index_file() -> PathBuf {
    PathBuf::from("index.html")
}

fn default_buffer_size() -> usize {
    1024
}

fn default_buffer_pool_max_idle() -> usize {
    256
}

fn default_pool_max_idle_per_host() -> usize {
    10
}

fn default_openai_origin() -> String {
    "https://api.openai.com".to_string()
}

fn default_cloudflare_origin() -> String {
    "https://api.cloudflare.com".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutputType {
    Stdout,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogTarget {
    #[serde(rename = "type")]
    pub output_type: LogOutputType,
    pub path: Option<PathBuf>,
    pub level: Option<LogLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<LogLevel>,
    pub format: Option<LogFormat>,
    pub targets: Option<Vec<LogTarget>>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Some(LogLevel::Info),
            format: Some(LogFormat::Text),
            targets: Some(vec![LogTarget {
                output_type: LogOutputType::Stdout,
                path: None,
                level: None,
            }]),
        }
    }
}

/// Origins behind the fixed provider routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Origin for the `/o` route
    #[serde(default = "default_openai_origin")]
    pub openai: String,
    /// Origin for the `/c` route
    #[serde(default = "default_cloudflare_origin")]
    pub cloudflare: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            openai: default_openai_origin(),
            cloudflare: default_cloudflare_origin(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_host")]
    pub listen_host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Lets clients pick any upstream host through `X-Target-Host`
    #[serde(default)]
    pub enable_proxy_any_site: bool,
    /// Landing page served on `/`, read on every request
    #[serde(default = "default_index_file")]
    pub index_file: PathBuf,
    #[serde(default)]
    pub upstreams: UpstreamConfig,
    /// Size in bytes of each pooled response relay buffer
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Idle buffers kept by the pool; extras are freed on release
    #[serde(default = "default_buffer_pool_max_idle")]
    pub buffer_pool_max_idle: usize,
    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_host: default_listen_host(),
            port: default_port(),
            enable_proxy_any_site: false,
            index_file: default_index_file(),
            upstreams: UpstreamConfig::default(),
            buffer_size: default_buffer_size(),
            buffer_pool_max_idle: default_buffer_pool_max_idle(),
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
            logging: None,
        }
    }
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_host, self.port)
    }

    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
