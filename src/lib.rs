pub mod access_log;
pub mod buffer_pool;
pub mod common;
pub mod config;
pub mod config_validation;
pub mod dispatcher;
pub mod error;
pub mod headers;
pub mod logging;
pub mod proxy;
pub mod relay;
pub mod rewrite;
pub mod router;
pub mod static_files;

pub use config::Config;
pub use error::ProxyError;
pub use proxy::{ProxyServer, ProxyService};
