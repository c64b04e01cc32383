//! Startup validation of the proxy configuration
//!
//! Errors abort startup; warnings and suggestions are logged and the proxy
//! keeps going.

use crate::config::Config;
use url::Url;

/// Validation outcome
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
            warnings: vec![],
            suggestions: vec![],
        }
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
        self.is_valid = false;
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn add_suggestion(&mut self, suggestion: String) {
        self.suggestions.push(suggestion);
    }

    /// Logs warnings and suggestions through the `log` facade.
    pub fn log(&self) {
        for warning in &self.warnings {
            log::warn!("{}", warning);
        }
        for suggestion in &self.suggestions {
            log::info!("Suggestion: {}", suggestion);
        }
    }
}

pub struct ConfigValidator<'a> {
    config: &'a Config,
}

impl<'a> ConfigValidator<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::success();

        self.validate_listener(&mut result);
        self.validate_upstreams(&mut result);
        self.validate_buffers(&mut result);
        self.validate_security_implications(&mut result);

        result
    }

    fn validate_listener(&self, result: &mut ValidationResult) {
        if self.config.port == 0 {
            result.add_error("Port 0 is reserved".to_string());
        } else if self.config.port < 1024 {
            result.add_warning(format!(
                "Using privileged port {} - may require elevated privileges",
                self.config.port
            ));
        }
    }

    fn validate_upstreams(&self, result: &mut ValidationResult) {
        let upstreams = &self.config.upstreams;
        for (name, origin) in [("openai", &upstreams.openai), ("cloudflare", &upstreams.cloudflare)] {
            if let Err(e) = Self::validate_origin(origin) {
                result.add_error(format!("Invalid upstream origin for {}: {} - {}", name, origin, e));
            }
        }
    }

    fn validate_buffers(&self, result: &mut ValidationResult) {
        if self.config.buffer_size == 0 {
            result.add_error("buffer_size must be greater than zero".to_string());
        } else if self.config.buffer_size > 1024 * 1024 {
            result.add_warning(format!(
                "Large relay buffer ({} bytes) is held for the whole lifetime of every streamed response",
                self.config.buffer_size
            ));
        }

        if self.config.buffer_pool_max_idle == 0 {
            result.add_suggestion(
                "buffer_pool_max_idle is 0: every relay allocates a fresh buffer".to_string(),
            );
        }
    }

    fn validate_security_implications(&self, result: &mut ValidationResult) {
        if self.config.enable_proxy_any_site {
            result.add_warning(
                "Any site proxy is enabled: clients choose the upstream host through X-Target-Host with no allow-list"
                    .to_string(),
            );
            if self.config.listen_host.is_unspecified() {
                result.add_suggestion(
                    "Bind to an internal interface when the any site proxy is enabled".to_string(),
                );
            }
        }
    }

    /// An origin is scheme + host (+ port), nothing else.
    fn validate_origin(origin: &str) -> Result<(), String> {
        let url = Url::parse(origin).map_err(|e| e.to_string())?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(format!("unsupported scheme '{}'", url.scheme()));
        }
        if url.host_str().is_none() {
            return Err("missing host".to_string());
        }
        if url.path() != "/" || url.query().is_some() || origin.ends_with('/') {
            return Err("origin must not carry a path or query".to_string());
        }

        Ok(())
    }
}
