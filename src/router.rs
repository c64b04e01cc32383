use crate::config::Config;
use crate::error::ProxyError;
use hyper::HeaderMap;
use hyper::header::HeaderName;

/// Names the upstream host for the any-site route.
pub static X_TARGET_HOST: HeaderName = HeaderName::from_static("x-target-host");

pub const OPENAI_PREFIX: &str = "/o";
pub const CLOUDFLARE_PREFIX: &str = "/c";
pub const ANY_SITE_PREFIX: &str = "/p";

/// Where a request goes once its path has been looked at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Exactly `/`: serve the landing page
    Landing,
    /// Forward to `origin` (scheme + host), matched through `prefix`
    Upstream { origin: String, prefix: &'static str },
}

/// Prefix routing table, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct RouteTable {
    openai_origin: String,
    cloudflare_origin: String,
    any_site_enabled: bool,
}

impl RouteTable {
    pub fn new(openai_origin: String, cloudflare_origin: String, any_site_enabled: bool) -> Self {
        Self {
            openai_origin,
            cloudflare_origin,
            any_site_enabled,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.upstreams.openai.clone(),
            config.upstreams.cloudflare.clone(),
            config.enable_proxy_any_site,
        )
    }

    pub fn any_site_enabled(&self) -> bool {
        self.any_site_enabled
    }

    /// Picks a route for `path`. Rules are checked in a fixed order and the
    /// prefixes are plain string prefixes, so `/openai/...` lands on `/o`.
    ///
    /// The any-site origin is `https://` followed by whatever the client put
    /// in `X-Target-Host`; nothing restricts which hosts it can reach.
    pub fn select(&self, path: &str, headers: &HeaderMap) -> Result<RouteDecision, ProxyError> {
        if path == "/" {
            return Ok(RouteDecision::Landing);
        }

        if path.starts_with(OPENAI_PREFIX) {
            return Ok(RouteDecision::Upstream {
                origin: self.openai_origin.clone(),
                prefix: OPENAI_PREFIX,
            });
        }

        if path.starts_with(CLOUDFLARE_PREFIX) {
            return Ok(RouteDecision::Upstream {
                origin: self.cloudflare_origin.clone(),
                prefix: CLOUDFLARE_PREFIX,
            });
        }

        if path.starts_with(ANY_SITE_PREFIX) {
            if !self.any_site_enabled {
                return Err(ProxyError::FeatureDisabled);
            }

            // Opaque bytes are kept; the URI parse rejects them later.
            let target = headers
                .get(&X_TARGET_HOST)
                .map(|value| String::from_utf8_lossy(value.as_bytes()))
                .filter(|value| !value.is_empty())
                .ok_or(ProxyError::MissingTargetHost)?;

            return Ok(RouteDecision::Upstream {
                origin: format!("https://{}", target),
                prefix: ANY_SITE_PREFIX,
            });
        }

        Err(ProxyError::RouteNotFound(path.to_string()))
    }
}
