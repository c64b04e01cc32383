use crate::headers::{X_FORWARDED_FOR, X_REAL_IP};
use hyper::HeaderMap;
use hyper::header::HeaderName;
use log::info;
use std::net::SocketAddr;

/// Best-effort client identity: `X-Forwarded-For`, then `X-Real-IP`, then
/// the transport peer address. Header values are taken as claimed.
pub fn client_identity(headers: &HeaderMap, remote_addr: Option<SocketAddr>) -> String {
    let claimed = |name: &HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
    };

    if let Some(forwarded) = claimed(&X_FORWARDED_FOR) {
        return forwarded.to_string();
    }
    if let Some(real_ip) = claimed(&X_REAL_IP) {
        return real_ip.to_string();
    }
    remote_addr.map(|addr| addr.to_string()).unwrap_or_default()
}

/// Emits the one line recorded for every proxied request.
pub fn log_proxy_request(headers: &HeaderMap, remote_addr: Option<SocketAddr>, target_url: &str) {
    info!(
        "Proxying request for [{}] to [{}]",
        client_identity(headers, remote_addr),
        target_url
    );
}
