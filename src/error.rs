use hyper::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Invalid path format: {0}")]
    InvalidPath(String),

    #[error("Missing X-Target-Host header")]
    MissingTargetHost,

    #[error("The any site proxy function is disabled.")]
    FeatureDisabled,

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Static asset error: {0}")]
    StaticAsset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("URI error: {0}")]
    Uri(String),
}

impl ProxyError {
    /// Status code sent to the client when this error ends a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::InvalidPath(_) | ProxyError::MissingTargetHost => StatusCode::BAD_REQUEST,
            ProxyError::FeatureDisabled => StatusCode::FORBIDDEN,
            ProxyError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body text sent to the client.
    ///
    /// Upstream dispatch failures expose the transport error text, everything
    /// else gets a short fixed message.
    pub fn client_message(&self) -> String {
        match self {
            ProxyError::InvalidPath(_) => "Invalid request path".to_string(),
            ProxyError::MissingTargetHost => "Bad Request".to_string(),
            ProxyError::FeatureDisabled => self.to_string(),
            ProxyError::RouteNotFound(_) => "404 page not found".to_string(),
            ProxyError::Upstream(message) => message.clone(),
            ProxyError::Uri(_) => "Error creating proxy request".to_string(),
            _ => "Internal Server Error".to_string(),
        }
    }
}

/// Flattens an error and its `source()` chain into one line.
///
/// hyper-util's client errors only say "client error (Connect)" at the top
/// level; the useful part (refused, DNS, TLS) lives further down the chain.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}
