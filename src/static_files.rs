use crate::common::{ProxyBody, full};
use crate::error::ProxyError;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::{Response, StatusCode};
use log::error;
use std::path::{Path, PathBuf};

/// Serves the landing page on `/`.
///
/// The file is read again for every request so it can be edited while the
/// proxy runs.
#[derive(Debug, Clone)]
pub struct LandingPage {
    path: PathBuf,
    content_type: HeaderValue,
}

impl LandingPage {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let content_type = Self::content_type_for(&path);
        Self { path, content_type }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn content_type_for(path: &Path) -> HeaderValue {
        mime_guess::from_path(path)
            .first()
            .and_then(|mime| HeaderValue::from_str(mime.essence_str()).ok())
            .unwrap_or_else(|| HeaderValue::from_static("text/html"))
    }

    pub async fn serve(&self) -> Result<Response<ProxyBody>, ProxyError> {
        let content = tokio::fs::read(&self.path).await.map_err(|e| {
            error!("reading {}: {}", self.path.display(), e);
            ProxyError::StaticAsset(format!("{}: {}", self.path.display(), e))
        })?;

        let mut response = Response::new(full(content));
        *response.status_mut() = StatusCode::OK;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, self.content_type.clone());
        Ok(response)
    }
}
