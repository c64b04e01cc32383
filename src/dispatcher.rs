use crate::access_log::log_proxy_request;
use crate::buffer_pool::BufferPool;
use crate::common::ProxyBody;
use crate::error::{ProxyError, error_chain};
use crate::headers::{relay_headers, strip_client_identity, strip_framing_headers};
use crate::relay::RelayBody;
use crate::rewrite::rewrite_path;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use http::uri::InvalidUri;
use hyper::{Request, Response, Uri};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use log::{debug, error};
use std::net::SocketAddr;
use std::sync::Arc;

pub type HttpsClient = Client<HttpsConnector<HttpConnector>, Incoming>;

/// Builds the shared outbound client. Plain `http://` origins are allowed
/// next to `https://` ones.
pub fn build_client(pool_max_idle_per_host: usize) -> HttpsClient {
    Client::builder(TokioExecutor::new())
        .pool_max_idle_per_host(pool_max_idle_per_host)
        .build(HttpsConnector::new())
}

/// Joins origin, rewritten path and the raw query string.
///
/// The query is appended untouched, and only when it is non-empty.
pub fn build_target_url(origin: &str, rewritten_path: &str, query: Option<&str>) -> String {
    match query {
        Some(query) if !query.is_empty() => format!("{}{}?{}", origin, rewritten_path, query),
        _ => format!("{}{}", origin, rewritten_path),
    }
}

/// Forwards one request to an upstream origin and relays the answer.
///
/// Each request is sent exactly once. No deadline is put on the upstream
/// call, so a silent upstream holds the request until the client gives up.
#[derive(Clone)]
pub struct ProxyDispatcher {
    client: HttpsClient,
    buffers: Arc<BufferPool>,
}

impl ProxyDispatcher {
    pub fn new(client: HttpsClient, buffers: Arc<BufferPool>) -> Self {
        Self { client, buffers }
    }

    pub fn buffers(&self) -> &Arc<BufferPool> {
        &self.buffers
    }

    pub async fn dispatch(
        &self,
        req: Request<Incoming>,
        remote_addr: Option<SocketAddr>,
        origin: &str,
    ) -> Result<Response<ProxyBody>, ProxyError> {
        let rewritten_path = rewrite_path(req.uri().path()).inspect_err(|e| {
            error!("Invalid path [{}] while rewrite: {}", req.uri().path(), e);
        })?;

        let target_url = build_target_url(origin, &rewritten_path, req.uri().query());

        // Identity headers are still present here, the logger trusts them
        log_proxy_request(req.headers(), remote_addr, &target_url);

        let target_uri: Uri = target_url.parse().map_err(|e: InvalidUri| {
            error!("creating proxy request for [{}]: {}", target_url, e);
            ProxyError::Uri(e.to_string())
        })?;

        let (parts, body) = req.into_parts();
        let mut inbound_headers = parts.headers;
        strip_client_identity(&mut inbound_headers);
        strip_framing_headers(&mut inbound_headers);

        let mut outbound = Request::builder()
            .method(parts.method)
            .uri(target_uri)
            .body(body)
            .map_err(|e| ProxyError::Http(e.to_string()))?;
        relay_headers(&inbound_headers, outbound.headers_mut());

        let upstream = self.client.request(outbound).await.map_err(|e| {
            let text = error_chain(&e);
            error!("sending proxy request to [{}]: {}", target_url, text);
            ProxyError::Upstream(text)
        })?;

        let (upstream_parts, upstream_body) = upstream.into_parts();
        debug!("Upstream [{}] answered {}", target_url, upstream_parts.status);

        let relay = RelayBody::new(upstream_body, self.buffers.acquire(), target_url);
        let mut response = Response::new(relay.boxed_unsync());
        *response.status_mut() = upstream_parts.status;
        relay_headers(&upstream_parts.headers, response.headers_mut());

        Ok(response)
    }
}
