//! Shared helpers: a mock upstream origin and a proxy bound to an ephemeral
//! port.

#![allow(dead_code)]

use bytes::Bytes;
use futures::SinkExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioIo};
use relay_gate::config::Config;
use relay_gate::proxy::{ProxyServer, ProxyService};
use serde_json::{Map, Value, json};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

pub type MockBody = UnsyncBoxBody<Bytes, Infallible>;
pub type TestClient = Client<HttpConnector, Full<Bytes>>;

pub const STREAM_CHUNKS: [&str; 3] = ["data: first\n\n", "data: second\n\n", "data: [DONE]\n\n"];

/// Mock origin. `/stream` sends [`STREAM_CHUNKS`], holding the last one back
/// until `release_last_chunk` is notified. Every other path answers `201`
/// with a JSON echo of what it received.
pub struct MockUpstream {
    pub addr: SocketAddr,
    pub release_last_chunk: Arc<Notify>,
}

impl MockUpstream {
    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }
}

pub async fn spawn_upstream() -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let release_last_chunk = Arc::new(Notify::new());
    let release = Arc::clone(&release_last_chunk);

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                continue;
            };
            let release = Arc::clone(&release);
            tokio::spawn(async move {
                let service = service_fn(move |req| mock_handler(req, Arc::clone(&release)));
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    MockUpstream {
        addr,
        release_last_chunk,
    }
}

async fn mock_handler(
    req: Request<Incoming>,
    release_last_chunk: Arc<Notify>,
) -> Result<Response<MockBody>, Infallible> {
    if req.uri().path() == "/stream" {
        return Ok(streaming_response(release_last_chunk));
    }

    let method = req.method().to_string();
    let uri = req.uri().to_string();
    let mut headers = Map::new();
    for key in req.headers().keys() {
        let values: Vec<Value> = req
            .headers()
            .get_all(key)
            .iter()
            .map(|v| Value::String(v.to_str().unwrap_or_default().to_string()))
            .collect();
        headers.insert(key.as_str().to_string(), Value::Array(values));
    }
    let body = req.into_body().collect().await.unwrap().to_bytes();

    let echo = json!({
        "method": method,
        "uri": uri,
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    });

    let response = Response::builder()
        .status(StatusCode::CREATED)
        .header("content-type", "application/json")
        .header("set-cookie", "session=abc")
        .header("set-cookie", "theme=dark")
        .header("x-upstream", "mock")
        .body(
            Full::new(Bytes::from(echo.to_string()))
                .map_err(|never| match never {})
                .boxed_unsync(),
        )
        .unwrap();
    Ok(response)
}

fn streaming_response(release_last_chunk: Arc<Notify>) -> Response<MockBody> {
    let (mut tx, rx) = futures::channel::mpsc::channel::<Result<Frame<Bytes>, Infallible>>(4);

    tokio::spawn(async move {
        for (i, chunk) in STREAM_CHUNKS.iter().enumerate() {
            if i == STREAM_CHUNKS.len() - 1 {
                release_last_chunk.notified().await;
            }
            if tx.send(Ok(Frame::data(Bytes::from_static(chunk.as_bytes())))).await.is_err() {
                return;
            }
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/event-stream")
        .body(StreamBody::new(rx).boxed_unsync())
        .unwrap()
}

/// Starts a proxy on `127.0.0.1:0` and returns its address together with
/// the shared service (for buffer pool inspection).
pub async fn spawn_proxy(config: Config) -> (SocketAddr, Arc<ProxyService>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = ProxyServer::from_config(&config);
    let service = Arc::clone(server.service());
    tokio::spawn(server.serve(listener));

    (addr, service)
}

/// Config whose fixed provider routes both point at `upstream`.
pub fn config_for(upstream: &MockUpstream) -> Config {
    let mut config = Config::default();
    config.upstreams.openai = upstream.origin();
    config.upstreams.cloudflare = upstream.origin();
    config
}

pub fn client() -> TestClient {
    Client::builder(TokioExecutor::new()).build_http()
}

pub fn get(url: String) -> Request<Full<Bytes>> {
    Request::builder()
        .uri(url)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

pub async fn body_string(response: Response<Incoming>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Incoming>) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}
