use crate::buffer_pool::BufferPool;
use crate::common::{ProxyBody, ResponseBuilder};
use crate::config::Config;
use crate::dispatcher::{ProxyDispatcher, build_client};
use crate::error::ProxyError;
use crate::router::{RouteDecision, RouteTable};
use crate::static_files::LandingPage;
use hyper::body::Incoming;
use hyper::server::conn::http1::Builder as ServerBuilder;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use log::{debug, error, info, warn};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Per-request entry point: route, then serve the landing page, dispatch
/// upstream, or answer with the routing error.
pub struct ProxyService {
    routes: RouteTable,
    landing: LandingPage,
    dispatcher: ProxyDispatcher,
}

impl ProxyService {
    pub fn new(routes: RouteTable, landing: LandingPage, dispatcher: ProxyDispatcher) -> Self {
        Self {
            routes,
            landing,
            dispatcher,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let buffers = BufferPool::new(config.buffer_size, config.buffer_pool_max_idle);
        let client = build_client(config.pool_max_idle_per_host);

        Self::new(
            RouteTable::from_config(config),
            LandingPage::new(config.index_file.clone()),
            ProxyDispatcher::new(client, buffers),
        )
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn buffers(&self) -> &Arc<BufferPool> {
        self.dispatcher.buffers()
    }

    pub async fn handle_request(
        &self,
        req: Request<Incoming>,
        remote_addr: Option<SocketAddr>,
    ) -> Response<ProxyBody> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        match self.process_request(req, remote_addr).await {
            Ok(response) => response,
            Err(e) => {
                if e.status_code().is_server_error() {
                    error!("{} {} failed: {}", method, path, e);
                } else {
                    warn!("{} {} rejected: {}", method, path, e);
                }
                ResponseBuilder::from_error(&e)
            }
        }
    }

    async fn process_request(
        &self,
        req: Request<Incoming>,
        remote_addr: Option<SocketAddr>,
    ) -> Result<Response<ProxyBody>, ProxyError> {
        match self.routes.select(req.uri().path(), req.headers())? {
            RouteDecision::Landing => self.landing.serve().await,
            RouteDecision::Upstream { origin, prefix } => {
                debug!("Route {} -> {}", prefix, origin);
                self.dispatcher.dispatch(req, remote_addr, &origin).await
            }
        }
    }
}

/// HTTP/1 listener driving a shared [`ProxyService`].
pub struct ProxyServer {
    service: Arc<ProxyService>,
}

impl ProxyServer {
    pub fn new(service: ProxyService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ProxyService::from_config(config))
    }

    pub fn service(&self) -> &Arc<ProxyService> {
        &self.service
    }

    /// Binds `addr` and serves until the task is dropped. Failing to bind
    /// is the only error that stops the proxy.
    pub async fn run(self, addr: SocketAddr) -> Result<(), ProxyError> {
        info!("Binding HTTP listener to: {}", addr);
        let listener = TcpListener::bind(addr).await.map_err(ProxyError::Io)?;
        self.serve(listener).await
    }

    /// Accept loop. Each connection gets its own task, so a slow upstream on
    /// one request never holds up another.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ProxyError> {
        if let Ok(local_addr) = listener.local_addr() {
            info!("HTTP proxy listening on: http://{}", local_addr);
        }
        if self.service.routes().any_site_enabled() {
            warn!("Any site proxy route /p is enabled, upstream hosts come from X-Target-Host");
        }

        loop {
            let (stream, remote_addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    // e.g. EMFILE; back off instead of spinning
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    continue;
                }
            };

            let service = Arc::clone(&self.service);
            tokio::spawn(async move {
                debug!("HTTP connection established from: {}", remote_addr);
                let io = TokioIo::new(stream);

                if let Err(err) = ServerBuilder::new()
                    .keep_alive(true)
                    .serve_connection(
                        io,
                        service_fn(move |req| {
                            let service = Arc::clone(&service);
                            async move {
                                Ok::<_, Infallible>(
                                    service.handle_request(req, Some(remote_addr)).await,
                                )
                            }
                        }),
                    )
                    .await
                {
                    debug!("Error serving HTTP connection from {}: {}", remote_addr, err);
                }
            });
        }
    }
}
