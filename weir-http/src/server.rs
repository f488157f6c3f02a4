use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use weir::StdError;
use weir_base::{CancellationToken, Daemon, config_section, defer};

use crate::{App, Environ, Reply};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[config_section("http_server")]
pub struct HttpServerConfig {
    pub addr: SocketAddr,
    /// Largest accepted request body in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

fn default_body_limit() -> usize {
    2 * 1024 * 1024
}

#[derive(Clone)]
struct ServerState {
    app: Arc<App>,
    body_limit: usize,
}

/// Serves an [`App`] over HTTP until shutdown.
pub struct HttpServer {
    state: ServerState,
    addr: SocketAddr,
    listener: Mutex<Option<TcpListener>>,
}

impl HttpServer {
    /// Creates a server that binds `config.addr` when it starts running.
    pub fn new(app: Arc<App>, config: &HttpServerConfig) -> Self {
        Self {
            state: ServerState {
                app,
                body_limit: config.body_limit,
            },
            addr: config.addr,
            listener: Mutex::new(None),
        }
    }

    /// Creates a server bound to `config.addr` right away, so that the
    /// actual address is known before it runs (useful with port `0`).
    pub async fn bind(app: Arc<App>, config: &HttpServerConfig) -> Result<Self, StdError> {
        let listener = TcpListener::bind(config.addr).await.map_err(Box::new)?;
        let mut server = Self::new(app, config);
        server.addr = listener.local_addr()?;
        server.listener = Mutex::new(Some(listener));
        Ok(server)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    fn take_listener(&self) -> Option<TcpListener> {
        self.listener.lock().ok().and_then(|mut v| v.take())
    }
}

impl Daemon for HttpServer {
    async fn run(&self, shutdown: CancellationToken) -> Result<(), StdError> {
        let span = tracing::info_span!("http_server", addr = ?self.addr);
        let router = axum::Router::new()
            .fallback(handle)
            .with_state(self.state.clone());
        tracing::info!(parent: &span, "Server starting");
        defer! {
            tracing::info!(parent: &span, "Server stopped")
        };
        let listener = match self.take_listener() {
            Some(v) => v,
            None => TcpListener::bind(self.addr).await.map_err(Box::new)?,
        };
        tracing::info!(parent: &span, "Server started");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(Box::new)?;
        Ok(())
    }
}

async fn handle(State(state): State<ServerState>, request: Request) -> axum::response::Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.body_limit).await {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!(%err, "Cannot read request body");
            return plain_response(StatusCode::PAYLOAD_TOO_LARGE);
        }
    };
    let mut environ = Environ::new(parts.method.as_str(), parts.uri.path())
        .with_query(parts.uri.query().unwrap_or_default())
        .with_body(body);
    for (name, value) in &parts.headers {
        environ = environ.with_header(
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }
    match state.app.dispatch(environ).await {
        Ok(reply) => into_axum_response(reply),
        Err(_) => plain_response(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

fn plain_response(status: StatusCode) -> axum::response::Response {
    let mut response =
        axum::response::Response::new(Body::from(status.canonical_reason().unwrap_or_default()));
    *response.status_mut() = status;
    response
}

fn into_axum_response(reply: Reply) -> axum::response::Response {
    let mut response = axum::response::Response::new(Body::from(reply.body));
    *response.status_mut() =
        StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    for (name, value) in reply.headers {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().append(name, value);
            }
            _ => tracing::warn!("Dropping invalid response header"),
        }
    }
    response
}
