//! # Stub Server
//!
//! In-process HTTP stub for exercising request/assertion scenarios without
//! reaching a public API. Every request, whatever its method or path, is
//! answered with the configured status and JSON body and recorded for later
//! inspection.

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    Router,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

/// Canned answer served for every request
#[derive(Debug, Clone, PartialEq)]
pub struct StubResponse {
    pub status: u16,
    pub body: Value,
    pub delay: Option<Duration>,
}

impl StubResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            delay: None,
        }
    }

    /// Hold the answer back, to provoke client timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
}

#[derive(Debug)]
struct StubState {
    response: Mutex<StubResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

#[derive(Debug)]
pub struct StubServer {
    addr: SocketAddr,
    state: Arc<StubState>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl StubServer {
    /// Bind an ephemeral loopback port and start serving `response`.
    pub async fn start(response: StubResponse) -> anyhow::Result<Self> {
        let state = Arc::new(StubState {
            response: Mutex::new(response),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(respond).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (sender, receiver) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                receiver.await.ok();
            });
            if let Err(e) = server.await {
                error!(%addr, error = %e, "Stub server stopped with an error");
            }
        });
        info!(%addr, "Stub server listening");

        Ok(Self {
            addr,
            state,
            shutdown: Some(sender),
            handle: Some(handle),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://host:port` with no trailing slash
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Replace the canned answer for subsequent requests.
    pub fn set_response(&self, response: StubResponse) {
        *self.state.response.lock() = response;
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    /// Stop accepting connections and wait for the server task to finish.
    pub async fn shutdown(mut self) {
        if let Some(sender) = self.shutdown.take() {
            sender.send(()).ok();
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!(addr = %self.addr, error = %e, "Stub server task failed");
            }
        }
        info!(addr = %self.addr, "Stub server shut down");
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(sender) = self.shutdown.take() {
            sender.send(()).ok();
        }
    }
}

#[instrument(skip(state))]
async fn respond(State(state): State<Arc<StubState>>, method: Method, uri: Uri) -> Response {
    state.requests.lock().push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
    });
    let response = state.response.lock().clone();
    debug!(status = response.status, "Serving stub response");

    if let Some(delay) = response.delay {
        tokio::time::sleep(delay).await;
    }

    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body)).into_response()
}
