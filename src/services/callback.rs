// SPDX-License-Identifier: MIT

//! One-shot loopback HTTP listener for the OAuth redirect.
//!
//! Binds exactly once, services exactly one request to the expected path,
//! and is torn down deterministically on the first of {matching request,
//! caller timeout}. A crashed or abandoned flow never leaves the port
//! occupied.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

const CONFIRMATION_BODY: &str =
    "WHOOP connection received. You can return to the CLI and close this tab.";

/// How long the accept loop gets to wind down after shutdown is signalled
/// before it is aborted outright.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Query parameters captured from the provider redirect. Written once by
/// the listener task, read once by the flow.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackResult {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

struct ListenerState {
    /// Consumed by the first request to the expected path.
    result_tx: Mutex<Option<oneshot::Sender<CallbackResult>>>,
}

/// Single-use HTTP listener bound to a loopback address.
pub struct CallbackListener {
    addr: SocketAddr,
    result_rx: oneshot::Receiver<CallbackResult>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: JoinHandle<std::io::Result<()>>,
}

impl CallbackListener {
    /// Bind the listener. The port is exclusive to one in-flight
    /// authorization attempt; a bind failure is immediately fatal and the
    /// caller must free the port.
    pub async fn bind(host: &str, port: u16, path: &str) -> Result<Self> {
        let listener = TcpListener::bind((host, port)).await.map_err(|e| {
            Error::Auth(format!(
                "could not start local callback listener on {host}:{port}: {e}"
            ))
        })?;
        let addr = listener.local_addr().map_err(|e| {
            Error::Auth(format!("could not resolve callback listener address: {e}"))
        })?;

        let (result_tx, result_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let state = Arc::new(ListenerState {
            result_tx: Mutex::new(Some(result_tx)),
        });

        let app = router(path, state);
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::debug!(address = %addr, "Callback listener bound");

        Ok(Self {
            addr,
            result_rx,
            shutdown_tx: Some(shutdown_tx),
            server,
        })
    }

    /// Address the listener actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Block until the first redirect to the expected path arrives or
    /// `timeout` elapses, then tear the listener down either way.
    pub async fn wait(mut self, timeout: Duration) -> Result<CallbackResult> {
        let outcome = tokio::time::timeout(timeout, &mut self.result_rx).await;
        self.shutdown().await;

        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_)) => Err(Error::Auth(
                "callback listener stopped unexpectedly".to_string(),
            )),
            Err(_) => Err(Error::Auth(
                "timed out waiting for WHOOP authorization".to_string(),
            )),
        }
    }

    /// Stop accepting and release the port, aborting the accept loop if it
    /// does not wind down within the grace period.
    async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut self.server)
            .await
            .is_err()
        {
            tracing::warn!("Callback listener did not shut down in time, aborting");
            self.server.abort();
            let _ = (&mut self.server).await;
        }
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        // A listener dropped without wait() must not outlive the flow call.
        self.server.abort();
    }
}

fn router(path: &str, state: Arc<ListenerState>) -> Router {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    Router::new()
        .route(&path, get(capture))
        .fallback(|| async { (StatusCode::NOT_FOUND, "Not Found") })
        .with_state(state)
}

async fn capture(
    State(state): State<Arc<ListenerState>>,
    Query(result): Query<CallbackResult>,
) -> (StatusCode, &'static str) {
    let tx = state
        .result_tx
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .take();
    if let Some(tx) = tx {
        let _ = tx.send(result);
    }
    (StatusCode::OK, CONFIRMATION_BODY)
}
