//! Static preview server with single-page-application fallback.
//!
//! Any request path that does not match a file in the build output is
//! answered with the root document, so client-side routes load the app.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::Router;
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::PreviewConfig;
use crate::error::{PreviewError, PreviewResult};

const ROOT_DOCUMENT: &str = "index.html";
const GRACEFUL_STOP: Duration = Duration::from_secs(2);
const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// A live preview server and the workspace it serves from.
#[derive(Debug)]
pub struct RunningPreviewServer {
    pub url: String,
    pub addr: SocketAddr,
    /// Workspace directory deleted when the server is torn down.
    pub workspace: PathBuf,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RunningPreviewServer {
    /// Signal graceful shutdown and wait until the listener is closed.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if tokio::time::timeout(GRACEFUL_STOP, &mut self.task).await.is_err() {
            debug!("Preview server {} did not drain in time, aborting", self.url);
            self.task.abort();
            let _ = (&mut self.task).await;
        }
        info!("Stopped preview server {}", self.url);
    }

    /// Stop without waiting. Used where no runtime can be awaited.
    pub fn abort(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Router serving `dist` with the SPA fallback.
pub fn spa_router(dist: &Path) -> Router {
    let index = ServeFile::new(dist.join(ROOT_DOCUMENT));
    Router::new()
        .fallback_service(ServeDir::new(dist).fallback(index))
        .layer(TraceLayer::new_for_http())
}

/// Bind, spawn and wait for the server to answer.
///
/// A bind failure or a server that never becomes ready is an error; the
/// caller degrades to the next preview strategy.
pub async fn start(
    dist: &Path,
    workspace: PathBuf,
    config: &PreviewConfig,
) -> PreviewResult<RunningPreviewServer> {
    let addr = config.bind_addr()?;
    let listener = bind(addr)?;
    let local = listener.local_addr()?;
    let url = format!("http://{}:{}", display_host(&config.host), local.port());

    let (tx, rx) = oneshot::channel::<()>();
    let app = spa_router(dist);
    let task = tokio::spawn(async move {
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
        if let Err(e) = served {
            warn!("Preview server error: {}", e);
        }
    });

    let server = RunningPreviewServer {
        url,
        addr: local,
        workspace,
        shutdown: Some(tx),
        task,
    };

    match wait_until_ready(&server.url, config).await {
        Ok(()) => {
            info!("Preview server ready at {}", server.url);
            Ok(server)
        }
        Err(e) => {
            server.stop().await;
            Err(e)
        }
    }
}

fn bind(addr: SocketAddr) -> PreviewResult<TcpListener> {
    let bind_error = |e: std::io::Error| PreviewError::Bind {
        addr: addr.to_string(),
        message: e.to_string(),
    };
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(bind_error)?;
    // Lets a fresh server take the port while the previous one's
    // connections sit in TIME_WAIT.
    socket.set_reuseaddr(true).map_err(bind_error)?;
    socket.bind(addr).map_err(bind_error)?;
    socket.listen(1024).map_err(bind_error)
}

/// Poll the server root until it answers with a success status.
pub async fn wait_until_ready(url: &str, config: &PreviewConfig) -> PreviewResult<()> {
    let client = reqwest::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .pool_max_idle_per_host(0)
        .build()?;

    for attempt in 1..=config.readiness_attempts {
        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            Ok(resp) => debug!("Readiness probe {} got {}", attempt, resp.status()),
            Err(e) => debug!("Readiness probe {} failed: {}", attempt, e),
        }
        tokio::time::sleep(config.readiness_interval()).await;
    }

    Err(PreviewError::NotReady {
        url: url.to_string(),
        attempts: config.readiness_attempts,
    })
}

fn display_host(host: &str) -> String {
    match host {
        "0.0.0.0" => "127.0.0.1".to_string(),
        "::" => "[::1]".to_string(),
        other if other.contains(':') => format!("[{}]", other),
        other => other.to_string(),
    }
}
