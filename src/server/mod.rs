// src/server/mod.rs

//! Development HTTP server with live reload.
//!
//! Static files come from the server root through `ServeDir`. Browsers get
//! change notifications over Server-Sent Events at [`EVENTS_PATH`]; the
//! client script at [`CLIENT_PATH`] is injected into every HTML page.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axum::Router;
use axum::middleware;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub mod inject;
pub mod livereload;

pub use livereload::{ReloadHub, ReloadSignal};

/// SSE stream of [`ReloadSignal`]s.
pub const EVENTS_PATH: &str = "/__livereload";
/// Browser side of the live-reload protocol.
pub const CLIENT_PATH: &str = "/__livereload.js";

/// Build the router serving `root` with live-reload support.
pub fn router(root: impl AsRef<Path>, hub: ReloadHub) -> Router {
    Router::new()
        .route(EVENTS_PATH, get(livereload::events))
        .route(CLIENT_PATH, get(livereload::client_script))
        .fallback_service(ServeDir::new(root.as_ref()))
        .layer(middleware::from_fn(inject::inject_client))
        .layer(TraceLayer::new_for_http())
        .with_state(hub)
}

/// A running dev server. Dropping the handle stops it.
#[derive(Debug)]
pub struct DevServer {
    addr: SocketAddr,
    root: PathBuf,
    handle: JoinHandle<()>,
}

impl DevServer {
    /// Bind `host:port` (port 0 picks a free one) and start serving.
    pub async fn start(root: PathBuf, host: &str, port: u16, hub: ReloadHub) -> Result<Self> {
        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("binding dev server to {host}:{port}"))?;
        let addr = listener
            .local_addr()
            .context("reading dev server address")?;

        let app = router(&root, hub);
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                error!(error = %err, "dev server stopped");
            }
        });

        info!(%addr, root = %root.display(), "dev server listening on http://{addr}");
        Ok(Self { addr, root, handle })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for DevServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
