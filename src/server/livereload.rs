// src/server/livereload.rs

use std::convert::Infallible;

use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

const CHANNEL_CAPACITY: usize = 64;

const CLIENT_JS: &str = include_str!("livereload.js");

/// A change notification for connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReloadSignal {
    /// Reload the whole page.
    Reload,
    /// Re-fetch stylesheets whose file name is `file`.
    Css { file: String },
}

/// Registry of connected live-reload clients.
///
/// Cloning is cheap; all clones publish to the same subscribers.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadSignal>,
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadHub {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadSignal> {
        self.tx.subscribe()
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Send `signal` to every connected client and return how many got it.
    /// With nobody connected this does nothing.
    pub fn publish(&self, signal: ReloadSignal) -> usize {
        match self.tx.send(signal) {
            Ok(receivers) => {
                debug!(receivers, "live-reload signal sent");
                receivers
            }
            Err(broadcast::error::SendError(signal)) => {
                debug!(?signal, "no live-reload clients connected");
                0
            }
        }
    }

    pub fn reload(&self) -> usize {
        self.publish(ReloadSignal::Reload)
    }

    pub fn inject_css(&self, file: impl Into<String>) -> usize {
        self.publish(ReloadSignal::Css { file: file.into() })
    }
}

pub(crate) async fn events(
    State(hub): State<ReloadHub>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(clients = hub.client_count() + 1, "live-reload client connected");
    let rx = hub.subscribe();

    let stream = BroadcastStream::new(rx).map(|msg| match msg {
        Ok(signal) => {
            let data = serde_json::to_string(&signal).unwrap_or_default();
            Ok(Event::default().data(data))
        }
        Err(_lagged) => {
            warn!("live-reload stream lagged; forcing reload");
            let data = serde_json::to_string(&ReloadSignal::Reload).unwrap_or_default();
            Ok(Event::default().data(data))
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub(crate) async fn client_script() -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (CACHE_CONTROL, "no-cache"),
        ],
        CLIENT_JS,
    )
}
