//! HTTP + WebSocket server

pub mod router;
pub mod handlers;
pub mod websocket;
pub mod highlight;
pub mod explorer;


use std::sync::Arc;

use anyhow::Context;
use grove_core::{BookmarkBackend, BookmarkStore};
use grove_provider::ContentProvider;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::info;

pub use explorer::{Explorer, ExplorerError, ExplorerSettings};

/// Capacity of the event channel shared by WebSocket connections.
const EVENT_CHANNEL_CAPACITY: usize = 256;

pub type SharedBookmarks = BookmarkStore<Box<dyn BookmarkBackend>>;

/// State shared by every request handler.
pub struct ServerState {
    /// The currently opened repository, if any.
    pub explorer: RwLock<Option<Explorer>>,
    pub bookmarks: Mutex<SharedBookmarks>,
    pub provider: Arc<dyn ContentProvider>,
    pub settings: ExplorerSettings,
    /// Serialized WebSocket events fanned out to every connection.
    pub events_tx: broadcast::Sender<String>,
}

impl ServerState {
    pub fn new(provider: Arc<dyn ContentProvider>, bookmarks: SharedBookmarks, settings: ExplorerSettings) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            explorer: RwLock::new(None),
            bookmarks: Mutex::new(bookmarks),
            provider,
            settings,
            events_tx,
        }
    }

    /// Send an event to all connected clients. Returns how many received it.
    pub fn broadcast(&self, message: String) -> Result<usize, broadcast::error::SendError<String>> {
        self.events_tx.send(message)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7890,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub struct GroveServer {
    state: Arc<ServerState>,
    config: ServerConfig,
}

impl GroveServer {
    pub fn new(state: ServerState, config: ServerConfig) -> Self {
        Self {
            state: Arc::new(state),
            config,
        }
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind and serve until the process is stopped.
    pub async fn start(self) -> anyhow::Result<()> {
        let address = self.config.address();
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind {}", address))?;
        info!("Listening on http://{}", address);

        let app = router::create_router(self.state);
        axum::serve(listener, app).await.context("Server error")?;
        Ok(())
    }
}
