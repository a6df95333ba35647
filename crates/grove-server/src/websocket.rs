//! WebSocket handling for live search and tree events

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use grove_core::{SearchOptions, SearchResult, Sequencer};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::ServerState;

/// WebSocket message types for client-server communication
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    /// Client runs a search; results echo the sequence
    #[serde(rename = "search")]
    Search { sequence: u64, options: SearchOptions },
    /// Server answers the newest search
    #[serde(rename = "search_results")]
    SearchResults { sequence: u64, results: Vec<SearchResult> },
    /// Server announces that the open tree changed
    #[serde(rename = "tree_updated")]
    TreeUpdated { repo: String, files: usize },
    /// Ping/pong for keepalive
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "pong")]
    Pong,
    /// Error message
    #[serde(rename = "error")]
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sequence: Option<u64>,
    },
}

impl WsMessage {
    fn error(message: impl Into<String>, sequence: Option<u64>) -> Self {
        WsMessage::Error {
            message: message.into(),
            sequence,
        }
    }
}

/// Handle WebSocket upgrade requests
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    info!("New WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let mut events = state.events_tx.subscribe();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<WsMessage>();
    let sequencer = Arc::new(Mutex::new(Sequencer::new()));

    // Forward direct replies and broadcast events to the client
    let mut send_task = tokio::spawn(async move {
        loop {
            let text = tokio::select! {
                reply = reply_rx.recv() => match reply {
                    Some(msg) => match serde_json::to_string(&msg) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to serialize WebSocket message: {}", e);
                            continue;
                        }
                    },
                    None => break,
                },
                event = events.recv() => match event {
                    Ok(text) => text,
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        warn!("WebSocket client lagged behind");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };
            if sender.send(Message::Text(text)).await.is_err() {
                debug!("Failed to send message to WebSocket client");
                break;
            }
        }
    });

    let recv_state = Arc::clone(&state);
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    debug!("Received WebSocket message: {}", text);
                    match serde_json::from_str::<WsMessage>(&text) {
                        Ok(ws_msg) => {
                            handle_client_message(ws_msg, &recv_state, &sequencer, &reply_tx).await;
                        }
                        Err(e) => {
                            warn!("Failed to parse WebSocket message: {}", e);
                            let _ = reply_tx.send(WsMessage::error(format!("malformed message: {}", e), None));
                        }
                    }
                }
                Message::Close(_) => {
                    debug!("WebSocket client disconnected");
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    info!("WebSocket connection closed");
}

/// Handle messages received from the WebSocket client
async fn handle_client_message(
    msg: WsMessage,
    state: &Arc<ServerState>,
    sequencer: &Arc<Mutex<Sequencer>>,
    reply_tx: &mpsc::UnboundedSender<WsMessage>,
) {
    match msg {
        WsMessage::Search { sequence, options } => {
            if !sequencer.lock().await.observe(sequence) {
                debug!("Dropping stale search {}", sequence);
                return;
            }
            let state = Arc::clone(state);
            let sequencer = Arc::clone(sequencer);
            let reply_tx = reply_tx.clone();
            tokio::spawn(async move {
                let reply = run_search(&state, sequence, &options).await;
                // A newer search arrived while this one ran.
                if !sequencer.lock().await.is_current(sequence) {
                    debug!("Discarding superseded search {}", sequence);
                    return;
                }
                let _ = reply_tx.send(reply);
            });
        }
        WsMessage::Ping => {
            let _ = reply_tx.send(WsMessage::Pong);
        }
        WsMessage::Pong => {}
        other => {
            debug!("Ignoring client message: {:?}", other);
        }
    }
}

async fn run_search(state: &ServerState, sequence: u64, options: &SearchOptions) -> WsMessage {
    let guard = state.explorer.read().await;
    let Some(explorer) = guard.as_ref() else {
        return WsMessage::error("no repository is open", Some(sequence));
    };
    match explorer.search(options) {
        Ok(results) => WsMessage::SearchResults { sequence, results },
        Err(e) => WsMessage::error(e.to_string(), Some(sequence)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_message_serialization() {
        let json = serde_json::to_string(&WsMessage::Ping).unwrap();
        assert_eq!(json, r#"{"type":"ping"}"#);

        let json = serde_json::to_string(&WsMessage::error("boom", Some(3))).unwrap();
        assert_eq!(json, r#"{"type":"error","message":"boom","sequence":3}"#);

        let msg: WsMessage =
            serde_json::from_str(r#"{"type":"search","sequence":7,"options":{"query":"main","useRegex":true}}"#).unwrap();
        match msg {
            WsMessage::Search { sequence, options } => {
                assert_eq!(sequence, 7);
                assert!(options.use_regex);
                assert_eq!(options.max_results, 50);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }
}
