//! Live event feed over WebSocket.
//!
//! GET /ws
//!
//! Every connection becomes one event subscriber and receives each job event
//! as a JSON text frame. Text frames sent by the client are answered with
//! `Echo: <text>` on that connection only.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{Sink, SinkExt, Stream, StreamExt};

use scrapemaster_core::events::Subscription;
use scrapemaster_core::traits::{Extractor, Fetcher};

use crate::state::AppState;

/// Counts open WebSocket connections.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker(Arc<AtomicUsize>);

impl ConnectionTracker {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn open(&self) -> ConnectionGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard(Arc::clone(&self.0))
    }
}

struct ConnectionGuard(Arc<AtomicUsize>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub async fn ws_handler<F, E>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<F, E>>>,
) -> Response
where
    F: Fetcher,
    E: Extractor,
{
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket<F, E>(socket: WebSocket, state: Arc<AppState<F, E>>)
where
    F: Fetcher,
    E: Extractor,
{
    let _guard = state.connections.open();
    let events = state.orchestrator.subscribe();
    tracing::debug!(connections = state.connections.count(), "WebSocket connected");

    let (sink, stream) = socket.split();
    pump(sink, stream, events).await;

    tracing::debug!("WebSocket disconnected");
}

/// Forward events to `sink` and answer client text frames until either side
/// closes. A send failure ends this connection only.
pub async fn pump<Si, St>(mut sink: Si, mut stream: St, mut events: Subscription)
where
    Si: Sink<Message> + Unpin,
    St: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(kind = event.kind(), error = %e, "Event not serializable");
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let reply = format!("Echo: {}", text.as_str());
                    if sink.send(Message::Text(reply.into())).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    events.disconnect();
}
