//! Websocket endpoint clients register on
//!
//! One task per socket: the read loop feeds the registry, a forward task
//! drains the client's outbound channel into the socket. When the registry
//! drops the client's sender the forward task closes the socket.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::protocol::{MessageType, RelayMessage};
use crate::registry::{PeerRegistry, Registration};
use crate::routes::RelayState;

/// Query string of the websocket upgrade
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectParams {
    pub key: Option<String>,
    pub id: Option<String>,
    pub token: Option<String>,
}

/// Check the upgrade parameters, returning `(id, token)` or the frame to
/// reject the client with.
pub fn admit(params: &ConnectParams, key: &str) -> Result<(String, String), RelayMessage> {
    let present = |value: &Option<String>| value.as_deref().filter(|v| !v.is_empty()).map(str::to_string);
    let (Some(client_key), Some(id), Some(token)) =
        (present(&params.key), present(&params.id), present(&params.token))
    else {
        return Err(RelayMessage::error("No id, token, or key supplied to websocket server"));
    };
    if client_key != key {
        return Err(RelayMessage::error("Invalid key provided"));
    }
    Ok((id, token))
}

pub async fn relay_socket(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<RelayState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

async fn handle_socket(socket: WebSocket, params: ConnectParams, state: RelayState) {
    let (mut sink, mut stream) = socket.split();

    let (id, token) = match admit(&params, &state.config.key) {
        Ok(admitted) => admitted,
        Err(rejection) => {
            warn!("Rejected websocket client {:?}", params.id);
            reject(&mut sink, rejection).await;
            return;
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let connection = match state.registry.register(&id, &token, tx) {
        Registration::Accepted { connection } => connection,
        Registration::IdTaken => {
            reject(&mut sink, RelayMessage::id_taken()).await;
            return;
        }
        Registration::LimitReached => {
            reject(
                &mut sink,
                RelayMessage::error("Server has reached its concurrent user limit"),
            )
            .await;
            return;
        }
    };

    let forward = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode relay message: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_text(&state.registry, &id, &text),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Websocket error for {}: {}", id, e);
                break;
            }
        }
    }

    state.registry.unregister(&id, connection);
    forward.abort();
}

fn handle_text(registry: &PeerRegistry, id: &str, text: &str) {
    let message = match RelayMessage::parse(text) {
        Ok(message) => message,
        Err(e) => {
            warn!("Ignoring frame from {}: {}", id, e);
            return;
        }
    };
    match message.kind {
        MessageType::Heartbeat => registry.heartbeat(id),
        kind if kind.is_relayed() => {
            registry.route(id, message);
        }
        kind => warn!("Ignoring {:?} from {}", kind, id),
    }
}

async fn reject(sink: &mut SplitSink<WebSocket, Message>, message: RelayMessage) {
    if let Ok(text) = message.to_json() {
        let _ = sink.send(Message::Text(text)).await;
    }
    let _ = sink.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(key: &str, id: &str, token: &str) -> ConnectParams {
        ConnectParams {
            key: Some(key.into()),
            id: Some(id.into()),
            token: Some(token.into()),
        }
    }

    #[test]
    fn test_admit_accepts_matching_key() {
        let admitted = admit(&params("peerjs", "customer-1", "t1"), "peerjs").unwrap();
        assert_eq!(admitted, ("customer-1".to_string(), "t1".to_string()));
    }

    #[test]
    fn test_admit_rejects_wrong_key() {
        let rejection = admit(&params("other", "customer-1", "t1"), "peerjs").unwrap_err();
        assert_eq!(rejection, RelayMessage::error("Invalid key provided"));
    }

    #[test]
    fn test_admit_rejects_missing_fields() {
        let rejection = admit(&ConnectParams::default(), "peerjs").unwrap_err();
        assert_eq!(rejection.kind, MessageType::Error);

        let empty_id = params("peerjs", "", "t1");
        assert!(admit(&empty_id, "peerjs").is_err());
    }
}
