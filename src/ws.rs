//! The `/ws/market` real-time endpoint: connect-time authentication,
//! session registration, and the per-connection read/write loop bridging
//! inbound STOMP-like frames to the Session Lifecycle and outbound
//! envelopes from the Transport back to the socket.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, RawQuery, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::authenticate;
use crate::models::SubscribeActionRequest;
use crate::AppState;

const DESTINATION_SUBSCRIBE_ACTION: &str = "/app/market/subscribe";

/// One inbound STOMP-like frame. The real STOMP wire grammar isn't
/// implemented here — this is the minimal JSON shape that carries the same
/// three verbs: subscribe-to-topic, unsubscribe-from-topic, and
/// send-to-destination.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
enum ClientFrame {
    #[serde(rename = "subscribe")]
    Subscribe { destination: String },
    #[serde(rename = "unsubscribe")]
    Unsubscribe { destination: String },
    #[serde(rename = "send")]
    Send {
        destination: String,
        body: serde_json::Value,
    },
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    ConnectInfo(_addr): ConnectInfo<std::net::SocketAddr>,
) -> Response {
    let claims = match authenticate(&state.jwt_handler, query.as_deref(), &headers) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, claims.sub))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, user_id: String) {
    let session_id = Uuid::new_v4().to_string();
    let mut outbound = state.transport.register_session(&session_id);
    state.lifecycle.on_connect(&session_id);
    info!(session_id, user_id, "websocket session connected");

    loop {
        tokio::select! {
            envelope = outbound.recv() => {
                let Some(envelope) = envelope else { break };
                if socket.send(Message::Text(envelope.to_json_string())).await.is_err() {
                    break;
                }
            }
            frame = socket.recv() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_frame(&state, &session_id, &user_id, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(session_id, error = %err, "websocket read error");
                        break;
                    }
                }
            }
        }
    }

    state.transport.remove_session(&session_id);
    state.lifecycle.on_disconnect(&session_id).await;
    info!(session_id, "websocket session disconnected");
}

async fn handle_client_frame(state: &AppState, session_id: &str, user_id: &str, text: &str) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            debug!(session_id, error = %err, "ignoring unparseable client frame");
            return;
        }
    };

    match frame {
        ClientFrame::Subscribe { destination } => {
            state.transport.subscribe_topic(session_id, &destination);
            if destination.starts_with("/topic/market/") {
                state.lifecycle.on_topic_subscribe(session_id);
            }
        }
        ClientFrame::Unsubscribe { destination } => {
            state.transport.unsubscribe_topic(session_id, &destination);
        }
        ClientFrame::Send { destination, body } if destination == DESTINATION_SUBSCRIBE_ACTION => {
            let mut request: SubscribeActionRequest = match serde_json::from_value(body) {
                Ok(request) => request,
                Err(err) => {
                    warn!(session_id, error = %err, "malformed subscribe-action payload");
                    return;
                }
            };
            if request.user_id.is_none() {
                request.user_id = Some(user_id.to_string());
            }
            state
                .lifecycle
                .handle_subscribe_action(session_id, request)
                .await;
        }
        ClientFrame::Send { destination, .. } => {
            debug!(session_id, destination, "ignoring send to unrecognized destination");
        }
    }
}
