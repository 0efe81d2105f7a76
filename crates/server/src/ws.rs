use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use plate_pubsub::{Identity, OutboundMessage, SubscriberHandle};
use plate_types::{CloseReason, SubscribeRequest, UnsubscribeRequest};

use crate::state::AppState;

const OUTBOUND_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Subscribe(SubscribeRequest),
    Unsubscribe(UnsubscribeRequest),
}

/// `GET /v1/ws`: the bidirectional subscription interface. Origin
/// allow-listing happens here, before the upgrade completes; the wire
/// framing for subscribe/unsubscribe/events beyond the canonical shapes in
/// `plate_types::event` is this crate's own choice.
pub async fn upgrade(State(state): State<AppState>, headers: axum::http::HeaderMap, ws: WebSocketUpgrade) -> impl IntoResponse {
    if !origin_allowed(&state, &headers) {
        return axum::http::StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn origin_allowed(state: &AppState, headers: &axum::http::HeaderMap) -> bool {
    if state.transport.allowed_origins.iter().any(|o| o == "*") {
        return true;
    }
    let Some(origin) = headers.get(axum::http::header::ORIGIN).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    state.transport.allowed_origins.iter().any(|o| o == origin)
}

#[instrument(skip(socket, state))]
async fn handle_socket(socket: WebSocket, state: AppState) {
    let subscriber_id = Uuid::new_v4().to_string();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(OUTBOUND_QUEUE_CAPACITY);
    let handle = SubscriberHandle::new(subscriber_id.clone(), tx);

    let mut heartbeat = tokio::time::interval(state.transport.heartbeat_interval);
    heartbeat.tick().await; // first tick fires immediately; consume it
    let mut awaiting_pong = false;
    let idle_timeout = state.transport.idle_timeout;
    let mut idle = Box::pin(tokio::time::sleep(idle_timeout));

    let close_reason = loop {
        tokio::select! {
            biased;

            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        idle.as_mut().reset(tokio::time::Instant::now() + idle_timeout);
                        handle_client_message(&state, &handle, &text).await;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        awaiting_pong = false;
                        idle.as_mut().reset(tokio::time::Instant::now() + idle_timeout);
                    }
                    Some(Ok(Message::Close(_))) | None => break None,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(%e, "websocket read error");
                        break None;
                    }
                }
            }

            outbound = rx.recv() => {
                match outbound {
                    Some(msg) => {
                        if let Some(text) = encode(&msg) {
                            if sink.send(Message::Text(text)).await.is_err() {
                                break None;
                            }
                        }
                    }
                    None => break None,
                }
            }

            _ = heartbeat.tick() => {
                if awaiting_pong {
                    break Some(CloseReason::HeartbeatTimeout);
                }
                awaiting_pong = true;
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break None;
                }
            }

            () = &mut idle => {
                break Some(CloseReason::IdleTimeout);
            }
        }
    };

    state.orchestrator.forget_subscriber(&subscriber_id);
    if let Some(reason) = close_reason {
        debug!(?reason, %subscriber_id, "closing websocket subscriber");
        let _ = sink.send(Message::Close(Some(axum::extract::ws::CloseFrame {
            code: 1000,
            reason: format!("{reason:?}").into(),
        })))
        .await;
    }
}

async fn handle_client_message(state: &AppState, handle: &SubscriberHandle, text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe(req)) => {
            let identity = Identity { user_id: req.user_id, session_id: req.session_id };
            state.orchestrator.subscribe(req.channel, &req.request_id, handle.clone(), identity).await;
        }
        Ok(ClientMessage::Unsubscribe(req)) => {
            state.orchestrator.unsubscribe(req.channel, &req.request_id, &handle.id);
        }
        Err(e) => {
            warn!(error = %e, "dropping malformed subscription message");
        }
    }
}

fn encode(msg: &OutboundMessage) -> Option<String> {
    let value = match msg {
        OutboundMessage::Ack(ack) => serde_json::to_string(ack),
        OutboundMessage::Event(event) => serde_json::to_string(event),
    };
    value.inspect_err(|e| warn!(%e, "failed to encode outbound subscription message")).ok()
}
