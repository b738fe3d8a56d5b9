use std::collections::HashSet;

use axum::{
    debug_handler,
    extract::{ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::{broadcast, mpsc};

use crate::{requests::store as requests, AppResult};

use super::{registry::RoomRegistry, room, store};

/// Wire shape of the `receiveMessage` event fanned out to a room.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveMessage {
    pub first_name: String,
    pub last_name: String,
    pub text: String,
    pub timestamp: i64,
    pub sender_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendMessage {
    pub first_name: String,
    pub last_name: String,
    pub sender_id: String,
    pub text: String,
    pub target_user_id: String,
    pub timestamp: i64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub(crate) enum ClientEvent {
    JoinChat { user_id: String, target_user_id: String },
    SendMessage(SendMessage),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ServerEvent {
    ReceiveMessage(ReceiveMessage),
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat_ws(
    State(db_pool): State<SqlitePool>,
    State(rooms): State<RoomRegistry>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session(socket, db_pool, rooms))
}

/// One realtime session. Frames arrive sequentially; every joined room
/// forwards into a single writer task so broadcasts from different rooms
/// cannot interleave mid-frame on the socket.
async fn session(socket: WebSocket, db_pool: SqlitePool, rooms: RoomRegistry) {
    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ReceiveMessage>(64);

    let mut writer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            let Ok(frame) = serde_json::to_string(&ServerEvent::ReceiveMessage(message)) else {
                continue;
            };
            if sender.send(frame.into()).await.is_err() {
                break;
            }
        }
    });

    let mut joined = HashSet::new();
    let mut forwards = Vec::new();

    loop {
        tokio::select! {
            _ = &mut writer => break,
            frame = receiver.next() => {
                let Some(Ok(frame)) = frame else {
                    break;
                };
                let Ok(event) = serde_json::from_slice::<ClientEvent>(&frame.into_data()) else {
                    continue;
                };

                match event {
                    ClientEvent::JoinChat { user_id, target_user_id } => {
                        // joining is not authorized; only sending is gated
                        let room_id = room::room_id(&user_id, &target_user_id);
                        if !joined.insert(room_id.clone()) {
                            continue;
                        }

                        let mut rx = rooms.join(&room_id);
                        let out_tx = out_tx.clone();
                        forwards.push(tokio::spawn(async move {
                            loop {
                                match rx.recv().await {
                                    Ok(message) => {
                                        if out_tx.send(message).await.is_err() {
                                            break;
                                        }
                                    }
                                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                                    Err(broadcast::error::RecvError::Closed) => break,
                                }
                            }
                        }));
                    }
                    ClientEvent::SendMessage(message) => {
                        if let Err(err) = handle_send(&db_pool, &rooms, message).await {
                            tracing::warn!("sendMessage failed: {err:?}");
                        }
                    }
                }
            }
        }
    }

    // disconnect releases connection-local state only
    writer.abort();
    for forward in forwards {
        forward.abort();
    }
}

/// Authorize, persist, broadcast. An unauthorized send is a silent no-op:
/// nothing is persisted or broadcast, and the sender gets no error frame.
pub(crate) async fn handle_send(
    db_pool: &SqlitePool,
    rooms: &RoomRegistry,
    message: SendMessage,
) -> AppResult<()> {
    if !requests::accepted_between(db_pool, &message.sender_id, &message.target_user_id).await? {
        tracing::debug!(
            sender = %message.sender_id,
            target = %message.target_user_id,
            "dropping message without an accepted connection",
        );
        return Ok(());
    }

    let conversation =
        store::get_or_create(db_pool, &message.sender_id, &message.target_user_id).await?;
    store::append(
        db_pool,
        &conversation.id,
        &message.sender_id,
        &message.text,
        message.timestamp,
    )
    .await?;

    let room_id = room::room_id(&message.sender_id, &message.target_user_id);
    rooms.publish(
        &room_id,
        ReceiveMessage {
            first_name: message.first_name,
            last_name: message.last_name,
            text: message.text,
            timestamp: message.timestamp,
            sender_id: message.sender_id,
        },
    );

    Ok(())
}
