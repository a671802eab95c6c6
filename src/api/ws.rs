// Push socket: one per browser tab, fed by the notification dispatcher

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info};

use crate::app_state::AppState;
use crate::infrastructure::middleware::Vc;
use crate::infrastructure::ConnectionRegistry;
use crate::models::UserId;

pub async fn ws_handler(vc: Vc, State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let registry = state.dispatcher.registry().clone();
    let user_id = vc.user_id;
    ws.on_upgrade(move |socket| handle_socket(registry, user_id, socket))
}

async fn handle_socket(registry: ConnectionRegistry, user_id: UserId, socket: WebSocket) {
    let (subscriber_id, mut outbound) = registry.add_subscriber(user_id).await;
    let (mut sender, mut receiver) = socket.split();
    info!("User {} connected a push socket", user_id);

    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Clients only listen; pings are answered by axum.
                Some(Ok(_)) => {}
            },
        }
    }

    registry.remove_subscriber(user_id, subscriber_id).await;
    debug!("User {} push socket closed", user_id);
}
