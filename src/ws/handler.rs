//! WebSocket upgrade handler

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::{GameService, PlayerId};
use crate::matchmaking::{Outbound, OutboundRx};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.game))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, game: Arc<GameService>) {
    let (ws_sink, ws_stream) = socket.split();

    let (player_id, slot, outbound_rx) = game.connect();
    info!(player_id = %player_id, slot = ?slot, "New WebSocket connection");

    run_session(&game, &player_id, ws_sink, ws_stream, outbound_rx).await;

    // Same path whether the client closed, the socket failed, or the
    // liveness sweep reclaimed the connection
    game.disconnect(&player_id);

    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    game: &Arc<GameService>,
    player_id: &PlayerId,
    ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    outbound_rx: OutboundRx,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    // Writer task: outbound queue -> WebSocket
    let mut writer_handle = tokio::spawn(run_writer(player_id.clone(), ws_sink, outbound_rx));

    // Reader loop: WebSocket -> session
    loop {
        let result = tokio::select! {
            next = ws_stream.next() => match next {
                Some(result) => result,
                None => break,
            },
            _ = &mut writer_handle => {
                debug!(player_id = %player_id, "Writer finished, ending session");
                return;
            }
        };

        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check() {
                    warn!(player_id = %player_id, "Rate limited inbound message");
                    continue;
                }

                match ClientMsg::parse(&text) {
                    Some(msg) => game.handle_message(player_id, msg),
                    None => {
                        warn!(player_id = %player_id, message = %text, "Message of unknown format ignored");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(player_id = %player_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                game.mark_alive(player_id);
            }
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Drain the outbound queue into the socket until it closes or fails
async fn run_writer(
    player_id: PlayerId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: OutboundRx,
) {
    while let Some(outbound) = outbound_rx.recv().await {
        let result = match outbound {
            Outbound::Message(msg) => send_msg(&mut ws_sink, &msg).await,
            Outbound::Ping => ws_sink
                .send(Message::Ping(Vec::new()))
                .await
                .map_err(|e| e.to_string()),
            Outbound::Close => {
                let _ = ws_sink.send(Message::Close(None)).await;
                debug!(player_id = %player_id, "Connection closed by server");
                break;
            }
        };

        if let Err(e) = result {
            debug!(player_id = %player_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
