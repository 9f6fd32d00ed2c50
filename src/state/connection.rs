//! Connection bridge.
//!
//! Each attached player gets two loops: a reader that decodes inbound frames
//! and applies them to the game, and a writer that drains the player's
//! outbound queue onto the socket. The game never waits on a socket; a
//! stalled client only backs up its own queue.
//!
//! The loops work on [`Frame`]s over any `Stream`/`Sink` pair so that the
//! transport (axum's WebSocket in production, in-memory channels in tests)
//! stays outside this module.

use std::fmt::Display;
use std::sync::Arc;

use futures::{pin_mut, Sink, SinkExt, Stream, StreamExt};
use tracing::{debug, info, warn};

use super::manager::{GameManager, ManagerError, SharedGame};
use super::player::{outbound_queue, OutboundReceiver, PlayerId};
use super::protocol::{ClientMessage, ServerMessage};

/// A transport frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Close,
}

/// Attach a connection to a game and run it until it ends.
///
/// Unknown or full games get an error message followed by a close frame.
pub async fn serve_connection<S, K, E>(
    manager: Arc<GameManager>,
    game_id: String,
    incoming: S,
    outgoing: K,
) where
    S: Stream<Item = Result<Frame, E>>,
    K: Sink<Frame> + Send + 'static,
    K::Error: Display + Send,
    E: Display,
{
    let (tx, rx) = outbound_queue();

    let (player_id, game) = match manager.join_game(&game_id, tx) {
        Ok(joined) => joined,
        Err(err) => {
            let message = match err {
                ManagerError::NotFound => {
                    warn!(game_id = %game_id, "websocket request with invalid game id");
                    ServerMessage::ErrGameId { gid: game_id }
                }
                ManagerError::Full { max } => {
                    warn!(game_id = %game_id, max, "websocket request for full game");
                    ServerMessage::ErrGameFull { gid: game_id, max }
                }
            };
            reject(outgoing, message).await;
            return;
        }
    };

    let writer = tokio::spawn(write_loop(outgoing, rx, player_id));
    read_loop(incoming, game, player_id).await;

    // Dropping the player closes its queue, which ends the writer.
    if manager.leave_game(&game_id, player_id).is_some() {
        info!(game_id = %game_id, player_id, "connection closed");
    }

    if let Err(err) = writer.await {
        warn!(player_id, %err, "writer task failed");
    }
}

/// Send a single fatal message and close.
async fn reject<K>(outgoing: K, message: ServerMessage)
where
    K: Sink<Frame>,
    K::Error: Display,
{
    pin_mut!(outgoing);
    let text = match message.to_text() {
        Ok(text) => text,
        Err(err) => {
            warn!(%err, "failed to encode error message");
            return;
        }
    };
    if let Err(err) = outgoing.send(Frame::Text(text)).await {
        debug!(%err, "failed to send error message");
        return;
    }
    let _ = outgoing.send(Frame::Close).await;
}

/// Decode inbound frames and apply them to the game until the connection
/// closes or fails.
pub async fn read_loop<S, E>(incoming: S, game: SharedGame, player_id: PlayerId)
where
    S: Stream<Item = Result<Frame, E>>,
    E: Display,
{
    pin_mut!(incoming);

    while let Some(frame) = incoming.next().await {
        match frame {
            Ok(Frame::Text(text)) => match ClientMessage::parse(&text) {
                Ok(ClientMessage::Flip { index }) => {
                    // Outcome and rejections are reported through the queues.
                    let _ = game.lock().handle_flip(player_id, index);
                }
                Err(err) => debug!(player_id, %err, "ignoring malformed message"),
            },
            Ok(Frame::Close) => break,
            Err(err) => {
                debug!(player_id, %err, "connection error");
                break;
            }
        }
    }
}

/// Drain the outbound queue onto the connection.
pub async fn write_loop<K>(outgoing: K, mut outbound: OutboundReceiver, player_id: PlayerId)
where
    K: Sink<Frame>,
    K::Error: Display,
{
    pin_mut!(outgoing);

    while let Some(message) = outbound.recv().await {
        let text = match message.to_text() {
            Ok(text) => text,
            Err(err) => {
                warn!(player_id, %err, "failed to encode message");
                continue;
            }
        };
        if let Err(err) = outgoing.send(Frame::Text(text)).await {
            debug!(player_id, %err, "write failed");
            return;
        }
    }

    let _ = outgoing.send(Frame::Close).await;
}
