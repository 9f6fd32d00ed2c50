//! Players attached to a game.
//!
//! A `Player` is the game's view of one live connection: an id, a score and
//! the sending half of that connection's outbound queue. The socket itself
//! belongs to the connection bridge; the game only ever pushes messages into
//! the queue. Dropping the `Player` closes the queue, which ends the
//! bridge's writer loop.

use tokio::sync::mpsc;

use super::protocol::{PlayerScore, ServerMessage};

/// Opaque player handle, assigned at join.
pub type PlayerId = u64;

/// Sending half of a player's outbound queue.
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

/// Receiving half of a player's outbound queue.
pub type OutboundReceiver = mpsc::UnboundedReceiver<ServerMessage>;

/// Create a new outbound queue.
pub fn outbound_queue() -> (Outbound, OutboundReceiver) {
    mpsc::unbounded_channel()
}

/// A player in a game.
#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub score: u32,
    /// False once the connection is gone
    pub active: bool,
    outbound: Outbound,
}

impl Player {
    pub fn new(id: PlayerId, outbound: Outbound) -> Self {
        Self {
            id,
            score: 0,
            active: true,
            outbound,
        }
    }

    /// Queue a message for this player.
    ///
    /// Never blocks. If the writer loop has already gone away the player is
    /// marked inactive and the message is dropped.
    pub fn send(&mut self, message: ServerMessage) {
        if self.outbound.send(message).is_err() {
            self.active = false;
        }
    }

    pub fn score_entry(&self) -> PlayerScore {
        PlayerScore {
            player: self.id,
            score: self.score,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "score": self.score,
            "active": self.active
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_new() {
        let (tx, _rx) = outbound_queue();
        let player = Player::new(7, tx);
        assert_eq!(player.id, 7);
        assert_eq!(player.score, 0);
        assert!(player.active);
    }

    #[test]
    fn test_send_queues_in_order() {
        let (tx, mut rx) = outbound_queue();
        let mut player = Player::new(1, tx);

        player.send(ServerMessage::Turn { player: 1 });
        player.send(ServerMessage::Leave { player: 2 });

        assert_eq!(rx.try_recv().unwrap(), ServerMessage::Turn { player: 1 });
        assert_eq!(rx.try_recv().unwrap(), ServerMessage::Leave { player: 2 });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (tx, rx) = outbound_queue();
        let mut player = Player::new(1, tx);
        drop(rx);

        player.send(ServerMessage::Turn { player: 1 });
        assert!(!player.active);
    }

    #[test]
    fn test_drop_closes_queue() {
        let (tx, mut rx) = outbound_queue();
        let player = Player::new(1, tx);
        drop(player);
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
