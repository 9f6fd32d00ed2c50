//! WebSocket message protocol.
//!
//! One JSON object per frame. Every object carries a `msg` discriminator.

use serde::{Deserialize, Serialize};

use super::player::PlayerId;

/// Messages sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "msg", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Unknown game id; the connection is closed afterwards.
    #[serde(rename = "err_gameid")]
    ErrGameId { gid: String },

    /// Game at capacity; the connection is closed afterwards.
    #[serde(rename = "err_gamefull")]
    ErrGameFull { gid: String, max: usize },

    /// Sent to a player right after joining.
    Init {
        player: PlayerId,
        game: serde_json::Value,
    },

    Join {
        player: PlayerId,
        players: Vec<PlayerScore>,
    },

    Leave { player: PlayerId },

    /// First card of a pair turned up.
    Flip {
        player: PlayerId,
        index: usize,
        pair_key: usize,
    },

    Match {
        player: PlayerId,
        indices: [usize; 2],
        pair_key: usize,
        score: u32,
    },

    /// Both cards are already face down again on the server; clients show
    /// them for `hide_after_ms` before hiding.
    Mismatch {
        player: PlayerId,
        cards: [RevealedCard; 2],
        hide_after_ms: u64,
    },

    Turn { player: PlayerId },

    GameOver { ranking: Vec<PlayerScore> },

    /// A flip that was refused; sent only to the player who tried it.
    Reject { index: usize, reason: String },
}

impl ServerMessage {
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A player's id and score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlayerScore {
    pub player: PlayerId,
    pub score: u32,
}

/// A face-up card in a mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RevealedCard {
    pub index: usize,
    pub pair_key: usize,
}

/// Messages sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "msg", rename_all = "snake_case")]
pub enum ClientMessage {
    Flip { index: usize },
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_error_messages() {
        let msg = ServerMessage::ErrGameId {
            gid: "abc123".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"msg": "err_gameid", "gid": "abc123"})
        );

        let msg = ServerMessage::ErrGameFull {
            gid: "abc123".to_string(),
            max: 2,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"msg": "err_gamefull", "gid": "abc123", "max": 2})
        );
    }

    #[test]
    fn test_game_events() {
        let msg = ServerMessage::Mismatch {
            player: 1,
            cards: [
                RevealedCard { index: 0, pair_key: 3 },
                RevealedCard { index: 5, pair_key: 1 },
            ],
            hide_after_ms: 1000,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "msg": "mismatch",
                "player": 1,
                "cards": [{"index": 0, "pair_key": 3}, {"index": 5, "pair_key": 1}],
                "hide_after_ms": 1000
            })
        );

        let msg = ServerMessage::GameOver {
            ranking: vec![PlayerScore { player: 2, score: 3 }],
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"msg": "game_over", "ranking": [{"player": 2, "score": 3}]})
        );
    }

    #[test]
    fn test_parse_client_flip() {
        assert_eq!(
            ClientMessage::parse(r#"{"msg":"flip","index":4}"#).unwrap(),
            ClientMessage::Flip { index: 4 }
        );
        assert!(ClientMessage::parse(r#"{"msg":"dance"}"#).is_err());
        assert!(ClientMessage::parse("not json").is_err());
    }
}
