//! Game state management.
//!
//! A `Game` owns one session's deck, its attached players, the turn pointer
//! and the lifecycle timestamps. All rule enforcement for flips, matches
//! and turn rotation lives here. A `Game` is not thread-safe on its own; the
//! [`GameManager`](super::manager::GameManager) wraps each one in a mutex so
//! that every mutating operation is serialized.
//!
//! # State Diagram
//!
//! ```text
//! ┌─────────┐  first accepted flip  ┌────────┐  last pair matched  ┌──────────┐
//! │ Waiting │──────────────────────▶│ Active │────────────────────▶│ Finished │
//! └─────────┘                       └────────┘                     └──────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::deck::{Card, Cosmetics};
use super::player::{Player, PlayerId};
use super::protocol::{PlayerScore, RevealedCard, ServerMessage};

/// Rule variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// One player at a time; a mismatch passes the turn
    #[default]
    Classic,
    /// Anyone may flip at any time
    Rush,
}

impl GameMode {
    /// Parse the numeric code used in creation requests.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Classic),
            2 => Some(Self::Rush),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Rush => "rush",
        }
    }
}

/// Game state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameStatus {
    /// Players may join, no card flipped yet
    #[default]
    Waiting,
    /// At least one flip accepted
    Active,
    /// Every pair matched
    Finished,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Finished => "finished",
        }
    }

    /// Check if game is terminal (cannot change).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// What an accepted flip did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlipOutcome {
    /// First card of a pair turned up
    Revealed { index: usize },
    /// Second card matched the first
    Matched { indices: [usize; 2] },
    /// Second card did not match; both are face down again
    Mismatched { indices: [usize; 2] },
    /// The final pair was matched
    Finished { ranking: Vec<PlayerScore> },
}

/// Game session state.
#[derive(Debug)]
pub struct Game {
    /// Six-character game id
    pub id: String,

    pub mode: GameMode,

    /// 0 means unlimited
    pub max_players: usize,

    pub cosmetics: Cosmetics,

    pub status: GameStatus,

    cards: Vec<Card>,

    /// Join order is turn order
    players: Vec<Player>,

    /// Holder of the turn (classic mode only)
    current_turn: Option<PlayerId>,

    /// Index of the single face-up unmatched card, if any
    pending: Option<usize>,

    /// How long clients keep a mismatched pair visible
    pub mismatch_reveal_ms: u64,

    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Updated on every flip, join and leave
    pub last_activity_at: chrono::DateTime<chrono::Utc>,

    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Game {
    /// Create a new game in the `Waiting` state.
    pub fn new(
        id: String,
        mode: GameMode,
        max_players: usize,
        cosmetics: Cosmetics,
        cards: Vec<Card>,
        mismatch_reveal_ms: u64,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id,
            mode,
            max_players,
            cosmetics,
            status: GameStatus::Waiting,
            cards,
            players: Vec::new(),
            current_turn: None,
            pending: None,
            mismatch_reveal_ms,
            created_at: now,
            last_activity_at: now,
            finished_at: None,
        }
    }

    /// Check if no more players can join.
    pub fn is_full(&self) -> bool {
        self.max_players != 0 && self.players.len() >= self.max_players
    }

    /// Add a player.
    ///
    /// The joiner receives an `init` snapshot, then everyone (joiner
    /// included) receives the `join` notification.
    pub fn add_player(&mut self, player: Player) -> Result<(), GameError> {
        if self.is_full() {
            return Err(GameError::Full);
        }

        if self.has_player(player.id) {
            return Err(GameError::AlreadyPlayer);
        }

        let player_id = player.id;
        let assign_turn = self.mode == GameMode::Classic && self.current_turn.is_none();
        if assign_turn {
            self.current_turn = Some(player_id);
        }

        self.players.push(player);
        self.touch();

        let snapshot = self.to_json();
        if let Some(player) = self.players.last_mut() {
            player.send(ServerMessage::Init {
                player: player_id,
                game: snapshot,
            });
        }

        let players = self.scores();
        self.broadcast(ServerMessage::Join {
            player: player_id,
            players,
        });
        if assign_turn {
            self.broadcast(ServerMessage::Turn { player: player_id });
        }

        info!(game_id = %self.id, player_id, players = self.players.len(), "player joined");
        Ok(())
    }

    /// Remove a player.
    ///
    /// If the player held the turn, it passes to the next player in join
    /// order. An empty game is left for the reaper.
    pub fn remove_player(&mut self, player_id: PlayerId) -> Option<Player> {
        let position = self.players.iter().position(|p| p.id == player_id)?;
        let player = self.players.remove(position);
        self.touch();

        self.broadcast(ServerMessage::Leave { player: player_id });

        if self.current_turn == Some(player_id) {
            // The pending card was turned by the leaving player.
            self.release_pending();
            self.current_turn = if self.players.is_empty() {
                None
            } else {
                Some(self.players[position % self.players.len()].id)
            };
            if let Some(next) = self.current_turn {
                self.broadcast(ServerMessage::Turn { player: next });
            }
        }

        info!(game_id = %self.id, player_id, players = self.players.len(), "player left");
        Some(player)
    }

    /// Handle a flip request.
    ///
    /// Rejected flips change nothing and are echoed only to the player who
    /// tried them.
    pub fn handle_flip(
        &mut self,
        player_id: PlayerId,
        index: usize,
    ) -> Result<FlipOutcome, GameError> {
        if let Err(err) = self.check_flip(player_id, index) {
            debug!(game_id = %self.id, player_id, index, %err, "flip rejected");
            if let Some(player) = self.get_player_mut(player_id) {
                player.send(ServerMessage::Reject {
                    index,
                    reason: err.to_string(),
                });
            }
            return Err(err);
        }

        if self.status == GameStatus::Waiting {
            self.status = GameStatus::Active;
        }
        self.touch();
        self.cards[index].flipped = true;

        let first = match self.pending.take() {
            None => {
                self.pending = Some(index);
                let pair_key = self.cards[index].pair_key;
                self.broadcast(ServerMessage::Flip {
                    player: player_id,
                    index,
                    pair_key,
                });
                return Ok(FlipOutcome::Revealed { index });
            }
            Some(first) => first,
        };

        let indices = [first, index];
        if self.cards[first].pair_key == self.cards[index].pair_key {
            Ok(self.resolve_match(player_id, indices))
        } else {
            Ok(self.resolve_mismatch(player_id, indices))
        }
    }

    fn check_flip(&self, player_id: PlayerId, index: usize) -> Result<(), GameError> {
        if !self.has_player(player_id) {
            return Err(GameError::NotPlayer);
        }
        if self.status.is_terminal() {
            return Err(GameError::Finished);
        }
        let card = self.cards.get(index).ok_or(GameError::InvalidCard)?;
        if card.matched {
            return Err(GameError::AlreadyMatched);
        }
        if card.flipped {
            return Err(GameError::AlreadyFlipped);
        }
        if self.mode == GameMode::Classic && !self.is_player_turn(player_id) {
            return Err(GameError::NotYourTurn);
        }
        Ok(())
    }

    fn resolve_match(&mut self, player_id: PlayerId, indices: [usize; 2]) -> FlipOutcome {
        for i in indices {
            self.cards[i].matched = true;
        }
        let pair_key = self.cards[indices[0]].pair_key;

        let mut score = 0;
        if let Some(player) = self.get_player_mut(player_id) {
            player.score += 1;
            score = player.score;
        }

        // In classic mode the turn stays with the player who matched.
        self.broadcast(ServerMessage::Match {
            player: player_id,
            indices,
            pair_key,
            score,
        });

        if !self.cards.iter().all(|c| c.matched) {
            return FlipOutcome::Matched { indices };
        }

        self.status = GameStatus::Finished;
        self.finished_at = Some(chrono::Utc::now());
        let ranking = self.ranking();
        self.broadcast(ServerMessage::GameOver {
            ranking: ranking.clone(),
        });

        info!(game_id = %self.id, winner = ?ranking.first().map(|r| r.player), "game finished");
        FlipOutcome::Finished { ranking }
    }

    fn resolve_mismatch(&mut self, player_id: PlayerId, indices: [usize; 2]) -> FlipOutcome {
        for i in indices {
            self.cards[i].flipped = false;
        }

        let cards = indices.map(|i| RevealedCard {
            index: i,
            pair_key: self.cards[i].pair_key,
        });
        let hide_after_ms = self.mismatch_reveal_ms;
        self.broadcast(ServerMessage::Mismatch {
            player: player_id,
            cards,
            hide_after_ms,
        });

        if self.mode == GameMode::Classic {
            if let Some(next) = self.advance_turn() {
                self.broadcast(ServerMessage::Turn { player: next });
            }
        }

        FlipOutcome::Mismatched { indices }
    }

    /// Turn the pending card back down.
    fn release_pending(&mut self) {
        if let Some(index) = self.pending.take() {
            self.cards[index].flipped = false;
        }
    }

    /// Pass the turn to the next player in join order, wrapping.
    pub fn advance_turn(&mut self) -> Option<PlayerId> {
        if self.players.is_empty() {
            self.current_turn = None;
            return None;
        }

        let next = match self.current_position() {
            Some(pos) => (pos + 1) % self.players.len(),
            None => 0,
        };
        self.current_turn = Some(self.players[next].id);
        self.current_turn
    }

    fn current_position(&self) -> Option<usize> {
        let current = self.current_turn?;
        self.players.iter().position(|p| p.id == current)
    }

    /// Get current player ID (classic mode only).
    pub fn current_player_id(&self) -> Option<PlayerId> {
        self.current_turn
    }

    /// Check if it's a player's turn.
    pub fn is_player_turn(&self, player_id: PlayerId) -> bool {
        self.current_turn == Some(player_id)
    }

    /// Index of the face-up card waiting for its partner.
    pub fn pending_card(&self) -> Option<usize> {
        self.pending
    }

    /// Queue a message for every player.
    pub fn broadcast(&mut self, message: ServerMessage) {
        for player in &mut self.players {
            player.send(message.clone());
        }
    }

    /// Scores in join order.
    pub fn scores(&self) -> Vec<PlayerScore> {
        self.players.iter().map(|p| p.score_entry()).collect()
    }

    /// Scores sorted descending, ties broken by join order.
    pub fn ranking(&self) -> Vec<PlayerScore> {
        let mut ranking = self.scores();
        ranking.sort_by(|a, b| b.score.cmp(&a.score));
        ranking
    }

    /// Record activity.
    pub fn touch(&mut self) {
        self.last_activity_at = chrono::Utc::now();
    }

    /// Check whether the reaper should collect this game at `now`.
    ///
    /// Games with attached players are never stale.
    pub fn is_stale(
        &self,
        now: chrono::DateTime<chrono::Utc>,
        finished_grace: chrono::Duration,
        idle_threshold: chrono::Duration,
    ) -> bool {
        if !self.players.is_empty() {
            return false;
        }
        let finished_expired = self
            .finished_at
            .is_some_and(|finished_at| now - finished_at > finished_grace);
        finished_expired || now - self.last_activity_at > idle_threshold
    }

    /// Get a player.
    pub fn get_player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    /// Get a mutable player.
    pub fn get_player_mut(&mut self, player_id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    /// Check if player is in game.
    pub fn has_player(&self, player_id: PlayerId) -> bool {
        self.get_player(player_id).is_some()
    }

    /// Players in join order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Convert full game state to JSON snapshot.
    pub fn to_json(&self) -> serde_json::Value {
        let cards: Vec<serde_json::Value> = self.cards.iter().map(|c| c.to_json()).collect();
        let players: Vec<serde_json::Value> = self.players.iter().map(|p| p.to_json()).collect();

        serde_json::json!({
            "game_id": self.id,
            "mode": self.mode.as_str(),
            "max_players": self.max_players,
            "status": self.status.as_str(),
            "card_set": self.cosmetics.card_set,
            "layout": self.cosmetics.layout.as_str(),
            "rotation": self.cosmetics.rotation.as_str(),
            "cards": cards,
            "players": players,
            "current_turn": self.current_turn,
            "mismatch_reveal_ms": self.mismatch_reveal_ms
        })
    }
}

/// Game errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameError {
    Full,
    AlreadyPlayer,
    NotPlayer,
    Finished,
    InvalidCard,
    AlreadyMatched,
    AlreadyFlipped,
    NotYourTurn,
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "Game is full"),
            Self::AlreadyPlayer => write!(f, "Already a player in this game"),
            Self::NotPlayer => write!(f, "Not a player in this game"),
            Self::Finished => write!(f, "Game is over"),
            Self::InvalidCard => write!(f, "No such card"),
            Self::AlreadyMatched => write!(f, "Card is already matched"),
            Self::AlreadyFlipped => write!(f, "Card is already face up"),
            Self::NotYourTurn => write!(f, "It's not your turn"),
        }
    }
}

impl std::error::Error for GameError {}
