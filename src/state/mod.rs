//! Game session state.
//!
//! - `deck` - Card and deck construction
//! - `rng` - Seeded randomness for shuffles and ids
//! - `params` - Typed game creation parameters
//! - `player` - Players and their outbound queues
//! - `game` - Per-game state machine and rules
//! - `manager` - Registry of live games, creation and reaping
//! - `protocol` - WebSocket messages
//! - `connection` - Reader/writer loops bridging sockets and games
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          GameManager                             │
//! │                                                                  │
//! │   RwLock< game_id → Arc<Mutex<Game>> >         Mutex<GameRng>    │
//! │                                                                  │
//! │   ┌─────────────────────────────┐                                │
//! │   │ Game                        │                                │
//! │   │  cards, turn, pending card  │                                │
//! │   │  players ─────────────┐     │                                │
//! │   └───────────────────────┼─────┘                                │
//! └───────────────────────────┼──────────────────────────────────────┘
//!                             │ outbound queue (mpsc)
//!                             ▼
//!          ┌─────────────────────────────────────┐
//!          │ Connection bridge (per player)      │
//!          │   reader loop ──▶ Game::handle_flip │
//!          │   writer loop ◀── outbound queue    │
//!          └─────────────────────────────────────┘
//! ```

pub mod connection;
pub mod deck;
pub mod game;
pub mod manager;
pub mod params;
pub mod player;
pub mod protocol;
pub mod rng;

use std::sync::Arc;

// Re-export commonly used types
pub use connection::{read_loop, serve_connection, write_loop, Frame};
pub use deck::{build_deck, Card, Cosmetics, Layout, Placement, Rotation};
pub use game::{FlipOutcome, Game, GameError, GameMode, GameStatus};
pub use manager::{GameManager, ManagerError, SharedGame};
pub use params::{GameParams, ParamWarning};
pub use player::{outbound_queue, Outbound, OutboundReceiver, Player, PlayerId};
pub use protocol::{ClientMessage, PlayerScore, RevealedCard, ServerMessage};
pub use rng::{GameRng, GAME_ID_LEN};

use crate::config::AppConfig;

/// Shared application state handed to request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub games: Arc<GameManager>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Build the state, seeding the RNG once.
    pub fn new(config: AppConfig) -> Self {
        let rng = match config.game.rng_seed {
            Some(seed) => GameRng::new(seed),
            None => GameRng::from_entropy(),
        };
        tracing::info!(seed = rng.seed(), "random source seeded");

        Self {
            games: Arc::new(GameManager::new(config.game.clone(), rng)),
            config: Arc::new(config),
        }
    }

    /// Parse creation parameters, log fallbacks, reap stale games and
    /// create a new one.
    pub fn create_game(&self, query: &std::collections::HashMap<String, String>) -> String {
        self.games.clean_games();

        let (params, warnings) = GameParams::from_query(query, &self.config.game);
        for warning in &warnings {
            tracing::warn!(key = warning.key, "{}", warning);
        }
        self.games.create_game(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_app_state_create() {
        let mut config = AppConfig::default();
        config.game.rng_seed = Some(4);
        let state = AppState::new(config);

        let query: HashMap<String, String> = [("n", "5"), ("t", "2"), ("m", "2")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let id = state.create_game(&query);

        let shared = state.games.get_game(&id).unwrap();
        let game = shared.lock();
        assert_eq!(game.cards().len(), 10);
        assert_eq!(game.mode, GameMode::Rush);
        assert_eq!(game.max_players, 2);
    }

    #[test]
    fn test_same_seed_same_ids() {
        let mut config = AppConfig::default();
        config.game.rng_seed = Some(99);
        let a = AppState::new(config.clone());
        let b = AppState::new(config);

        let query = HashMap::new();
        assert_eq!(a.create_game(&query), b.create_game(&query));
    }
}
