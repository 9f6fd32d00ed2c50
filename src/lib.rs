//! Memory Session Library
//!
//! This crate serves a multiplayer card-matching ("memory") game over
//! WebSockets.
//!
//! # Overview
//!
//! - **Deck Builder** - Shuffled decks of pairs with cosmetic placement data.
//!
//! - **Game** - Per-session state machine (`waiting` → `active` → `finished`)
//!   enforcing turn order and match rules in `classic` and `rush` modes.
//!
//! - **Game Manager** - Registry of live games: collision-free ids, lookup,
//!   joins and lazy reaping of finished or abandoned games.
//!
//! - **Connection Bridge** - Per-player reader and writer loops so that no
//!   socket can stall the rule engine.
//!
//! # Example
//!
//! ```rust
//! use memory_session::config::GameSettings;
//! use memory_session::state::{
//!     outbound_queue, GameManager, GameMode, GameParams, GameRng, ServerMessage,
//! };
//!
//! let manager = GameManager::new(GameSettings::default(), GameRng::new(1));
//! let params = GameParams {
//!     pair_count: 5,
//!     mode: GameMode::Classic,
//!     max_players: 2,
//!     cosmetics: Default::default(),
//! };
//! let game_id = manager.create_game(params);
//!
//! let (tx, mut rx) = outbound_queue();
//! let (player_id, game) = manager.join_game(&game_id, tx).unwrap();
//! assert!(matches!(rx.try_recv(), Ok(ServerMessage::Init { .. })));
//!
//! game.lock().handle_flip(player_id, 0).unwrap();
//! ```

pub mod config;
pub mod logging;
pub mod server;
pub mod state;

pub use state::*;
