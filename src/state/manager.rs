//! Game registry.
//!
//! The `GameManager` is the single owner of every live [`Game`]. The id to
//! game mapping sits behind a read-write lock and each game behind its own
//! mutex, so a busy game never blocks lookups or creation of others.
//!
//! Lock order is always registry first, then game.
//!
//! Stale games are reaped lazily by [`GameManager::clean_games`], which the
//! HTTP layer calls whenever a new game is requested.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use super::deck::build_deck;
use super::game::{Game, GameError, GameStatus};
use super::params::GameParams;
use super::player::{Outbound, Player, PlayerId};
use super::rng::GameRng;
use crate::config::GameSettings;

/// A game shared between the registry and the connections attached to it.
pub type SharedGame = Arc<Mutex<Game>>;

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerError {
    /// No live game with this id
    NotFound,
    /// Game already has `max` players
    Full { max: usize },
}

impl std::fmt::Display for ManagerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "Game not found"),
            Self::Full { max } => write!(f, "Game is full ({} players)", max),
        }
    }
}

impl std::error::Error for ManagerError {}

/// Game manager - tracks all live games.
#[derive(Debug)]
pub struct GameManager {
    games: RwLock<HashMap<String, SharedGame>>,
    rng: Mutex<GameRng>,
    settings: GameSettings,
    next_player_id: AtomicU64,
}

impl GameManager {
    pub fn new(settings: GameSettings, rng: GameRng) -> Self {
        Self {
            games: RwLock::new(HashMap::new()),
            rng: Mutex::new(rng),
            settings,
            next_player_id: AtomicU64::new(1),
        }
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Create a new game and return its id.
    pub fn create_game(&self, params: GameParams) -> String {
        let mut pair_count = params.pair_count;
        if pair_count == 0 {
            warn!(
                default = self.settings.default_pair_count,
                "invalid pair count 0, using default"
            );
            pair_count = self.settings.default_pair_count.max(1);
        }
        if pair_count > self.settings.max_pair_count {
            warn!(
                requested = pair_count,
                max = self.settings.max_pair_count,
                "pair count too large, clamping"
            );
            pair_count = self.settings.max_pair_count.max(1);
        }

        let cards = build_deck(pair_count, params.cosmetics, &mut self.rng.lock());

        let mut games = self.games.write();
        let id = loop {
            let candidate = self.rng.lock().game_id();
            if !games.contains_key(&candidate) {
                break candidate;
            }
        };

        let game = Game::new(
            id.clone(),
            params.mode,
            params.max_players,
            params.cosmetics,
            cards,
            self.settings.mismatch_reveal_ms,
        );
        games.insert(id.clone(), Arc::new(Mutex::new(game)));

        info!(
            game_id = %id,
            pairs = pair_count,
            mode = params.mode.as_str(),
            max_players = params.max_players,
            "game created"
        );
        id
    }

    /// Get a game.
    pub fn get_game(&self, game_id: &str) -> Result<SharedGame, ManagerError> {
        self.games
            .read()
            .get(game_id)
            .cloned()
            .ok_or(ManagerError::NotFound)
    }

    /// Attach a new player to a game.
    ///
    /// Runs under the registry read lock, so the reaper cannot remove the
    /// game between the lookup and the join.
    pub fn join_game(
        &self,
        game_id: &str,
        outbound: Outbound,
    ) -> Result<(PlayerId, SharedGame), ManagerError> {
        let games = self.games.read();
        let shared = games.get(game_id).ok_or(ManagerError::NotFound)?;

        let mut game = shared.lock();
        if game.is_full() {
            return Err(ManagerError::Full {
                max: game.max_players,
            });
        }

        let player_id = self.next_player_id.fetch_add(1, Ordering::Relaxed);
        match game.add_player(Player::new(player_id, outbound)) {
            Ok(()) => {}
            Err(GameError::Full) => {
                return Err(ManagerError::Full {
                    max: game.max_players,
                })
            }
            Err(err) => {
                // Ids are unique, so nothing else can fail here.
                warn!(game_id, player_id, %err, "unexpected join failure");
                return Err(ManagerError::NotFound);
            }
        }

        drop(game);
        Ok((player_id, Arc::clone(shared)))
    }

    /// Detach a player from a game, if both still exist.
    pub fn leave_game(&self, game_id: &str, player_id: PlayerId) -> Option<Player> {
        let shared = self.get_game(game_id).ok()?;
        let mut game = shared.lock();
        game.remove_player(player_id)
    }

    /// Remove finished and abandoned games. Returns the removed ids.
    pub fn clean_games(&self) -> Vec<String> {
        self.clean_games_at(chrono::Utc::now())
    }

    /// Remove games that are stale at `now`.
    pub fn clean_games_at(&self, now: chrono::DateTime<chrono::Utc>) -> Vec<String> {
        let grace = self.settings.finished_grace();
        let idle = self.settings.idle_threshold();

        let mut games = self.games.write();
        let stale: Vec<String> = games
            .iter()
            .filter(|(_, g)| g.lock().is_stale(now, grace, idle))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            games.remove(id);
        }
        drop(games);

        if !stale.is_empty() {
            info!(
                removed = stale.len(),
                ids = ?stale,
                remaining = self.count(),
                active = self.active_count(),
                "reaped stale games"
            );
        }
        stale
    }

    /// Count games with at least one accepted flip that are not finished.
    pub fn active_count(&self) -> usize {
        self.games
            .read()
            .values()
            .filter(|g| g.lock().status == GameStatus::Active)
            .count()
    }

    /// Total game count.
    pub fn count(&self) -> usize {
        self.games.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::GameMode;
    use crate::state::player::outbound_queue;
    use std::collections::HashSet;

    fn make_manager() -> GameManager {
        GameManager::new(GameSettings::default(), GameRng::new(11))
    }

    fn params(pairs: usize, mode: GameMode, max_players: usize) -> GameParams {
        GameParams {
            pair_count: pairs,
            mode,
            max_players,
            cosmetics: Default::default(),
        }
    }

    #[test]
    fn test_create_game() {
        let manager = make_manager();
        let id = manager.create_game(params(5, GameMode::Classic, 2));

        assert_eq!(id.len(), 6);
        let shared = manager.get_game(&id).unwrap();
        let game = shared.lock();
        assert_eq!(game.id, id);
        assert_eq!(game.status, GameStatus::Waiting);
        assert_eq!(game.cards().len(), 10);
        assert_eq!(game.mode, GameMode::Classic);
        assert_eq!(game.max_players, 2);
    }

    #[test]
    fn test_zero_pairs_uses_default() {
        let manager = make_manager();
        let id = manager.create_game(params(0, GameMode::Rush, 0));
        let shared = manager.get_game(&id).unwrap();
        assert_eq!(shared.lock().cards().len(), 20);
    }

    #[test]
    fn test_pair_count_clamped() {
        let manager = make_manager();
        let id = manager.create_game(params(10_000, GameMode::Rush, 0));
        let shared = manager.get_game(&id).unwrap();
        assert_eq!(shared.lock().cards().len(), 200);
    }

    #[test]
    fn test_ids_unique() {
        let manager = make_manager();
        let ids: HashSet<String> = (0..500)
            .map(|_| manager.create_game(params(1, GameMode::Classic, 0)))
            .collect();
        assert_eq!(ids.len(), 500);
        assert_eq!(manager.count(), 500);
    }

    #[test]
    fn test_get_unknown() {
        let manager = make_manager();
        assert_eq!(manager.get_game("nope00").err(), Some(ManagerError::NotFound));
    }

    #[test]
    fn test_join_and_full() {
        let manager = make_manager();
        let id = manager.create_game(params(5, GameMode::Classic, 2));

        let (tx1, _rx1) = outbound_queue();
        let (tx2, _rx2) = outbound_queue();
        let (tx3, _rx3) = outbound_queue();
        let (p1, _) = manager.join_game(&id, tx1).unwrap();
        let (p2, _) = manager.join_game(&id, tx2).unwrap();
        assert_ne!(p1, p2);

        assert_eq!(
            manager.join_game(&id, tx3).err(),
            Some(ManagerError::Full { max: 2 })
        );
        assert_eq!(manager.get_game(&id).unwrap().lock().player_count(), 2);
    }

    #[test]
    fn test_join_unknown() {
        let manager = make_manager();
        let (tx, _rx) = outbound_queue();
        assert_eq!(
            manager.join_game("zzzzzz", tx).err(),
            Some(ManagerError::NotFound)
        );
    }

    #[test]
    fn test_leave_game() {
        let manager = make_manager();
        let id = manager.create_game(params(2, GameMode::Classic, 0));
        let (tx, _rx) = outbound_queue();
        let (player_id, _) = manager.join_game(&id, tx).unwrap();

        assert!(manager.leave_game(&id, player_id).is_some());
        assert!(manager.leave_game(&id, player_id).is_none());
        assert!(manager.get_game(&id).is_ok());
    }

    #[test]
    fn test_clean_idle_games() {
        let manager = make_manager();
        let idle = manager.create_game(params(2, GameMode::Classic, 0));
        let busy = manager.create_game(params(2, GameMode::Classic, 0));
        let (tx, _rx) = outbound_queue();
        manager.join_game(&busy, tx).unwrap();

        let now = chrono::Utc::now();
        assert!(manager.clean_games_at(now).is_empty());

        let later = now + manager.settings().idle_threshold() + chrono::Duration::seconds(1);
        assert_eq!(manager.clean_games_at(later), vec![idle.clone()]);
        assert_eq!(manager.get_game(&idle).err(), Some(ManagerError::NotFound));
        assert!(manager.get_game(&busy).is_ok());
    }

    #[test]
    fn test_clean_finished_games() {
        let manager = make_manager();
        let id = manager.create_game(params(1, GameMode::Rush, 0));
        let (tx, _rx) = outbound_queue();
        let (player_id, shared) = manager.join_game(&id, tx).unwrap();
        {
            let mut game = shared.lock();
            game.handle_flip(player_id, 0).unwrap();
            game.handle_flip(player_id, 1).unwrap();
            assert_eq!(game.status, GameStatus::Finished);
        }
        let finished_at = shared.lock().finished_at.unwrap();

        let within = finished_at + chrono::Duration::seconds(10);
        assert!(manager.clean_games_at(within).is_empty());

        manager.leave_game(&id, player_id);
        let after = finished_at + manager.settings().finished_grace() + chrono::Duration::seconds(1);
        assert_eq!(manager.clean_games_at(after), vec![id]);
        assert_eq!(manager.count(), 0);
    }

    #[test]
    fn test_finished_game_with_players_kept() {
        let manager = make_manager();
        let id = manager.create_game(params(1, GameMode::Rush, 0));
        let (tx, _rx) = outbound_queue();
        let (player_id, shared) = manager.join_game(&id, tx).unwrap();
        {
            let mut game = shared.lock();
            game.handle_flip(player_id, 0).unwrap();
            game.handle_flip(player_id, 1).unwrap();
        }
        let finished_at = shared.lock().finished_at.unwrap();

        let after = finished_at
            + manager.settings().finished_grace()
            + manager.settings().idle_threshold()
            + chrono::Duration::seconds(1);
        assert!(manager.clean_games_at(after).is_empty());
        assert!(manager.get_game(&id).is_ok());
        assert_eq!(shared.lock().player_count(), 1);
    }

    #[test]
    fn test_active_count() {
        let manager = make_manager();
        let id = manager.create_game(params(3, GameMode::Rush, 0));
        manager.create_game(params(3, GameMode::Rush, 0));
        assert_eq!(manager.active_count(), 0);

        let (tx, _rx) = outbound_queue();
        let (player_id, shared) = manager.join_game(&id, tx).unwrap();
        shared.lock().handle_flip(player_id, 0).unwrap();
        assert_eq!(manager.active_count(), 1);
    }
}
