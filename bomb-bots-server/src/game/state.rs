//! Authoritative Game State
//!
//! Everything the server knows about the current lobby or game. All
//! collections are ordered so iteration, and therefore the emitted event
//! stream, is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use bomb_bots_protocol::message::ServerMessage;
use bomb_bots_protocol::types::{
    Bomb, BombId, Direction, GameSettings, Player, PlayerId, Position, Score,
};

use crate::game::rng::Lcg;

/// Which part of the lifecycle the server is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for enough players to join.
    Lobby,
    /// A game is running; joins are ignored.
    InGame,
}

/// A player's chosen action for the current turn. Latest wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    /// Place a bomb on the current cell.
    PlaceBomb,
    /// Place a block on the current cell.
    PlaceBlock,
    /// Step one cell in a direction.
    Move(Direction),
}

/// The single authoritative state, guarded by one lock in the network layer.
#[derive(Debug, Clone)]
pub struct GameState {
    /// Static parameters sent in Hello.
    pub settings: GameSettings,
    /// Blocks rolled onto the board when a game starts.
    pub initial_blocks: u16,
    /// Seeded generator; drawn from only inside the turn functions.
    pub rng: Lcg,
    /// Lobby or in-game.
    pub phase: Phase,
    /// Identifier for the next accepted player.
    pub next_player_id: PlayerId,
    /// Identifier for the next placed bomb.
    pub next_bomb_id: BombId,
    /// Players accepted for the current lobby or running game.
    pub players: BTreeMap<PlayerId, Player>,
    /// Number of the next turn to simulate.
    pub turn: u32,
    /// Current cell of every player.
    pub positions: BTreeMap<PlayerId, Position>,
    /// Times each player has been caught by an explosion.
    pub scores: BTreeMap<PlayerId, Score>,
    /// Live bombs by identifier.
    pub bombs: BTreeMap<BombId, Bomb>,
    /// Cells occupied by blocks.
    pub blocks: BTreeSet<Position>,
    /// Latest action chosen by each player since the previous turn.
    pub pending_actions: BTreeMap<PlayerId, PlayerAction>,
    /// Every Turn message broadcast so far, replayed to late spectators.
    pub turn_history: Vec<ServerMessage>,
}

impl GameState {
    /// Fresh state in the lobby phase.
    pub fn new(settings: GameSettings, initial_blocks: u16, seed: u32) -> Self {
        Self {
            settings,
            initial_blocks,
            rng: Lcg::new(seed),
            phase: Phase::Lobby,
            next_player_id: 0,
            next_bomb_id: 0,
            players: BTreeMap::new(),
            turn: 0,
            positions: BTreeMap::new(),
            scores: BTreeMap::new(),
            bombs: BTreeMap::new(),
            blocks: BTreeSet::new(),
            pending_actions: BTreeMap::new(),
            turn_history: Vec::new(),
        }
    }

    /// The Hello message every new connection receives.
    pub fn hello_message(&self) -> ServerMessage {
        ServerMessage::Hello(self.settings.clone())
    }

    /// Whether the roster has reached the configured player count.
    pub fn is_lobby_full(&self) -> bool {
        self.players.len() == usize::from(self.settings.players_count)
    }

    /// Admit a player during the lobby phase.
    ///
    /// Returns the assigned identifier and roster entry, or `None` when a
    /// game is running. Filling the roster flips the phase to `InGame`; the
    /// caller is expected to start the turn loop.
    pub fn try_join(&mut self, name: String, address: String) -> Option<(PlayerId, Player)> {
        if self.phase != Phase::Lobby || self.is_lobby_full() {
            return None;
        }
        let id = self.next_player_id;
        self.next_player_id += 1;
        let player = Player { name, address };
        self.players.insert(id, player.clone());
        if self.is_lobby_full() {
            self.phase = Phase::InGame;
        }
        Some((id, player))
    }

    /// Remember a player's action for the coming turn, replacing any earlier
    /// choice. Ignored outside a running game.
    pub fn record_action(&mut self, id: PlayerId, action: PlayerAction) {
        if self.phase == Phase::InGame && self.players.contains_key(&id) {
            self.pending_actions.insert(id, action);
        }
    }

    /// The GameStarted message for the current roster.
    pub fn game_started_message(&self) -> ServerMessage {
        ServerMessage::GameStarted {
            players: self.players.clone(),
        }
    }

    /// The GameEnded message with the final scores.
    pub fn game_ended_message(&self) -> ServerMessage {
        ServerMessage::GameEnded {
            scores: self.scores.clone(),
        }
    }

    /// Return to an empty lobby after the terminal turn.
    ///
    /// Identifiers restart from 0; the random generator keeps its state so
    /// consecutive games continue the seeded sequence.
    pub fn reset_to_lobby(&mut self) {
        self.phase = Phase::Lobby;
        self.next_player_id = 0;
        self.next_bomb_id = 0;
        self.players.clear();
        self.turn = 0;
        self.positions.clear();
        self.scores.clear();
        self.bombs.clear();
        self.blocks.clear();
        self.pending_actions.clear();
        self.turn_history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(players_count: u8) -> GameSettings {
        GameSettings {
            server_name: "test".into(),
            players_count,
            size_x: 8,
            size_y: 8,
            game_length: 10,
            explosion_radius: 2,
            bomb_timer: 3,
        }
    }

    fn join(state: &mut GameState, name: &str) -> Option<(PlayerId, Player)> {
        state.try_join(name.into(), format!("[10.0.0.1]:{}", 1000 + state.players.len()))
    }

    #[test]
    fn test_join_assigns_sequential_ids() {
        let mut state = GameState::new(settings(3), 0, 1);
        assert_eq!(join(&mut state, "a").unwrap().0, 0);
        assert_eq!(join(&mut state, "b").unwrap().0, 1);
        assert_eq!(state.phase, Phase::Lobby);
        assert_eq!(join(&mut state, "c").unwrap().0, 2);
        assert_eq!(state.phase, Phase::InGame);
    }

    #[test]
    fn test_join_rejected_during_game() {
        let mut state = GameState::new(settings(1), 0, 1);
        assert!(join(&mut state, "a").is_some());
        assert_eq!(state.phase, Phase::InGame);
        assert!(join(&mut state, "b").is_none());
        assert_eq!(state.players.len(), 1);
    }

    #[test]
    fn test_actions_ignored_in_lobby() {
        let mut state = GameState::new(settings(2), 0, 1);
        let (id, _) = join(&mut state, "a").unwrap();
        state.record_action(id, PlayerAction::PlaceBomb);
        assert!(state.pending_actions.is_empty());
    }

    #[test]
    fn test_latest_action_wins() {
        let mut state = GameState::new(settings(1), 0, 1);
        let (id, _) = join(&mut state, "a").unwrap();
        state.record_action(id, PlayerAction::Move(Direction::Up));
        state.record_action(id, PlayerAction::PlaceBlock);
        assert_eq!(state.pending_actions.get(&id), Some(&PlayerAction::PlaceBlock));
    }

    #[test]
    fn test_actions_from_unknown_players_ignored() {
        let mut state = GameState::new(settings(1), 0, 1);
        join(&mut state, "a");
        state.record_action(77, PlayerAction::PlaceBomb);
        assert!(state.pending_actions.is_empty());
    }

    #[test]
    fn test_reset_restarts_identifiers() {
        let mut state = GameState::new(settings(1), 0, 1);
        join(&mut state, "a");
        state.scores.insert(0, 4);
        state.blocks.insert(Position::new(1, 1));
        state.reset_to_lobby();

        assert_eq!(state.phase, Phase::Lobby);
        assert!(state.players.is_empty());
        assert!(state.scores.is_empty());
        assert!(state.blocks.is_empty());
        let (id, _) = join(&mut state, "b").unwrap();
        assert_eq!(id, 0);
    }

    #[test]
    fn test_reset_keeps_rng_state() {
        let mut state = GameState::new(settings(1), 0, 1);
        let _ = state.rng.next_value();
        let before = state.rng;
        state.reset_to_lobby();
        assert_eq!(state.rng, before);
    }
}
