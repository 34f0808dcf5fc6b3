//! World Projection
//!
//! The client never simulates: it folds the server's append-only message
//! stream into a snapshot the UI can draw. The `BombExploded` payload is the
//! ground truth for what was destroyed; the local four-direction walk only
//! derives the cells to light up in the frame.
//!
//! Destroyed blocks stay on the board until every event of the turn has been
//! applied, so a later explosion in the same turn still sees them. This
//! mirrors how the server computes a whole turn against its pre-turn board.

use std::collections::{BTreeMap, BTreeSet};

use bomb_bots_protocol::message::{ClientMessage, DrawMessage, Event, InputMessage, ServerMessage};
use bomb_bots_protocol::types::{
    Bomb, BombId, Direction, GameSettings, Player, PlayerId, Position, Score,
};

/// Client-side view of the game, derived purely from server messages.
#[derive(Debug)]
pub struct Projection {
    player_name: String,
    settings: Option<GameSettings>,
    game_started: bool,
    join_sent: bool,
    players: BTreeMap<PlayerId, Player>,
    positions: BTreeMap<PlayerId, Position>,
    scores: BTreeMap<PlayerId, Score>,
    blocks: BTreeSet<Position>,
    bombs: BTreeMap<BombId, Bomb>,
}

impl Projection {
    /// Empty projection for a fresh connection. `player_name` is what a
    /// triggered Join will carry.
    pub fn new(player_name: String) -> Self {
        Self {
            player_name,
            settings: None,
            game_started: false,
            join_sent: false,
            players: BTreeMap::new(),
            positions: BTreeMap::new(),
            scores: BTreeMap::new(),
            blocks: BTreeSet::new(),
            bombs: BTreeMap::new(),
        }
    }

    /// Fold one server message into the projection. Returns the frame to
    /// forward to the UI, if this message produces one.
    pub fn apply(&mut self, message: ServerMessage) -> Option<DrawMessage> {
        match message {
            ServerMessage::Hello(settings) => {
                if self.settings.is_some() {
                    return None; // only the first Hello counts
                }
                self.settings = Some(settings);
                self.lobby_frame()
            }
            _ if self.settings.is_none() => None, // nothing is valid before Hello
            ServerMessage::AcceptedPlayer { id, player } => {
                if self.game_started {
                    return None;
                }
                self.players.insert(id, player);
                self.lobby_frame()
            }
            ServerMessage::GameStarted { players } => {
                self.positions = players.keys().map(|id| (*id, Position::new(0, 0))).collect();
                self.scores = players.keys().map(|id| (*id, 0)).collect();
                self.players = players;
                self.bombs.clear();
                self.blocks.clear();
                self.game_started = true;
                // The first frame of the game follows with turn 0.
                None
            }
            ServerMessage::Turn { turn, events } => {
                if !self.game_started {
                    return None;
                }
                let settings = self.settings.clone()?;
                Some(self.apply_turn(settings, turn, events))
            }
            ServerMessage::GameEnded { scores: _ } => {
                self.game_started = false;
                self.join_sent = false;
                self.positions.clear();
                self.scores.clear();
                self.bombs.clear();
                self.blocks.clear();
                self.lobby_frame()
            }
        }
    }

    /// Latest known cell of every player.
    pub fn positions(&self) -> &BTreeMap<PlayerId, Position> {
        &self.positions
    }

    /// Current per-player scores.
    pub fn scores(&self) -> &BTreeMap<PlayerId, Score> {
        &self.scores
    }

    /// Blocks currently standing.
    pub fn blocks(&self) -> &BTreeSet<Position> {
        &self.blocks
    }

    /// Live bombs by identifier.
    pub fn bombs(&self) -> &BTreeMap<BombId, Bomb> {
        &self.bombs
    }

    /// Gate one UI input according to the connection phase.
    ///
    /// Before Hello everything is dropped. In the lobby the first input
    /// triggers the Join and later ones are dropped. During a game inputs
    /// map straight onto client messages.
    pub fn translate_input(&mut self, input: InputMessage) -> Option<ClientMessage> {
        self.settings.as_ref()?;
        if !self.game_started {
            if self.join_sent {
                return None;
            }
            self.join_sent = true;
            return Some(ClientMessage::Join {
                name: self.player_name.clone(),
            });
        }
        Some(match input {
            InputMessage::PlaceBomb => ClientMessage::PlaceBomb,
            InputMessage::PlaceBlock => ClientMessage::PlaceBlock,
            InputMessage::Move { direction } => ClientMessage::Move { direction },
        })
    }

    fn apply_turn(&mut self, settings: GameSettings, turn: u16, events: Vec<Event>) -> DrawMessage {
        let mut explosions: BTreeSet<Position> = BTreeSet::new();
        let mut destroyed_blocks: BTreeSet<Position> = BTreeSet::new();
        let mut destroyed_players: BTreeSet<PlayerId> = BTreeSet::new();

        for bomb in self.bombs.values_mut() {
            bomb.timer = bomb.timer.saturating_sub(1);
        }

        for event in events {
            match event {
                Event::BlockPlaced { position } => {
                    self.blocks.insert(position);
                }
                Event::BombPlaced { id, position } => {
                    self.bombs.insert(
                        id,
                        Bomb {
                            position,
                            timer: settings.bomb_timer,
                        },
                    );
                }
                Event::PlayerMoved { id, position } => {
                    if self.players.contains_key(&id) {
                        self.positions.insert(id, position);
                    }
                }
                Event::BombExploded {
                    id,
                    players_destroyed,
                    blocks_destroyed,
                } => {
                    if let Some(bomb) = self.bombs.remove(&id) {
                        // A bomb buried under a block has no visible blast.
                        if !self.blocks.contains(&bomb.position) {
                            explosions.extend(explosion_cells(
                                bomb.position,
                                settings.explosion_radius,
                                settings.size_x,
                                settings.size_y,
                                &self.blocks,
                            ));
                        }
                    }
                    destroyed_players.extend(players_destroyed);
                    destroyed_blocks.extend(blocks_destroyed);
                }
            }
        }

        // Destroyed blocks leave the board only now, after every walk of the
        // turn has seen them.
        for block in &destroyed_blocks {
            self.blocks.remove(block);
        }
        for id in &destroyed_players {
            if let Some(score) = self.scores.get_mut(id) {
                *score += 1;
            }
        }

        DrawMessage::Game {
            server_name: settings.server_name,
            size_x: settings.size_x,
            size_y: settings.size_y,
            game_length: settings.game_length,
            turn,
            players: self.players.clone(),
            player_positions: self.positions.clone(),
            blocks: self.blocks.iter().copied().collect(),
            bombs: self.bombs.values().copied().collect(),
            explosions: explosions.into_iter().collect(),
            scores: self.scores.clone(),
        }
    }

    fn lobby_frame(&self) -> Option<DrawMessage> {
        Some(DrawMessage::Lobby {
            settings: self.settings.clone()?,
            players: self.players.clone(),
        })
    }
}

/// Cells lit by one explosion: up to `radius` cells in each direction from
/// the center, stopping at the board edge or at the first block after
/// including it.
fn explosion_cells(
    center: Position,
    radius: u16,
    size_x: u16,
    size_y: u16,
    blocks: &BTreeSet<Position>,
) -> BTreeSet<Position> {
    let mut cells = BTreeSet::new();
    for direction in Direction::ALL {
        let mut cell = center;
        for step in 0..=radius {
            if step > 0 {
                match direction.step(cell, size_x, size_y) {
                    Some(next) => cell = next,
                    None => break,
                }
            }
            cells.insert(cell);
            if blocks.contains(&cell) {
                break;
            }
        }
    }
    cells
}
