//! Protocol Messages
//!
//! Every message family exchanged between the three processes:
//!
//! - `ClientMessage`: client proxy -> server, over TCP.
//! - `ServerMessage`: server -> client proxy, over TCP.
//! - `InputMessage`: UI -> client proxy, one per UDP datagram.
//! - `DrawMessage`: client proxy -> UI, one per UDP datagram.
//!
//! Each message is a u8 discriminant followed by the variant payload.
//! `Event` is the per-turn unit the server appends to its history and the
//! client folds into its projection.

use std::collections::BTreeMap;

use crate::codec::{Decode, DecodeError, Encode, Reader};
use crate::types::{Bomb, BombId, Direction, GameSettings, Player, PlayerId, Position, Score};

/// One thing that happened during a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A bomb was placed on the board.
    BombPlaced {
        /// Identifier of the new bomb.
        id: BombId,
        /// Cell it was placed on.
        position: Position,
    },
    /// A bomb's timer expired.
    BombExploded {
        /// Identifier of the exploded bomb.
        id: BombId,
        /// Players caught in the blast this turn, by this bomb.
        players_destroyed: Vec<PlayerId>,
        /// Blocks the blast reached, by this bomb.
        blocks_destroyed: Vec<Position>,
    },
    /// A player appeared at or moved to a cell.
    PlayerMoved {
        /// The player that moved.
        id: PlayerId,
        /// Their new cell.
        position: Position,
    },
    /// A block was placed on the board.
    BlockPlaced {
        /// Cell the block occupies.
        position: Position,
    },
}

impl Encode for Event {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Event::BombPlaced { id, position } => {
                0u8.encode(out);
                id.encode(out);
                position.encode(out);
            }
            Event::BombExploded {
                id,
                players_destroyed,
                blocks_destroyed,
            } => {
                1u8.encode(out);
                id.encode(out);
                players_destroyed.encode(out);
                blocks_destroyed.encode(out);
            }
            Event::PlayerMoved { id, position } => {
                2u8.encode(out);
                id.encode(out);
                position.encode(out);
            }
            Event::BlockPlaced { position } => {
                3u8.encode(out);
                position.encode(out);
            }
        }
    }
}

impl Decode for Event {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        match u8::decode(r)? {
            0 => Ok(Event::BombPlaced {
                id: BombId::decode(r)?,
                position: Position::decode(r)?,
            }),
            1 => Ok(Event::BombExploded {
                id: BombId::decode(r)?,
                players_destroyed: Vec::decode(r)?,
                blocks_destroyed: Vec::decode(r)?,
            }),
            2 => Ok(Event::PlayerMoved {
                id: PlayerId::decode(r)?,
                position: Position::decode(r)?,
            }),
            3 => Ok(Event::BlockPlaced {
                position: Position::decode(r)?,
            }),
            _ => Err(DecodeError::Invalid),
        }
    }
}

/// Messages sent by the client proxy to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Ask to take part in the next game.
    Join {
        /// Display name of the player.
        name: String,
    },
    /// Place a bomb on the current cell.
    PlaceBomb,
    /// Place a block on the current cell.
    PlaceBlock,
    /// Move one cell in a direction.
    Move {
        /// Where to go.
        direction: Direction,
    },
}

impl Encode for ClientMessage {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            ClientMessage::Join { name } => {
                0u8.encode(out);
                name.encode(out);
            }
            ClientMessage::PlaceBomb => 1u8.encode(out),
            ClientMessage::PlaceBlock => 2u8.encode(out),
            ClientMessage::Move { direction } => {
                3u8.encode(out);
                direction.encode(out);
            }
        }
    }
}

impl Decode for ClientMessage {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        match u8::decode(r)? {
            0 => Ok(ClientMessage::Join {
                name: String::decode(r)?,
            }),
            1 => Ok(ClientMessage::PlaceBomb),
            2 => Ok(ClientMessage::PlaceBlock),
            3 => Ok(ClientMessage::Move {
                direction: Direction::decode(r)?,
            }),
            _ => Err(DecodeError::Invalid),
        }
    }
}

/// Messages sent by the server to every connected peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// First message on every connection: the static game parameters.
    Hello(GameSettings),
    /// A player was admitted to the lobby.
    AcceptedPlayer {
        /// Assigned identifier.
        id: PlayerId,
        /// Name and address of the player.
        player: Player,
    },
    /// The lobby filled up and a game begins.
    GameStarted {
        /// Full roster for this game.
        players: BTreeMap<PlayerId, Player>,
    },
    /// Everything that happened during one turn.
    Turn {
        /// Turn number, 0-based.
        turn: u16,
        /// Events in application order.
        events: Vec<Event>,
    },
    /// The terminal turn has passed; final per-player scores.
    GameEnded {
        /// Times each player was caught by an explosion.
        scores: BTreeMap<PlayerId, Score>,
    },
}

impl Encode for ServerMessage {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            ServerMessage::Hello(settings) => {
                0u8.encode(out);
                settings.encode(out);
            }
            ServerMessage::AcceptedPlayer { id, player } => {
                1u8.encode(out);
                id.encode(out);
                player.encode(out);
            }
            ServerMessage::GameStarted { players } => {
                2u8.encode(out);
                players.encode(out);
            }
            ServerMessage::Turn { turn, events } => {
                3u8.encode(out);
                turn.encode(out);
                events.encode(out);
            }
            ServerMessage::GameEnded { scores } => {
                4u8.encode(out);
                scores.encode(out);
            }
        }
    }
}

impl Decode for ServerMessage {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        match u8::decode(r)? {
            0 => Ok(ServerMessage::Hello(GameSettings::decode(r)?)),
            1 => Ok(ServerMessage::AcceptedPlayer {
                id: PlayerId::decode(r)?,
                player: Player::decode(r)?,
            }),
            2 => Ok(ServerMessage::GameStarted {
                players: BTreeMap::decode(r)?,
            }),
            3 => Ok(ServerMessage::Turn {
                turn: u16::decode(r)?,
                events: Vec::decode(r)?,
            }),
            4 => Ok(ServerMessage::GameEnded {
                scores: BTreeMap::decode(r)?,
            }),
            _ => Err(DecodeError::Invalid),
        }
    }
}

/// Messages the UI sends to the client proxy, one per datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMessage {
    /// Place a bomb on the current cell.
    PlaceBomb,
    /// Place a block on the current cell.
    PlaceBlock,
    /// Move one cell in a direction.
    Move {
        /// Where to go.
        direction: Direction,
    },
}

impl Encode for InputMessage {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            InputMessage::PlaceBomb => 0u8.encode(out),
            InputMessage::PlaceBlock => 1u8.encode(out),
            InputMessage::Move { direction } => {
                2u8.encode(out);
                direction.encode(out);
            }
        }
    }
}

impl Decode for InputMessage {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        match u8::decode(r)? {
            0 => Ok(InputMessage::PlaceBomb),
            1 => Ok(InputMessage::PlaceBlock),
            2 => Ok(InputMessage::Move {
                direction: Direction::decode(r)?,
            }),
            _ => Err(DecodeError::Invalid),
        }
    }
}

/// Frames the client proxy sends to the UI, one per datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawMessage {
    /// Waiting-room view: parameters plus who has joined so far.
    Lobby {
        /// Static game parameters from Hello.
        settings: GameSettings,
        /// Players admitted so far.
        players: BTreeMap<PlayerId, Player>,
    },
    /// In-game view after one turn was applied.
    Game {
        /// Display name of the server.
        server_name: String,
        /// Board width.
        size_x: u16,
        /// Board height.
        size_y: u16,
        /// Number of the terminal turn.
        game_length: u16,
        /// Turn this frame describes.
        turn: u16,
        /// Roster of the running game.
        players: BTreeMap<PlayerId, Player>,
        /// Latest known cell of each player.
        player_positions: BTreeMap<PlayerId, Position>,
        /// Blocks currently standing.
        blocks: Vec<Position>,
        /// Live bombs with their remaining timers.
        bombs: Vec<Bomb>,
        /// Cells covered by this turn's explosions.
        explosions: Vec<Position>,
        /// Current per-player scores.
        scores: BTreeMap<PlayerId, Score>,
    },
}

impl Encode for DrawMessage {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            DrawMessage::Lobby { settings, players } => {
                0u8.encode(out);
                settings.encode(out);
                players.encode(out);
            }
            DrawMessage::Game {
                server_name,
                size_x,
                size_y,
                game_length,
                turn,
                players,
                player_positions,
                blocks,
                bombs,
                explosions,
                scores,
            } => {
                1u8.encode(out);
                server_name.encode(out);
                size_x.encode(out);
                size_y.encode(out);
                game_length.encode(out);
                turn.encode(out);
                players.encode(out);
                player_positions.encode(out);
                blocks.encode(out);
                bombs.encode(out);
                explosions.encode(out);
                scores.encode(out);
            }
        }
    }
}

impl Decode for DrawMessage {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        match u8::decode(r)? {
            0 => Ok(DrawMessage::Lobby {
                settings: GameSettings::decode(r)?,
                players: BTreeMap::decode(r)?,
            }),
            1 => Ok(DrawMessage::Game {
                server_name: String::decode(r)?,
                size_x: u16::decode(r)?,
                size_y: u16::decode(r)?,
                game_length: u16::decode(r)?,
                turn: u16::decode(r)?,
                players: BTreeMap::decode(r)?,
                player_positions: BTreeMap::decode(r)?,
                blocks: Vec::decode(r)?,
                bombs: Vec::decode(r)?,
                explosions: Vec::decode(r)?,
                scores: BTreeMap::decode(r)?,
            }),
            _ => Err(DecodeError::Invalid),
        }
    }
}
