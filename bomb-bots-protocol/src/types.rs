//! Protocol Domain Types
//!
//! Board coordinates, identifiers and the static game settings carried by
//! the Hello message. All types encode with the codec primitives so they can
//! appear anywhere inside a message payload.

use crate::codec::{Decode, DecodeError, Encode, Reader};

/// Player identifier, assigned by the server in join order starting at 0.
pub type PlayerId = u8;

/// Bomb identifier, assigned by the server in placement order starting at 0.
pub type BombId = u32;

/// Number of turns in which a player was caught by an explosion.
pub type Score = u32;

/// A movement direction on the board.
///
/// The vertical axis grows upward: `Up` is +y and `Down` is -y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Direction {
    /// +y
    Up = 0,
    /// +x
    Right = 1,
    /// -y
    Down = 2,
    /// -x
    Left = 3,
}

impl Direction {
    /// All four directions, in discriminant order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// The cell one step from `from` in this direction, or `None` when the
    /// step leaves a board of `size_x` by `size_y` cells.
    pub fn step(self, from: Position, size_x: u16, size_y: u16) -> Option<Position> {
        let Position { x, y } = from;
        let (x, y) = match self {
            Direction::Up => (Some(x), y.checked_add(1)),
            Direction::Right => (x.checked_add(1), Some(y)),
            Direction::Down => (Some(x), y.checked_sub(1)),
            Direction::Left => (x.checked_sub(1), Some(y)),
        };
        match (x, y) {
            (Some(x), Some(y)) if x < size_x && y < size_y => Some(Position { x, y }),
            _ => None,
        }
    }
}

impl Encode for Direction {
    fn encode(&self, out: &mut Vec<u8>) {
        (*self as u8).encode(out);
    }
}

impl Decode for Direction {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        match u8::decode(r)? {
            0 => Ok(Direction::Up),
            1 => Ok(Direction::Right),
            2 => Ok(Direction::Down),
            3 => Ok(Direction::Left),
            _ => Err(DecodeError::Invalid),
        }
    }
}

/// A cell on the board. `0 <= x < size_x`, `0 <= y < size_y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: u16,
    /// Vertical coordinate.
    pub y: u16,
}

impl Position {
    /// Shorthand constructor.
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

impl Encode for Position {
    fn encode(&self, out: &mut Vec<u8>) {
        self.x.encode(out);
        self.y.encode(out);
    }
}

impl Decode for Position {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let x = u16::decode(r)?;
        let y = u16::decode(r)?;
        Ok(Self { x, y })
    }
}

/// A live bomb: where it sits and how many turns until it explodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bomb {
    /// Cell the bomb occupies.
    pub position: Position,
    /// Turns remaining before the explosion.
    pub timer: u16,
}

impl Encode for Bomb {
    fn encode(&self, out: &mut Vec<u8>) {
        self.position.encode(out);
        self.timer.encode(out);
    }
}

impl Decode for Bomb {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let position = Position::decode(r)?;
        let timer = u16::decode(r)?;
        Ok(Self { position, timer })
    }
}

/// An accepted player as announced to every peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Name the player joined with.
    pub name: String,
    /// Peer address in the human form `[<ip>]:<port>`.
    pub address: String,
}

impl Encode for Player {
    fn encode(&self, out: &mut Vec<u8>) {
        self.name.encode(out);
        self.address.encode(out);
    }
}

impl Decode for Player {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let name = String::decode(r)?;
        let address = String::decode(r)?;
        Ok(Self { name, address })
    }
}

/// Static game parameters, fixed for a server's lifetime and sent in Hello.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSettings {
    /// Display name of the server.
    pub server_name: String,
    /// Number of players needed to start a game.
    pub players_count: u8,
    /// Board width.
    pub size_x: u16,
    /// Board height.
    pub size_y: u16,
    /// Number of the terminal turn.
    pub game_length: u16,
    /// How far explosions reach in each direction.
    pub explosion_radius: u16,
    /// Turns between placing a bomb and its explosion.
    pub bomb_timer: u16,
}

impl Encode for GameSettings {
    fn encode(&self, out: &mut Vec<u8>) {
        self.server_name.encode(out);
        self.players_count.encode(out);
        self.size_x.encode(out);
        self.size_y.encode(out);
        self.game_length.encode(out);
        self.explosion_radius.encode(out);
        self.bomb_timer.encode(out);
    }
}

impl Decode for GameSettings {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let server_name = String::decode(r)?;
        let players_count = u8::decode(r)?;
        let size_x = u16::decode(r)?;
        let size_y = u16::decode(r)?;
        let game_length = u16::decode(r)?;
        let explosion_radius = u16::decode(r)?;
        let bomb_timer = u16::decode(r)?;
        Ok(Self {
            server_name,
            players_count,
            size_x,
            size_y,
            game_length,
            explosion_radius,
            bomb_timer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_prefix, encode_to_vec};

    #[test]
    fn test_direction_axes() {
        let center = Position::new(1, 1);
        assert_eq!(
            Direction::Up.step(center, 3, 3),
            Some(Position::new(1, 2)),
            "up is +y"
        );
        assert_eq!(Direction::Down.step(center, 3, 3), Some(Position::new(1, 0)));
        assert_eq!(Direction::Right.step(center, 3, 3), Some(Position::new(2, 1)));
        assert_eq!(Direction::Left.step(center, 3, 3), Some(Position::new(0, 1)));
    }

    #[test]
    fn test_direction_stops_at_board_edges() {
        assert_eq!(Direction::Down.step(Position::new(0, 0), 4, 4), None);
        assert_eq!(Direction::Left.step(Position::new(0, 0), 4, 4), None);
        assert_eq!(Direction::Up.step(Position::new(3, 3), 4, 4), None);
        assert_eq!(Direction::Right.step(Position::new(3, 3), 4, 4), None);
    }

    #[test]
    fn test_direction_rejects_unknown_tag() {
        assert_eq!(decode_prefix::<Direction>(&[4]).unwrap_err(), crate::codec::DecodeError::Invalid);
    }

    #[test]
    fn test_bomb_roundtrip() {
        let bomb = Bomb {
            position: Position::new(2, 3),
            timer: 5,
        };
        let bytes = encode_to_vec(&bomb);
        assert_eq!(bytes, vec![0, 2, 0, 3, 0, 5]);
        let (decoded, _) = decode_prefix::<Bomb>(&bytes).unwrap();
        assert_eq!(decoded, bomb);
    }

    #[test]
    fn test_player_roundtrip() {
        let player = Player {
            name: "bot".into(),
            address: "[127.0.0.1]:4242".into(),
        };
        let bytes = encode_to_vec(&player);
        let (decoded, used) = decode_prefix::<Player>(&bytes).unwrap();
        assert_eq!(decoded, player);
        assert_eq!(used, bytes.len());
    }
}
