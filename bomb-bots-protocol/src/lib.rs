//! # Bomb Bots Wire Protocol
//!
//! Shared binary protocol between the Bomb Bots game server and the client
//! proxy, plus the datagram messages the proxy exchanges with the UI.
//!
//! ## Module Structure
//!
//! - `codec`: big-endian primitives, length-prefixed strings, sequences and
//!   mappings, and the streaming-safe `Incomplete`/`Invalid` contract
//! - `types`: board coordinates, identifiers, game settings
//! - `message`: the five message families and the per-turn `Event`
//! - `framing`: reassembly of whole messages from chunked stream reads
//!
//! ## Wire Format
//!
//! Every message is a u8 discriminant followed by its payload. Integers are
//! big-endian; strings carry a u8 length; sequences and mappings carry a u32
//! length. Decoding distinguishes a truncated buffer (wait for more bytes)
//! from bytes that can never form a message (close the stream).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod codec;
pub mod framing;
pub mod message;
pub mod types;

pub use codec::{decode_datagram, decode_prefix, encode_to_vec, Decode, DecodeError, Encode};
pub use framing::{FramingError, MessageAssembler};
pub use message::{ClientMessage, DrawMessage, Event, InputMessage, ServerMessage};
pub use types::{Bomb, BombId, Direction, GameSettings, Player, PlayerId, Position, Score};
