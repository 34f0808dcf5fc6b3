//! # Bomb Bots Client Proxy
//!
//! Headless middleman between the Bomb Bots game server and a rendering UI.
//! The server side is a TCP stream of authoritative messages; the UI side is
//! a UDP endpoint that receives draw frames and sends input datagrams.
//!
//! ## Module Structure
//!
//! - `config`: command-line options and address splitting
//! - `projection`: pure fold of the server's event stream into a renderable
//!   snapshot, plus the input-gating rules
//! - `proxy`: sockets and tasks wiring the two sides together
//!
//! The projection holds no authority: it replays whatever the server
//! announces, so a proxy that connects mid-game ends up in exactly the same
//! state as one that watched from turn 0.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod projection;
pub mod proxy;

pub use config::{ClientOptions, OptionsError};
pub use projection::Projection;
