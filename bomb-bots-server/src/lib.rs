//! # Bomb Bots Game Server
//!
//! Authoritative server for the Bomb Bots network game. Peers connect over
//! TCP, join as players or watch as spectators, and every peer receives the
//! same ordered stream of turn broadcasts.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    BOMB BOTS SERVER                        │
//! ├────────────────────────────────────────────────────────────┤
//! │  config.rs       - Command-line options and validation     │
//! │                                                            │
//! │  game/           - Deterministic simulation                │
//! │  ├── rng.rs      - Lehmer linear congruential generator    │
//! │  ├── state.rs    - Lobby, roster, board and turn history   │
//! │  └── tick.rs     - Turn construction and bomb explosions   │
//! │                                                            │
//! │  network/        - Networking (non-deterministic)          │
//! │  └── server.rs   - TCP listener, fan-out, game loop task   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! The `game/` module is fully deterministic: iteration goes through
//! `BTreeMap`/`BTreeSet`, all randomness comes from the seeded generator in
//! `game::rng`, and the generator is only drawn from inside the turn
//! functions. Given a seed and a fixed sequence of joins and actions, the
//! emitted byte stream is identical across runs.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod game;
pub mod network;

pub use config::{OptionsError, ServerOptions};
pub use game::state::GameState;
pub use network::server::GameServer;
