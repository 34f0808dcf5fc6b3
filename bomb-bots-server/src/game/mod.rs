//! Game Simulation
//!
//! Deterministic core of the server. Nothing here touches sockets or the
//! clock; the network layer feeds joins and actions in, and pulls turn
//! messages out.
//!
//! - `rng`: seeded Lehmer generator, the only source of randomness
//! - `state`: lobby roster, board contents and the turn history
//! - `tick`: turn construction, bomb explosions, action application

pub mod rng;
pub mod state;
pub mod tick;

pub use rng::Lcg;
pub use state::{GameState, Phase, PlayerAction};
