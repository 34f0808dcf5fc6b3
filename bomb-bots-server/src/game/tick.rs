//! Turn Simulation
//!
//! Builds the event list for each turn. The opening turn spreads players and
//! blocks across the board; every later turn runs the same ordered phases:
//!
//! 1. Bomb timers tick down and expired bombs explode.
//! 2. Player actions apply in identifier order; destroyed players respawn
//!    instead of acting.
//! 3. Blocks reached by an explosion disappear.
//! 4. Every destroyed player scores one point, once per turn.
//!
//! The generator draw order is part of the protocol: two draws per player
//! placement (x then y), two per initial-block attempt (duplicates consume
//! their draws without retrying), two per respawn.

use std::collections::BTreeSet;

use bomb_bots_protocol::message::{Event, ServerMessage};
use bomb_bots_protocol::types::{Bomb, BombId, Direction, PlayerId, Position};

use crate::game::state::{GameState, PlayerAction};

/// Build turn 0 at the lobby-to-game transition.
///
/// Every accepted player is dropped on a random cell and `initial_blocks`
/// placement attempts follow. The returned Turn message is already recorded
/// in the replay history.
pub fn opening_turn(state: &mut GameState) -> ServerMessage {
    let mut events = Vec::new();

    let ids: Vec<PlayerId> = state.players.keys().copied().collect();
    for id in ids {
        let position = random_cell(state);
        state.positions.insert(id, position);
        state.scores.insert(id, 0);
        events.push(Event::PlayerMoved { id, position });
    }

    for _ in 0..state.initial_blocks {
        let position = random_cell(state);
        // An occupied cell swallows the attempt; the draws stay consumed.
        if state.blocks.insert(position) {
            events.push(Event::BlockPlaced { position });
        }
    }

    state.pending_actions.clear();
    finish_turn(state, events)
}

/// Simulate one in-game turn and return its Turn message.
pub fn advance_turn(state: &mut GameState) -> ServerMessage {
    let actions = std::mem::take(&mut state.pending_actions);
    let mut events = Vec::new();
    let mut destroyed_players: BTreeSet<PlayerId> = BTreeSet::new();
    let mut destroyed_blocks: BTreeSet<Position> = BTreeSet::new();

    // Phase 1: bombs. Expired bombs all see the board as it stood at the
    // start of the turn, so one explosion never shortens another's walk.
    for bomb in state.bombs.values_mut() {
        bomb.timer -= 1;
    }
    let expired: Vec<(BombId, Position)> = state
        .bombs
        .iter()
        .filter(|(_, bomb)| bomb.timer == 0)
        .map(|(id, bomb)| (*id, bomb.position))
        .collect();
    for (id, center) in expired {
        let (cells, blocks_hit) = explosion_reach(
            center,
            state.settings.explosion_radius,
            state.settings.size_x,
            state.settings.size_y,
            &state.blocks,
        );
        let players_hit: Vec<PlayerId> = state
            .positions
            .iter()
            .filter(|(_, position)| cells.contains(position))
            .map(|(id, _)| *id)
            .collect();

        destroyed_players.extend(players_hit.iter().copied());
        destroyed_blocks.extend(blocks_hit.iter().copied());
        events.push(Event::BombExploded {
            id,
            players_destroyed: players_hit,
            blocks_destroyed: blocks_hit.into_iter().collect(),
        });
        state.bombs.remove(&id);
    }

    // Phase 2: actions in identifier order. A destroyed player respawns and
    // their chosen action is forfeited.
    let ids: Vec<PlayerId> = state.players.keys().copied().collect();
    for id in ids {
        if destroyed_players.contains(&id) {
            let position = random_cell(state);
            state.positions.insert(id, position);
            events.push(Event::PlayerMoved { id, position });
            continue;
        }
        let Some(action) = actions.get(&id) else {
            continue;
        };
        let Some(&position) = state.positions.get(&id) else {
            continue;
        };
        match action {
            PlayerAction::PlaceBomb => {
                let bomb_id = state.next_bomb_id;
                state.next_bomb_id += 1;
                state.bombs.insert(
                    bomb_id,
                    Bomb {
                        position,
                        timer: state.settings.bomb_timer,
                    },
                );
                events.push(Event::BombPlaced {
                    id: bomb_id,
                    position,
                });
            }
            PlayerAction::PlaceBlock => {
                if state.blocks.insert(position) {
                    events.push(Event::BlockPlaced { position });
                }
            }
            PlayerAction::Move(direction) => {
                let target = direction.step(position, state.settings.size_x, state.settings.size_y);
                if let Some(target) = target {
                    if !state.blocks.contains(&target) {
                        state.positions.insert(id, target);
                        events.push(Event::PlayerMoved {
                            id,
                            position: target,
                        });
                    }
                }
            }
        }
    }

    // Phase 3: destroyed blocks leave the board.
    for block in &destroyed_blocks {
        state.blocks.remove(block);
    }

    // Phase 4: one point per destroyed player, however many bombs hit them.
    for id in &destroyed_players {
        if let Some(score) = state.scores.get_mut(id) {
            *score += 1;
        }
    }

    finish_turn(state, events)
}

/// Cells reached by one explosion, and the blocks among them.
///
/// Walks up to `radius` cells in each of the four directions starting from
/// the center (which is always reached). A walk stops at the board edge, or
/// at the first block after including it.
fn explosion_reach(
    center: Position,
    radius: u16,
    size_x: u16,
    size_y: u16,
    blocks: &BTreeSet<Position>,
) -> (BTreeSet<Position>, BTreeSet<Position>) {
    let mut cells = BTreeSet::new();
    let mut blocks_hit = BTreeSet::new();

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
                blocks_hit.insert(cell);
                break;
            }
        }
    }
    (cells, blocks_hit)
}

fn random_cell(state: &mut GameState) -> Position {
    let x = state.rng.next_coordinate(state.settings.size_x);
    let y = state.rng.next_coordinate(state.settings.size_y);
    Position::new(x, y)
}

fn finish_turn(state: &mut GameState, events: Vec<Event>) -> ServerMessage {
    let message = ServerMessage::Turn {
        turn: state.turn as u16,
        events,
    };
    state.turn_history.push(message.clone());
    state.turn += 1;
    message
}
