// End-to-end determinism check between the two halves of the system: the
// server's emitted broadcast sequence, folded into a fresh client
// projection, must reproduce the authoritative positions, blocks, bombs and
// scores after every single turn.
//
// No sockets are involved; the messages handed to the projection are the
// exact values the network layer would encode and broadcast.

use bomb_bots_client::Projection;
use bomb_bots_protocol::message::ServerMessage;
use bomb_bots_protocol::types::{Direction, GameSettings};
use bomb_bots_server::game::state::{GameState, PlayerAction};
use bomb_bots_server::game::tick::{advance_turn, opening_turn};

const GAME_LENGTH: u16 = 16;

fn settings() -> GameSettings {
    GameSettings {
        server_name: "sync-check".into(),
        players_count: 3,
        size_x: 12,
        size_y: 10,
        game_length: GAME_LENGTH,
        explosion_radius: 2,
        bomb_timer: 2,
    }
}

fn started_server(seed: u32) -> GameState {
    let mut server = GameState::new(settings(), 15, seed);
    for n in 0..3u16 {
        let joined = server.try_join(format!("bot-{n}"), format!("[::1]:{}", 6000 + n));
        assert!(joined.is_some());
    }
    server
}

/// A busy but deterministic action script: every player acts every turn,
/// cycling through bombs, blocks and moves so explosions, respawns and
/// blocked moves all occur.
fn script_actions(server: &mut GameState, turn: u32) {
    let directions = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];
    for id in 0..3u8 {
        let action = match (turn + u32::from(id)) % 4 {
            0 => PlayerAction::PlaceBomb,
            1 => PlayerAction::PlaceBlock,
            _ => PlayerAction::Move(directions[((turn + u32::from(id)) % 4) as usize]),
        };
        server.record_action(id, action);
    }
}

fn assert_in_sync(server: &GameState, client: &Projection, turn: u32) {
    assert_eq!(&server.positions, client.positions(), "positions after turn {turn}");
    assert_eq!(&server.blocks, client.blocks(), "blocks after turn {turn}");
    assert_eq!(&server.bombs, client.bombs(), "bombs after turn {turn}");
    assert_eq!(&server.scores, client.scores(), "scores after turn {turn}");
}

#[test]
fn projection_tracks_the_server_turn_by_turn() {
    let mut server = started_server(2137);
    let mut client = Projection::new("watcher".into());
    client.apply(ServerMessage::Hello(settings()));
    client.apply(server.game_started_message());

    let first = opening_turn(&mut server);
    client.apply(first);
    assert_in_sync(&server, &client, 0);

    for turn in 1..=u32::from(GAME_LENGTH) {
        script_actions(&mut server, turn);
        let message = advance_turn(&mut server);
        client.apply(message);
        assert_in_sync(&server, &client, turn);
    }
}

#[test]
fn replayed_history_matches_a_live_projection() {
    let mut server = started_server(31415);
    let mut live = Projection::new("early".into());
    live.apply(ServerMessage::Hello(settings()));
    live.apply(server.game_started_message());
    live.apply(opening_turn(&mut server));

    for turn in 1..=8u32 {
        script_actions(&mut server, turn);
        live.apply(advance_turn(&mut server));
    }

    // A peer connecting now receives GameStarted plus the recorded turns.
    let mut late = Projection::new("late".into());
    late.apply(ServerMessage::Hello(settings()));
    late.apply(server.game_started_message());
    for message in server.turn_history.clone() {
        late.apply(message);
    }

    assert_eq!(live.positions(), late.positions());
    assert_eq!(live.blocks(), late.blocks());
    assert_eq!(live.bombs(), late.bombs());
    assert_eq!(live.scores(), late.scores());
    assert_in_sync(&server, &late, 8);
}

#[test]
fn two_runs_from_the_same_seed_emit_identical_turns() {
    let mut first = started_server(99);
    let mut second = started_server(99);

    assert_eq!(opening_turn(&mut first), opening_turn(&mut second));
    for turn in 1..=6u32 {
        script_actions(&mut first, turn);
        script_actions(&mut second, turn);
        assert_eq!(advance_turn(&mut first), advance_turn(&mut second));
    }
}
