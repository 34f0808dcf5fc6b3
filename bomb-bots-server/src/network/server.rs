//! TCP Game Server
//!
//! Accepts player and spectator connections, fans server messages out to
//! every peer, and drives the turn loop.
//!
//! Concurrency model: one task per connection reads and decodes client
//! messages; one writer task per connection drains a channel into the
//! socket; a single game-loop task advances the clock while a game runs.
//! Every state mutation happens under one `Mutex` around [`World`], and
//! broadcasts iterate the subscriber set under that same lock, so every
//! peer observes the same message order. A subscriber whose channel is gone
//! is detached without interrupting the broadcast.

use std::collections::BTreeMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use bomb_bots_protocol::codec::encode_to_vec;
use bomb_bots_protocol::framing::MessageAssembler;
use bomb_bots_protocol::message::{ClientMessage, ServerMessage};
use bomb_bots_protocol::types::PlayerId;

use crate::config::ServerOptions;
use crate::game::state::{GameState, Phase, PlayerAction};
use crate::game::tick::{advance_turn, opening_turn};

/// Handle identifying one connection inside the subscriber set.
type ConnId = u64;

/// A connected peer as the broadcast fan-out sees it.
struct Subscriber {
    /// Encoded messages queued for this peer's writer task.
    sender: mpsc::UnboundedSender<Vec<u8>>,
    /// The player this connection joined as, if any.
    player: Option<PlayerId>,
}

/// Everything behind the single server lock: the authoritative game state
/// and the current set of open connections.
struct World {
    game: GameState,
    subscribers: BTreeMap<ConnId, Subscriber>,
    next_conn_id: ConnId,
}

impl World {
    /// Send one message to every connected peer, detaching peers whose
    /// writer is gone. Runs under the lock so the subscriber set is frozen
    /// for the whole iteration.
    fn broadcast(&mut self, message: &ServerMessage) {
        let bytes = encode_to_vec(message);
        self.subscribers.retain(|conn_id, subscriber| {
            let alive = subscriber.sender.send(bytes.clone()).is_ok();
            if !alive {
                warn!("detaching unreachable connection #{conn_id}");
            }
            alive
        });
    }
}

/// The Bomb Bots game server.
pub struct GameServer {
    options: Arc<ServerOptions>,
    listener: TcpListener,
    world: Arc<Mutex<World>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Bind the listening socket. The IPv6 wildcard accepts IPv4 peers as
    /// v4-mapped addresses on dual-stack hosts.
    pub async fn bind(options: ServerOptions) -> io::Result<Self> {
        let listener = TcpListener::bind(("::", options.port)).await?;
        let world = World {
            game: GameState::new(options.settings(), options.initial_blocks, options.seed),
            subscribers: BTreeMap::new(),
            next_conn_id: 0,
        };
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            options: Arc::new(options),
            listener,
            world: Arc::new(Mutex::new(world)),
            shutdown_tx,
        })
    }

    /// The address actually bound, useful when port 0 was requested.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// A handle that stops the accept loop and the turn loop when fired.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Accept connections until shutdown is signalled.
    pub async fn run(self) -> io::Result<()> {
        info!("listening on {}", self.listener.local_addr()?);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            info!("new connection from {addr}");
                            let world = Arc::clone(&self.world);
                            let options = Arc::clone(&self.options);
                            let shutdown_tx = self.shutdown_tx.clone();
                            tokio::spawn(async move {
                                handle_connection(world, options, stream, addr, shutdown_tx).await;
                            });
                        }
                        Err(e) => error!("accept failed: {e}"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("shutting down");
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Serve one connection from accept to close.
async fn handle_connection(
    world: Arc<Mutex<World>>,
    options: Arc<ServerOptions>,
    stream: TcpStream,
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        warn!("{addr}: failed to disable send coalescing: {e}");
    }
    let (read_half, write_half) = stream.into_split();
    let (sender, receiver) = mpsc::unbounded_channel::<Vec<u8>>();
    tokio::spawn(write_loop(write_half, receiver, addr));

    // Under one lock: greet, catch the peer up with the current phase, and
    // enter the broadcast set. Broadcasts also run under the lock, so the
    // replay can neither miss a turn nor receive one twice.
    let conn_id = {
        let mut guard = world.lock().await;
        let world = &mut *guard;
        let conn_id = world.next_conn_id;
        world.next_conn_id += 1;

        let _ = sender.send(encode_to_vec(&world.game.hello_message()));
        match world.game.phase {
            Phase::Lobby => {
                for (id, player) in &world.game.players {
                    let _ = sender.send(encode_to_vec(&ServerMessage::AcceptedPlayer {
                        id: *id,
                        player: player.clone(),
                    }));
                }
            }
            Phase::InGame => {
                let _ = sender.send(encode_to_vec(&world.game.game_started_message()));
                for turn in &world.game.turn_history {
                    let _ = sender.send(encode_to_vec(turn));
                }
            }
        }
        world.subscribers.insert(
            conn_id,
            Subscriber {
                sender,
                player: None,
            },
        );
        conn_id
    };

    read_loop(&world, &options, conn_id, read_half, addr, &shutdown_tx).await;

    let mut guard = world.lock().await;
    guard.subscribers.remove(&conn_id);
    info!("connection from {addr} closed");
}

/// Drain queued messages into the socket. Ends on write failure or when the
/// connection's channel is dropped; either way the peer gets detached on the
/// next broadcast.
async fn write_loop(
    mut write_half: OwnedWriteHalf,
    mut receiver: mpsc::UnboundedReceiver<Vec<u8>>,
    addr: SocketAddr,
) {
    while let Some(bytes) = receiver.recv().await {
        if let Err(e) = write_half.write_all(&bytes).await {
            warn!("{addr}: write failed: {e}");
            return;
        }
    }
}

/// Read, reassemble and dispatch client messages until EOF, a read error or
/// a framing error closes the stream.
async fn read_loop(
    world: &Arc<Mutex<World>>,
    options: &Arc<ServerOptions>,
    conn_id: ConnId,
    mut read_half: OwnedReadHalf,
    addr: SocketAddr,
    shutdown_tx: &broadcast::Sender<()>,
) {
    let mut assembler = MessageAssembler::<ClientMessage>::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = match read_half.read(&mut buf).await {
            Ok(0) => {
                debug!("{addr}: end of stream");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                warn!("{addr}: read failed: {e}");
                return;
            }
        };
        let messages = match assembler.feed(&buf[..n]) {
            Ok(messages) => messages,
            Err(e) => {
                warn!("{addr}: {e}, closing connection");
                return;
            }
        };
        for message in messages {
            handle_client_message(world, options, conn_id, addr, message, shutdown_tx).await;
        }
    }
}

/// Apply one decoded client message under the world lock.
async fn handle_client_message(
    world: &Arc<Mutex<World>>,
    options: &Arc<ServerOptions>,
    conn_id: ConnId,
    addr: SocketAddr,
    message: ClientMessage,
    shutdown_tx: &broadcast::Sender<()>,
) {
    let mut guard = world.lock().await;
    let world_ref = &mut *guard;

    match message {
        ClientMessage::Join { name } => {
            let already_player = world_ref
                .subscribers
                .get(&conn_id)
                .is_none_or(|subscriber| subscriber.player.is_some());
            if already_player {
                debug!("{addr}: repeated join ignored");
                return;
            }
            let address = format!("[{}]:{}", addr.ip(), addr.port());
            let Some((id, player)) = world_ref.game.try_join(name, address) else {
                debug!("{addr}: join ignored (game running or lobby full)");
                return;
            };
            if let Some(subscriber) = world_ref.subscribers.get_mut(&conn_id) {
                subscriber.player = Some(id);
            }
            info!("{addr} joined as player {id} ({})", player.name);
            world_ref.broadcast(&ServerMessage::AcceptedPlayer { id, player });

            if world_ref.game.phase == Phase::InGame {
                // The roster just filled; hand the clock to the game loop.
                tokio::spawn(run_game(
                    Arc::clone(world),
                    Arc::clone(options),
                    shutdown_tx.subscribe(),
                ));
            }
        }
        ClientMessage::PlaceBomb => record_action(world_ref, conn_id, PlayerAction::PlaceBomb),
        ClientMessage::PlaceBlock => record_action(world_ref, conn_id, PlayerAction::PlaceBlock),
        ClientMessage::Move { direction } => {
            record_action(world_ref, conn_id, PlayerAction::Move(direction));
        }
    }
}

fn record_action(world: &mut World, conn_id: ConnId, action: PlayerAction) {
    if let Some(player_id) = world
        .subscribers
        .get(&conn_id)
        .and_then(|subscriber| subscriber.player)
    {
        world.game.record_action(player_id, action);
    }
}

/// Drive one game from its opening turn to GameEnded, then reset to the
/// lobby and exit. Spawned when the roster fills; the interval keeps an
/// absolute cadence, so a slow turn does not shift later deadlines.
async fn run_game(
    world: Arc<Mutex<World>>,
    options: Arc<ServerOptions>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    {
        let mut guard = world.lock().await;
        let world = &mut *guard;
        info!("lobby full, starting game with {} players", world.game.players.len());
        let started = world.game.game_started_message();
        world.broadcast(&started);
        let turn = opening_turn(&mut world.game);
        world.broadcast(&turn);
        if world.game.turn > u32::from(options.game_length) {
            finish_game(world);
            return;
        }
    }

    let mut ticker = interval(options.turn_duration);
    ticker.tick().await; // the first tick completes immediately

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.recv() => {
                debug!("game loop stopping on shutdown");
                return;
            }
        }

        let mut guard = world.lock().await;
        let world = &mut *guard;
        let turn = advance_turn(&mut world.game);
        world.broadcast(&turn);
        if world.game.turn > u32::from(options.game_length) {
            finish_game(world);
            return;
        }
    }
}

/// Broadcast the final scores and return to an empty lobby. Connections
/// stay open and may join the next game.
fn finish_game(world: &mut World) {
    let ended = world.game.game_ended_message();
    world.broadcast(&ended);
    world.game.reset_to_lobby();
    for subscriber in world.subscribers.values_mut() {
        subscriber.player = None;
    }
    info!("game over, back to lobby");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::net::Ipv6Addr;
    use std::time::Duration;

    use bomb_bots_protocol::message::Event;

    fn test_options(players_count: u8, game_length: u16) -> ServerOptions {
        ServerOptions {
            bomb_timer: 3,
            players_count,
            turn_duration: Duration::from_millis(20),
            explosion_radius: 2,
            initial_blocks: 2,
            game_length,
            server_name: "test-arena".into(),
            port: 0,
            seed: 1,
            size_x: 8,
            size_y: 8,
        }
    }

    async fn start_server(options: ServerOptions) -> (SocketAddr, broadcast::Sender<()>) {
        let server = GameServer::bind(options).await.unwrap();
        let port = server.local_addr().unwrap().port();
        let shutdown = server.shutdown_handle();
        tokio::spawn(server.run());
        ((Ipv6Addr::LOCALHOST, port).into(), shutdown)
    }

    struct TestPeer {
        stream: TcpStream,
        assembler: MessageAssembler<ServerMessage>,
        queued: VecDeque<ServerMessage>,
    }

    impl TestPeer {
        async fn connect(addr: SocketAddr) -> Self {
            Self {
                stream: TcpStream::connect(addr).await.unwrap(),
                assembler: MessageAssembler::new(),
                queued: VecDeque::new(),
            }
        }

        async fn send(&mut self, message: &ClientMessage) {
            self.stream.write_all(&encode_to_vec(message)).await.unwrap();
        }

        async fn next_message(&mut self) -> ServerMessage {
            loop {
                if let Some(message) = self.queued.pop_front() {
                    return message;
                }
                let mut buf = [0u8; 4096];
                let n = self.stream.read(&mut buf).await.unwrap();
                assert!(n > 0, "server closed the stream mid-test");
                self.queued.extend(self.assembler.feed(&buf[..n]).unwrap());
            }
        }

        async fn next_turn(&mut self) -> (u16, Vec<Event>) {
            loop {
                if let ServerMessage::Turn { turn, events } = self.next_message().await {
                    return (turn, events);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_full_game_lifecycle() {
        let (addr, _shutdown) = start_server(test_options(1, 2)).await;
        let mut peer = TestPeer::connect(addr).await;

        let hello = peer.next_message().await;
        let ServerMessage::Hello(settings) = hello else {
            panic!("expected hello first, got {hello:?}");
        };
        assert_eq!(settings.server_name, "test-arena");
        assert_eq!(settings.players_count, 1);

        peer.send(&ClientMessage::Join { name: "solo".into() }).await;

        let accepted = peer.next_message().await;
        let ServerMessage::AcceptedPlayer { id, player } = accepted else {
            panic!("expected accepted player, got {accepted:?}");
        };
        assert_eq!(id, 0);
        assert_eq!(player.name, "solo");
        assert!(player.address.starts_with('['), "address is [<ip>]:<port>");

        let started = peer.next_message().await;
        let ServerMessage::GameStarted { players } = started else {
            panic!("expected game start, got {started:?}");
        };
        assert_eq!(players.len(), 1);

        for expected in 0..=2u16 {
            let (turn, _) = peer.next_turn().await;
            assert_eq!(turn, expected);
        }

        let ended = peer.next_message().await;
        let ServerMessage::GameEnded { scores } = ended else {
            panic!("expected game end, got {ended:?}");
        };
        assert_eq!(scores.get(&0), Some(&0));
    }

    #[tokio::test]
    async fn test_late_spectator_gets_full_replay() {
        let (addr, _shutdown) = start_server(test_options(1, 30)).await;
        let mut player = TestPeer::connect(addr).await;
        player.next_message().await; // hello
        player.send(&ClientMessage::Join { name: "runner".into() }).await;

        // Let a few turns pass before the spectator shows up.
        loop {
            let (turn, _) = player.next_turn().await;
            if turn >= 3 {
                break;
            }
        }

        let mut spectator = TestPeer::connect(addr).await;
        assert!(matches!(spectator.next_message().await, ServerMessage::Hello(_)));
        assert!(matches!(
            spectator.next_message().await,
            ServerMessage::GameStarted { .. }
        ));

        // Replayed turns start at 0 and stay consecutive through the live
        // broadcasts that follow.
        for expected in 0..=6u16 {
            let (turn, _) = spectator.next_turn().await;
            assert_eq!(turn, expected);
        }
    }

    #[tokio::test]
    async fn test_rejoin_after_game_end_restarts_ids() {
        let (addr, _shutdown) = start_server(test_options(1, 0)).await;
        let mut peer = TestPeer::connect(addr).await;
        peer.next_message().await; // hello
        peer.send(&ClientMessage::Join { name: "first".into() }).await;

        // A zero-length game ends right after its opening turn.
        loop {
            if let ServerMessage::GameEnded { .. } = peer.next_message().await {
                break;
            }
        }

        peer.send(&ClientMessage::Join { name: "second".into() }).await;
        let accepted = peer.next_message().await;
        let ServerMessage::AcceptedPlayer { id, player } = accepted else {
            panic!("expected accepted player, got {accepted:?}");
        };
        assert_eq!(id, 0);
        assert_eq!(player.name, "second");
    }

    #[tokio::test]
    async fn test_duplicate_join_does_not_consume_an_id() {
        let (addr, _shutdown) = start_server(test_options(2, 5)).await;
        let mut first = TestPeer::connect(addr).await;
        first.next_message().await; // hello
        first.send(&ClientMessage::Join { name: "one".into() }).await;
        first.send(&ClientMessage::Join { name: "one-again".into() }).await;

        let accepted = first.next_message().await;
        assert!(matches!(accepted, ServerMessage::AcceptedPlayer { id: 0, .. }));

        let mut second = TestPeer::connect(addr).await;
        second.next_message().await; // hello
        // The replay carries player 0's admission.
        assert!(matches!(
            second.next_message().await,
            ServerMessage::AcceptedPlayer { id: 0, .. }
        ));
        second.send(&ClientMessage::Join { name: "two".into() }).await;
        let accepted = second.next_message().await;
        let ServerMessage::AcceptedPlayer { id, .. } = accepted else {
            panic!("expected accepted player, got {accepted:?}");
        };
        assert_eq!(id, 1, "duplicate join must not have taken an id");
    }

    #[tokio::test]
    async fn test_spectator_in_lobby_sees_joins() {
        let (addr, _shutdown) = start_server(test_options(2, 5)).await;
        let mut spectator = TestPeer::connect(addr).await;
        spectator.next_message().await; // hello

        let mut player = TestPeer::connect(addr).await;
        player.next_message().await; // hello
        player.send(&ClientMessage::Join { name: "one".into() }).await;

        assert!(matches!(
            spectator.next_message().await,
            ServerMessage::AcceptedPlayer { id: 0, .. }
        ));
    }
}
