//! Client Proxy Runtime
//!
//! Wires the two sides of the proxy together: a TCP stream to the game
//! server and a UDP socket shared with the UI. Two reader tasks run
//! concurrently, one per side, and a writer task owns the TCP write half.
//! The projection sits behind one lock; frame encoding and the UDP send
//! happen under it, so frames leave in the order of the server messages
//! that caused them.
//!
//! Failure policy: anything wrong with the server stream (close, read
//! error, malformed bytes) ends the process. A malformed UI datagram is
//! dropped; a failed send to the UI is logged and survived.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use bomb_bots_protocol::codec::{decode_datagram, encode_to_vec};
use bomb_bots_protocol::framing::{FramingError, MessageAssembler};
use bomb_bots_protocol::message::{InputMessage, ServerMessage};

use crate::config::ClientOptions;
use crate::projection::Projection;

/// Fatal proxy failures.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// A hostname did not resolve to any usable address.
    #[error("failed to resolve {0}")]
    Resolve(String),

    /// Socket setup or IO failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The server sent bytes that can never form a message.
    #[error("server stream broken: {0}")]
    ServerStream(#[from] FramingError),

    /// The server closed the connection.
    #[error("server closed the connection")]
    ServerClosed,
}

/// Resolve `host:port`, preferring IPv4 and falling back to IPv6.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr, ProxyError> {
    let mut fallback = None;
    for addr in lookup_host((host, port)).await? {
        match addr {
            SocketAddr::V4(_) => return Ok(addr),
            SocketAddr::V6(_) => {
                fallback.get_or_insert(addr);
            }
        }
    }
    fallback.ok_or_else(|| ProxyError::Resolve(format!("{host}:{port}")))
}

/// Run the proxy until a fatal error ends it.
pub async fn run(options: ClientOptions) -> Result<(), ProxyError> {
    let server_addr = resolve(&options.server_host, options.server_port).await?;
    let ui_addr = resolve(&options.gui_host, options.gui_port).await?;

    let stream = TcpStream::connect(server_addr).await?;
    stream.set_nodelay(true)?;
    info!("connected to server at {server_addr}");

    // Bind in the family of the UI endpoint so frames reach it directly.
    let bind_addr: SocketAddr = match ui_addr {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, options.port).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, options.port).into(),
    };
    let socket = Arc::new(UdpSocket::bind(bind_addr).await?);
    info!("talking to UI at {ui_addr} from {}", socket.local_addr()?);

    let projection = Arc::new(Mutex::new(Projection::new(options.player_name)));

    let (read_half, write_half) = stream.into_split();
    let (to_server, from_tasks) = mpsc::unbounded_channel::<Vec<u8>>();
    tokio::spawn(server_write_loop(write_half, from_tasks));

    let server_side = server_read_loop(read_half, Arc::clone(&projection), Arc::clone(&socket), ui_addr);
    let ui_side = ui_read_loop(socket, projection, to_server);

    // Both loops run until the first fatal error.
    tokio::select! {
        result = server_side => result,
        result = ui_side => result,
    }
}

/// Read server messages, fold them into the projection and forward the
/// resulting frames to the UI.
async fn server_read_loop(
    mut read_half: OwnedReadHalf,
    projection: Arc<Mutex<Projection>>,
    socket: Arc<UdpSocket>,
    ui_addr: SocketAddr,
) -> Result<(), ProxyError> {
    let mut assembler = MessageAssembler::<ServerMessage>::new();
    let mut buf = [0u8; 65536];

    loop {
        let n = read_half.read(&mut buf).await?;
        if n == 0 {
            return Err(ProxyError::ServerClosed);
        }
        for message in assembler.feed(&buf[..n])? {
            let mut projection = projection.lock().await;
            if let Some(frame) = projection.apply(message) {
                let bytes = encode_to_vec(&frame);
                if let Err(e) = socket.send_to(&bytes, ui_addr).await {
                    warn!("failed to send frame to UI: {e}");
                }
            }
        }
    }
}

/// Read UI datagrams, gate them through the projection and queue the
/// resulting client messages for the server.
async fn ui_read_loop(
    socket: Arc<UdpSocket>,
    projection: Arc<Mutex<Projection>>,
    to_server: mpsc::UnboundedSender<Vec<u8>>,
) -> Result<(), ProxyError> {
    let mut buf = [0u8; 65536];

    loop {
        let (n, from) = socket.recv_from(&mut buf).await?;
        // One message per datagram; residue or garbage drops the datagram.
        let input = match decode_datagram::<InputMessage>(&buf[..n]) {
            Ok(input) => input,
            Err(_) => {
                debug!("dropping malformed datagram from {from}");
                continue;
            }
        };
        let message = projection.lock().await.translate_input(input);
        if let Some(message) = message {
            if to_server.send(encode_to_vec(&message)).is_err() {
                return Err(ProxyError::ServerClosed);
            }
        }
    }
}

/// Drain queued client messages into the server stream.
async fn server_write_loop(
    mut write_half: OwnedWriteHalf,
    mut queued: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    while let Some(bytes) = queued.recv().await {
        if let Err(e) = write_half.write_all(&bytes).await {
            warn!("write to server failed: {e}");
            return;
        }
    }
}
