//! Bomb Bots Game Server
//!
//! Binary entry point: parse options, set up logging, run the server.

use std::process::ExitCode;

use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use bomb_bots_server::config::{print_usage, OptionsError, ServerOptions};
use bomb_bots_server::network::server::GameServer;

#[tokio::main]
async fn main() -> ExitCode {
    let options = match ServerOptions::from_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(OptionsError::Help) => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{e}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("failed to set tracing subscriber");

    info!(
        "starting {} ({}x{} board, {} players, {} turns)",
        options.server_name, options.size_x, options.size_y, options.players_count, options.game_length
    );

    let server = match GameServer::bind(options).await {
        Ok(server) => server,
        Err(e) => {
            error!("failed to bind: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = server.run().await {
        error!("server error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
