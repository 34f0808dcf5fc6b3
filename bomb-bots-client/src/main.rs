//! Bomb Bots Client Proxy
//!
//! Binary entry point: parse options, set up logging, run the proxy.

use std::process::ExitCode;

use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use bomb_bots_client::config::{print_usage, ClientOptions, OptionsError};

#[tokio::main]
async fn main() -> ExitCode {
    let options = match ClientOptions::from_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(OptionsError::Help) => {
            print_usage();
            return ExitCode::FAILURE;
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

    if let Err(e) = bomb_bots_client::proxy::run(options).await {
        error!("{e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
