//! Server Configuration
//!
//! Command-line option parsing and validation. Uses plain `std::env::args`
//! matching with a usage printer; every option is required except `--seed`,
//! which defaults to a clock-derived value.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

use bomb_bots_protocol::codec::MAX_STRING_LEN;
use bomb_bots_protocol::types::GameSettings;

/// Why option parsing did not produce a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    /// `--help` was requested.
    #[error("help requested")]
    Help,

    /// An option was missing, unknown or carried an unusable value.
    #[error("{0}")]
    Invalid(String),
}

/// Fully validated server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerOptions {
    /// Turns between placing a bomb and its explosion (at least 1).
    pub bomb_timer: u16,
    /// Players required to start a game (at least 1).
    pub players_count: u8,
    /// Wall-clock length of one turn.
    pub turn_duration: Duration,
    /// Reach of an explosion in each direction.
    pub explosion_radius: u16,
    /// Blocks rolled onto the board at game start.
    pub initial_blocks: u16,
    /// Number of the terminal turn.
    pub game_length: u16,
    /// Display name sent in Hello.
    pub server_name: String,
    /// TCP port to listen on.
    pub port: u16,
    /// Random generator seed.
    pub seed: u32,
    /// Board width (at least 1).
    pub size_x: u16,
    /// Board height (at least 1).
    pub size_y: u16,
}

impl ServerOptions {
    /// Parse options from an argument list (without the program name).
    pub fn from_args<I>(args: I) -> Result<Self, OptionsError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut bomb_timer: Option<u16> = None;
        let mut players_count: Option<u8> = None;
        let mut turn_duration: Option<u64> = None;
        let mut explosion_radius: Option<u16> = None;
        let mut initial_blocks: Option<u16> = None;
        let mut game_length: Option<u16> = None;
        let mut server_name: Option<String> = None;
        let mut port: Option<u16> = None;
        let mut seed: Option<u32> = None;
        let mut size_x: Option<u16> = None;
        let mut size_y: Option<u16> = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--bomb-timer" => bomb_timer = Some(number(&arg, args.next())?),
                "--players-count" => players_count = Some(number(&arg, args.next())?),
                "--turn-duration" => turn_duration = Some(number(&arg, args.next())?),
                "--explosion-radius" => explosion_radius = Some(number(&arg, args.next())?),
                "--initial-blocks" => initial_blocks = Some(number(&arg, args.next())?),
                "--game-length" => game_length = Some(number(&arg, args.next())?),
                "--server-name" => server_name = Some(value(&arg, args.next())?),
                "--port" => port = Some(number(&arg, args.next())?),
                "--seed" => seed = Some(number(&arg, args.next())?),
                "--size-x" => size_x = Some(number(&arg, args.next())?),
                "--size-y" => size_y = Some(number(&arg, args.next())?),
                "--help" | "-h" => return Err(OptionsError::Help),
                other => {
                    return Err(OptionsError::Invalid(format!("unknown option: {other}")));
                }
            }
        }

        let options = Self {
            bomb_timer: require(bomb_timer, "--bomb-timer")?,
            players_count: require(players_count, "--players-count")?,
            turn_duration: Duration::from_millis(require(turn_duration, "--turn-duration")?),
            explosion_radius: require(explosion_radius, "--explosion-radius")?,
            initial_blocks: require(initial_blocks, "--initial-blocks")?,
            game_length: require(game_length, "--game-length")?,
            server_name: require(server_name, "--server-name")?,
            port: require(port, "--port")?,
            seed: seed.unwrap_or_else(clock_seed),
            size_x: require(size_x, "--size-x")?,
            size_y: require(size_y, "--size-y")?,
        };
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), OptionsError> {
        if self.server_name.len() > MAX_STRING_LEN {
            return Err(OptionsError::Invalid(format!(
                "--server-name must be at most {MAX_STRING_LEN} bytes"
            )));
        }
        if self.players_count == 0 {
            return Err(OptionsError::Invalid(
                "--players-count must be at least 1".into(),
            ));
        }
        if self.size_x == 0 || self.size_y == 0 {
            return Err(OptionsError::Invalid(
                "--size-x and --size-y must be at least 1".into(),
            ));
        }
        if self.bomb_timer == 0 {
            return Err(OptionsError::Invalid("--bomb-timer must be at least 1".into()));
        }
        if self.turn_duration.is_zero() {
            return Err(OptionsError::Invalid(
                "--turn-duration must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The static game parameters carried by Hello.
    pub fn settings(&self) -> GameSettings {
        GameSettings {
            server_name: self.server_name.clone(),
            players_count: self.players_count,
            size_x: self.size_x,
            size_y: self.size_y,
            game_length: self.game_length,
            explosion_radius: self.explosion_radius,
            bomb_timer: self.bomb_timer,
        }
    }
}

/// Print the option summary to stdout.
pub fn print_usage() {
    println!("Usage: bomb-bots-server [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --bomb-timer <N>        Turns until a placed bomb explodes");
    println!("  --players-count <N>     Players required to start a game (1-255)");
    println!("  --turn-duration <MS>    Length of one turn in milliseconds");
    println!("  --explosion-radius <N>  Reach of an explosion in each direction");
    println!("  --initial-blocks <N>    Blocks rolled onto the board at game start");
    println!("  --game-length <N>       Number of the final turn");
    println!("  --server-name <NAME>    Server display name");
    println!("  --port <PORT>           TCP port to listen on");
    println!("  --seed <N>              (optional) Random generator seed");
    println!("  --size-x <N>            Board width");
    println!("  --size-y <N>            Board height");
    println!("  --help, -h              Show this help");
}

fn value(option: &str, next: Option<String>) -> Result<String, OptionsError> {
    next.ok_or_else(|| OptionsError::Invalid(format!("{option} requires a value")))
}

fn number<T: std::str::FromStr>(option: &str, next: Option<String>) -> Result<T, OptionsError> {
    value(option, next)?
        .parse()
        .map_err(|_| OptionsError::Invalid(format!("{option} requires a valid number")))
}

fn require<T>(slot: Option<T>, option: &str) -> Result<T, OptionsError> {
    slot.ok_or_else(|| OptionsError::Invalid(format!("missing required option {option}")))
}

fn clock_seed() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u32
}
