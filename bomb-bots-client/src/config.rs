//! Client Configuration
//!
//! Command-line options for the proxy. Addresses arrive as `host:port`
//! strings; the split happens on the last colon so bare IPv6 literals work.

use thiserror::Error;

use bomb_bots_protocol::codec::MAX_STRING_LEN;

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

/// Fully validated client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    /// Host part of the UI endpoint.
    pub gui_host: String,
    /// Port part of the UI endpoint.
    pub gui_port: u16,
    /// Name sent in the Join message.
    pub player_name: String,
    /// Local UDP port the UI talks to.
    pub port: u16,
    /// Host part of the game server address.
    pub server_host: String,
    /// Port part of the game server address.
    pub server_port: u16,
}

impl ClientOptions {
    /// Parse options from an argument list (without the program name).
    pub fn from_args<I>(args: I) -> Result<Self, OptionsError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut gui_address: Option<String> = None;
        let mut player_name: Option<String> = None;
        let mut port: Option<u16> = None;
        let mut server_address: Option<String> = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--gui-address" => gui_address = Some(value(&arg, args.next())?),
                "--player-name" => player_name = Some(value(&arg, args.next())?),
                "--port" => {
                    port = Some(
                        value(&arg, args.next())?
                            .parse()
                            .map_err(|_| OptionsError::Invalid("--port requires a valid port".into()))?,
                    );
                }
                "--server-address" => server_address = Some(value(&arg, args.next())?),
                "--help" | "-h" => return Err(OptionsError::Help),
                other => {
                    return Err(OptionsError::Invalid(format!("unknown option: {other}")));
                }
            }
        }

        let (gui_host, gui_port) = split_address(&require(gui_address, "--gui-address")?)?;
        let (server_host, server_port) = split_address(&require(server_address, "--server-address")?)?;
        let player_name = require(player_name, "--player-name")?;
        if player_name.len() > MAX_STRING_LEN {
            return Err(OptionsError::Invalid(format!(
                "--player-name must be at most {MAX_STRING_LEN} bytes"
            )));
        }

        Ok(Self {
            gui_host,
            gui_port,
            player_name,
            port: require(port, "--port")?,
            server_host,
            server_port,
        })
    }
}

/// Print the option summary to stdout.
pub fn print_usage() {
    println!("Usage: bomb-bots-client [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --gui-address <HOST:PORT>     UI endpoint (hostname, IPv4 or IPv6)");
    println!("  --player-name <NAME>          Name sent when joining a game");
    println!("  --port <PORT>                 Local UDP port the UI talks to");
    println!("  --server-address <HOST:PORT>  Game server (hostname, IPv4 or IPv6)");
    println!("  --help, -h                    Show this help");
}

/// Split `host:port` on the last colon, tolerating `[...]` around the host.
fn split_address(address: &str) -> Result<(String, u16), OptionsError> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| OptionsError::Invalid(format!("expected host:port, got {address}")))?;
    let port = port
        .parse()
        .map_err(|_| OptionsError::Invalid(format!("invalid port in {address}")))?;
    let host = host
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        return Err(OptionsError::Invalid(format!("empty host in {address}")));
    }
    Ok((host.to_string(), port))
}

fn value(option: &str, next: Option<String>) -> Result<String, OptionsError> {
    next.ok_or_else(|| OptionsError::Invalid(format!("{option} requires a value")))
}

fn require<T>(slot: Option<T>, option: &str) -> Result<T, OptionsError> {
    slot.ok_or_else(|| OptionsError::Invalid(format!("missing required option {option}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn full_args() -> Vec<String> {
        args(&[
            "--gui-address", "localhost:20210",
            "--player-name", "bot",
            "--port", "20211",
            "--server-address", "game.example.net:10000",
        ])
    }

    #[test]
    fn test_parses_full_argument_list() {
        let options = ClientOptions::from_args(full_args()).unwrap();
        assert_eq!(options.gui_host, "localhost");
        assert_eq!(options.gui_port, 20210);
        assert_eq!(options.player_name, "bot");
        assert_eq!(options.port, 20211);
        assert_eq!(options.server_host, "game.example.net");
        assert_eq!(options.server_port, 10000);
    }

    #[test]
    fn test_address_splits_on_last_colon() {
        assert_eq!(split_address("::1:9999").unwrap(), ("::1".to_string(), 9999));
        assert_eq!(
            split_address("[2001:db8::7]:80").unwrap(),
            ("2001:db8::7".to_string(), 80)
        );
        assert_eq!(
            split_address("10.0.0.1:81").unwrap(),
            ("10.0.0.1".to_string(), 81)
        );
    }

    #[test]
    fn test_address_without_port_is_rejected() {
        assert!(split_address("localhost").is_err());
        assert!(split_address("host:notaport").is_err());
    }

    #[test]
    fn test_missing_required_option_is_reported() {
        let mut list = full_args();
        list.drain(2..4); // remove --player-name and its value
        let err = ClientOptions::from_args(list).unwrap_err();
        assert_eq!(
            err,
            OptionsError::Invalid("missing required option --player-name".into())
        );
    }

    #[test]
    fn test_help_wins() {
        let mut list = full_args();
        list.insert(0, "--help".into());
        assert_eq!(ClientOptions::from_args(list), Err(OptionsError::Help));
    }

    #[test]
    fn test_rejects_overlong_player_name() {
        let mut list = full_args();
        let pos = list.iter().position(|a| a == "bot").unwrap();
        list[pos] = "x".repeat(256);
        assert!(matches!(
            ClientOptions::from_args(list),
            Err(OptionsError::Invalid(_))
        ));
    }
}
