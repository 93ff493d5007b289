use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::navigation::NavigationMode;

#[derive(Parser, Debug)]
#[command(name = "meet-lobby")]
#[command(version)]
#[command(about = "Start, connect to, or rejoin video meeting sessions")]
pub struct Args {
    /// TOML file with a [registry] table (url, api_key, api_secret)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the active-rooms endpoint over HTTP
    Serve {
        /// Address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,

        /// Port to listen on
        #[arg(long, default_value = "3000")]
        port: u16,
    },

    /// Start a new session and print its link
    Start {
        /// Enable end-to-end encryption
        #[arg(long)]
        e2ee: bool,

        /// Passphrase to use instead of a generated one (implies --e2ee)
        #[arg(long)]
        passphrase: Option<String>,
    },

    /// Connect to a custom server with a token
    Connect {
        /// Server URL, e.g. wss://example.livekit.cloud
        #[arg(long, default_value = "")]
        server_url: String,

        /// Access token
        #[arg(long, default_value = "")]
        token: String,

        /// Enable end-to-end encryption
        #[arg(long)]
        e2ee: bool,

        /// Passphrase to use instead of a generated one (implies --e2ee)
        #[arg(long)]
        passphrase: Option<String>,
    },

    /// Join a session that currently has participants (lists them when no name is given)
    Join {
        /// Room name
        name: Option<String>,

        /// Seconds to wait for the registry
        #[arg(long, default_value = "10")]
        timeout_secs: u64,
    },

    /// Watch the room directory, refreshing on an interval
    Watch {
        /// Seconds between refreshes
        #[arg(long, default_value = "5")]
        interval_secs: u64,
    },

    /// Show the mode a landing URL selects, optionally switching it
    Tab {
        /// Landing URL, e.g. "/?tab=join"
        url: String,

        /// Mode to switch to
        #[arg(long, value_enum)]
        select: Option<NavigationMode>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_serve_defaults() {
        let args = Args::parse_from(["meet-lobby", "serve"]);
        assert_eq!(args.log_level, "info");
        assert!(args.config.is_none());
        match args.command {
            Command::Serve { bind, port } => {
                assert_eq!(bind, "127.0.0.1");
                assert_eq!(port, 3000);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_args_parse_start_e2ee() {
        let args = Args::parse_from(["meet-lobby", "start", "--e2ee"]);
        assert!(matches!(args.command, Command::Start { e2ee: true, passphrase: None }));
    }

    #[test]
    fn test_args_parse_connect() {
        let args = Args::parse_from([
            "meet-lobby",
            "connect",
            "--server-url",
            "wss://x.example",
            "--token",
            "abc",
            "--passphrase",
            "pw",
        ]);
        match args.command {
            Command::Connect { server_url, token, e2ee, passphrase } => {
                assert_eq!(server_url, "wss://x.example");
                assert_eq!(token, "abc");
                assert!(!e2ee);
                assert_eq!(passphrase.as_deref(), Some("pw"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_args_parse_connect_defaults_to_empty_fields() {
        let args = Args::parse_from(["meet-lobby", "connect"]);
        assert!(matches!(
            args.command,
            Command::Connect { ref server_url, ref token, .. } if server_url.is_empty() && token.is_empty()
        ));
    }

    #[test]
    fn test_args_parse_join_with_name() {
        let args = Args::parse_from(["meet-lobby", "join", "standup", "--timeout-secs", "3"]);
        match args.command {
            Command::Join { name, timeout_secs } => {
                assert_eq!(name.as_deref(), Some("standup"));
                assert_eq!(timeout_secs, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_args_parse_tab_select() {
        let args = Args::parse_from(["meet-lobby", "tab", "/?tab=demo", "--select", "join"]);
        match args.command {
            Command::Tab { url, select } => {
                assert_eq!(url, "/?tab=demo");
                assert_eq!(select, Some(NavigationMode::JoinExisting));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_args_global_config_after_subcommand() {
        let args = Args::parse_from(["meet-lobby", "watch", "--config", "lobby.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("lobby.toml")));
    }
}
