use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use meet_lobby::cli::{Args, Command};
use meet_lobby::config::RegistrySettings;
use meet_lobby::directory::{participants_label, DirectoryState, DirectoryView};
use meet_lobby::ident::default_passphrase;
use meet_lobby::launch::{CustomConnect, E2eeOptions, JoinExisting, QuickStart};
use meet_lobby::navigation::{Location, NavigationController, Navigator};
use meet_lobby::poller::DirectoryPoller;
use meet_lobby::registry::RegistryClient;
use meet_lobby::server;

// ---------------------------------------------------------------------------
// Terminal navigator
// ---------------------------------------------------------------------------

/// Prints each destination instead of opening it.
struct TerminalNavigator {
    origin: Option<String>,
}

impl Navigator for TerminalNavigator {
    fn push(&mut self, location: &Location) {
        let rendered = match &self.origin {
            Some(origin) => format!("{}{}", origin.trim_end_matches('/'), location),
            None => location.to_string(),
        };
        println!("{}", rendered.bright_green());
    }
}

fn e2ee_options(e2ee: bool, passphrase: Option<String>) -> E2eeOptions {
    E2eeOptions {
        enabled: e2ee || passphrase.is_some(),
        passphrase: passphrase.unwrap_or_else(default_passphrase),
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn render_directory(state: &DirectoryState) {
    let now = now_secs();
    match state.view() {
        DirectoryView::Loading => eprintln!("{}", "Loading active rooms...".bright_black()),
        DirectoryView::Failed(msg) => eprintln!("{}", msg.red()),
        DirectoryView::Empty => eprintln!(
            "{}",
            "No active meetings found. Start a new meeting with `meet-lobby start`!".bright_black()
        ),
        DirectoryView::Listing { rooms, error, .. } => {
            for room in rooms {
                println!(
                    "  {}  {} • Created {}",
                    room.name.bold(),
                    participants_label(room.participant_count),
                    room.age_label(now)
                );
            }
            if let Some(msg) = error {
                eprintln!("{}", msg.red());
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let settings = RegistrySettings::load(args.config.as_deref())?;
    let mut navigator = TerminalNavigator {
        origin: std::env::var("MEET_LOBBY_ORIGIN").ok(),
    };

    match args.command {
        Command::Serve { bind, port } => {
            let addr = format!("{bind}:{port}");
            eprintln!(
                "{}",
                format!("  Room directory at http://{addr}{}", server::ACTIVE_ROOMS_PATH)
                    .bright_green()
            );
            eprintln!("{}", "  Press Ctrl+C to stop.".bright_blue());
            if let Err(e) = settings.resolve() {
                tracing::warn!(error = %e, "registry not configured, requests will fail");
            }
            let registry = RegistryClient::builder(settings).build();
            server::serve(&addr, registry).await?;
        }
        Command::Start { e2ee, passphrase } => {
            QuickStart::new(e2ee_options(e2ee, passphrase)).launch(&mut navigator)?;
        }
        Command::Connect {
            server_url,
            token,
            e2ee,
            passphrase,
        } => {
            CustomConnect::new(server_url, token)
                .with_e2ee(e2ee_options(e2ee, passphrase))
                .launch(&mut navigator)?;
        }
        Command::Join { name, timeout_secs } => {
            let handle = DirectoryPoller::new(RegistryClient::builder(settings).build()).spawn();
            let state = tokio::time::timeout(Duration::from_secs(timeout_secs), handle.settled())
                .await
                .map_err(|_| "timed out waiting for the room registry")?
                .ok_or("room directory stopped unexpectedly")?;
            handle.shutdown();

            match name {
                Some(name) => {
                    JoinExisting::new(&state).launch(&name, &mut navigator)?;
                }
                None => render_directory(&state),
            }
        }
        Command::Watch { interval_secs } => {
            let handle = DirectoryPoller::new(RegistryClient::builder(settings).build())
                .interval(Duration::from_secs(interval_secs.max(1)))
                .spawn();
            let mut rx = handle.subscribe();
            let mut stdin = BufReader::new(tokio::io::stdin()).lines();
            eprintln!("{}", "  Enter `r` to refresh, Ctrl+C to stop.".bright_blue());

            loop {
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = rx.borrow_and_update().clone();
                        if !state.is_loading {
                            render_directory(&state);
                        }
                    }
                    line = stdin.next_line() => match line {
                        Ok(Some(cmd)) if cmd.trim() == "r" => {
                            if !handle.refresh() {
                                eprintln!("{}", "  refresh already in progress".bright_black());
                            }
                        }
                        Ok(Some(_)) => {}
                        _ => break,
                    },
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            handle.shutdown();
        }
        Command::Tab { url, select } => {
            let mut controller = NavigationController::new(Location::parse(&url)?, navigator);
            println!("{}", controller.mode().label().bold());
            if let Some(mode) = select {
                controller.select_mode(mode);
                println!("{}", controller.mode().label().bold());
            }
        }
    }

    Ok(())
}
