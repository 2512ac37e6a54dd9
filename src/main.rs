//! mudplay - a terminal client for browser-hosted MUD games
//!
//! Joins a game's play channel over a Phoenix socket and shows the
//! transcript, status gauges and a prompt in the console.
//!
//! # Quick Start
//!
//! ```text
//! mudplay -g midmud                      # Join using server_url from config.toml
//! mudplay -g midmud -s wss://host/socket/websocket -t <token>
//! ```
//!
//! # Keys
//!
//! | Key | Action |
//! |-----|--------|
//! | Enter | Send the line |
//! | Up/Down | Recall history (text prompts only) |
//! | PageUp/PageDown | Scroll the transcript |
//! | Ctrl+V | Paste |
//! | Ctrl+U, Esc | Clear the line |
//! | Ctrl+C, Ctrl+D | Quit |

mod ui;

use std::env;
use std::time::Duration;

use anyhow::{anyhow, Context};
use crossterm::event::{self, Event, KeyEventKind};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use mudplay::config::{self, ColorScheme, Config};
use mudplay::transport::WebSocketTransport;
use mudplay::{Session, SessionView};

use crate::ui::{KeyMapper, PromptAction, Renderer};

/// Lines moved per PageUp/PageDown
const SCROLL_PAGE: usize = 10;

/// Command line options
#[derive(Default)]
struct Args {
    game: Option<String>,
    server: Option<String>,
    token: Option<String>,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("mudplay {}", VERSION);
}

fn print_help() {
    eprintln!("mudplay {} - terminal client for browser-hosted MUD games", VERSION);
    eprintln!();
    eprintln!("Usage: mudplay [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -g, --game <ID>       Game to join (default: `game` from config.toml)");
    eprintln!("  -s, --server <URL>    Socket endpoint (default: `server_url` from config.toml)");
    eprintln!("  -t, --token <TOKEN>   Play token (default: $MUDPLAY_TOKEN)");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Keys:");
    eprintln!("  Enter                 Send the line");
    eprintln!("  Up/Down               Recall history (text prompts only)");
    eprintln!("  PageUp/PageDown       Scroll the transcript");
    eprintln!("  Ctrl+V                Paste");
    eprintln!("  Ctrl+U, Esc           Clear the line");
    eprintln!("  Ctrl+C, Ctrl+D        Quit");
    eprintln!();
    eprintln!("Configuration: ~/.mudplay/config.toml");
    eprintln!("Log file:      ~/.mudplay/mudplay.log (level via RUST_LOG)");
    eprintln!();
    eprintln!("Color schemes: {}", ColorScheme::list().join(", "));
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-g" | "--game" => {
                i += 1;
                parsed.game = Some(args.get(i).ok_or("Missing game argument")?.clone());
            }
            "-s" | "--server" => {
                i += 1;
                parsed.server = Some(args.get(i).ok_or("Missing server argument")?.clone());
            }
            "-t" | "--token" => {
                i += 1;
                parsed.token = Some(args.get(i).ok_or("Missing token argument")?.clone());
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(parsed)
}

fn init_logging() {
    let log_path = config::config_dir()
        .map(|dir| dir.join("mudplay.log"))
        .unwrap_or_else(|| std::path::PathBuf::from("mudplay.log"));

    // Open log file (append mode)
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging();
    info!("mudplay {} starting...", VERSION);

    let config = Config::load();
    run_client(args, config)
}

fn run_client(args: Args, config: Config) -> anyhow::Result<()> {
    let game = args
        .game
        .or_else(|| config.game.clone())
        .ok_or_else(|| anyhow!("no game given; pass --game or set `game` in config.toml"))?;
    let server = args.server.unwrap_or_else(|| config.server_url.clone());
    let token = args
        .token
        .or_else(|| env::var("MUDPLAY_TOKEN").ok())
        .unwrap_or_default();
    if token.is_empty() {
        warn!("no play token given, joining without one");
    }

    info!(game = %game, server = %server, "joining");
    let transport = WebSocketTransport::new(server, config.heartbeat());
    let mut session = Session::new(transport);
    session
        .start(&game, &token)
        .with_context(|| format!("failed to join {}", game))?;

    let mut renderer = Renderer::new(
        config.get_color_scheme(),
        config.gauges.clone(),
        config.mask_char,
        game,
    );
    renderer.init()?;

    let result = run_main_loop(&mut session, &mut renderer);

    session.close();
    renderer.cleanup()?;

    info!(
        status = session.status().label(),
        anomalies = session.anomaly_count(),
        "session ended"
    );
    result
}

fn run_main_loop(
    session: &mut Session<WebSocketTransport>,
    renderer: &mut Renderer,
) -> anyhow::Result<()> {
    let poll_timeout = Duration::from_millis(10);
    renderer.render(&*session)?;

    loop {
        // Apply whatever the socket delivered since the last pass
        let events = session.transport().poll_events();
        let mut dirty = !events.is_empty();
        for event in events {
            session.handle_event(event);
        }

        if event::poll(poll_timeout)? {
            match event::read()? {
                Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                    match KeyMapper::map(&key_event) {
                        Some(PromptAction::Quit) => break,
                        Some(action) => {
                            apply_action(session, renderer, action);
                            dirty = true;
                        }
                        None => {}
                    }
                }
                Event::Paste(text) => {
                    paste_text(session, &text);
                    dirty = true;
                }
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }

        if dirty {
            renderer.render(&*session)?;
        }
    }

    Ok(())
}

fn apply_action(
    session: &mut Session<WebSocketTransport>,
    renderer: &mut Renderer,
    action: PromptAction,
) {
    match action {
        PromptAction::Insert(ch) => {
            let mut text = session.input().current_text().to_string();
            text.push(ch);
            session.set_current_text(text);
        }
        PromptAction::Backspace => {
            let mut text = session.input().current_text().to_string();
            text.pop();
            session.set_current_text(text);
        }
        PromptAction::ClearLine => session.set_current_text(String::new()),
        PromptAction::Submit => {
            if session.submit_line().is_some() {
                renderer.scroll_to_bottom();
            }
        }
        PromptAction::HistoryBack => session.scroll_backward(),
        PromptAction::HistoryForward => session.scroll_forward(),
        PromptAction::Paste => {
            match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.get_text()) {
                Ok(text) => paste_text(session, &text),
                Err(e) => warn!(err = %e, "clipboard read failed"),
            }
        }
        PromptAction::PageUp => renderer.scroll_up(SCROLL_PAGE),
        PromptAction::PageDown => renderer.scroll_down(SCROLL_PAGE),
        PromptAction::Quit => {}
    }
}

/// Append pasted text to the prompt; only the first line is taken
fn paste_text(session: &mut Session<WebSocketTransport>, text: &str) {
    let Some(line) = text.lines().next() else {
        return;
    };
    let mut current = session.input().current_text().to_string();
    current.push_str(line);
    session.set_current_text(current);
}
