//! Console shell: command parsing, REPL thread and status rendering

use anyhow::Result;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

use vmix_remote::dispatcher::Dispatcher;
use vmix_remote::mixer::{MixerState, OverlayState, OVERLAY_LAYERS};
use vmix_remote::sync::{ConnectionStatus, EngineEvent, SyncEngine};

const PROMPT: &str = "vmix> ";

/// One parsed shell line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// `connect [host[:port]]`; missing parts come from the config
    Connect {
        host: Option<String>,
        port: Option<u16>,
    },
    Reconnect,
    Disconnect,
    List,
    Preview(String),
    Play,
    FadeToBlack,
    Overlay(u8),
    ClearOverlays,
    Status,
    Help,
    Quit,
}

/// Parse one input line. `Ok(None)` for blank lines.
pub fn parse_command(line: &str) -> std::result::Result<Option<ShellCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    if words.next().is_some() {
        return Err(format!("too many arguments for '{}'", verb));
    }

    let command = match (verb.to_ascii_lowercase().as_str(), arg) {
        ("connect", None) => ShellCommand::Connect {
            host: None,
            port: None,
        },
        ("connect", Some(address)) => {
            let (host, port) = parse_address(address)?;
            ShellCommand::Connect {
                host: Some(host),
                port,
            }
        },
        ("reconnect", None) => ShellCommand::Reconnect,
        ("disconnect", None) => ShellCommand::Disconnect,
        ("list" | "ls", None) => ShellCommand::List,
        ("preview" | "pv", Some(number)) => ShellCommand::Preview(number.to_string()),
        ("preview" | "pv", None) => return Err("usage: preview <input number>".to_string()),
        ("play" | "go", None) => ShellCommand::Play,
        ("ftb", None) => ShellCommand::FadeToBlack,
        ("overlay" | "ov", Some(layer)) => {
            let layer = layer
                .parse::<u8>()
                .ok()
                .filter(|l| OverlayState::is_valid_layer(*l))
                .ok_or_else(|| format!("overlay layer must be between 1 and {}", OVERLAY_LAYERS))?;
            ShellCommand::Overlay(layer)
        },
        ("overlay" | "ov", None) => {
            return Err(format!("usage: overlay <1-{}>", OVERLAY_LAYERS));
        },
        ("clear", None) => ShellCommand::ClearOverlays,
        ("status" | "st", None) => ShellCommand::Status,
        ("help" | "?", None) => ShellCommand::Help,
        ("quit" | "exit", None) => ShellCommand::Quit,
        (_, Some(_)) if is_known(verb) => {
            return Err(format!("'{}' takes no arguments", verb));
        },
        _ => return Err(format!("unknown command '{}' (try 'help')", verb)),
    };
    Ok(Some(command))
}

fn is_known(verb: &str) -> bool {
    matches!(
        verb.to_ascii_lowercase().as_str(),
        "reconnect" | "disconnect" | "list" | "ls" | "play" | "go" | "ftb" | "clear" | "status"
            | "st" | "help" | "?" | "quit" | "exit"
    )
}

/// Split `host[:port]`
pub fn parse_address(address: &str) -> std::result::Result<(String, Option<u16>), String> {
    match address.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| format!("invalid port '{}'", port))?;
            Ok((host.to_string(), Some(port)))
        },
        None => Ok((address.to_string(), None)),
    }
}

/// Run the line editor on a blocking thread, forwarding each line.
/// The channel closes on EOF, Ctrl-C or Ctrl-D.
pub fn spawn_repl(tx: mpsc::UnboundedSender<String>) -> Result<std::thread::JoinHandle<()>> {
    let handle = std::thread::Builder::new()
        .name("repl".to_string())
        .spawn(move || {
            let mut editor = match DefaultEditor::new() {
                Ok(editor) => editor,
                Err(e) => {
                    error!("Failed to start line editor: {}", e);
                    return;
                },
            };
            repl_loop(&mut editor, &tx);
        })?;
    Ok(handle)
}

fn repl_loop(editor: &mut DefaultEditor, tx: &mpsc::UnboundedSender<String>) {
    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                if tx.send(line).is_err() {
                    break;
                }
            },
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                debug!("Line editor stopped: {}", e);
                break;
            },
        }
    }
}

/// Executes shell commands against the dispatcher and prints results
pub struct Shell {
    dispatcher: Dispatcher,
    default_endpoint: (String, u16),
}

impl Shell {
    pub fn new(dispatcher: Dispatcher, default_endpoint: (String, u16)) -> Self {
        Self {
            dispatcher,
            default_endpoint,
        }
    }

    fn engine(&self) -> &Arc<SyncEngine> {
        self.dispatcher.engine()
    }

    pub fn set_default_endpoint(&mut self, endpoint: (String, u16)) {
        self.default_endpoint = endpoint;
    }

    /// Execute one command. Returns false when the shell should exit.
    pub async fn execute(&self, command: ShellCommand) -> bool {
        let result = match command {
            ShellCommand::Quit => return false,
            ShellCommand::Help => {
                print_help();
                return true;
            },
            ShellCommand::Status => {
                println!("{}", render_status(self.engine()));
                return true;
            },
            ShellCommand::Connect { host, port } => {
                let host = host.unwrap_or_else(|| self.default_endpoint.0.clone());
                let port = port.unwrap_or(self.default_endpoint.1);
                self.engine()
                    .connect(&host, port)
                    .await
                    .map(|()| format!("Connected to {}:{}", host, port))
            },
            ShellCommand::Reconnect => self.engine().reconnect().await.map(|()| "Reconnected".to_string()),
            ShellCommand::Disconnect => {
                self.engine().disconnect();
                Ok("Disconnected".to_string())
            },
            ShellCommand::List => self.engine().list_inputs().await.map(|inputs| {
                render_inputs(&self.engine().state(), inputs.len())
            }),
            ShellCommand::Preview(number) => self.dispatcher.preview_input(&number).await.map(|o| o.message),
            ShellCommand::Play => self.dispatcher.quick_play().await.map(|o| o.message),
            ShellCommand::FadeToBlack => self.dispatcher.toggle_fade_to_black().await.map(|o| o.message),
            ShellCommand::Overlay(layer) => self.dispatcher.toggle_overlay(layer).await.map(|o| o.message),
            ShellCommand::ClearOverlays => self.dispatcher.remove_all_overlays().await.map(|o| o.message),
        };

        match result {
            Ok(message) => println!("{}", message.green()),
            Err(e) => println!("{} {}", "✗".red().bold(), e.status_message().red()),
        }
        true
    }
}

/// Status line for an engine event; `None` for events the console ignores.
/// `state` only supplies input titles; pointers come from the event itself.
pub fn render_event(event: &EngineEvent, state: &MixerState) -> Option<String> {
    match event {
        EngineEvent::StateChanged { active, preview } => {
            Some(render_pointers(&state.with_pointers(active.clone(), preview.clone())))
        },
        EngineEvent::InputsRefreshed(inputs) => {
            Some(format!("{} {} inputs", "📋".dimmed(), inputs.len()))
        },
        EngineEvent::ConnectionStatusChanged(status) => Some(render_connection(*status)),
        // The console has no blinking widget; `status` shows the FTB flag
        EngineEvent::FadeToBlackBlink(_) => None,
    }
}

fn render_pointers(state: &MixerState) -> String {
    format!(
        "{} {}   {} {}",
        "PGM".red().bold(),
        state.active_label(),
        "PVW".green().bold(),
        state.preview_label()
    )
}

fn render_connection(status: ConnectionStatus) -> String {
    match status {
        ConnectionStatus::Connected => format!("● {}", status).green().to_string(),
        ConnectionStatus::Connecting => format!("◌ {}", status).yellow().to_string(),
        ConnectionStatus::Disconnected => format!("○ {}", status).red().to_string(),
    }
}

fn render_inputs(state: &MixerState, count: usize) -> String {
    let mut out = format!("{} inputs", count).bold().to_string();
    for input in &state.inputs {
        let marker = if state.active.as_deref() == Some(input.number.as_str()) {
            "PGM".red().bold().to_string()
        } else if state.preview.as_deref() == Some(input.number.as_str()) {
            "PVW".green().bold().to_string()
        } else {
            "   ".to_string()
        };
        out.push_str(&format!(
            "\n {} V{:<3} {} {}",
            marker,
            input.number,
            input.display_title(),
            format!("[{}]", input.input_type).dimmed()
        ));
    }
    out
}

/// Multi-line status summary for the `status` command
pub fn render_status(engine: &SyncEngine) -> String {
    let state = engine.state();
    let overlays: Vec<String> = engine
        .overlays()
        .iter()
        .map(|(layer, on)| {
            if on {
                layer.to_string().yellow().bold().to_string()
            } else {
                layer.to_string().dimmed().to_string()
            }
        })
        .collect();
    let ftb = if engine.fade_to_black().active {
        "ON".red().bold().to_string()
    } else {
        "off".dimmed().to_string()
    };
    let address = engine
        .connection()
        .map(|c| c.address())
        .unwrap_or_else(|| "-".to_string());
    let health = engine.health();
    let last_contact = health
        .last_contact_at
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());

    format!(
        "{} {}\n{}\nOverlays: {}   FTB: {}\nLast contact: {} ({} failed polls)",
        render_connection(engine.status()),
        address,
        render_pointers(&state),
        overlays.join(" "),
        ftb,
        last_contact,
        health.consecutive_failures
    )
}

fn print_help() {
    println!("{}", "Commands:".bold());
    let rows = [
        ("connect [host[:port]]", "connect to vMix (defaults from config)"),
        ("reconnect", "drop and rebuild the connection"),
        ("disconnect", "stop polling and disconnect"),
        ("list", "refresh and show all inputs"),
        ("preview <n>", "put input n into preview"),
        ("play", "fade preview to program (cut if fade fails)"),
        ("ftb", "toggle fade to black"),
        ("overlay <1-4>", "toggle preview on an overlay layer"),
        ("clear", "take all overlays out"),
        ("status", "show connection and mixer state"),
        ("quit", "exit"),
    ];
    for (command, description) in rows {
        println!("  {:<22} {}", command.cyan(), description);
    }
}
