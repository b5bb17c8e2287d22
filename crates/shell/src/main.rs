//! Popfolio Shell
//!
//! Host shell process for the Popfolio panel desktop.
//!
//! Responsibilities:
//! - Load panel declarations and viewport from config
//! - Process host commands from stdin
//! - Run the panel engine (stagger queue, z-order, placement, theme)
//! - Emit surface updates as line-delimited JSON on stdout

mod config;
mod session;
mod surface;

use anyhow::Result;
use config::Config;
use session::{Session, StepOutcome};
use surface::SurfaceUpdate;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Events that the shell event loop processes.
enum ShellEvent {
    /// A command from the rendering host.
    Host(HostCommand),
    /// A panel-open settle timer fired.
    OpenSettled,
    /// Shutdown signal.
    Shutdown,
}

/// Commands the rendering host sends on stdin, one per line.
#[derive(Debug, Clone, PartialEq)]
enum HostCommand {
    /// Flip a panel's toggle control.
    Toggle { panel: String },
    /// A panel surface was pressed.
    Press { panel: String },
    /// Flip the page theme.
    Theme,
    /// The viewport changed size.
    Resize { width: i32, height: i32 },
    /// Stop the shell.
    Quit,
}

/// Parse one line of host input.
///
/// Returns None for blank lines and anything unrecognized; the shell logs
/// and keeps running.
fn parse_host_command(line: &str) -> Option<HostCommand> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "toggle" => Some(HostCommand::Toggle {
            panel: parts.next()?.to_string(),
        }),
        "press" => Some(HostCommand::Press {
            panel: parts.next()?.to_string(),
        }),
        "theme" => Some(HostCommand::Theme),
        "resize" => {
            let width = parts.next()?.parse().ok()?;
            let height = parts.next()?.parse().ok()?;
            Some(HostCommand::Resize { width, height })
        }
        "quit" => Some(HostCommand::Quit),
        _ => None,
    }
}

/// Write surface updates to stdout, one JSON object per line.
fn emit(updates: &[SurfaceUpdate]) {
    for update in updates {
        match serde_json::to_string(update) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!("Failed to serialize surface update: {}", e),
        }
    }
}

/// Apply a step outcome: emit its updates and schedule the settle timer if
/// one was requested. The timer is fire-and-forget; the session tolerates a
/// settle arriving after the queue went idle.
fn apply_outcome(outcome: StepOutcome, event_tx: &mpsc::Sender<ShellEvent>) {
    emit(&outcome.updates);

    if let Some(delay) = outcome.settle_after {
        let settle_tx = event_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = settle_tx.send(ShellEvent::OpenSettled).await;
        });
    }
}

/// Read host commands from stdin and forward them to the event loop.
async fn run_host_reader(event_tx: mpsc::Sender<ShellEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match parse_host_command(line) {
                    Some(HostCommand::Quit) => {
                        let _ = event_tx.send(ShellEvent::Shutdown).await;
                        break;
                    }
                    Some(cmd) => {
                        if event_tx.send(ShellEvent::Host(cmd)).await.is_err() {
                            break;
                        }
                    }
                    None => warn!("Unrecognized host command: {}", line),
                }
            }
            Ok(None) => {
                // Host closed stdin
                let _ = event_tx.send(ShellEvent::Shutdown).await;
                break;
            }
            Err(e) => {
                error!("Failed to read host input: {}", e);
                let _ = event_tx.send(ShellEvent::Shutdown).await;
                break;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (needed for log level)
    let config = Config::load().unwrap_or_else(|e| {
        // Can't use tracing yet, fall back to eprintln
        eprintln!("Failed to load configuration: {}. Using defaults.", e);
        Config::default()
    });

    // Initialize logging with configured log level. Log output goes to
    // stderr; stdout is reserved for the surface update stream.
    let log_level = match config.behavior.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO, // default fallback for invalid values
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Popfolio shell starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: {} panels, viewport {}x{}, log_level={}",
        config.panels.len(),
        config.viewport.width,
        config.viewport.height,
        config.behavior.log_level
    );

    let mut session = Session::new(&config)?;

    // Create event channel
    let (event_tx, mut event_rx) = mpsc::channel::<ShellEvent>(100);

    // Spawn host command reader
    let reader_tx = event_tx.clone();
    tokio::spawn(async move {
        run_host_reader(reader_tx).await;
    });

    // Install Ctrl+C handler so terminal kill triggers graceful shutdown
    {
        let shutdown_tx = event_tx.clone();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Ctrl+C received, initiating shutdown...");
                let _ = shutdown_tx.send(ShellEvent::Shutdown).await;
            }
        });
    }

    // Tell the host the starting theme before any commands arrive
    emit(&[SurfaceUpdate::theme(session.theme())]);

    info!("Ready. Send host commands on stdin.");

    // Main event loop
    loop {
        let event = match event_rx.recv().await {
            Some(e) => e,
            None => break,
        };

        match event {
            ShellEvent::Host(cmd) => {
                debug!("Host command: {:?}", cmd);
                match cmd {
                    HostCommand::Toggle { panel } => {
                        apply_outcome(session.toggle(&panel), &event_tx);
                    }
                    HostCommand::Press { panel } => {
                        apply_outcome(session.press(&panel), &event_tx);
                    }
                    HostCommand::Theme => {
                        apply_outcome(session.toggle_theme(), &event_tx);
                    }
                    HostCommand::Resize { width, height } => {
                        session.resize(width, height);
                    }
                    HostCommand::Quit => {
                        // Translated to Shutdown by the reader
                    }
                }
            }
            ShellEvent::OpenSettled => {
                apply_outcome(session.open_settled(), &event_tx);
            }
            ShellEvent::Shutdown => {
                if session.is_animating() {
                    debug!("Shutting down with a panel entrance in flight");
                }
                info!("Shutting down...");
                break;
            }
        }
    }

    info!("Popfolio shell stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toggle() {
        assert_eq!(
            parse_host_command("toggle about"),
            Some(HostCommand::Toggle {
                panel: "about".to_string()
            })
        );
    }

    #[test]
    fn test_parse_press() {
        assert_eq!(
            parse_host_command("press projects"),
            Some(HostCommand::Press {
                panel: "projects".to_string()
            })
        );
    }

    #[test]
    fn test_parse_theme_and_quit() {
        assert_eq!(parse_host_command("theme"), Some(HostCommand::Theme));
        assert_eq!(parse_host_command("quit"), Some(HostCommand::Quit));
    }

    #[test]
    fn test_parse_resize() {
        assert_eq!(
            parse_host_command("resize 1440 900"),
            Some(HostCommand::Resize {
                width: 1440,
                height: 900
            })
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_host_command(""), None);
        assert_eq!(parse_host_command("toggle"), None);
        assert_eq!(parse_host_command("resize 100"), None);
        assert_eq!(parse_host_command("resize wide tall"), None);
        assert_eq!(parse_host_command("unknown about"), None);
    }

    #[test]
    fn test_parse_ignores_extra_whitespace() {
        assert_eq!(
            parse_host_command("  toggle   contact  "),
            Some(HostCommand::Toggle {
                panel: "contact".to_string()
            })
        );
    }
}
