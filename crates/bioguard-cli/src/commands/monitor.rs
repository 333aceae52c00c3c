//! Monitor command implementation.
//!
//! Holds one session open and renders every reading the analyzer sends,
//! whether pushed as a notification or answered to a poll. A dropped
//! connection ends the command; there is no reconnect.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use bioguard_core::{BleAdapter, PresentationSink, SessionManager, SessionState};
use tracing::{info, warn};

use crate::config::{Config, Overrides};
use crate::terminal::TerminalSink;

/// How long to wait for the platform to confirm a requested disconnect.
const DISCONNECT_GRACE: Duration = Duration::from_secs(5);

/// Arguments for the monitor command.
pub struct MonitorArgs {
    pub overrides: Overrides,
    pub count: u32,
    pub no_color: bool,
    pub quiet: bool,
}

pub async fn cmd_monitor(args: MonitorArgs, config: &Config) -> Result<()> {
    let MonitorArgs {
        overrides,
        count,
        no_color,
        quiet,
    } = args;

    let session_config = config.session_config(&overrides)?;
    let adapter = Arc::new(BleAdapter::new(config.link_config(&overrides)?));
    let sink = TerminalSink::stdout(no_color, quiet);

    if !quiet {
        eprintln!(
            "Monitoring: {} | Poll: {} ms{}",
            session_config.filter.name,
            session_config.poll_interval.as_millis(),
            if count > 0 {
                format!(" | Count: {}", count)
            } else {
                String::new()
            }
        );
        eprintln!("{}", "-".repeat(50));
    }

    let mut manager = SessionManager::new(adapter, sink, session_config)?;
    manager.connect().await.context("Failed to connect")?;

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    run(&mut manager, count, quiet, ctrl_c).await
}

/// Render events until `count` readings arrived, `stop` resolves, or the
/// link drops. A dropped link is an error.
async fn run<S, F>(manager: &mut SessionManager<S>, count: u32, quiet: bool, stop: F) -> Result<()>
where
    S: PresentationSink,
    F: Future<Output = ()>,
{
    tokio::pin!(stop);
    let mut readings = 0u32;

    loop {
        if count > 0 && readings >= count {
            info!("Completed {} readings", readings);
            shutdown(manager).await;
            return Ok(());
        }

        tokio::select! {
            () = &mut stop => {
                if !quiet {
                    eprintln!("\nShutting down...");
                }
                shutdown(manager).await;
                return Ok(());
            }
            event = manager.next_event() => {
                let Some(event) = event else {
                    bail!("Event channel closed");
                };
                if manager.handle_event(event).is_some() {
                    readings += 1;
                }
                if manager.state() == SessionState::Idle {
                    bail!("Connection lost");
                }
            }
        }
    }
}

/// Request a disconnect and run the teardown once the platform reports it.
async fn shutdown<S: PresentationSink>(manager: &mut SessionManager<S>) {
    if let Err(e) = manager.disconnect().await {
        warn!("Disconnect failed: {}", e);
    }

    let confirmed = tokio::time::timeout(DISCONNECT_GRACE, async {
        while manager.state() != SessionState::Idle {
            match manager.next_event().await {
                Some(event) => {
                    manager.handle_event(event);
                }
                None => break,
            }
        }
    })
    .await;

    if confirmed.is_err() || manager.state() != SessionState::Idle {
        warn!("Disconnect was not confirmed within {:?}", DISCONNECT_GRACE);
        manager.on_disconnect();
    }
}
