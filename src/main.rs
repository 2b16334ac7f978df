//! neurograph - Main Entry Point
//!
//! Runs a session file (or the built-in demo) in real time. Lines typed on
//! stdin are posted to the state machine as external events.

use anyhow::Context;
use neurograph::{
    config::{resolve_session_path, EngineConfig, SessionBuilder, SessionFile},
    engine::{self, EngineCommand, EngineMessage},
    state_machine::StateEvent,
};
use std::io::BufRead;
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(config: &EngineConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter()));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "neurograph.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

fn load_session() -> anyhow::Result<SessionFile> {
    match std::env::args().nth(1) {
        Some(arg) => {
            let path = resolve_session_path(&arg);
            SessionFile::load(&path).with_context(|| format!("Failed to load session {:?}", path))
        }
        None => Ok(SessionFile::demo()),
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let session = load_session()?;
    let _log_guard = init_logging(&session.engine);

    tracing::info!(
        "Starting session '{}' ({} nodes, {} states)",
        session.name,
        session.graph.nodes.len(),
        session.state_machine.states.len()
    );

    let engine = SessionBuilder::build(&session).context("Failed to build session")?;
    let (handle, join) = engine::spawn(engine, session.engine.clone())?;

    let cmd_tx = handle.cmd_tx.clone();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let event = line.trim();
            if event.is_empty() {
                continue;
            }
            if cmd_tx.send(EngineCommand::PostEvent(event.to_string())).is_err() {
                break;
            }
        }
    });

    handle.start();

    let mut exit_status = 0;
    while let Ok(msg) = handle.msg_rx.recv() {
        match msg {
            EngineMessage::State(StateEvent::Activated { name, .. }) => {
                tracing::info!("State '{}' active", name);
            }
            EngineMessage::State(StateEvent::Deactivated { name, .. }) => {
                tracing::info!("State '{}' inactive", name);
            }
            EngineMessage::State(_) => {}
            EngineMessage::NodeStatus { node, warnings, .. } => {
                for (code, message) in warnings {
                    tracing::warn!("Node '{}' warning {:?}: {}", node, code, message);
                }
            }
            EngineMessage::Stats(stats) => {
                tracing::debug!(
                    "{} ticks, {:.1} Hz, active: {:?}",
                    stats.ticks,
                    stats.effective_rate_hz,
                    stats.active_states
                );
            }
            EngineMessage::ExitReached { status } => {
                exit_status = status;
            }
            EngineMessage::CommandFailed(message) => {
                tracing::error!("{}", message);
            }
            EngineMessage::Started | EngineMessage::Stopped => {}
            EngineMessage::Shutdown => break,
        }
    }

    join.join()
        .map_err(|_| anyhow::anyhow!("Engine thread panicked"))?;

    tracing::info!("Session finished with status {}", exit_status);
    Ok(ExitCode::from(u8::try_from(exit_status).unwrap_or(u8::MAX)))
}
