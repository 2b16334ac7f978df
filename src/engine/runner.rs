use crate::config::EngineConfig;
use crate::engine::bridge::{EngineCommand, EngineHandle, EngineMessage, EngineStats};
use crate::engine::runtime::Engine;
use crate::error::{EngineError, Result};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const STATS_INTERVAL: Duration = Duration::from_millis(500);

/// Real-time host loop around an `Engine`.
///
/// Owns the engine on its own thread, applies host commands between ticks,
/// derives `elapsed`/`delta` from a monotonic clock and paces itself to
/// `tick_rate_hz`.
pub struct EngineRunner {
    engine: Engine,
    config: EngineConfig,
    cmd_rx: Receiver<EngineCommand>,
    msg_tx: Sender<EngineMessage>,
    running: Arc<AtomicBool>,
    /// True while a session is ticking.
    active: bool,
    start_time: Option<Instant>,
    last_elapsed: Duration,
    last_tick_time: Option<Instant>,
    last_stats_time: Instant,
    ticks_at_last_stats: u64,
}

impl EngineRunner {
    pub fn new(
        engine: Engine,
        config: EngineConfig,
        cmd_rx: Receiver<EngineCommand>,
        msg_tx: Sender<EngineMessage>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            engine,
            config,
            cmd_rx,
            msg_tx,
            running,
            active: false,
            start_time: None,
            last_elapsed: Duration::ZERO,
            last_tick_time: None,
            last_stats_time: Instant::now(),
            ticks_at_last_stats: 0,
        }
    }

    /// Run until shutdown and hand the engine back.
    pub fn run(mut self) -> Engine {
        tracing::info!("Engine thread started at {} Hz", self.config.tick_rate_hz);

        while self.running.load(Ordering::Relaxed) {
            self.process_commands();

            if self.active {
                self.tick();
            }

            if self.last_stats_time.elapsed() >= STATS_INTERVAL {
                self.send_stats();
            }

            self.rate_limit();
        }

        if self.active {
            self.deactivate();
        }

        let _ = self.msg_tx.send(EngineMessage::Shutdown);
        tracing::info!("Engine thread exiting");
        self.engine
    }

    fn process_commands(&mut self) {
        while let Ok(cmd) = self.cmd_rx.try_recv() {
            match cmd {
                EngineCommand::Start => {
                    if !self.active {
                        self.activate();
                    }
                }
                EngineCommand::Stop => {
                    if self.active {
                        self.deactivate();
                    }
                }
                EngineCommand::Reset => {
                    if self.active {
                        self.deactivate();
                    }
                    self.engine.reset();
                }
                EngineCommand::PostEvent(name) => {
                    if let Err(e) = self.engine.post_event(name.as_str()) {
                        self.report_failure(format!("Event '{}' rejected: {}", name, e));
                    }
                }
                EngineCommand::SetAttribute { node, key, value } => {
                    if let Err(e) = self.engine.set_attribute(&node, &key, &value) {
                        self.report_failure(format!("Setting {}.{} failed: {}", node, key, e));
                    }
                }
                EngineCommand::RequestStats => {
                    self.send_stats();
                }
                EngineCommand::Shutdown => {
                    self.running.store(false, Ordering::Relaxed);
                }
            }
        }
    }

    fn activate(&mut self) {
        if let Err(e) = self.engine.start(Duration::ZERO) {
            self.report_failure(format!("Failed to start engine: {}", e));
            return;
        }
        self.active = true;
        self.start_time = Some(Instant::now());
        self.last_elapsed = Duration::ZERO;
        self.last_tick_time = None;
        self.forward_events();
        self.send(EngineMessage::Started);
    }

    fn deactivate(&mut self) {
        self.engine.stop();
        self.active = false;
        self.start_time = None;
        self.last_tick_time = None;
        self.forward_events();
        self.send(EngineMessage::Stopped);
    }

    fn tick(&mut self) {
        let Some(start) = self.start_time else {
            return;
        };
        self.last_tick_time = Some(Instant::now());

        let elapsed = start.elapsed();
        let delta = elapsed.saturating_sub(self.last_elapsed);
        self.last_elapsed = elapsed;

        self.engine.update(elapsed, delta);
        self.forward_events();
        self.forward_status_changes();

        if let Some(status) = self.engine.exit_status() {
            if self.config.stop_on_exit_state {
                tracing::info!("Exit state reached with status {}", status);
                self.send(EngineMessage::ExitReached { status });
                self.deactivate();
                self.running.store(false, Ordering::Relaxed);
                return;
            }
        }

        if let Some(limit) = self.config.run_duration() {
            if elapsed >= limit {
                tracing::info!("Run duration of {:?} elapsed", limit);
                self.deactivate();
                self.running.store(false, Ordering::Relaxed);
            }
        }
    }

    fn forward_events(&mut self) {
        for event in self.engine.take_state_events() {
            self.send(EngineMessage::State(event));
        }
    }

    fn forward_status_changes(&mut self) {
        let changed = self.engine.graph_mut().take_status_changes();
        for id in changed {
            let graph = self.engine.graph();
            let (Some(name), Some(status)) = (graph.node_name(id), graph.node_status(id)) else {
                continue;
            };
            let errors: Vec<_> = status.errors().map(|(c, m)| (c, m.to_string())).collect();
            let warnings: Vec<_> = status.warnings().map(|(c, m)| (c, m.to_string())).collect();
            for (code, message) in &errors {
                tracing::warn!("Node '{}' error {:?}: {}", name, code, message);
            }
            let msg = EngineMessage::NodeStatus {
                node: name.to_string(),
                errors,
                warnings,
            };
            self.send(msg);
        }
    }

    fn send_stats(&mut self) {
        let since = self.last_stats_time.elapsed().as_secs_f64();
        let ticks = self.engine.ticks();
        let new_ticks = ticks.saturating_sub(self.ticks_at_last_stats);
        let stats = EngineStats {
            ticks,
            elapsed: self.engine.elapsed(),
            node_count: self.engine.graph().node_count(),
            active_states: self.engine.active_state_names(),
            effective_rate_hz: if since > 0.0 { new_ticks as f64 / since } else { 0.0 },
        };
        self.send(EngineMessage::Stats(stats));
        self.ticks_at_last_stats = ticks;
        self.last_stats_time = Instant::now();
    }

    fn report_failure(&self, message: String) {
        tracing::warn!("{}", message);
        self.send(EngineMessage::CommandFailed(message));
    }

    /// Never blocks the tick: a full queue drops the message.
    fn send(&self, msg: EngineMessage) {
        if let Err(TrySendError::Full(msg)) = self.msg_tx.try_send(msg) {
            tracing::trace!("Message queue full, dropping {:?}", msg);
        }
    }

    fn rate_limit(&self) {
        if self.config.tick_rate_hz == 0 {
            std::thread::sleep(Duration::from_millis(10));
            return;
        }

        let target_interval = self.config.tick_interval();

        if let Some(last) = self.last_tick_time {
            let elapsed = last.elapsed();
            if elapsed < target_interval {
                let remaining = target_interval - elapsed;
                if remaining > Duration::from_millis(2) {
                    std::thread::sleep(remaining - Duration::from_millis(1));
                }
                while last.elapsed() < target_interval {
                    std::hint::spin_loop();
                }
            }
        } else if !self.active {
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

/// Spawn a runner thread for `engine`.
///
/// The join handle yields the engine back once the runner shuts down.
pub fn spawn(engine: Engine, config: EngineConfig) -> Result<(EngineHandle, JoinHandle<Engine>)> {
    let (handle, cmd_rx, msg_tx) = EngineHandle::new();
    let running = Arc::new(AtomicBool::new(true));
    let runner = EngineRunner::new(engine, config, cmd_rx, msg_tx, running);
    let join = std::thread::Builder::new()
        .name("neurograph-engine".to_string())
        .spawn(move || runner.run())
        .map_err(|e| EngineError::from(e).with_context("Failed to spawn engine thread"))?;
    Ok((handle, join))
}
