//! Thread boundary between the engine runner and its host.
//!
//! The host keeps an `EngineHandle`; the runner thread owns the command
//! receiver and the message sender.

use crate::graph::{AttributeValue, ErrorCode, WarningCode};
use crate::state_machine::StateEvent;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::time::Duration;

/// Commands sent from the host to the runner.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Start a session.
    Start,
    /// Stop the session; the runner keeps processing commands.
    Stop,
    /// Stop and return the engine to its initial condition.
    Reset,
    /// Post an external event (button press, marker) to the state machine.
    PostEvent(String),
    /// Change a node attribute.
    SetAttribute {
        node: String,
        key: String,
        value: AttributeValue,
    },
    /// Request current statistics.
    RequestStats,
    /// Shut down the runner thread.
    Shutdown,
}

/// Messages sent from the runner to the host.
#[derive(Debug, Clone)]
pub enum EngineMessage {
    Started,
    Stopped,
    /// State machine activity.
    State(StateEvent),
    /// A node raised or cleared an error or warning.
    NodeStatus {
        node: String,
        errors: Vec<(ErrorCode, String)>,
        warnings: Vec<(WarningCode, String)>,
    },
    /// Periodic statistics.
    Stats(EngineStats),
    /// An exit state stopped the session.
    ExitReached { status: u32 },
    /// A command could not be applied.
    CommandFailed(String),
    /// Runner is shutting down.
    Shutdown,
}

/// Runner statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineStats {
    pub ticks: u64,
    pub elapsed: Duration,
    pub node_count: usize,
    pub active_states: Vec<String>,
    /// Measured ticks per second since the previous report.
    pub effective_rate_hz: f64,
}

/// Channel capacity for commands (host → runner).
const CMD_CHANNEL_CAPACITY: usize = 256;
/// Channel capacity for messages (runner → host).
const MSG_CHANNEL_CAPACITY: usize = 10_000;

/// Host-side handle for communicating with the runner thread.
pub struct EngineHandle {
    pub cmd_tx: Sender<EngineCommand>,
    pub msg_rx: Receiver<EngineMessage>,
}

impl EngineHandle {
    /// Create a new handle pair: `(handle_for_host, cmd_rx, msg_tx)`.
    pub fn new() -> (Self, Receiver<EngineCommand>, Sender<EngineMessage>) {
        let (cmd_tx, cmd_rx) = bounded(CMD_CHANNEL_CAPACITY);
        let (msg_tx, msg_rx) = bounded(MSG_CHANNEL_CAPACITY);
        (Self { cmd_tx, msg_rx }, cmd_rx, msg_tx)
    }

    /// Drain all pending messages.
    pub fn drain(&self) -> Vec<EngineMessage> {
        let mut msgs = Vec::new();
        while let Ok(msg) = self.msg_rx.try_recv() {
            msgs.push(msg);
        }
        msgs
    }

    /// Try to receive a single message without blocking.
    pub fn try_recv(&self) -> Option<EngineMessage> {
        self.msg_rx.try_recv().ok()
    }

    /// Block until a message arrives or `timeout` passes.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineMessage> {
        self.msg_rx.recv_timeout(timeout).ok()
    }

    pub fn send_command(&self, cmd: EngineCommand) -> bool {
        self.cmd_tx.send(cmd).is_ok()
    }

    pub fn start(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Start);
    }

    pub fn stop(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Stop);
    }

    pub fn reset(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Reset);
    }

    pub fn post_event(&self, name: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::PostEvent(name.into()));
    }

    pub fn set_attribute(&self, node: impl Into<String>, key: impl Into<String>, value: AttributeValue) {
        let _ = self.cmd_tx.send(EngineCommand::SetAttribute {
            node: node.into(),
            key: key.into(),
            value,
        });
    }

    pub fn request_stats(&self) {
        let _ = self.cmd_tx.send(EngineCommand::RequestStats);
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_reach_runner_side() {
        let (handle, cmd_rx, _msg_tx) = EngineHandle::new();
        handle.start();
        handle.post_event("button");
        handle.shutdown();

        let received: Vec<EngineCommand> = cmd_rx.try_iter().collect();
        assert_eq!(received.len(), 3);
        assert!(matches!(received[0], EngineCommand::Start));
        assert!(matches!(&received[1], EngineCommand::PostEvent(name) if name == "button"));
        assert!(matches!(received[2], EngineCommand::Shutdown));
    }

    #[test]
    fn test_drain_returns_messages_in_order() {
        let (handle, _cmd_rx, msg_tx) = EngineHandle::new();
        msg_tx.send(EngineMessage::Started).unwrap();
        msg_tx.send(EngineMessage::ExitReached { status: 2 }).unwrap();

        let msgs = handle.drain();
        assert_eq!(msgs.len(), 2);
        assert!(matches!(msgs[0], EngineMessage::Started));
        assert!(matches!(msgs[1], EngineMessage::ExitReached { status: 2 }));
        assert!(handle.try_recv().is_none());
    }

    #[test]
    fn test_send_fails_after_runner_drops() {
        let (handle, cmd_rx, _msg_tx) = EngineHandle::new();
        drop(cmd_rx);
        assert!(!handle.send_command(EngineCommand::Stop));
    }
}
