//! Test data builders for creating test objects

use neurograph::graph::RecordedChannel;
use neurograph::state_machine::{StateId, StateKind, StateMachine, TransitionCondition, TransitionId};
use std::path::{Path, PathBuf};

/// Builder for JSON recordings read by `JsonRecordingProvider`
#[derive(Default)]
pub struct RecordingBuilder {
    channels: Vec<RecordedChannel>,
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(mut self, name: &str, sample_rate: f64, samples: &[f64]) -> Self {
        self.channels
            .push(RecordedChannel::new(name, sample_rate, samples.to_vec()));
        self
    }

    pub fn build(self) -> Vec<RecordedChannel> {
        self.channels
    }

    /// Write `{ "channels": [...] }` to `dir/file_name`.
    pub fn write(self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        let content = serde_json::json!({ "channels": self.channels });
        std::fs::write(&path, content.to_string()).expect("write recording");
        path
    }
}

/// Builder for state machines addressed by state name
pub struct MachineBuilder {
    machine: StateMachine,
}

impl MachineBuilder {
    pub fn new() -> Self {
        Self {
            machine: StateMachine::new(),
        }
    }

    pub fn state(mut self, name: &str, kind: StateKind) -> Self {
        self.machine.add_state(name, kind).expect("unique state");
        self
    }

    pub fn transition(self, from: &str, to: &str) -> Self {
        self.transition_with(from, to, Vec::new())
    }

    pub fn transition_with(mut self, from: &str, to: &str, conditions: Vec<TransitionCondition>) -> Self {
        let from = self.id(from);
        let to = self.id(to);
        let transition = self.machine.add_transition(from, to).expect("valid transition");
        for condition in conditions {
            self.machine
                .add_condition(transition, condition)
                .expect("valid transition");
        }
        self
    }

    pub fn id(&self, name: &str) -> StateId {
        self.machine
            .find_state(name)
            .unwrap_or_else(|| panic!("unknown state '{}'", name))
    }

    /// Id of the transition from `from` to `to`.
    pub fn transition_id(&self, from: &str, to: &str) -> TransitionId {
        let (from, to) = (self.id(from), self.id(to));
        self.machine
            .transitions()
            .iter()
            .find(|t| t.from() == from && t.to() == to)
            .map(|t| t.id())
            .expect("transition exists")
    }

    pub fn machine_mut(&mut self) -> &mut StateMachine {
        &mut self.machine
    }

    pub fn build(self) -> StateMachine {
        self.machine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_builder() {
        let machine = MachineBuilder::new()
            .state("a", StateKind::Entry)
            .state("b", StateKind::Plain)
            .transition("a", "b")
            .build();

        assert_eq!(machine.states().len(), 2);
        assert_eq!(machine.transitions().len(), 1);
    }

    #[test]
    fn test_recording_builder_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = RecordingBuilder::new()
            .channel("Fp1", 2.0, &[1.0, 2.0])
            .write(dir.path(), "rec.json");

        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("Fp1"));
    }
}
