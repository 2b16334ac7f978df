//! State machine container and per-tick scheduler.
//!
//! Each `update`:
//! 1. Update conditions of transitions leaving active states.
//! 2. Recompute the allowed sets of sync states.
//! 3. Start ready transitions of every active state, per its activation mode.
//! 4. Advance running transitions and complete the finished ones.
//! 5. Stop if an exit state is active.
//! 6. Update states (timer clocks).

use crate::state_machine::condition::{ConditionContext, FeedbackSource, TransitionCondition};
use crate::state_machine::error::{StateMachineError, StateMachineResult};
use crate::state_machine::event::StateEvent;
use crate::state_machine::id::{StateId, TransitionId};
use crate::state_machine::state::{ActivationMode, DeadEndMode, State, StateKind};
use crate::state_machine::transition::StateTransition;
use std::cmp::Reverse;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct StateMachine {
    states: Vec<State>,
    transitions: Vec<StateTransition>,
    running: bool,
    exit_status: Option<u32>,
    /// Events posted since the last tick.
    pending_events: Vec<String>,
    events: Vec<StateEvent>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Editing ──

    pub fn add_state(&mut self, name: impl Into<String>, kind: StateKind) -> StateMachineResult<StateId> {
        let name = name.into();
        if self.find_state(&name).is_some() {
            return Err(StateMachineError::DuplicateState(name));
        }
        let id = StateId(self.states.len() as u32);
        self.states.push(State::new(id, name, kind));
        Ok(id)
    }

    pub fn add_transition(&mut self, from: StateId, to: StateId) -> StateMachineResult<TransitionId> {
        let source = self.state(from).ok_or(StateMachineError::InvalidState(from))?;
        self.state(to).ok_or(StateMachineError::InvalidState(to))?;
        if from == to {
            tracing::warn!("Rejected self transition on '{}'", source.name());
            return Err(StateMachineError::SelfTransition(source.name().to_string()));
        }
        let id = TransitionId(self.transitions.len() as u32);
        self.transitions.push(StateTransition::new(id, from, to));
        Ok(id)
    }

    pub fn add_condition(&mut self, id: TransitionId, condition: TransitionCondition) -> StateMachineResult<()> {
        self.transition_mut(id)
            .ok_or(StateMachineError::InvalidTransition(id))?
            .add_condition(condition);
        Ok(())
    }

    pub fn set_activation_mode(&mut self, id: StateId, mode: ActivationMode) -> StateMachineResult<()> {
        self.state_mut(id).ok_or(StateMachineError::InvalidState(id))?.activation_mode = mode;
        Ok(())
    }

    pub fn set_dead_end_mode(&mut self, id: StateId, mode: DeadEndMode) -> StateMachineResult<()> {
        self.state_mut(id).ok_or(StateMachineError::InvalidState(id))?.dead_end_mode = mode;
        Ok(())
    }

    // ── Queries ──

    pub fn find_state(&self, name: &str) -> Option<StateId> {
        self.states.iter().find(|s| s.name() == name).map(State::id)
    }

    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(id.index())
    }

    pub fn state_mut(&mut self, id: StateId) -> Option<&mut State> {
        self.states.get_mut(id.index())
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn transition(&self, id: TransitionId) -> Option<&StateTransition> {
        self.transitions.get(id.index())
    }

    pub fn transition_mut(&mut self, id: TransitionId) -> Option<&mut StateTransition> {
        self.transitions.get_mut(id.index())
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub fn is_active(&self, id: StateId) -> bool {
        self.state(id).is_some_and(State::is_active)
    }

    pub fn active_states(&self) -> Vec<StateId> {
        self.states.iter().filter(|s| s.is_active()).map(State::id).collect()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Highest status among the exit states that stopped the machine.
    pub fn exit_status(&self) -> Option<u32> {
        self.exit_status
    }

    /// Events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<StateEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Session control ──

    /// Reset and activate every entry state.
    pub fn start(&mut self, elapsed: Duration) -> StateMachineResult<()> {
        self.reset();
        let entries: Vec<StateId> = self
            .states
            .iter()
            .filter(|s| matches!(s.kind(), StateKind::Entry))
            .map(State::id)
            .collect();
        if entries.is_empty() {
            return Err(StateMachineError::NoEntryState);
        }

        self.running = true;
        for id in &entries {
            self.states[id.index()].activate(elapsed);
            self.on_entered(*id);
        }
        tracing::info!("State machine started with {} entry state(s)", entries.len());
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            tracing::info!("State machine stopped");
        }
    }

    pub fn reset(&mut self) {
        for state in &mut self.states {
            state.reset();
        }
        for transition in &mut self.transitions {
            transition.reset();
            transition.reset_conditions();
        }
        self.running = false;
        self.exit_status = None;
        self.pending_events.clear();
        self.events.clear();
    }

    /// Queue an external event for the next tick.
    pub fn post_event(&mut self, name: impl Into<String>) -> StateMachineResult<()> {
        if !self.running {
            return Err(StateMachineError::NotRunning);
        }
        self.pending_events.push(name.into());
        Ok(())
    }

    // ── Tick ──

    pub fn update(&mut self, elapsed: Duration, delta: Duration, feedback: &dyn FeedbackSource) {
        if !self.running {
            return;
        }

        let posted = std::mem::take(&mut self.pending_events);
        let ctx = ConditionContext {
            delta,
            feedback,
            events: &posted,
        };
        for transition in &mut self.transitions {
            if transition.disabled || transition.is_transitioning() {
                continue;
            }
            if self.states[transition.from().index()].is_active() {
                transition.update_conditions(&ctx);
            }
        }

        self.update_sync_states();

        for source in self.active_states() {
            self.check_transitions(source);
        }

        for index in 0..self.transitions.len() {
            let transition = &mut self.transitions[index];
            if !transition.is_transitioning() {
                continue;
            }
            transition.advance(delta);
            if transition.is_done() {
                self.complete_transition(TransitionId(index as u32), elapsed);
            }
        }

        let exit_status = self
            .states
            .iter()
            .filter(|s| s.is_active())
            .filter_map(State::exit_status)
            .max();
        if let Some(status) = exit_status {
            self.running = false;
            self.exit_status = Some(status);
            self.events.push(StateEvent::ExitReached { status });
            tracing::info!("Exit state reached with status {}", status);
            return;
        }

        for state in &mut self.states {
            state.update(elapsed, delta);
        }
    }

    fn update_sync_states(&mut self) {
        for index in 0..self.states.len() {
            if self.states[index].sync().is_none() {
                continue;
            }
            let target = StateId(index as u32);
            let mut total = 0;
            let mut candidates = Vec::new();
            for transition in self.transitions.iter().filter(|t| t.to() == target && !t.disabled) {
                total += 1;
                let source = &self.states[transition.from().index()];
                if source.is_active() && source.can_exit(transition.id()) {
                    candidates.push(transition.id());
                }
            }
            if let Some(sync) = self.states[index].sync_mut() {
                if sync.update_allowed(candidates, total) {
                    tracing::trace!("Sync state {:?} open", target);
                }
            }
        }
    }

    fn check_transitions(&mut self, source: StateId) {
        let state = &self.states[source.index()];
        let ready: Vec<&StateTransition> = self
            .transitions
            .iter()
            .filter(|t| t.from() == source && !t.disabled && !t.is_transitioning())
            .filter(|t| t.is_ready())
            .filter(|t| state.can_exit(t.id()) && self.states[t.to().index()].accepts(t.id()))
            .collect();

        let selected: Vec<TransitionId> = match state.activation_mode {
            ActivationMode::ActivateAll => ready.iter().map(|t| t.id()).collect(),
            ActivationMode::ActivateFirst => ready
                .iter()
                .max_by_key(|t| (t.priority, Reverse(t.id())))
                .map(|t| t.id())
                .into_iter()
                .collect(),
        };

        for id in selected {
            self.start_transition(id);
        }
    }

    fn start_transition(&mut self, id: TransitionId) {
        let transition = &self.transitions[id.index()];
        let (from, to) = (transition.from(), transition.to());
        if !self.states[to.index()].accepts(id) {
            return;
        }

        let source = &mut self.states[from.index()];
        if source.begin_exit(id) {
            tracing::debug!("Deactivate state '{}'", source.name());
            self.events.push(StateEvent::Deactivated {
                state: from,
                name: source.name().to_string(),
            });
        }
        self.states[to.index()].begin_enter(id);
        self.transitions[id.index()].start();
        tracing::debug!(
            "Transition '{}' -> '{}' started",
            self.states[from.index()].name(),
            self.states[to.index()].name()
        );
        self.events.push(StateEvent::TransitionStarted {
            transition: id,
            from,
            to,
        });
    }

    fn complete_transition(&mut self, id: TransitionId, elapsed: Duration) {
        let transition = &mut self.transitions[id.index()];
        let (from, to) = (transition.from(), transition.to());
        transition.reset();

        self.states[from.index()].finish_exit(id);
        if self.states[to.index()].finish_enter(id, elapsed) {
            self.on_entered(to);
        }
    }

    /// Bookkeeping after `id` became active.
    fn on_entered(&mut self, id: StateId) {
        let name = self.states[id.index()].name().to_string();
        tracing::debug!("Activate state '{}'", name);
        self.events.push(StateEvent::Activated {
            state: id,
            name: name.clone(),
        });

        let mut outgoing = 0;
        for transition in self.transitions.iter_mut().filter(|t| t.from() == id && !t.disabled) {
            transition.reset_conditions();
            outgoing += 1;
        }

        let state = &mut self.states[id.index()];
        if outgoing == 0 && state.dead_end_mode == DeadEndMode::Deactivate {
            state.deactivate();
            tracing::debug!("Dead end state '{}' deactivated", name);
            self.events.push(StateEvent::Deactivated { state: id, name });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::Comparison;
    use crate::state_machine::state::StatePhase;
    use crate::state_machine::sync_state::SyncState;
    use crate::state_machine::timer_state::TimerState;
    use std::collections::HashMap;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    /// Tick every 100 ms over `(from, to]`.
    fn run(machine: &mut StateMachine, from: u64, to: u64) {
        let feedback: HashMap<String, f64> = HashMap::new();
        run_with(machine, from, to, &feedback);
    }

    fn run_with(machine: &mut StateMachine, from: u64, to: u64, feedback: &dyn FeedbackSource) {
        let mut t = from + 100;
        while t <= to {
            machine.update(ms(t), ms(100), feedback);
            t += 100;
        }
    }

    fn stay(machine: &mut StateMachine, name: &str, kind: StateKind) -> StateId {
        let id = machine.add_state(name, kind).unwrap();
        machine.set_dead_end_mode(id, DeadEndMode::StayActive).unwrap();
        id
    }

    #[test]
    fn test_time_condition_drives_transition() {
        let mut machine = StateMachine::new();
        let start = machine.add_state("start", StateKind::Entry).unwrap();
        let rest = stay(&mut machine, "rest", StateKind::Plain);
        let t = machine.add_transition(start, rest).unwrap();
        machine.add_condition(t, TransitionCondition::time(0.5)).unwrap();

        machine.start(ms(0)).unwrap();
        run(&mut machine, 0, 400);
        assert!(machine.is_active(start));
        run(&mut machine, 400, 500);
        assert!(machine.is_active(rest));
        assert!(!machine.is_active(start));
        assert_eq!(machine.state(rest).unwrap().activation_count(), 1);
    }

    #[test]
    fn test_self_transition_rejected() {
        let mut machine = StateMachine::new();
        let s = machine.add_state("s", StateKind::Entry).unwrap();
        assert!(matches!(
            machine.add_transition(s, s),
            Err(StateMachineError::SelfTransition(_))
        ));
        assert!(machine.transitions().is_empty());
    }

    #[test]
    fn test_duplicate_state_rejected() {
        let mut machine = StateMachine::new();
        machine.add_state("s", StateKind::Plain).unwrap();
        assert!(machine.add_state("s", StateKind::Plain).is_err());
    }

    #[test]
    fn test_start_requires_entry_state() {
        let mut machine = StateMachine::new();
        machine.add_state("s", StateKind::Plain).unwrap();
        assert!(matches!(machine.start(ms(0)), Err(StateMachineError::NoEntryState)));
    }

    #[test]
    fn test_activate_first_uses_priority_then_order() {
        let mut machine = StateMachine::new();
        let start = machine.add_state("start", StateKind::Entry).unwrap();
        let a = stay(&mut machine, "a", StateKind::Plain);
        let b = stay(&mut machine, "b", StateKind::Plain);
        let c = stay(&mut machine, "c", StateKind::Plain);
        let to_a = machine.add_transition(start, a).unwrap();
        let to_b = machine.add_transition(start, b).unwrap();
        let to_c = machine.add_transition(start, c).unwrap();
        machine.transition_mut(to_a).unwrap().priority = 1;
        machine.transition_mut(to_b).unwrap().priority = 5;
        machine.transition_mut(to_c).unwrap().priority = 5;

        machine.start(ms(0)).unwrap();
        run(&mut machine, 0, 100);
        assert_eq!(machine.active_states(), vec![b]);
    }

    #[test]
    fn test_activate_all_fans_out() {
        let mut machine = StateMachine::new();
        let start = machine.add_state("start", StateKind::Entry).unwrap();
        let a = stay(&mut machine, "a", StateKind::Plain);
        let b = stay(&mut machine, "b", StateKind::Plain);
        machine.add_transition(start, a).unwrap();
        machine.add_transition(start, b).unwrap();
        machine.set_activation_mode(start, ActivationMode::ActivateAll).unwrap();

        machine.start(ms(0)).unwrap();
        run(&mut machine, 0, 100);
        assert_eq!(machine.active_states(), vec![a, b]);
        assert_eq!(machine.state(start).unwrap().phase(), StatePhase::Inactive);
    }

    #[test]
    fn test_disabled_transition_is_ignored() {
        let mut machine = StateMachine::new();
        let start = stay(&mut machine, "start", StateKind::Entry);
        let a = stay(&mut machine, "a", StateKind::Plain);
        let t = machine.add_transition(start, a).unwrap();
        machine.transition_mut(t).unwrap().disabled = true;

        machine.start(ms(0)).unwrap();
        run(&mut machine, 0, 300);
        assert!(machine.is_active(start));
    }

    #[test]
    fn test_event_condition() {
        let mut machine = StateMachine::new();
        assert!(matches!(machine.post_event("button"), Err(StateMachineError::NotRunning)));

        let start = machine.add_state("start", StateKind::Entry).unwrap();
        let pressed = stay(&mut machine, "pressed", StateKind::Plain);
        let t = machine.add_transition(start, pressed).unwrap();
        machine.add_condition(t, TransitionCondition::event("button")).unwrap();

        machine.start(ms(0)).unwrap();
        run(&mut machine, 0, 300);
        assert!(machine.is_active(start));

        machine.post_event("button").unwrap();
        run(&mut machine, 300, 400);
        assert!(machine.is_active(pressed));
    }

    #[test]
    fn test_feedback_condition() {
        let mut machine = StateMachine::new();
        let start = machine.add_state("start", StateKind::Entry).unwrap();
        let relaxed = stay(&mut machine, "relaxed", StateKind::Plain);
        let t = machine.add_transition(start, relaxed).unwrap();
        machine
            .add_condition(t, TransitionCondition::feedback("alpha", Comparison::Greater, 0.7))
            .unwrap();

        machine.start(ms(0)).unwrap();
        let mut feedback = HashMap::from([("alpha".to_string(), 0.2)]);
        run_with(&mut machine, 0, 200, &feedback);
        assert!(machine.is_active(start));

        feedback.insert("alpha".to_string(), 0.9);
        run_with(&mut machine, 200, 300, &feedback);
        assert!(machine.is_active(relaxed));
    }

    #[test]
    fn test_dead_end_deactivates() {
        let mut machine = StateMachine::new();
        let start = machine.add_state("start", StateKind::Entry).unwrap();
        let end = machine.add_state("end", StateKind::Plain).unwrap();
        machine.add_transition(start, end).unwrap();

        machine.start(ms(0)).unwrap();
        machine.take_events();
        run(&mut machine, 0, 100);
        assert!(machine.active_states().is_empty());
        assert_eq!(machine.state(end).unwrap().activation_count(), 1);

        let events = machine.take_events();
        assert!(events.contains(&StateEvent::Activated {
            state: end,
            name: "end".to_string()
        }));
        assert_eq!(
            events.last(),
            Some(&StateEvent::Deactivated {
                state: end,
                name: "end".to_string()
            })
        );
    }

    #[test]
    fn test_exit_state_stops_with_max_status() {
        let mut machine = StateMachine::new();
        let a = machine.add_state("a", StateKind::Entry).unwrap();
        let b = machine.add_state("b", StateKind::Entry).unwrap();
        let done = machine.add_state("done", StateKind::Exit { status: 1 }).unwrap();
        let failed = machine.add_state("failed", StateKind::Exit { status: 7 }).unwrap();
        machine.add_transition(a, done).unwrap();
        machine.add_transition(b, failed).unwrap();

        machine.start(ms(0)).unwrap();
        run(&mut machine, 0, 100);
        assert!(!machine.is_running());
        assert_eq!(machine.exit_status(), Some(7));
        assert!(machine
            .take_events()
            .contains(&StateEvent::ExitReached { status: 7 }));

        // Stopped machines ignore ticks
        run(&mut machine, 100, 500);
        assert!(machine.is_active(done));
    }

    #[test]
    fn test_transition_duration_blends() {
        let mut machine = StateMachine::new();
        let start = machine.add_state("start", StateKind::Entry).unwrap();
        let target = stay(&mut machine, "target", StateKind::Plain);
        let t = machine.add_transition(start, target).unwrap();
        machine.transition_mut(t).unwrap().duration = ms(500);

        machine.start(ms(0)).unwrap();
        run(&mut machine, 0, 300);
        assert_eq!(machine.state(target).unwrap().phase(), StatePhase::Eligible);
        assert_eq!(machine.state(start).unwrap().phase(), StatePhase::Exiting);
        assert!((machine.transition(t).unwrap().progress() - 0.4).abs() < 1e-9);

        run(&mut machine, 300, 600);
        assert!(machine.is_active(target));
        assert_eq!(machine.state(start).unwrap().phase(), StatePhase::Inactive);
    }

    #[test]
    fn test_timer_state_gates_exit() {
        let mut machine = StateMachine::new();
        let start = machine.add_state("start", StateKind::Entry).unwrap();
        let timer = machine
            .add_state("timer", StateKind::Timer(TimerState::new(ms(500))))
            .unwrap();
        let after = stay(&mut machine, "after", StateKind::Plain);
        machine.add_transition(start, timer).unwrap();
        machine.add_transition(timer, after).unwrap();

        machine.start(ms(0)).unwrap();
        run(&mut machine, 0, 600);
        assert!(machine.is_active(timer));
        run(&mut machine, 600, 700);
        assert!(machine.is_active(after));
    }

    /// Entry states feeding a sync state; the last `delayed` of them pass
    /// through an intermediate state first, after a one second wait.
    fn sync_machine(sync: SyncState, branches: usize, delayed: usize) -> (StateMachine, StateId) {
        let mut machine = StateMachine::new();
        let join = stay(&mut machine, "join", StateKind::Sync(sync));
        for i in 0..branches {
            let entry = machine.add_state(format!("branch{}", i), StateKind::Entry).unwrap();
            if i + delayed >= branches {
                let wait = machine.add_state(format!("wait{}", i), StateKind::Plain).unwrap();
                let t = machine.add_transition(entry, wait).unwrap();
                machine.add_condition(t, TransitionCondition::time(1.0)).unwrap();
                machine.add_transition(wait, join).unwrap();
            } else {
                machine.add_transition(entry, join).unwrap();
            }
        }
        machine.start(ms(0)).unwrap();
        (machine, join)
    }

    #[test]
    fn test_sync_wait_all_blocks_until_every_branch() {
        let (mut machine, join) = sync_machine(SyncState::wait_all(), 3, 1);
        run(&mut machine, 0, 500);
        assert!(!machine.is_active(join));
        assert!(machine.state(join).unwrap().sync().unwrap().allowed().is_empty());
        assert_eq!(machine.active_states().len(), 3);

        run(&mut machine, 500, 1100);
        assert!(machine.is_active(join));
        assert_eq!(machine.active_states(), vec![join]);
        assert_eq!(machine.state(join).unwrap().activation_count(), 1);
    }

    #[test]
    fn test_sync_wait_all_ignores_disabled_incoming() {
        let mut machine = StateMachine::new();
        let join = stay(&mut machine, "join", StateKind::Sync(SyncState::wait_all()));
        let a = machine.add_state("a", StateKind::Entry).unwrap();
        let b = machine.add_state("b", StateKind::Entry).unwrap();
        let idle = machine.add_state("idle", StateKind::Plain).unwrap();
        machine.add_transition(a, join).unwrap();
        machine.add_transition(b, join).unwrap();
        let unused = machine.add_transition(idle, join).unwrap();
        machine.transition_mut(unused).unwrap().disabled = true;

        machine.start(ms(0)).unwrap();
        run(&mut machine, 0, 100);
        assert!(machine.is_active(join));
    }

    #[test]
    fn test_sync_wait_count_exact_match() {
        // One ready branch of two required
        let (mut machine, join) = sync_machine(SyncState::wait_count(2), 3, 2);
        run(&mut machine, 0, 500);
        assert!(!machine.is_active(join));

        // The delayed branches arrive together: three ready, two required
        run(&mut machine, 500, 2000);
        assert!(!machine.is_active(join));

        // Exactly two
        let (mut machine, join) = sync_machine(SyncState::wait_count(2), 2, 1);
        run(&mut machine, 0, 1100);
        assert!(machine.is_active(join));
    }

    #[test]
    fn test_sync_wait_count_over_ready_never_enters() {
        let (mut machine, join) = sync_machine(SyncState::wait_count(2), 3, 0);
        run(&mut machine, 0, 1000);
        assert!(!machine.is_active(join));
        assert_eq!(machine.active_states().len(), 3);
    }

    #[test]
    fn test_restart_resets_progress() {
        let mut machine = StateMachine::new();
        let start = machine.add_state("start", StateKind::Entry).unwrap();
        let rest = stay(&mut machine, "rest", StateKind::Plain);
        let t = machine.add_transition(start, rest).unwrap();
        machine.add_condition(t, TransitionCondition::time(0.3)).unwrap();

        machine.start(ms(0)).unwrap();
        run(&mut machine, 0, 200);
        machine.start(ms(200)).unwrap();
        run(&mut machine, 200, 400);
        assert!(machine.is_active(start));
        run(&mut machine, 400, 500);
        assert!(machine.is_active(rest));
    }
}
