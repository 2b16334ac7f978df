use crate::state_machine::id::{StateId, TransitionId};
use crate::state_machine::sync_state::SyncState;
use crate::state_machine::timer_state::TimerState;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How many ready outgoing transitions a state starts in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationMode {
    /// Highest priority wins; ties go to the earliest declared transition.
    #[default]
    ActivateFirst,
    /// Start every ready transition.
    ActivateAll,
}

/// What happens to a state entered without any enabled outgoing transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadEndMode {
    #[default]
    Deactivate,
    StayActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatePhase {
    #[default]
    Inactive,
    /// A transition into the state has started.
    Eligible,
    Active,
    /// A transition out of the state has started.
    Exiting,
}

#[derive(Debug, Clone)]
pub enum StateKind {
    Plain,
    /// Activated by `StateMachine::start`.
    Entry,
    /// Stops the machine when active, reporting `status`.
    Exit { status: u32 },
    Timer(TimerState),
    Sync(SyncState),
}

impl StateKind {
    pub fn name(&self) -> &'static str {
        match self {
            StateKind::Plain => "plain",
            StateKind::Entry => "entry",
            StateKind::Exit { .. } => "exit",
            StateKind::Timer(_) => "timer",
            StateKind::Sync(_) => "sync",
        }
    }
}

#[derive(Debug, Clone)]
pub struct State {
    id: StateId,
    name: String,
    kind: StateKind,
    pub activation_mode: ActivationMode,
    pub dead_end_mode: DeadEndMode,
    phase: StatePhase,
    /// Transition currently moving this state in or out.
    primary: Option<TransitionId>,
    activation_count: u32,
}

impl State {
    pub(crate) fn new(id: StateId, name: String, kind: StateKind) -> Self {
        let dead_end_mode = match kind {
            StateKind::Exit { .. } => DeadEndMode::StayActive,
            _ => DeadEndMode::Deactivate,
        };
        Self {
            id,
            name,
            kind,
            activation_mode: ActivationMode::default(),
            dead_end_mode,
            phase: StatePhase::Inactive,
            primary: None,
            activation_count: 0,
        }
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &StateKind {
        &self.kind
    }

    pub fn phase(&self) -> StatePhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == StatePhase::Active
    }

    pub fn activation_count(&self) -> u32 {
        self.activation_count
    }

    pub fn exit_status(&self) -> Option<u32> {
        match self.kind {
            StateKind::Exit { status } => Some(status),
            _ => None,
        }
    }

    pub fn sync(&self) -> Option<&SyncState> {
        match &self.kind {
            StateKind::Sync(sync) => Some(sync),
            _ => None,
        }
    }

    pub(crate) fn sync_mut(&mut self) -> Option<&mut SyncState> {
        match &mut self.kind {
            StateKind::Sync(sync) => Some(sync),
            _ => None,
        }
    }

    pub fn can_exit(&self, _transition: TransitionId) -> bool {
        match &self.kind {
            StateKind::Timer(timer) => timer.can_exit(),
            _ => true,
        }
    }

    pub fn can_enter(&self, transition: TransitionId) -> bool {
        match &self.kind {
            StateKind::Sync(sync) => sync.can_enter(transition),
            _ => true,
        }
    }

    /// Whether a transition into this state may start now.
    pub(crate) fn accepts(&self, transition: TransitionId) -> bool {
        self.phase != StatePhase::Exiting && self.can_enter(transition)
    }

    /// A transition into this state started.
    pub(crate) fn begin_enter(&mut self, transition: TransitionId) {
        if self.primary.is_none() {
            self.primary = Some(transition);
            self.phase = StatePhase::Eligible;
        }
    }

    /// A transition out of this state started. Returns true when the state
    /// stopped being active.
    pub(crate) fn begin_exit(&mut self, transition: TransitionId) -> bool {
        if self.phase != StatePhase::Active || self.primary.is_some() {
            return false;
        }
        self.primary = Some(transition);
        self.phase = StatePhase::Exiting;
        self.on_deactivate();
        true
    }

    /// A transition into this state completed. Returns true on activation.
    pub(crate) fn finish_enter(&mut self, transition: TransitionId, elapsed: Duration) -> bool {
        if self.primary != Some(transition) || self.phase != StatePhase::Eligible {
            return false;
        }
        self.primary = None;
        self.activate(elapsed);
        true
    }

    pub(crate) fn finish_exit(&mut self, transition: TransitionId) {
        if self.phase == StatePhase::Exiting && self.primary == Some(transition) {
            self.phase = StatePhase::Inactive;
            self.primary = None;
        }
    }

    pub(crate) fn activate(&mut self, elapsed: Duration) {
        self.phase = StatePhase::Active;
        self.activation_count += 1;
        if let StateKind::Timer(timer) = &mut self.kind {
            timer.on_activate(elapsed);
        }
    }

    /// Leave without a transition (dead end).
    pub(crate) fn deactivate(&mut self) {
        self.phase = StatePhase::Inactive;
        self.primary = None;
        self.on_deactivate();
    }

    fn on_deactivate(&mut self) {
        if let StateKind::Sync(sync) = &mut self.kind {
            sync.reset();
        }
    }

    pub(crate) fn update(&mut self, elapsed: Duration, delta: Duration) {
        if let StateKind::Timer(timer) = &mut self.kind {
            timer.update(elapsed, delta);
        }
    }

    pub(crate) fn reset(&mut self) {
        self.phase = StatePhase::Inactive;
        self.primary = None;
        self.activation_count = 0;
        match &mut self.kind {
            StateKind::Timer(timer) => timer.reset(),
            StateKind::Sync(sync) => sync.reset(),
            _ => {}
        }
    }
}
