use crate::state_machine::id::{StateId, TransitionId};

/// Observable state machine activity, drained by the host after each tick.
#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    Activated { state: StateId, name: String },
    Deactivated { state: StateId, name: String },
    TransitionStarted {
        transition: TransitionId,
        from: StateId,
        to: StateId,
    },
    ExitReached { status: u32 },
}
