use crate::state_machine::id::{StateId, TransitionId};
use thiserror::Error;

/// Edit-time errors of the state machine.
#[derive(Error, Debug)]
pub enum StateMachineError {
    #[error("Invalid state: {0:?}")]
    InvalidState(StateId),

    #[error("Unknown state '{0}'")]
    UnknownState(String),

    #[error("A state named '{0}' already exists")]
    DuplicateState(String),

    #[error("Invalid transition: {0:?}")]
    InvalidTransition(TransitionId),

    #[error("Transition from '{0}' to itself is not allowed")]
    SelfTransition(String),

    #[error("State machine has no entry state")]
    NoEntryState,

    #[error("State machine is not running")]
    NotRunning,
}

pub type StateMachineResult<T> = std::result::Result<T, StateMachineError>;
