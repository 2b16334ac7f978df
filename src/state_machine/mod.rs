//! Session control flow.
//!
//! A second graph, independent of the dataflow graph: states connected by
//! transitions whose conditions read time, external events and feedback
//! values from the dataflow graph. The machine ticks once per engine update,
//! after the graph, so feedback conditions see this tick's signal values.
//!
//! ```text
//! [Entry] ──(time 5s)──► [Relax] ──(alpha > 0.7)──► [Sync] ──► [Exit]
//!        └─(button)────► [Task]  ──────────────────┘
//! ```

pub mod condition;
pub mod error;
pub mod event;
pub mod id;
pub mod machine;
pub mod state;
pub mod sync_state;
pub mod timer_state;
pub mod transition;

pub use condition::{
    ConditionContext, EventCondition, FeedbackCondition, FeedbackSource, TimeCondition,
    TransitionCondition,
};
pub use error::{StateMachineError, StateMachineResult};
pub use event::StateEvent;
pub use id::{StateId, TransitionId};
pub use machine::StateMachine;
pub use state::{ActivationMode, DeadEndMode, State, StateKind, StatePhase};
pub use sync_state::{SyncMode, SyncState};
pub use timer_state::TimerState;
pub use transition::StateTransition;
