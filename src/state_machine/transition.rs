use crate::state_machine::condition::{ConditionContext, TransitionCondition};
use crate::state_machine::id::{StateId, TransitionId};
use std::time::Duration;

/// Directed edge between two states.
///
/// A transition is ready when every condition holds; a transition without
/// conditions is always ready. Once started it blends for `duration` and
/// then completes.
#[derive(Debug, Clone)]
pub struct StateTransition {
    id: TransitionId,
    from: StateId,
    to: StateId,
    pub priority: u32,
    pub duration: Duration,
    pub disabled: bool,
    conditions: Vec<TransitionCondition>,
    transitioning: bool,
    fresh: bool,
    blended: Duration,
}

impl StateTransition {
    pub(crate) fn new(id: TransitionId, from: StateId, to: StateId) -> Self {
        Self {
            id,
            from,
            to,
            priority: 0,
            duration: Duration::ZERO,
            disabled: false,
            conditions: Vec::new(),
            transitioning: false,
            fresh: false,
            blended: Duration::ZERO,
        }
    }

    pub fn id(&self) -> TransitionId {
        self.id
    }

    pub fn from(&self) -> StateId {
        self.from
    }

    pub fn to(&self) -> StateId {
        self.to
    }

    pub fn conditions(&self) -> &[TransitionCondition] {
        &self.conditions
    }

    pub fn add_condition(&mut self, condition: TransitionCondition) {
        self.conditions.push(condition);
    }

    pub fn is_ready(&self) -> bool {
        self.conditions.iter().all(TransitionCondition::is_true)
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    /// Blend progress in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if !self.transitioning {
            return 0.0;
        }
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.blended.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub(crate) fn update_conditions(&mut self, ctx: &ConditionContext) {
        for condition in &mut self.conditions {
            condition.update(ctx);
        }
    }

    pub(crate) fn reset_conditions(&mut self) {
        for condition in &mut self.conditions {
            condition.reset();
        }
    }

    pub(crate) fn start(&mut self) {
        self.transitioning = true;
        self.fresh = true;
        self.blended = Duration::ZERO;
    }

    /// Advance the blend. The tick that started the transition adds no time.
    pub(crate) fn advance(&mut self, delta: Duration) {
        if !self.transitioning {
            return;
        }
        if self.fresh {
            self.fresh = false;
        } else {
            self.blended += delta;
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.transitioning && self.blended >= self.duration
    }

    pub(crate) fn reset(&mut self) {
        self.transitioning = false;
        self.fresh = false;
        self.blended = Duration::ZERO;
    }
}
