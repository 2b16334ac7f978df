//! Transition conditions.
//!
//! Conditions are re-evaluated once per tick, and only while the source state
//! of their transition is active. A transition is ready when all of its
//! conditions hold.

use crate::dsp::Comparison;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Read access to named signal values, provided by the dataflow graph.
#[cfg_attr(test, mockall::automock)]
pub trait FeedbackSource {
    /// Latest value of the named feedback sink, `None` while it has no data.
    fn feedback_value(&self, name: &str) -> Option<f64>;
}

impl FeedbackSource for HashMap<String, f64> {
    fn feedback_value(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

/// Per-tick inputs for condition evaluation.
pub struct ConditionContext<'a> {
    pub delta: Duration,
    pub feedback: &'a dyn FeedbackSource,
    /// Events posted since the previous tick.
    pub events: &'a [String],
}

/// Countdown that holds once its source state has been active long enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeCondition {
    pub seconds: f64,
    #[serde(skip)]
    waited: Duration,
}

impl TimeCondition {
    pub fn new(seconds: f64) -> Self {
        Self {
            seconds,
            waited: Duration::ZERO,
        }
    }

    pub fn remaining(&self) -> f64 {
        (self.seconds - self.waited.as_secs_f64()).max(0.0)
    }
}

/// Compares the value of a feedback sink against a constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackCondition {
    /// Name of the feedback node in the graph.
    pub feedback: String,
    pub comparison: Comparison,
    pub value: f64,
    #[serde(skip)]
    satisfied: bool,
}

impl FeedbackCondition {
    pub fn new(feedback: impl Into<String>, comparison: Comparison, value: f64) -> Self {
        Self {
            feedback: feedback.into(),
            comparison,
            value,
            satisfied: false,
        }
    }
}

/// Holds on the tick after a named external event was posted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCondition {
    pub event: String,
    #[serde(skip)]
    triggered: bool,
}

impl EventCondition {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            triggered: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionCondition {
    Time(TimeCondition),
    Feedback(FeedbackCondition),
    Event(EventCondition),
}

impl TransitionCondition {
    pub fn time(seconds: f64) -> Self {
        TransitionCondition::Time(TimeCondition::new(seconds))
    }

    pub fn feedback(name: impl Into<String>, comparison: Comparison, value: f64) -> Self {
        TransitionCondition::Feedback(FeedbackCondition::new(name, comparison, value))
    }

    pub fn event(name: impl Into<String>) -> Self {
        TransitionCondition::Event(EventCondition::new(name))
    }

    pub fn update(&mut self, ctx: &ConditionContext) {
        match self {
            TransitionCondition::Time(c) => c.waited += ctx.delta,
            TransitionCondition::Feedback(c) => {
                c.satisfied = ctx
                    .feedback
                    .feedback_value(&c.feedback)
                    .is_some_and(|v| c.comparison.evaluate(v, c.value));
            }
            TransitionCondition::Event(c) => {
                c.triggered = ctx.events.iter().any(|e| *e == c.event);
            }
        }
    }

    pub fn is_true(&self) -> bool {
        match self {
            TransitionCondition::Time(c) => c.waited.as_secs_f64() + 1e-9 >= c.seconds,
            TransitionCondition::Feedback(c) => c.satisfied,
            TransitionCondition::Event(c) => c.triggered,
        }
    }

    /// Forget accumulated state. Called whenever the source state is entered.
    pub fn reset(&mut self) {
        match self {
            TransitionCondition::Time(c) => c.waited = Duration::ZERO,
            TransitionCondition::Feedback(c) => c.satisfied = false,
            TransitionCondition::Event(c) => c.triggered = false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(delta_ms: u64, feedback: &'a dyn FeedbackSource, events: &'a [String]) -> ConditionContext<'a> {
        ConditionContext {
            delta: Duration::from_millis(delta_ms),
            feedback,
            events,
        }
    }

    #[test]
    fn test_time_condition_counts_down() {
        let feedback: HashMap<String, f64> = HashMap::new();
        let mut condition = TransitionCondition::time(0.3);
        for _ in 0..2 {
            condition.update(&ctx(100, &feedback, &[]));
        }
        assert!(!condition.is_true());
        condition.update(&ctx(100, &feedback, &[]));
        assert!(condition.is_true());

        condition.reset();
        assert!(!condition.is_true());
    }

    #[test]
    fn test_feedback_condition_uses_source() {
        let mut source = MockFeedbackSource::new();
        source
            .expect_feedback_value()
            .returning(|name| (name == "alpha").then_some(0.8));

        let mut condition = TransitionCondition::feedback("alpha", Comparison::GreaterOrEqual, 0.5);
        condition.update(&ctx(10, &source, &[]));
        assert!(condition.is_true());
    }

    #[test]
    fn test_feedback_condition_without_value_is_false() {
        let feedback: HashMap<String, f64> = HashMap::new();
        let mut condition = TransitionCondition::feedback("alpha", Comparison::Less, 1.0);
        condition.update(&ctx(10, &feedback, &[]));
        assert!(!condition.is_true());
    }

    #[test]
    fn test_event_condition_lasts_one_tick() {
        let feedback: HashMap<String, f64> = HashMap::new();
        let events = vec!["button".to_string()];
        let mut condition = TransitionCondition::event("button");
        condition.update(&ctx(10, &feedback, &events));
        assert!(condition.is_true());
        condition.update(&ctx(10, &feedback, &[]));
        assert!(!condition.is_true());
    }

    #[test]
    fn test_condition_serde_tags() {
        let json = r#"{"kind":"feedback","feedback":"alpha","comparison":">","value":0.5}"#;
        let condition: TransitionCondition = serde_json::from_str(json).unwrap();
        assert_eq!(
            condition,
            TransitionCondition::feedback("alpha", Comparison::Greater, 0.5)
        );
    }
}
