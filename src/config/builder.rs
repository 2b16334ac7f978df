use crate::config::session::{
    parse_endpoint, GraphDefinition, SessionFile, StateDefinition, StateKindName,
    StateMachineDefinition,
};
use crate::engine::Engine;
use crate::error::{EngineError, Result, ResultExt};
use crate::graph::{Graph, GraphError, NodeFactory};
use crate::state_machine::{
    StateKind, StateMachine, StateMachineError, SyncMode, SyncState, TimerState,
};
use std::time::Duration;

/// Turns a `SessionFile` into a ready-to-start `Engine`.
pub struct SessionBuilder;

impl SessionBuilder {
    pub fn build(session: &SessionFile) -> Result<Engine> {
        session.engine.validate()?;
        let graph = Self::build_graph(&session.graph)
            .with_context(|| format!("Failed to build graph of session '{}'", session.name))?;
        let state_machine = Self::build_state_machine(&session.state_machine).with_context(|| {
            format!("Failed to build state machine of session '{}'", session.name)
        })?;
        Ok(Engine::new(graph, state_machine))
    }

    pub fn build_graph(definition: &GraphDefinition) -> Result<Graph> {
        let mut graph = Graph::new();

        for node_def in &definition.nodes {
            let id = graph.add_node(node_def.name.clone(), NodeFactory::create(node_def.node_type))?;
            for (key, value) in &node_def.attributes {
                graph
                    .set_attribute(id, key, value)
                    .with_context(|| format!("Node '{}'", node_def.name))?;
            }
        }

        for connection in &definition.connections {
            let (from_node, from_port) = parse_endpoint(&connection.from)?;
            let (to_node, to_port) = parse_endpoint(&connection.to)?;
            let from = graph
                .find_node(from_node)
                .ok_or_else(|| GraphError::UnknownNode(from_node.to_string()))?;
            let to = graph
                .find_node(to_node)
                .ok_or_else(|| GraphError::UnknownNode(to_node.to_string()))?;
            graph
                .connect(from, from_port, to, to_port)
                .with_context(|| format!("Connecting {} -> {}", connection.from, connection.to))?;
        }

        tracing::info!(
            "Built graph with {} nodes and {} connections",
            graph.node_count(),
            graph.connections().len()
        );
        Ok(graph)
    }

    pub fn build_state_machine(definition: &StateMachineDefinition) -> Result<StateMachine> {
        let mut machine = StateMachine::new();

        for state_def in &definition.states {
            let kind = Self::state_kind(state_def)?;
            let id = machine.add_state(state_def.name.clone(), kind)?;
            machine.set_activation_mode(id, state_def.activation_mode)?;
            if let Some(mode) = state_def.dead_end_mode {
                machine.set_dead_end_mode(id, mode)?;
            }
        }

        for transition_def in &definition.transitions {
            let from = machine
                .find_state(&transition_def.from)
                .ok_or_else(|| StateMachineError::UnknownState(transition_def.from.clone()))?;
            let to = machine
                .find_state(&transition_def.to)
                .ok_or_else(|| StateMachineError::UnknownState(transition_def.to.clone()))?;
            let id = machine.add_transition(from, to)?;

            let duration = duration_from_secs(transition_def.duration_secs).ok_or_else(|| {
                EngineError::Config(format!(
                    "Transition {} -> {}: invalid duration {}",
                    transition_def.from, transition_def.to, transition_def.duration_secs
                ))
            })?;
            if let Some(transition) = machine.transition_mut(id) {
                transition.priority = transition_def.priority;
                transition.duration = duration;
                transition.disabled = transition_def.disabled;
            }
            for condition in &transition_def.conditions {
                machine.add_condition(id, condition.clone())?;
            }
        }

        tracing::info!(
            "Built state machine with {} states and {} transitions",
            machine.states().len(),
            machine.transitions().len()
        );
        Ok(machine)
    }

    fn state_kind(def: &StateDefinition) -> Result<StateKind> {
        let kind = match def.kind {
            StateKindName::Plain => StateKind::Plain,
            StateKindName::Entry => StateKind::Entry,
            StateKindName::Exit => StateKind::Exit { status: def.status },
            StateKindName::Timer => {
                let interval = def
                    .interval_secs
                    .and_then(duration_from_secs)
                    .filter(|interval| !interval.is_zero())
                    .ok_or_else(|| {
                        EngineError::Config(format!(
                            "Timer state '{}' needs a positive interval_secs",
                            def.name
                        ))
                    })?;
                StateKind::Timer(
                    TimerState::new(interval)
                        .with_first_tick(def.first_tick_on_entry)
                        .with_restart_on_entry(def.restart_on_entry),
                )
            }
            StateKindName::Sync => StateKind::Sync(match def.sync_mode {
                SyncMode::WaitAll => SyncState::wait_all(),
                SyncMode::WaitCount => {
                    if def.sync_count == 0 {
                        return Err(EngineError::Config(format!(
                            "Sync state '{}' in wait_count mode needs sync_count > 0",
                            def.name
                        )));
                    }
                    SyncState::wait_count(def.sync_count)
                }
            }),
        };
        Ok(kind)
    }
}

/// `None` for negative, non-finite or unrepresentable values.
fn duration_from_secs(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::session::{ConnectionDefinition, NodeDefinition, TransitionDefinition};
    use crate::graph::{AttributeValue, NodeType};
    use crate::state_machine::TransitionCondition;

    #[test]
    fn test_build_demo_session() {
        let engine = SessionBuilder::build(&SessionFile::demo()).unwrap();
        assert_eq!(engine.graph().node_count(), 3);
        assert_eq!(engine.graph().connections().len(), 2);
        assert_eq!(engine.state_machine().states().len(), 3);

        let relax = engine.state_machine().find_state("relax").unwrap();
        let button = engine
            .state_machine()
            .transitions()
            .iter()
            .find(|t| t.from() == relax && t.priority == 1)
            .unwrap();
        assert_eq!(button.conditions(), &[TransitionCondition::event("button")]);
    }

    #[test]
    fn test_attributes_are_applied() {
        let definition = GraphDefinition {
            nodes: vec![NodeDefinition::new("gen", NodeType::SignalGenerator)
                .with_attribute("frequency", 3i64)
                .with_attribute("waveform", "square")],
            connections: Vec::new(),
        };
        let graph = SessionBuilder::build_graph(&definition).unwrap();
        let gen = graph.find_node("gen").unwrap();
        assert_eq!(graph.attribute(gen, "frequency"), Some(AttributeValue::Float(3.0)));
        assert_eq!(graph.attribute(gen, "waveform"), Some(AttributeValue::from("square")));
    }

    #[test]
    fn test_invalid_attribute_names_node() {
        let definition = GraphDefinition {
            nodes: vec![NodeDefinition::new("gen", NodeType::SignalGenerator)
                .with_attribute("waveform", "noise")],
            connections: Vec::new(),
        };
        let err = SessionBuilder::build_graph(&definition).unwrap_err();
        assert!(err.to_string().contains("Node 'gen'"));
    }

    #[test]
    fn test_unknown_connection_endpoint() {
        let definition = GraphDefinition {
            nodes: vec![NodeDefinition::new("gen", NodeType::SignalGenerator)],
            connections: vec![ConnectionDefinition::new("gen.out", "missing.in")],
        };
        let err = SessionBuilder::build_graph(&definition).unwrap_err();
        assert!(matches!(err, EngineError::Graph(GraphError::UnknownNode(ref name)) if name == "missing"));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let definition = GraphDefinition {
            nodes: vec![
                NodeDefinition::new("a", NodeType::Smooth),
                NodeDefinition::new("b", NodeType::Smooth),
            ],
            connections: vec![
                ConnectionDefinition::new("a.out", "b.in"),
                ConnectionDefinition::new("b.out", "a.in"),
            ],
        };
        let err = SessionBuilder::build_graph(&definition).unwrap_err();
        assert!(err.to_string().contains("Cycle"));
    }

    #[test]
    fn test_transition_attributes() {
        let mut transition = TransitionDefinition::new("start", "end");
        transition.priority = 4;
        transition.duration_secs = 1.25;
        transition.disabled = true;
        let definition = StateMachineDefinition {
            states: vec![
                StateDefinition::new("start", StateKindName::Entry),
                StateDefinition::exit("end", 2),
            ],
            transitions: vec![transition],
        };

        let machine = SessionBuilder::build_state_machine(&definition).unwrap();
        let t = &machine.transitions()[0];
        assert_eq!(t.priority, 4);
        assert_eq!(t.duration, Duration::from_millis(1250));
        assert!(t.disabled);

        let end = machine.state(t.to()).unwrap();
        assert_eq!(end.exit_status(), Some(2));
    }

    #[test]
    fn test_state_kinds() {
        let definition = StateMachineDefinition {
            states: vec![
                StateDefinition::timer("tick", 0.5),
                StateDefinition::sync("join", SyncMode::WaitCount, 2),
            ],
            transitions: Vec::new(),
        };
        let machine = SessionBuilder::build_state_machine(&definition).unwrap();
        assert!(matches!(machine.states()[0].kind(), StateKind::Timer(_)));
        let sync = machine.states()[1].sync().unwrap();
        assert_eq!(sync.mode(), SyncMode::WaitCount);
        assert_eq!(sync.count(), 2);
    }

    #[test]
    fn test_timer_without_interval_is_rejected() {
        let definition = StateMachineDefinition {
            states: vec![StateDefinition::new("tick", StateKindName::Timer)],
            transitions: Vec::new(),
        };
        assert!(matches!(
            SessionBuilder::build_state_machine(&definition),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_oversized_durations_are_rejected() {
        let timer = StateMachineDefinition {
            states: vec![StateDefinition::timer("tick", 1e20)],
            transitions: Vec::new(),
        };
        assert!(matches!(
            SessionBuilder::build_state_machine(&timer),
            Err(EngineError::Config(_))
        ));

        let mut transition = TransitionDefinition::new("start", "end");
        transition.duration_secs = 1e20;
        let blend = StateMachineDefinition {
            states: vec![
                StateDefinition::new("start", StateKindName::Entry),
                StateDefinition::exit("end", 0),
            ],
            transitions: vec![transition],
        };
        assert!(matches!(
            SessionBuilder::build_state_machine(&blend),
            Err(EngineError::Config(_))
        ));

        let mut session = SessionFile::demo();
        session.engine.run_duration_secs = Some(1e20);
        assert!(matches!(
            SessionBuilder::build(&session),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_transition_state() {
        let definition = StateMachineDefinition {
            states: vec![StateDefinition::new("start", StateKindName::Entry)],
            transitions: vec![TransitionDefinition::new("start", "nowhere")],
        };
        let err = SessionBuilder::build_state_machine(&definition).unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }
}
