//! Builds the wave schedule for a validated workflow.
//!
//! A "wave" is a set of nodes whose predecessors have all finished. Waves
//! are strictly ordered (wave N+1 never starts before wave N finishes);
//! nodes within a wave have no defined order relative to each other and are
//! dispatched together via `futures::future::join_all`.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::models::{Edge, Workflow};
use crate::{dag::validate_dag, EngineError};

/// Per-node incoming/outgoing edges, keyed by node ID.
pub struct Graph<'a> {
    pub in_edges: HashMap<&'a str, Vec<&'a Edge>>,
    pub out_edges: HashMap<&'a str, Vec<&'a Edge>>,
}

impl<'a> Graph<'a> {
    pub fn build(workflow: &'a Workflow) -> Self {
        let mut in_edges: HashMap<&str, Vec<&Edge>> = HashMap::new();
        let mut out_edges: HashMap<&str, Vec<&Edge>> = HashMap::new();

        for node in &workflow.nodes {
            in_edges.entry(node.id.as_str()).or_default();
            out_edges.entry(node.id.as_str()).or_default();
        }

        for edge in &workflow.edges {
            out_edges.entry(edge.from.as_str()).or_default().push(edge);
            in_edges.entry(edge.to.as_str()).or_default().push(edge);
        }

        Self { in_edges, out_edges }
    }
}

/// Validate `workflow` (duplicate IDs, dangling edges, cycles) then group
/// its nodes into dependency waves. Edge `condition` is ignored here —
/// structural ordering doesn't care whether an edge is a normal or
/// `$error` path, only that the target waits for the source.
pub fn build_waves(workflow: &Workflow) -> Result<Vec<Vec<String>>, EngineError> {
    validate_dag(workflow)?;

    let graph = Graph::build(workflow);
    let mut in_degree: HashMap<&str, usize> = graph.in_edges.iter().map(|(id, edges)| (*id, edges.len())).collect();

    let mut frontier: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut waves = Vec::new();
    let mut remaining: HashSet<&str> = in_degree.keys().copied().collect();

    while !frontier.is_empty() {
        let wave: Vec<String> = frontier.iter().map(|id| id.to_string()).collect();
        let mut next_frontier = VecDeque::new();

        for node_id in frontier.drain(..) {
            remaining.remove(node_id);
            for edge in graph.out_edges.get(node_id).into_iter().flatten() {
                let deg = in_degree.get_mut(edge.to.as_str()).expect("edge target must exist");
                *deg -= 1;
                if *deg == 0 && remaining.contains(edge.to.as_str()) {
                    next_frontier.push_back(edge.to.as_str());
                }
            }
        }

        waves.push(wave);
        frontier = next_frontier;
    }

    Ok(waves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NodeDefinition, Trigger};

    fn node(id: &str) -> NodeDefinition {
        NodeDefinition { id: id.to_string(), node_type: "mock".into(), config: serde_json::Value::Null, ..Default::default() }
    }

    fn edge(from: &str, to: &str) -> Edge {
        Edge { from: from.into(), to: to.into(), condition: None, ..Default::default() }
    }

    fn workflow(nodes: Vec<NodeDefinition>, edges: Vec<Edge>) -> Workflow {
        Workflow::new("wf", Trigger::Manual, nodes, edges)
    }

    #[test]
    fn diamond_groups_into_three_waves() {
        let wf = workflow(
            vec![node("a"), node("b"), node("c"), node("d")],
            vec![edge("a", "b"), edge("a", "c"), edge("b", "d"), edge("c", "d")],
        );

        let waves = build_waves(&wf).unwrap();
        assert_eq!(waves.len(), 3);
        assert_eq!(waves[0], vec!["a"]);
        let mut mid = waves[1].clone();
        mid.sort();
        assert_eq!(mid, vec!["b", "c"]);
        assert_eq!(waves[2], vec!["d"]);
    }

    #[test]
    fn independent_components_land_in_the_same_wave() {
        let wf = workflow(vec![node("a"), node("b")], vec![]);
        let waves = build_waves(&wf).unwrap();
        assert_eq!(waves.len(), 1);
        let mut w = waves[0].clone();
        w.sort();
        assert_eq!(w, vec!["a", "b"]);
    }

    #[test]
    fn cycle_is_rejected_before_scheduling() {
        let wf = workflow(vec![node("a"), node("b")], vec![edge("a", "b"), edge("b", "a")]);
        assert!(matches!(build_waves(&wf), Err(EngineError::CycleDetected)));
    }
}
