//! Dependency graph for tasks
//!
//! Builds an effort-weighted DAG from a task snapshot and finds its critical
//! chain. Uses petgraph for graph operations.
//!
//! Edges run from a dependency to the task that depends on it. Node order is
//! the order in which task IDs first appear in the snapshot; successor order is
//! the order in which edges were first added. Both orders feed the tie-break
//! between equally long paths, so the result is fully deterministic.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

use super::id::TaskId;
use super::task::Task;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("dependency cycle detected")]
    CyclicDependency,
}

/// A task node: its ID and effort estimate in hours
#[derive(Debug, Clone, Copy, PartialEq)]
struct TaskNode {
    id: TaskId,
    weight: f64,
}

/// A path from a source, ending at some node
#[derive(Debug, Clone)]
struct PathPrefix {
    /// Left-to-right sum of the estimates along the path
    weight: f64,
    source: NodeIndex,
    /// Edge insertion ranks along the path, used to order paths with equal weight
    ranks: Vec<usize>,
    nodes: Vec<NodeIndex>,
}

impl PathPrefix {
    fn start(node: NodeIndex, weight: f64) -> Self {
        Self {
            weight,
            source: node,
            ranks: Vec::new(),
            nodes: vec![node],
        }
    }

    fn extend(&self, edge: EdgeIndex, node: NodeIndex, weight: f64) -> Self {
        let mut ranks = self.ranks.clone();
        ranks.push(edge.index());
        let mut nodes = self.nodes.clone();
        nodes.push(node);
        Self {
            weight: self.weight + weight,
            source: self.source,
            ranks,
            nodes,
        }
    }

    /// Enumeration order of two paths ending at the same node
    fn enumeration_order(&self, other: &PathPrefix) -> Ordering {
        self.source
            .cmp(&other.source)
            .then_with(|| self.ranks.cmp(&other.ranks))
    }
}

/// Keeps the paths into one node that can still win
///
/// Adding the same suffix never reverses the order of two sums, so a path is
/// dead once an earlier-enumerated path weighs at least as much. Rounding can
/// close a gap of at most `tolerance`, so lighter paths beyond that are dead
/// too. What is left is in enumeration order with strictly rising weights.
fn retain_contenders(mut paths: Vec<PathPrefix>, tolerance: f64) -> Vec<PathPrefix> {
    paths.sort_by(|a, b| a.enumeration_order(b));

    let mut kept: Vec<PathPrefix> = Vec::new();
    for path in paths {
        let dominated = kept.last().is_some_and(|best| best.weight >= path.weight);
        if !dominated {
            kept.push(path);
        }
    }

    if let Some(heaviest) = kept.last().map(|path| path.weight) {
        kept.retain(|path| !(path.weight < heaviest - tolerance));
    }
    kept
}

/// A validated, acyclic dependency graph
#[derive(Debug)]
pub struct DependencyGraph {
    /// The underlying directed graph
    graph: DiGraph<TaskNode, ()>,

    /// Map from TaskId to node index
    node_map: HashMap<TaskId, NodeIndex>,

    /// Nodes in topological order (dependencies before dependents)
    order: Vec<NodeIndex>,
}

impl DependencyGraph {
    /// Builds a graph from a task snapshot
    ///
    /// A repeated task ID keeps its first position and takes the effort of its
    /// last record. Dependencies on tasks outside the snapshot are skipped with
    /// a warning. Fails if the dependencies form a cycle.
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Result<Self, GraphError> {
        let tasks: Vec<&Task> = tasks.into_iter().collect();
        let mut graph = DiGraph::new();
        let mut node_map: HashMap<TaskId, NodeIndex> = HashMap::new();

        // First pass: add all nodes
        for task in &tasks {
            let node = TaskNode {
                id: task.id,
                weight: task.estimated_hours,
            };
            match node_map.get(&task.id) {
                Some(&idx) => graph[idx] = node,
                None => {
                    let idx = graph.add_node(node);
                    node_map.insert(task.id, idx);
                }
            }
        }

        // Second pass: add all edges
        for task in &tasks {
            let task_idx = node_map[&task.id];
            for dep_id in &task.dependencies {
                match node_map.get(dep_id) {
                    Some(&dep_idx) => {
                        graph.update_edge(dep_idx, task_idx, ());
                    }
                    None => warn!(
                        task = %task.id,
                        dependency = %dep_id,
                        "Ignoring dependency on a task outside the snapshot"
                    ),
                }
            }
        }

        let order = toposort(&graph, None).map_err(|_| GraphError::CyclicDependency)?;

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built dependency graph"
        );

        Ok(Self {
            graph,
            node_map,
            order,
        })
    }

    /// Returns the heaviest source-to-sink path as task IDs in dependency order
    ///
    /// Path weight is the sum of effort estimates along the path. Among paths
    /// of equal weight, the winner is the first one met when walking sources in
    /// node order, then sinks in node order, then paths depth-first with
    /// successors in edge order. A path must weigh strictly more than zero;
    /// otherwise the chain is empty.
    pub fn critical_path(&self) -> Vec<TaskId> {
        let tolerance = self.rounding_tolerance();
        let mut contenders: Vec<Vec<PathPrefix>> = vec![Vec::new(); self.graph.node_count()];

        for &node in &self.order {
            let weight = self.graph[node].weight;
            let mut candidates: Vec<PathPrefix> = Vec::new();

            let mut incoming = self
                .graph
                .edges_directed(node, Direction::Incoming)
                .peekable();

            if incoming.peek().is_none() {
                candidates.push(PathPrefix::start(node, weight));
            }

            for edge in incoming {
                for prefix in &contenders[edge.source().index()] {
                    candidates.push(prefix.extend(edge.id(), node, weight));
                }
            }

            contenders[node.index()] = retain_contenders(candidates, tolerance);
        }

        // Complete paths compare on their exact sums; equal sums go to the
        // earlier source, then the earlier sink, then the earlier path
        let mut chain: Option<&PathPrefix> = None;
        for sink in self.sinks_idx() {
            for path in &contenders[sink.index()] {
                let better = match chain {
                    None => true,
                    Some(current) if path.weight != current.weight => path.weight > current.weight,
                    Some(current) => path.source < current.source,
                };
                if better {
                    chain = Some(path);
                }
            }
        }

        let chain: Vec<TaskId> = match chain {
            Some(path) if path.weight > 0.0 => path
                .nodes
                .iter()
                .map(|&idx| self.graph[idx].id)
                .collect(),
            _ => Vec::new(),
        };

        debug!(length = chain.len(), "Computed critical path");
        chain
    }

    /// Largest gap between two path sums that later additions can still close
    ///
    /// Each addition rounds both sums by at most one ulp of a value bounded by
    /// the total absolute effort, and a path has fewer additions than nodes.
    fn rounding_tolerance(&self) -> f64 {
        let total: f64 = self
            .graph
            .node_weights()
            .map(|node| node.weight.abs())
            .sum();
        2.0 * self.graph.node_count() as f64 * total * f64::EPSILON
    }

    fn sinks_idx(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices().filter(|&idx| {
            self.graph
                .neighbors_directed(idx, Direction::Outgoing)
                .next()
                .is_none()
        })
    }

    fn sources_idx(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices().filter(|&idx| {
            self.graph
                .neighbors_directed(idx, Direction::Incoming)
                .next()
                .is_none()
        })
    }

    /// Tasks nothing depends on being done first (zero in-degree), in node order
    pub fn sources(&self) -> Vec<TaskId> {
        self.sources_idx().map(|idx| self.graph[idx].id).collect()
    }

    /// Tasks nothing else waits on (zero out-degree), in node order
    pub fn sinks(&self) -> Vec<TaskId> {
        self.sinks_idx().map(|idx| self.graph[idx].id).collect()
    }

    /// Returns the direct dependencies of a task, in edge order
    pub fn dependencies(&self, task_id: &TaskId) -> Vec<TaskId> {
        self.neighbors(task_id, Direction::Incoming)
    }

    /// Returns the direct dependents of a task (tasks that depend on it), in edge order
    pub fn dependents(&self, task_id: &TaskId) -> Vec<TaskId> {
        self.neighbors(task_id, Direction::Outgoing)
    }

    fn neighbors(&self, task_id: &TaskId, direction: Direction) -> Vec<TaskId> {
        let Some(&idx) = self.node_map.get(task_id) else {
            return vec![];
        };

        // petgraph walks edges newest first
        let mut edges: Vec<_> = self.graph.edges_directed(idx, direction).collect();
        edges.sort_by_key(|edge| edge.id());
        edges
            .into_iter()
            .map(|edge| match direction {
                Direction::Incoming => self.graph[edge.source()].id,
                Direction::Outgoing => self.graph[edge.target()].id,
            })
            .collect()
    }

    /// Returns true if `task` directly depends on `depends_on`
    pub fn has_dependency(&self, task: &TaskId, depends_on: &TaskId) -> bool {
        match (self.node_map.get(depends_on), self.node_map.get(task)) {
            (Some(&from), Some(&to)) => self.graph.contains_edge(from, to),
            _ => false,
        }
    }

    /// Effort estimate recorded for a task
    pub fn weight(&self, task_id: &TaskId) -> Option<f64> {
        self.node_map.get(task_id).map(|&idx| self.graph[idx].weight)
    }

    /// Returns all tasks in topological order (dependencies before dependents)
    pub fn topological_order(&self) -> Vec<TaskId> {
        self.order.iter().map(|&idx| self.graph[idx].id).collect()
    }

    /// Returns true if the graph contains the task
    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.node_map.contains_key(task_id)
    }

    /// Returns the number of tasks in the graph
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns the number of dependency edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::domain::id::ProjectId;
    use chrono::{TimeZone, Utc};

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap())
    }

    fn task(hours: f64, deps: &[&Task]) -> Task {
        let mut task = Task::new(ProjectId::new(), "Task", hours, &clock());
        task.dependencies = deps.iter().map(|d| d.id).collect();
        task
    }

    #[test]
    fn empty_graph() {
        let graph = DependencyGraph::from_tasks(&[] as &[Task]).unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.len(), 0);
        assert!(graph.critical_path().is_empty());
    }

    #[test]
    fn linear_chain() {
        let a = task(10.0, &[]);
        let b = task(20.0, &[&a]);
        let c = task(5.0, &[&b]);
        let tasks = [a.clone(), b.clone(), c.clone()];

        let graph = DependencyGraph::from_tasks(&tasks).unwrap();
        assert_eq!(graph.sources(), vec![a.id]);
        assert_eq!(graph.sinks(), vec![c.id]);
        assert_eq!(graph.critical_path(), vec![a.id, b.id, c.id]);
    }

    #[test]
    fn picks_heaviest_branch() {
        let a = task(1.0, &[]);
        let short = task(2.0, &[&a]);
        let long = task(8.0, &[&a]);
        let end = task(1.0, &[&short, &long]);
        let tasks = [a.clone(), short, long.clone(), end.clone()];

        let graph = DependencyGraph::from_tasks(&tasks).unwrap();
        assert_eq!(graph.critical_path(), vec![a.id, long.id, end.id]);
    }

    #[test]
    fn tie_goes_to_first_edge() {
        let a = task(1.0, &[]);
        let left = task(5.0, &[&a]);
        let right = task(5.0, &[&a]);
        let end = task(1.0, &[&right, &left]);
        let tasks = [a.clone(), left.clone(), right, end.clone()];

        // a -> left is added before a -> right, so left is explored first
        let graph = DependencyGraph::from_tasks(&tasks).unwrap();
        assert_eq!(graph.critical_path(), vec![a.id, left.id, end.id]);
    }

    #[test]
    fn tie_after_rounding_goes_to_first_source() {
        // 2.3 + 0.3 rounds below 2.6, yet both paths reach 3.8 exactly
        let t1 = task(2.3, &[]);
        let t2 = task(0.3, &[&t1]);
        let t3 = task(2.6, &[]);
        let t5 = task(0.5, &[&t2, &t3]);
        let t9 = task(0.7, &[&t5]);
        let tasks = [t1.clone(), t2.clone(), t3, t5.clone(), t9.clone()];

        let graph = DependencyGraph::from_tasks(&tasks).unwrap();
        assert_eq!(graph.critical_path(), vec![t1.id, t2.id, t5.id, t9.id]);
    }

    #[test]
    fn lighter_prefix_is_dropped_when_it_cannot_catch_up() {
        let a = task(2.0, &[]);
        let b = task(2.5, &[]);
        let end = task(0.5, &[&a, &b]);
        let tasks = [a, b.clone(), end.clone()];

        let graph = DependencyGraph::from_tasks(&tasks).unwrap();
        assert_eq!(graph.critical_path(), vec![b.id, end.id]);
    }

    #[test]
    fn tie_goes_to_first_source_then_first_sink() {
        let s1 = task(3.0, &[]);
        let s2 = task(3.0, &[]);
        let t1 = task(2.0, &[&s2]);
        let t2 = task(2.0, &[&s1]);
        let tasks = [s1.clone(), s2, t1, t2.clone()];

        let graph = DependencyGraph::from_tasks(&tasks).unwrap();
        assert_eq!(graph.critical_path(), vec![s1.id, t2.id]);

        // Same source, two sinks of equal weight: the earlier sink wins
        let s = task(3.0, &[]);
        let x = task(2.0, &[&s]);
        let y = task(2.0, &[&s]);
        let tasks = [s.clone(), y.clone(), x];
        let graph = DependencyGraph::from_tasks(&tasks).unwrap();
        assert_eq!(graph.critical_path(), vec![s.id, y.id]);
    }

    #[test]
    fn isolated_task_is_its_own_chain() {
        let lone = task(4.0, &[]);
        let a = task(1.0, &[]);
        let b = task(2.0, &[&a]);
        let tasks = [a, b, lone.clone()];

        let graph = DependencyGraph::from_tasks(&tasks).unwrap();
        assert_eq!(graph.critical_path(), vec![lone.id]);
    }

    #[test]
    fn zero_effort_gives_empty_chain() {
        let a = task(0.0, &[]);
        let b = task(0.0, &[&a]);
        let graph = DependencyGraph::from_tasks(&[a, b]).unwrap();
        assert!(graph.critical_path().is_empty());
    }

    #[test]
    fn cycle_detection() {
        let mut a = task(1.0, &[]);
        let b = task(1.0, &[&a]);
        let c = task(1.0, &[&b]);
        a.dependencies.push(c.id);

        let result = DependencyGraph::from_tasks(&[a, b, c]);
        assert_eq!(result.unwrap_err(), GraphError::CyclicDependency);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut a = task(1.0, &[]);
        a.dependencies.push(a.id);
        let result = DependencyGraph::from_tasks(&[a]);
        assert!(matches!(result, Err(GraphError::CyclicDependency)));
    }

    #[test]
    fn dangling_dependency_is_ignored() {
        let a = task(3.0, &[]);
        let mut b = task(2.0, &[&a]);
        let ghost = TaskId::new();
        b.dependencies.push(ghost);

        let graph = DependencyGraph::from_tasks(&[a.clone(), b.clone()]).unwrap();
        assert!(!graph.contains(&ghost));
        assert_eq!(graph.dependencies(&b.id), vec![a.id]);
        assert_eq!(graph.critical_path(), vec![a.id, b.id]);
    }

    #[test]
    fn duplicate_ids_keep_position_and_take_last_effort() {
        let a = task(1.0, &[]);
        let b = task(2.0, &[]);
        let mut a_again = a.clone();
        a_again.estimated_hours = 9.0;

        let graph = DependencyGraph::from_tasks(&[a.clone(), b.clone(), a_again]).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.weight(&a.id), Some(9.0));
        assert_eq!(graph.sources(), vec![a.id, b.id]);
    }

    #[test]
    fn repeated_dependency_adds_one_edge() {
        let a = task(1.0, &[]);
        let mut b = task(1.0, &[&a]);
        b.dependencies.push(a.id);

        let graph = DependencyGraph::from_tasks(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.has_dependency(&b.id, &a.id));
        assert!(!graph.has_dependency(&a.id, &b.id));
    }

    #[test]
    fn neighbors_follow_edge_order() {
        let a = task(1.0, &[]);
        let b = task(1.0, &[]);
        let c = task(1.0, &[&b, &a]);
        let d = task(1.0, &[&a]);

        let graph = DependencyGraph::from_tasks(&[a.clone(), b.clone(), c.clone(), d.clone()])
            .unwrap();
        assert_eq!(graph.dependencies(&c.id), vec![b.id, a.id]);
        assert_eq!(graph.dependents(&a.id), vec![c.id, d.id]);
    }

    #[test]
    fn topological_order() {
        let c = task(1.0, &[]);
        let b = task(1.0, &[&c]);
        let a = task(1.0, &[&b]);

        let graph = DependencyGraph::from_tasks(&[a.clone(), b.clone(), c.clone()]).unwrap();
        let order = graph.topological_order();

        let pos = |id: &TaskId| order.iter().position(|x| x == id).unwrap();
        assert!(pos(&c.id) < pos(&b.id));
        assert!(pos(&b.id) < pos(&a.id));
    }

    #[test]
    fn wide_graph_is_fast() {
        use std::time::Instant;

        // Layered graph with every node linked to every node of the next
        // layer: far too many paths to enumerate one by one.
        let mut tasks: Vec<Task> = Vec::new();
        let mut previous: Vec<Task> = Vec::new();
        for _ in 0..20 {
            let layer: Vec<Task> = (0..10)
                .map(|i| task(1.0 + i as f64, &previous.iter().collect::<Vec<_>>()))
                .collect();
            tasks.extend(layer.iter().cloned());
            previous = layer;
        }

        let start = Instant::now();
        let graph = DependencyGraph::from_tasks(&tasks).unwrap();
        let chain = graph.critical_path();
        let duration = start.elapsed();

        assert_eq!(chain.len(), 20);
        assert!(duration.as_millis() < 500, "Critical path took {:?}", duration);
    }
}
