//! The [`Dag`] type and its traversal helpers.
//!
//! # Edge Direction Convention
//!
//! Edges point from **dependent -> dependency**:
//!
//! - **Edge source**: the node that has the dependency
//! - **Edge target**: the node being depended upon
//!
//! So `Direction::Outgoing` walks towards dependencies and
//! `Direction::Incoming` walks towards dependents (the impact direction).
//!
//! # Ordering
//!
//! Every query that returns several nodes returns them either sorted or in
//! BFS discovery order with neighbours visited in sorted order, so repeated
//! queries over an unchanged graph return identical output.

use crate::error::{DagError, Result};
use petgraph::algo;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;

/// A directed acyclic graph keyed by caller-supplied identifiers.
///
/// Acyclicity is checked on every edge insertion; a rejected insertion leaves
/// the graph untouched.
#[derive(Clone)]
pub struct Dag<N> {
    /// Underlying petgraph storage. `StableDiGraph` keeps indices valid
    /// across node removal so `node_map` never needs rebuilding.
    graph: StableDiGraph<N, ()>,

    /// Mapping from node id to graph index.
    node_map: HashMap<N, NodeIndex>,
}

impl<N> Default for Dag<N> {
    fn default() -> Self {
        Self {
            graph: StableDiGraph::default(),
            node_map: HashMap::new(),
        }
    }
}

impl<N: fmt::Debug> fmt::Debug for Dag<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dag")
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .finish()
    }
}

impl<N> Dag<N>
where
    N: Clone + Eq + Hash + Ord,
{
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node. Returns `true` if the node was not already present.
    pub fn add_node(&mut self, id: N) -> bool {
        if self.node_map.contains_key(&id) {
            return false;
        }
        let idx = self.graph.add_node(id.clone());
        self.node_map.insert(id, idx);
        true
    }

    /// Removes a node together with all of its incoming and outgoing edges.
    pub fn remove_node(&mut self, id: &N) -> bool {
        match self.node_map.remove(id) {
            Some(idx) => {
                self.graph.remove_node(idx);
                true
            }
            None => false,
        }
    }

    /// Returns true if the graph contains `id`.
    #[must_use]
    pub fn contains(&self, id: &N) -> bool {
        self.node_map.contains_key(id)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All node ids, sorted.
    #[must_use]
    pub fn nodes(&self) -> Vec<N> {
        let mut nodes: Vec<N> = self.node_map.keys().cloned().collect();
        nodes.sort();
        nodes
    }

    /// All edges as sorted `(dependent, dependency)` pairs.
    #[must_use]
    pub fn edges(&self) -> Vec<(N, N)> {
        let mut edges: Vec<(N, N)> = self
            .graph
            .edge_indices()
            .filter_map(|edge| self.graph.edge_endpoints(edge))
            .map(|(source, target)| (self.graph[source].clone(), self.graph[target].clone()))
            .collect();
        edges.sort();
        edges
    }

    /// Returns true if the edge `from -> to` exists.
    #[must_use]
    pub fn has_edge(&self, from: &N, to: &N) -> bool {
        match (self.node_map.get(from), self.node_map.get(to)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Returns true if adding `from -> to` would close a cycle.
    ///
    /// Checks whether `from` is already reachable from `to`. Nodes that are
    /// not in the graph yet have no paths, so they never close a cycle
    /// unless `from == to`.
    #[must_use]
    pub fn would_create_cycle(&self, from: &N, to: &N) -> bool {
        if from == to {
            return true;
        }
        match (self.node_map.get(from), self.node_map.get(to)) {
            (Some(&from_node), Some(&to_node)) => {
                algo::has_path_connecting(&self.graph, to_node, from_node, None)
            }
            _ => false,
        }
    }

    /// Validates a prospective edge without mutating anything.
    ///
    /// # Errors
    ///
    /// - [`DagError::SelfLoop`] if `from == to`
    /// - [`DagError::Cycle`] if `from` is reachable from `to`
    pub fn check_edge(&self, from: &N, to: &N) -> Result<(), N> {
        if from == to {
            return Err(DagError::SelfLoop(from.clone()));
        }
        if self.would_create_cycle(from, to) {
            return Err(DagError::Cycle {
                from: from.clone(),
                to: to.clone(),
            });
        }
        Ok(())
    }

    /// Adds the edge `from -> to` between two existing nodes.
    ///
    /// Returns `false` if the edge already existed.
    ///
    /// # Errors
    ///
    /// - [`DagError::NodeNotFound`] if either node is missing
    /// - [`DagError::SelfLoop`] or [`DagError::Cycle`] as for [`Dag::check_edge`]
    pub fn add_edge(&mut self, from: &N, to: &N) -> Result<bool, N> {
        let from_node = *self
            .node_map
            .get(from)
            .ok_or_else(|| DagError::NodeNotFound(from.clone()))?;
        let to_node = *self
            .node_map
            .get(to)
            .ok_or_else(|| DagError::NodeNotFound(to.clone()))?;

        if self.graph.find_edge(from_node, to_node).is_some() {
            return Ok(false);
        }
        self.check_edge(from, to)?;

        self.graph.add_edge(from_node, to_node, ());
        Ok(true)
    }

    /// Adds every edge `from -> target` in one atomic step.
    ///
    /// Missing nodes (including `from`) are created. All edges are validated
    /// against the current graph before anything is inserted: every new edge
    /// leaves `from`, so any cycle it could close has to come back to `from`
    /// through edges that already exist. Returns the targets whose edge was
    /// newly added, sorted.
    ///
    /// # Errors
    ///
    /// Returns the first [`DagError::SelfLoop`] or [`DagError::Cycle`] found,
    /// in target order; the graph is unchanged in that case.
    pub fn extend_edges<'a, I>(&mut self, from: &N, targets: I) -> Result<Vec<N>, N>
    where
        I: IntoIterator<Item = &'a N>,
        N: 'a,
    {
        let targets: BTreeSet<&N> = targets.into_iter().collect();

        let mut added = Vec::new();
        for target in targets {
            if self.has_edge(from, target) {
                continue;
            }
            self.check_edge(from, target)?;
            added.push(target.clone());
        }

        self.add_node(from.clone());
        let from_node = self.node_map[from];
        for target in &added {
            self.add_node(target.clone());
            let to_node = self.node_map[target];
            self.graph.add_edge(from_node, to_node, ());
        }

        Ok(added)
    }

    /// Removes the edge `from -> to`. Returns `false` if it did not exist.
    pub fn remove_edge(&mut self, from: &N, to: &N) -> bool {
        let (Some(&from_node), Some(&to_node)) = (self.node_map.get(from), self.node_map.get(to))
        else {
            return false;
        };
        match self.graph.find_edge(from_node, to_node) {
            Some(edge) => {
                self.graph.remove_edge(edge);
                true
            }
            None => false,
        }
    }

    /// Direct dependencies of `id`, sorted. Empty for unknown nodes.
    #[must_use]
    pub fn dependencies(&self, id: &N) -> Vec<N> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Direct dependents of `id`, sorted. Empty for unknown nodes.
    #[must_use]
    pub fn dependents(&self, id: &N) -> Vec<N> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Every node reachable from `id` along dependency edges, in BFS
    /// discovery order. `id` itself is excluded.
    #[must_use]
    pub fn transitive_dependencies(&self, id: &N) -> Vec<N> {
        self.closure(id, Direction::Outgoing)
    }

    /// Every node that transitively depends on `id` (the reverse closure),
    /// in BFS discovery order. `id` itself is excluded.
    #[must_use]
    pub fn transitive_dependents(&self, id: &N) -> Vec<N> {
        self.closure(id, Direction::Incoming)
    }

    /// All nodes ordered so that every dependency precedes its dependents.
    ///
    /// # Errors
    ///
    /// Returns [`DagError::Cycle`] naming the offending node. Insertion keeps
    /// the graph acyclic, so this only fires if that invariant was broken.
    pub fn topological_order(&self) -> Result<Vec<N>, N> {
        match algo::toposort(&self.graph, None) {
            Ok(order) => Ok(order
                .into_iter()
                .rev()
                .map(|idx| self.graph[idx].clone())
                .collect()),
            Err(cycle) => {
                let node = self.graph[cycle.node_id()].clone();
                Err(DagError::Cycle {
                    from: node.clone(),
                    to: node,
                })
            }
        }
    }

    /// Removes every node and edge.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.node_map.clear();
    }

    fn neighbors(&self, id: &N, direction: Direction) -> Vec<N> {
        let Some(&node) = self.node_map.get(id) else {
            return Vec::new();
        };
        let mut ids: Vec<N> = self
            .graph
            .neighbors_directed(node, direction)
            .map(|idx| self.graph[idx].clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// BFS from `id` in the given direction.
    fn closure(&self, id: &N, direction: Direction) -> Vec<N> {
        let Some(&start) = self.node_map.get(id) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            let mut next: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(current, direction)
                .filter(|idx| !visited.contains(idx))
                .collect();
            next.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
            next.dedup();

            for idx in next {
                if visited.insert(idx) {
                    result.push(self.graph[idx].clone());
                    queue.push_back(idx);
                }
            }
        }

        tracing::trace!(
            visited = result.len(),
            ?direction,
            "closure traversal finished"
        );
        result
    }
}
