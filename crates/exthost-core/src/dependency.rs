//! Dependency graph and load ordering for registered extensions.
//!
//! Every `ext-depend` and `ext-softdepend` entry that names another
//! registered bundle adds an edge. Edges point from dependent to dependency:
//! if A depends on B, the edge is `A -> B` and B loads first.
//!
//! Cycles do not make the whole plan fail. Every extension that sits on a
//! cycle (a strongly connected component with more than one member, or a
//! self-dependency) is reported in [`LoadPlan::cycles`] and left out of
//! [`LoadPlan::order`]; everything else is ordered. Extensions that merely
//! depend on a cycle stay in the order and fail their own dependency check
//! later if the dependency was a hard one.
//!
//! # Example
//!
//! ```
//! use exthost_core::dependency::DependencyGraph;
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_node("B");
//! graph.add_node("A");
//! graph.add_edge("B", "A");
//!
//! let plan = graph.plan();
//! assert_eq!(plan.order, vec!["A", "B"]);
//! assert!(plan.cycles.is_empty());
//! ```

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use crate::scanner::RegisteredBundle;

/// Load order computed from a [`DependencyGraph`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadPlan {
    /// Acyclic extensions in dependency-first order; independent extensions
    /// are ordered by ascending name.
    pub order: Vec<String>,
    /// Each cycle's members, sorted by name.
    pub cycles: Vec<Vec<String>>,
}

/// Directed graph of dependencies between extensions.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Adjacency list: key depends on each value.
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Create an empty dependency graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for a set of registered bundles. Dependencies on names
    /// outside the set add no edge.
    pub fn from_bundles<'a>(bundles: impl IntoIterator<Item = &'a RegisteredBundle>) -> Self {
        let bundles: Vec<&RegisteredBundle> = bundles.into_iter().collect();
        let mut graph = Self::new();
        for bundle in &bundles {
            graph.add_node(bundle.name());
        }
        for bundle in &bundles {
            for dep in bundle.descriptor.extension_dependencies() {
                if graph.contains(dep) {
                    graph.add_edge(bundle.name(), dep);
                }
            }
        }
        graph
    }

    /// Add a node. Adding an existing node is a no-op.
    pub fn add_node(&mut self, id: &str) {
        self.edges.entry(id.to_string()).or_default();
    }

    /// Declare that `from` depends on `to`, adding either node if missing.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.add_node(to);
        self.edges
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
    }

    /// Whether the graph has a node named `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    /// Return the number of nodes.
    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    /// Return the number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Get the direct dependencies of a node, sorted.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.edges
            .get(id)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Compute the load order and the cycles.
    pub fn plan(&self) -> LoadPlan {
        let cycles = self.cycles();
        let cyclic: BTreeSet<&str> = cycles.iter().flatten().map(String::as_str).collect();

        // Kahn's algorithm over the acyclic remainder. Edges into cycle
        // members are dropped: those dependencies never load.
        let mut pending: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (from, deps) in &self.edges {
            if cyclic.contains(from.as_str()) {
                continue;
            }
            let live: Vec<&str> = deps
                .iter()
                .map(String::as_str)
                .filter(|dep| !cyclic.contains(dep))
                .collect();
            pending.insert(from.as_str(), live.len());
            for dep in live {
                dependents.entry(dep).or_default().push(from.as_str());
            }
        }

        let mut ready: BinaryHeap<Reverse<&str>> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| Reverse(*id))
            .collect();

        let mut order = Vec::with_capacity(pending.len());
        while let Some(Reverse(current)) = ready.pop() {
            order.push(current.to_string());
            for dependent in dependents.get(current).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(Reverse(*dependent));
                    }
                }
            }
        }

        LoadPlan { order, cycles }
    }

    /// Strongly connected components that form cycles (Tarjan).
    fn cycles(&self) -> Vec<Vec<String>> {
        let mut tarjan = Tarjan {
            graph: self,
            index: 0,
            indices: BTreeMap::new(),
            lowlinks: BTreeMap::new(),
            stack: Vec::new(),
            on_stack: BTreeSet::new(),
            components: Vec::new(),
        };
        for node in self.edges.keys() {
            if !tarjan.indices.contains_key(node.as_str()) {
                tarjan.visit(node);
            }
        }

        let mut cycles: Vec<Vec<String>> = tarjan
            .components
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || self
                        .edges
                        .get(component[0])
                        .is_some_and(|deps| deps.contains(component[0]))
            })
            .map(|component| {
                let mut names: Vec<String> = component.into_iter().map(str::to_string).collect();
                names.sort();
                names
            })
            .collect();
        cycles.sort();
        cycles
    }
}

type Successors<'g> = std::iter::Flatten<std::option::IntoIter<&'g BTreeSet<String>>>;

/// Tarjan's algorithm driven by an explicit call stack, so chain length is
/// bounded by memory rather than thread stack size.
struct Tarjan<'g> {
    graph: &'g DependencyGraph,
    index: usize,
    indices: BTreeMap<&'g str, usize>,
    lowlinks: BTreeMap<&'g str, usize>,
    stack: Vec<&'g str>,
    on_stack: BTreeSet<&'g str>,
    components: Vec<Vec<&'g str>>,
}

impl<'g> Tarjan<'g> {
    fn visit(&mut self, root: &'g str) {
        let mut calls: Vec<(&'g str, Successors<'g>)> = vec![self.enter(root)];

        loop {
            let Some((node, deps)) = calls.last_mut() else {
                break;
            };
            let node = *node;

            if let Some(dep) = deps.next() {
                let dep = dep.as_str();
                if !self.indices.contains_key(dep) {
                    let frame = self.enter(dep);
                    calls.push(frame);
                } else if self.on_stack.contains(dep) {
                    let low = self.lowlinks[node].min(self.indices[dep]);
                    self.lowlinks.insert(node, low);
                }
                continue;
            }

            calls.pop();
            if let Some((parent, _)) = calls.last() {
                let parent = *parent;
                let low = self.lowlinks[parent].min(self.lowlinks[node]);
                self.lowlinks.insert(parent, low);
            }

            if self.lowlinks[node] == self.indices[node] {
                let mut component = Vec::new();
                while let Some(member) = self.stack.pop() {
                    self.on_stack.remove(member);
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                self.components.push(component);
            }
        }
    }

    fn enter(&mut self, node: &'g str) -> (&'g str, Successors<'g>) {
        let graph = self.graph;
        self.indices.insert(node, self.index);
        self.lowlinks.insert(node, self.index);
        self.index += 1;
        self.stack.push(node);
        self.on_stack.insert(node);
        (node, graph.edges.get(node).into_iter().flatten())
    }
}
