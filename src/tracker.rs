// Copyright 2025 Pants project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::hash::Hash;

use fnv::{FnvHashMap as HashMap, FnvHashSet as HashSet};
use petgraph::graph::{DiGraph, NodeIndex};

///
/// Tracks unresolved dependency edges between nodes.
///
/// For each dependant, the tracker holds the set of dependencies it is still waiting on. The
/// tracker stores plain clones of the node type and imposes no ordering of its own: `resolve`
/// reports which dependants became runnable, nothing more.
///
pub struct DependencyTracker<N: Eq + Hash + Clone> {
    outstanding: HashMap<N, HashSet<N>>,
}

impl<N: Eq + Hash + Clone> DependencyTracker<N> {
    pub fn new() -> DependencyTracker<N> {
        DependencyTracker {
            outstanding: HashMap::default(),
        }
    }

    ///
    /// Records that `dependant` may only run once `dependency` has completed.
    ///
    /// Duplicate edges collapse, and self-edges are ignored: a node waiting on itself could
    /// never be released.
    ///
    pub fn add(&mut self, dependency: N, dependant: N) {
        if dependency == dependant {
            return;
        }
        self.outstanding
            .entry(dependant)
            .or_default()
            .insert(dependency);
    }

    /// The dependencies `dependant` is still waiting on.
    pub fn get_dependencies(&self, dependant: &N) -> HashSet<N> {
        self.outstanding.get(dependant).cloned().unwrap_or_default()
    }

    pub fn are_dependencies_resolved(&self, dependant: &N) -> bool {
        !self.outstanding.contains_key(dependant)
    }

    /// Every node that some other node is still waiting on.
    pub fn get_all_dependencies(&self) -> HashSet<N> {
        self.outstanding.values().flatten().cloned().collect()
    }

    ///
    /// Removes `dependency` from every dependant's outstanding set and returns exactly the
    /// dependants that became free as a result of this call. Once a dependency is fully
    /// released, further calls return nothing.
    ///
    pub fn resolve(&mut self, dependency: &N) -> HashSet<N> {
        let mut freed = HashSet::default();
        self.outstanding.retain(|dependant, dependencies| {
            if dependencies.remove(dependency) && dependencies.is_empty() {
                freed.insert(dependant.clone());
                false
            } else {
                true
            }
        });
        freed
    }

    ///
    /// The strongly connected components of size greater than one over the recorded edges: the
    /// groups of nodes that can never be released. Used to fail a session fast instead of
    /// stalling on a graph that will not drain.
    ///
    pub fn circular_dependencies(&self) -> Vec<Vec<N>> {
        let mut graph: DiGraph<N, ()> = DiGraph::new();
        let mut indices: HashMap<N, NodeIndex> = HashMap::default();

        for (dependant, dependencies) in &self.outstanding {
            for dependency in dependencies {
                let from = Self::ensure_node(&mut graph, &mut indices, dependency);
                let to = Self::ensure_node(&mut graph, &mut indices, dependant);
                graph.add_edge(from, to, ());
            }
        }

        petgraph::algo::kosaraju_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| scc.into_iter().map(|ix| graph[ix].clone()).collect())
            .collect()
    }

    fn ensure_node(
        graph: &mut DiGraph<N, ()>,
        indices: &mut HashMap<N, NodeIndex>,
        node: &N,
    ) -> NodeIndex {
        if let Some(&ix) = indices.get(node) {
            return ix;
        }
        let ix = graph.add_node(node.clone());
        indices.insert(node.clone(), ix);
        ix
    }
}
