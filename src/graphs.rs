// Copyright 2025 Pants project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::collections::VecDeque;
use std::hash::Hash;

use fnv::FnvHashSet as HashSet;

///
/// Walks the directed graph reachable from `seeds`, calling `visit` exactly once per discovered
/// edge `(node, neighbor)`.
///
/// Deduplication is per-edge rather than per-node: a node reached along two distinct edges is
/// expanded twice, which lets the visitor rebind a successor's identity the first time the
/// successor is seen. Cycles terminate once every edge has been visited.
///
pub fn traverse<N, I, F, V>(seeds: I, mut neighbors: F, mut visit: V)
where
    N: Eq + Hash + Clone,
    I: IntoIterator<Item = N>,
    F: FnMut(&N) -> Vec<N>,
    V: FnMut(&N, &N),
{
    let mut seen: HashSet<(N, N)> = HashSet::default();
    let mut frontier: VecDeque<N> = seeds.into_iter().collect();

    while let Some(node) = frontier.pop_front() {
        for neighbor in neighbors(&node) {
            if seen.insert((node.clone(), neighbor.clone())) {
                visit(&node, &neighbor);
                frontier.push_back(neighbor);
            }
        }
    }
}
