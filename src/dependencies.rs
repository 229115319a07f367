// Copyright 2025 Pants project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::any::TypeId;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use fnv::{FnvHashMap as HashMap, FnvHashSet as HashSet};

use crate::bear::{BearHandle, BearType};
use crate::files::FileDict;
use crate::graphs::traverse;
use crate::section::Section;
use crate::tracker::DependencyTracker;

///
/// Resolves bear types to the instance satisfying them within one (section, file-dictionary)
/// group.
///
/// Seeds are pre-bound to their own type, making user-supplied instances authoritative: a
/// dependency on a seed's type reuses the seed instead of constructing a fresh instance.
///
struct ResolutionTable<R> {
    by_type: HashMap<TypeId, BearHandle<R>>,
}

impl<R: 'static> ResolutionTable<R> {
    fn new() -> ResolutionTable<R> {
        ResolutionTable {
            by_type: HashMap::default(),
        }
    }

    /// Binds a seed as the pre-resolved instance of its own type. The first binding of a type
    /// wins; later seeds of the same type stay schedulable but do not satisfy dependants.
    fn bind_seed(&mut self, seed: &BearHandle<R>) {
        self.by_type
            .entry(seed.type_id())
            .or_insert_with(|| seed.clone());
    }

    /// The instance for the given type, constructing and recording it on first sight.
    fn resolve(
        &mut self,
        bear_type: &BearType<R>,
        section: &Arc<Section>,
        file_dict: &Arc<FileDict>,
    ) -> BearHandle<R> {
        self.by_type
            .entry(bear_type.id())
            .or_insert_with(|| bear_type.instantiate(section.clone(), file_dict.clone()))
            .clone()
    }

    fn get(&self, bear_type: &BearType<R>) -> Option<&BearHandle<R>> {
        self.by_type.get(&bear_type.id())
    }
}

/// A node in the dependency-instantiation graph: either a seed instance or a declared type.
enum DepNode<R> {
    Seed(BearHandle<R>),
    Kind(BearType<R>),
}

impl<R: 'static> DepNode<R> {
    fn neighbors(&self) -> Vec<DepNode<R>> {
        let declared = match self {
            DepNode::Seed(bear) => bear.dependencies(),
            DepNode::Kind(bear_type) => bear_type.dependencies(),
        };
        declared.into_iter().map(DepNode::Kind).collect()
    }
}

impl<R: 'static> Clone for DepNode<R> {
    fn clone(&self) -> DepNode<R> {
        match self {
            DepNode::Seed(bear) => DepNode::Seed(bear.clone()),
            DepNode::Kind(bear_type) => DepNode::Kind(bear_type.clone()),
        }
    }
}

impl<R: 'static> PartialEq for DepNode<R> {
    fn eq(&self, other: &DepNode<R>) -> bool {
        match (self, other) {
            (DepNode::Seed(a), DepNode::Seed(b)) => a == b,
            (DepNode::Kind(a), DepNode::Kind(b)) => a == b,
            _ => false,
        }
    }
}

impl<R: 'static> Eq for DepNode<R> {}

impl<R: 'static> Hash for DepNode<R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            DepNode::Seed(bear) => {
                state.write_u8(0);
                bear.hash(state);
            }
            DepNode::Kind(bear_type) => {
                state.write_u8(1);
                bear_type.hash(state);
            }
        }
    }
}

///
/// Initializes a `DependencyTracker` from the given seed bears, and returns it together with
/// the set of bears that are immediately schedulable.
///
/// Seeds are deduplicated by identity and grouped by their (section, file-dictionary) pair.
/// Within each group, the declared dependency types are traversed, instantiating each type at
/// most once and recording every dependant → dependency edge. The schedulable set holds the
/// seeds without dependencies, plus the instantiated dependencies that have none of their own.
///
pub fn initialize_dependencies<R: 'static>(
    bears: impl IntoIterator<Item = BearHandle<R>>,
) -> (DependencyTracker<BearHandle<R>>, HashSet<BearHandle<R>>) {
    let bears: HashSet<BearHandle<R>> = bears.into_iter().collect();

    let mut tracker = DependencyTracker::new();

    let mut groups: HashMap<(usize, usize), Vec<BearHandle<R>>> = HashMap::default();
    for bear in &bears {
        let key = (
            Arc::as_ptr(bear.section()) as usize,
            Arc::as_ptr(bear.file_dict()) as usize,
        );
        groups.entry(key).or_default().push(bear.clone());
    }

    for group in groups.into_values() {
        let section = group[0].section().clone();
        let file_dict = group[0].file_dict().clone();

        let mut table = ResolutionTable::new();
        for seed in &group {
            table.bind_seed(seed);
        }

        traverse(
            group.iter().cloned().map(DepNode::Seed),
            |node| node.neighbors(),
            |prev, next| {
                let bear_type = match next {
                    DepNode::Kind(bear_type) => bear_type,
                    // Neighbors are always declared types.
                    DepNode::Seed(_) => return,
                };
                let dependant = match prev {
                    DepNode::Seed(bear) => bear.clone(),
                    DepNode::Kind(prev_type) => table
                        .get(prev_type)
                        .expect("a type is instantiated before it is expanded")
                        .clone(),
                };
                let dependency = table.resolve(bear_type, &section, &file_dict);
                tracker.add(dependency, dependant);
            },
        );
    }

    let mut to_schedule: HashSet<BearHandle<R>> = bears
        .into_iter()
        .filter(|bear| tracker.are_dependencies_resolved(bear))
        .collect();

    for dependency in tracker.get_all_dependencies() {
        if tracker.are_dependencies_resolved(&dependency) {
            to_schedule.insert(dependency);
        }
    }

    (tracker, to_schedule)
}
