// Copyright 2025 Pants project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::files::FileDict;
use crate::section::Section;

/// Opaque payload describing one task of a bear. Produced by `Bear::generate_tasks` and handed
/// back to `Bear::execute_task` on a worker thread; the scheduler never inspects it.
pub type TaskArgs = Box<dyn Any + Send>;

///
/// An analyzer. Implementations are bound to a (section, file-dictionary) pair at construction
/// and split their work into independent tasks which run in parallel on worker threads.
///
pub trait Bear: Send + Sync + Sized + 'static {
    /// The result record type this bear emits.
    type Record: Send + 'static;

    ///
    /// The bear types this bear depends on. Every task of every dependency completes before any
    /// of this bear's tasks is submitted, and each dependency type is instantiated at most once
    /// per (section, file-dictionary) pair.
    ///
    fn dependencies() -> Vec<BearType<Self::Record>> {
        Vec::new()
    }

    /// A human-readable identifier, used in log messages.
    fn name(&self) -> String {
        short_type_name::<Self>().to_owned()
    }

    fn section(&self) -> &Arc<Section>;

    fn file_dict(&self) -> &Arc<FileDict>;

    ///
    /// Yields the arguments of each task this bear wants to run. Called exactly once per
    /// session; an empty result means the bear is complete as soon as it is scheduled.
    ///
    fn generate_tasks(&self) -> Vec<TaskArgs>;

    ///
    /// Executes a single task on a worker thread, returning the records it produced.
    ///
    fn execute_task(&self, args: TaskArgs) -> Result<Vec<Self::Record>, String>;
}

///
/// A bear type that may be named in `Bear::dependencies`: anything the core can instantiate on
/// its own from a (section, file-dictionary) pair.
///
pub trait DependencyBear: Bear {
    fn new(section: Arc<Section>, file_dict: Arc<FileDict>) -> Self;
}

///
/// A runtime descriptor for a bear type: its identity, how to construct an instance of it, and
/// what it in turn depends on.
///
pub struct BearType<R> {
    id: TypeId,
    name: &'static str,
    construct: fn(Arc<Section>, Arc<FileDict>) -> BearHandle<R>,
    depends: fn() -> Vec<BearType<R>>,
}

impl<R: 'static> BearType<R> {
    pub fn of<B>() -> BearType<R>
    where
        B: DependencyBear<Record = R>,
    {
        BearType {
            id: TypeId::of::<B>(),
            name: short_type_name::<B>(),
            construct: |section, file_dict| BearHandle::new(B::new(section, file_dict)),
            depends: B::dependencies,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn id(&self) -> TypeId {
        self.id
    }

    pub(crate) fn instantiate(
        &self,
        section: Arc<Section>,
        file_dict: Arc<FileDict>,
    ) -> BearHandle<R> {
        (self.construct)(section, file_dict)
    }

    pub(crate) fn dependencies(&self) -> Vec<BearType<R>> {
        (self.depends)()
    }
}

impl<R: 'static> Clone for BearType<R> {
    fn clone(&self) -> BearType<R> {
        BearType {
            id: self.id,
            name: self.name,
            construct: self.construct,
            depends: self.depends,
        }
    }
}

impl<R: 'static> PartialEq for BearType<R> {
    fn eq(&self, other: &BearType<R>) -> bool {
        self.id == other.id
    }
}

impl<R: 'static> Eq for BearType<R> {}

impl<R: 'static> Hash for BearType<R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<R: 'static> fmt::Debug for BearType<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BearType({})", self.name)
    }
}

///
/// The object-safe view of a `Bear` that the tracker, initializer and scheduler work through.
///
trait DynBear<R>: Send + Sync {
    // Only monomorphized by concrete `Bear` impls, which live in downstream crates and in
    // `tests` (cfg(test)); a `cargo build` of this crate alone never instantiates one.
    #[allow(dead_code)]
    fn type_id(&self) -> TypeId;
    fn name(&self) -> String;
    fn section(&self) -> &Arc<Section>;
    fn file_dict(&self) -> &Arc<FileDict>;
    fn dependencies(&self) -> Vec<BearType<R>>;
    fn generate_tasks(&self) -> Vec<TaskArgs>;
    fn execute_task(&self, args: TaskArgs) -> Result<Vec<R>, String>;
}

impl<B: Bear> DynBear<B::Record> for B {
    fn type_id(&self) -> TypeId {
        TypeId::of::<B>()
    }

    fn name(&self) -> String {
        Bear::name(self)
    }

    fn section(&self) -> &Arc<Section> {
        Bear::section(self)
    }

    fn file_dict(&self) -> &Arc<FileDict> {
        Bear::file_dict(self)
    }

    fn dependencies(&self) -> Vec<BearType<B::Record>> {
        B::dependencies()
    }

    fn generate_tasks(&self) -> Vec<TaskArgs> {
        Bear::generate_tasks(self)
    }

    fn execute_task(&self, args: TaskArgs) -> Result<Vec<B::Record>, String> {
        Bear::execute_task(self, args)
    }
}

///
/// The identity-bearing handle to a bear instance.
///
/// Two handles are equal when they point at the same instance: two instances of the same type
/// stay distinct, which is what lets user-supplied seeds coexist with instantiated
/// dependencies.
///
pub struct BearHandle<R>(Arc<dyn DynBear<R>>);

impl<R: 'static> BearHandle<R> {
    pub fn new<B>(bear: B) -> BearHandle<R>
    where
        B: Bear<Record = R>,
    {
        BearHandle(Arc::new(bear))
    }

    pub fn name(&self) -> String {
        self.0.name()
    }

    pub fn section(&self) -> &Arc<Section> {
        self.0.section()
    }

    pub fn file_dict(&self) -> &Arc<FileDict> {
        self.0.file_dict()
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.0.type_id()
    }

    pub(crate) fn dependencies(&self) -> Vec<BearType<R>> {
        self.0.dependencies()
    }

    pub(crate) fn generate_tasks(&self) -> Vec<TaskArgs> {
        self.0.generate_tasks()
    }

    pub(crate) fn execute_task(&self, args: TaskArgs) -> Result<Vec<R>, String> {
        self.0.execute_task(args)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl<R: 'static> Clone for BearHandle<R> {
    fn clone(&self) -> BearHandle<R> {
        BearHandle(self.0.clone())
    }
}

impl<R: 'static> PartialEq for BearHandle<R> {
    fn eq(&self, other: &BearHandle<R>) -> bool {
        self.addr() == other.addr()
    }
}

impl<R: 'static> Eq for BearHandle<R> {}

impl<R: 'static> Hash for BearHandle<R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl<R: 'static> fmt::Debug for BearHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BearHandle({})", self.0.name())
    }
}

/// The unqualified name of a type, for log messages.
fn short_type_name<T: ?Sized>() -> &'static str {
    let name = std::any::type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}
