// Copyright 2025 Pants project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

#![deny(warnings)]
// Enable all clippy lints except for many of the pedantic ones. It's a shame this needs to be copied and pasted across crates, but there doesn't appear to be a way to include inner attributes from a common source.
#![deny(
    clippy::all,
    clippy::default_trait_access,
    clippy::expl_impl_clone_on_copy,
    clippy::if_not_else,
    clippy::needless_continue,
    clippy::unseparated_literal_suffix,
    clippy::used_underscore_binding
)]
// It is often more clear to show that nothing is being moved.
#![allow(clippy::match_ref_pats)]
// Subjective style.
#![allow(
    clippy::len_without_is_empty,
    clippy::redundant_field_names,
    clippy::too_many_arguments
)]
// Default isn't as big a deal as people seem to think it is.
#![allow(clippy::new_without_default, clippy::new_ret_no_self)]
// Arc<Mutex> can be more clear than needing to grok Orderings:
#![allow(clippy::mutex_atomic)]

mod bear;
mod dependencies;
mod files;
mod graphs;
mod section;
mod tracker;

pub use crate::bear::{Bear, BearHandle, BearType, DependencyBear, TaskArgs};
pub use crate::dependencies::initialize_dependencies;
pub use crate::files::{collect_filenames, load_files, FileDict};
pub use crate::graphs::traverse;
pub use crate::section::Section;
pub use crate::tracker::DependencyTracker;

use std::fmt;
use std::time::Duration;

use fnv::FnvHashMap as HashMap;
use log::{debug, error, warn};
use task_executor::Executor;
use tokio::sync::mpsc;

///
/// An error preventing a session from starting.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CoreError {
    /// The declared dependency types form a cycle: the named bears could never be released.
    CircularDependency(Vec<String>),
    /// The worker pool could not be started.
    Executor(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::CircularDependency(names) => {
                write!(f, "Circular bear dependencies: {}", names.join(" <-> "))
            }
            CoreError::Executor(message) => {
                write!(f, "Failed to start the worker pool: {message}")
            }
        }
    }
}

impl std::error::Error for CoreError {}

/// The completion message a finished task posts back to the session loop.
struct TaskDone<R> {
    bear: BearHandle<R>,
    outcome: Result<Vec<R>, String>,
}

///
/// Owns all mutable scheduling state: the dependency tracker, the remaining-task counts and the
/// result callback. Only the session loop touches it, so completion handling is serialized and
/// workers communicate exclusively through the completion channel.
///
struct Scheduler<R: 'static, S> {
    executor: Executor,
    tracker: DependencyTracker<BearHandle<R>>,
    running_tasks: HashMap<BearHandle<R>, usize>,
    completions: mpsc::UnboundedSender<TaskDone<R>>,
    result_callback: S,
}

impl<R, S> Scheduler<R, S>
where
    R: Send + 'static,
    S: FnMut(R),
{
    ///
    /// Submits the tasks of every given bear to the worker pool.
    ///
    /// Bears with unresolved dependencies are skipped: the initializer never hands those out,
    /// so hitting that path indicates a dependency-tracking bug. A bear that generates no tasks
    /// counts as completed right away and releases its dependants synchronously.
    ///
    fn schedule_bears(&mut self, bears: Vec<BearHandle<R>>) {
        for bear in bears {
            if !self.tracker.are_dependencies_resolved(&bear) {
                warn!(
                    "Dependencies for '{}' not yet resolved, holding back. This should not \
                     happen, the dependency tracking system should be smarter.",
                    bear.name()
                );
                continue;
            }

            let tasks = bear.generate_tasks();
            if tasks.is_empty() {
                debug!("'{}' generated no tasks.", bear.name());
                let freed = self.tracker.resolve(&bear);
                self.schedule_bears(freed.into_iter().collect());
                continue;
            }

            debug!("Scheduled '{}' (tasks: {}).", bear.name(), tasks.len());
            self.running_tasks.insert(bear.clone(), tasks.len());
            for args in tasks {
                let task_bear = bear.clone();
                let execution = self.executor.spawn_blocking(
                    move || task_bear.execute_task(args),
                    |join_error| Err(format!("The task panicked: {join_error}")),
                );

                let done_bear = bear.clone();
                let completions = self.completions.clone();
                self.executor.native_spawn(async move {
                    let outcome = execution.await;
                    // The receiver only goes away once running_tasks has drained, and it
                    // drains only after this message is consumed.
                    let _ = completions.send(TaskDone {
                        bear: done_bear,
                        outcome,
                    });
                });
            }
        }
    }

    ///
    /// Handles one completed task: delivers its records, retires the task, and when it was the
    /// bear's last one, resolves the bear and schedules any dependants that became free.
    ///
    fn finish_task(&mut self, done: TaskDone<R>) {
        match done.outcome {
            Ok(records) => {
                for record in records {
                    (self.result_callback)(record);
                }
            }
            Err(err) => {
                error!(
                    "An error was raised during execution of '{}' or result handling: {err}",
                    done.bear.name()
                );
            }
        }

        let Some(remaining) = self.running_tasks.get_mut(&done.bear) else {
            return;
        };
        *remaining -= 1;
        if *remaining == 0 {
            self.running_tasks.remove(&done.bear);
            let freed = self.tracker.resolve(&done.bear);
            if !freed.is_empty() {
                self.schedule_bears(freed.into_iter().collect());
            }
        }
    }
}

///
/// Runs an analysis session on the given executor until every bear in the transitive dependency
/// closure of `bears` has completed.
///
/// `result_callback` is invoked on the session loop for every record as soon as it is produced:
/// a long-running callback delays scheduling, so callers should hand expensive work off.
///
/// Task failures (including panicking workers) are logged and do not abort the session. The
/// only failure is the fail-fast one: a dependency cycle, detected before anything runs.
///
pub async fn run_with_executor<R, S>(
    executor: Executor,
    bears: impl IntoIterator<Item = BearHandle<R>>,
    result_callback: S,
) -> Result<(), CoreError>
where
    R: Send + 'static,
    S: FnMut(R),
{
    let (tracker, to_schedule) = initialize_dependencies(bears);

    if let Some(cycle) = tracker.circular_dependencies().into_iter().next() {
        return Err(CoreError::CircularDependency(
            cycle.iter().map(BearHandle::name).collect(),
        ));
    }

    let (completions, mut receiver) = mpsc::unbounded_channel();
    let mut scheduler = Scheduler {
        executor,
        tracker,
        running_tasks: HashMap::default(),
        completions,
        result_callback,
    };

    scheduler.schedule_bears(to_schedule.into_iter().collect());
    while !scheduler.running_tasks.is_empty() {
        match receiver.recv().await {
            Some(done) => scheduler.finish_task(done),
            // Unreachable while the scheduler holds a sender, but quietly stopping beats
            // spinning forever if that ever changes.
            None => break,
        }
    }

    Ok(())
}

///
/// Runs an analysis session to completion on a dedicated worker pool: one cooperative thread
/// for scheduling and result delivery, and blocking workers sized to the host CPU count.
///
pub fn run<R, S>(
    bears: impl IntoIterator<Item = BearHandle<R>>,
    result_callback: S,
) -> Result<(), CoreError>
where
    R: Send + 'static,
    S: FnMut(R),
{
    let workers = num_cpus::get().max(1);
    let executor = Executor::new_owned(1, workers).map_err(CoreError::Executor)?;

    let result = executor.block_on(run_with_executor(executor.clone(), bears, result_callback));
    executor.shutdown(Duration::from_secs(5));
    result
}
