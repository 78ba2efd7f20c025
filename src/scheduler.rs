//! Batching trampoline for step functions.
//!
//! A computation is a state machine: a step function takes the state and
//! either continues, calls a nested task, or finishes. [`run`] drives a
//! single task; [`run_many`] drives a stack of tasks, always advancing the
//! innermost one and feeding each finished task's result back into the task
//! that called it.
//!
//! Steps execute in native batches. When a batch does not finish the
//! computation, the driver recurses one level and treats a whole lower level
//! as one unit, so reaching `N` steps needs only `O(log N)` native frames.

use thiserror::Error;

/// Default number of units per native batch.
pub const DEFAULT_BATCH: usize = 4;

/// Result of one step.
#[derive(Debug)]
pub enum Step<S, T, E> {
    /// Keep going with the new state.
    Continue(S),
    /// Suspend with `state` and run `task` to completion first.
    Call { state: S, task: Task<S, T, E> },
    /// Finished with a result.
    Done(T),
}

pub type StepFn<S, T, E> = fn(S) -> Result<Step<S, T, E>, E>;

/// Combines a finished nested task's result into the state of the task that
/// called it.
pub type ReceiverFn<S, T, E> = fn(S, T) -> Result<S, E>;

/// Default way for a state to absorb a nested task's result.
pub trait Receive<T, E>: Sized {
    /// # Errors
    ///
    /// Implementation-defined; aborts the whole run.
    fn receive(self, value: T) -> Result<Self, E>;
}

/// A step function, its current state and an optional result receiver.
pub struct Task<S, T, E> {
    step: StepFn<S, T, E>,
    state: S,
    receiver: Option<ReceiverFn<S, T, E>>,
}

impl<S, T, E> Task<S, T, E> {
    #[must_use]
    pub fn new(step: StepFn<S, T, E>, state: S) -> Self {
        Self {
            step,
            state,
            receiver: None,
        }
    }

    /// Route this task's result through `receiver` instead of
    /// [`Receive::receive`].
    #[must_use]
    pub fn with_receiver(mut self, receiver: ReceiverFn<S, T, E>) -> Self {
        self.receiver = Some(receiver);
        self
    }

    #[must_use]
    pub fn state(&self) -> &S {
        &self.state
    }
}

impl<S: std::fmt::Debug, T, E> std::fmt::Debug for Task<S, T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("state", &self.state)
            .field("receiver", &self.receiver.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("step budget of {budget} exceeded")]
    BudgetExceeded { budget: usize },

    #[error("single-task run received a nested call")]
    UnexpectedCall,

    #[error("no task to run")]
    EmptyTaskList,
}

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Steps executed.
    pub steps: usize,
    /// Deepest native batching level reached.
    pub max_depth: usize,
}

/// Trampoline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduler {
    batch: usize,
    budget: usize,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            batch: DEFAULT_BATCH,
            budget: usize::MAX,
        }
    }
}

impl Scheduler {
    /// A scheduler with the given step budget. Batch sizes below 2 are
    /// raised to 2.
    #[must_use]
    pub fn new(batch: usize, budget: usize) -> Self {
        Self {
            batch: batch.max(2),
            budget,
        }
    }

    #[must_use]
    pub fn batch(&self) -> usize {
        self.batch
    }

    #[must_use]
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Drive a single task. A [`Step::Call`] is an error.
    ///
    /// # Errors
    ///
    /// The first error returned by the step function, or a
    /// [`SchedulerError`] converted into `E`.
    pub fn run<S, T, E>(&self, step: StepFn<S, T, E>, state: S) -> Result<T, E>
    where
        E: From<SchedulerError>,
    {
        self.run_with_stats(step, state).map(|(value, _)| value)
    }

    /// [`run`](Self::run), also returning the run's counters.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_with_stats<S, T, E>(
        &self,
        step: StepFn<S, T, E>,
        state: S,
    ) -> Result<(T, RunStats), E>
    where
        E: From<SchedulerError>,
    {
        Run::new(*self, vec![Task::new(step, state)], None).finish()
    }

    /// Drive a stack of tasks, innermost last.
    ///
    /// # Errors
    ///
    /// The first error returned by any step function or receiver, or a
    /// [`SchedulerError`] converted into `E`.
    pub fn run_many<S, T, E>(&self, tasks: Vec<Task<S, T, E>>) -> Result<T, E>
    where
        S: Receive<T, E>,
        E: From<SchedulerError>,
    {
        self.run_many_with_stats(tasks).map(|(value, _)| value)
    }

    /// [`run_many`](Self::run_many), also returning the run's counters.
    ///
    /// # Errors
    ///
    /// See [`run_many`](Self::run_many).
    pub fn run_many_with_stats<S, T, E>(
        &self,
        tasks: Vec<Task<S, T, E>>,
    ) -> Result<(T, RunStats), E>
    where
        S: Receive<T, E>,
        E: From<SchedulerError>,
    {
        let (result, stats) = self.run_many_counted(tasks);
        result.map(|value| (value, stats))
    }

    /// [`run_many`](Self::run_many), returning the run's counters whether
    /// or not it succeeded. A failed run reports the steps taken up to the
    /// failure.
    pub fn run_many_counted<S, T, E>(&self, tasks: Vec<Task<S, T, E>>) -> (Result<T, E>, RunStats)
    where
        S: Receive<T, E>,
        E: From<SchedulerError>,
    {
        if tasks.is_empty() {
            return (Err(SchedulerError::EmptyTaskList.into()), RunStats::default());
        }
        let absorb: ReceiverFn<S, T, E> = <S as Receive<T, E>>::receive;
        Run::new(*self, tasks, Some(absorb)).finish_counted()
    }
}

/// Drive a single task with the default batch size.
///
/// # Errors
///
/// See [`Scheduler::run`].
pub fn run<S, T, E>(step: StepFn<S, T, E>, state: S, budget: usize) -> Result<T, E>
where
    E: From<SchedulerError>,
{
    Scheduler::new(DEFAULT_BATCH, budget).run(step, state)
}

/// Drive a stack of tasks with the default batch size.
///
/// # Errors
///
/// See [`Scheduler::run_many`].
pub fn run_many<S, T, E>(tasks: Vec<Task<S, T, E>>, budget: usize) -> Result<T, E>
where
    S: Receive<T, E>,
    E: From<SchedulerError>,
{
    Scheduler::new(DEFAULT_BATCH, budget).run_many(tasks)
}

struct Run<S, T, E> {
    config: Scheduler,
    tasks: Vec<Task<S, T, E>>,
    /// `None` for single-task runs, which reject nested calls.
    absorb: Option<ReceiverFn<S, T, E>>,
    result: Option<T>,
    steps: usize,
    depth: usize,
    max_depth: usize,
}

impl<S, T, E> Run<S, T, E>
where
    E: From<SchedulerError>,
{
    fn new(
        config: Scheduler,
        tasks: Vec<Task<S, T, E>>,
        absorb: Option<ReceiverFn<S, T, E>>,
    ) -> Self {
        Self {
            config,
            tasks,
            absorb,
            result: None,
            steps: 0,
            depth: 0,
            max_depth: 0,
        }
    }

    fn finish(self) -> Result<(T, RunStats), E> {
        let (result, stats) = self.finish_counted();
        result.map(|value| (value, stats))
    }

    fn finish_counted(mut self) -> (Result<T, E>, RunStats) {
        let result = self.drive_to_end();
        let stats = RunStats {
            steps: self.steps,
            max_depth: self.max_depth,
        };
        (result, stats)
    }

    fn drive_to_end(&mut self) -> Result<T, E> {
        let mut level = 0;
        while !self.drive(level)? {
            level += 1;
            tracing::trace!(level, steps = self.steps, "scheduler raised batching level");
        }
        self.result
            .take()
            .ok_or_else(|| SchedulerError::EmptyTaskList.into())
    }

    /// Run up to `batch` units at `level`; level 0 units are single steps.
    /// Returns `true` once the computation finished.
    fn drive(&mut self, level: usize) -> Result<bool, E> {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        for _ in 0..self.config.batch {
            let done = if level == 0 {
                self.tick()?
            } else {
                self.drive(level - 1)?
            };
            if done {
                self.depth -= 1;
                return Ok(true);
            }
        }
        self.depth -= 1;
        Ok(false)
    }

    fn tick(&mut self) -> Result<bool, E> {
        if self.steps >= self.config.budget {
            return Err(SchedulerError::BudgetExceeded {
                budget: self.config.budget,
            }
            .into());
        }
        self.steps += 1;

        let Some(task) = self.tasks.pop() else {
            return Err(SchedulerError::EmptyTaskList.into());
        };
        let Task {
            step,
            state,
            receiver,
        } = task;

        match step(state)? {
            Step::Continue(state) => {
                self.tasks.push(Task {
                    step,
                    state,
                    receiver,
                });
                Ok(false)
            }
            Step::Call { state, task: inner } => {
                if self.absorb.is_none() {
                    return Err(SchedulerError::UnexpectedCall.into());
                }
                self.tasks.push(Task {
                    step,
                    state,
                    receiver,
                });
                self.tasks.push(inner);
                tracing::trace!(depth = self.tasks.len(), "task pushed");
                Ok(false)
            }
            Step::Done(value) => {
                let Some(parent) = self.tasks.pop() else {
                    self.result = Some(value);
                    return Ok(true);
                };
                let combine = receiver
                    .or(self.absorb)
                    .ok_or(SchedulerError::UnexpectedCall)?;
                let state = combine(parent.state, value)?;
                self.tasks.push(Task { state, ..parent });
                tracing::trace!(depth = self.tasks.len(), "task popped");
                Ok(false)
            }
        }
    }
}
