//! Cooperative cancellation and nested progress reporting.
//!
//! Long running operations take a `&mut Progress` parameter. They poll
//! [`Progress::is_cancelled`] (or [`Progress::check`]) once per unit of work and
//! report how far along they are with [`Progress::set_task_progress`].
//!
//! Progress is reported against a stack of tasks. Each task started with
//! [`Progress::begin_task`] occupies a percentage of its parent; the task's own
//! progress runs from 0 to 100 and is scaled into the parent automatically:
//!
//! ```
//! use abt_compiler::Progress;
//!
//! let mut progress = Progress::new();
//! progress.begin_task("subdividing", 20.0);
//! progress.set_task_progress(1, 2);
//! assert_eq!(progress.percentage(), 10.0);
//! progress.end_task();
//! assert_eq!(progress.percentage(), 20.0);
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};

/// Shared cancellation flag.
///
/// Cloning the token shares the flag, so a token handed to another thread can
/// cancel an operation running on the thread that owns the [`Progress`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
struct Task {
    name: String,
    percentage: f32,
    percent_complete: f32,
}

impl Task {
    fn new(name: impl Into<String>, percentage: f32) -> Self {
        Self {
            name: name.into(),
            percentage,
            percent_complete: 0.0,
        }
    }
}

type Observer = Box<dyn FnMut(f32, &str) + Send>;

/// Progress and cancellation context threaded through compilation.
pub struct Progress {
    token: CancelToken,
    tasks: Vec<Task>,
    observer: Option<Observer>,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("token", &self.token)
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

impl Progress {
    /// Creates a context with a fresh cancellation token.
    pub fn new() -> Self {
        Self::with_token(CancelToken::new())
    }

    /// Creates a context that observes an existing cancellation token.
    pub fn with_token(token: CancelToken) -> Self {
        Self {
            token,
            tasks: vec![Task::new("", 100.0)],
            observer: None,
        }
    }

    /// Registers a callback receiving `(percentage, task string)` on every update.
    pub fn on_update<F>(mut self, observer: F) -> Self
    where
        F: FnMut(f32, &str) + Send + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Returns a clone of the cancellation token.
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns whether the operation has been asked to stop.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns `Err(Error::Cancelled)` if cancellation has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Begins a subtask occupying `percentage` of the current task.
    ///
    /// Every call must be paired with [`Progress::end_task`].
    pub fn begin_task(&mut self, name: impl Into<String>, percentage: f32) {
        if let Some(current) = self.tasks.last() {
            if current.percent_complete + percentage > 100.1 {
                log::warn!("Task percentages exceed 100");
            }
        }

        self.tasks.push(Task::new(name, percentage));
        self.notify();
    }

    /// Ends the most recently started subtask, crediting its share to the parent.
    pub fn end_task(&mut self) {
        if self.tasks.len() <= 1 {
            log::warn!("Attempt to end task when none exist");
            return;
        }

        if let Some(task) = self.tasks.pop() {
            if let Some(parent) = self.tasks.last_mut() {
                parent.percent_complete += task.percentage;
            }
        }
        self.notify();
    }

    /// Sets the current task's completion from item counts.
    ///
    /// Returns the cancellation flag so callers can update and poll in one call.
    pub fn set_task_progress(&mut self, done: usize, total: usize) -> bool {
        let fraction = if total == 0 {
            1.0
        } else {
            done.min(total) as f32 / total as f32
        };

        if let Some(task) = self.tasks.last_mut() {
            task.percent_complete = fraction * 100.0;
        }
        self.notify();

        self.is_cancelled()
    }

    /// Returns the overall completion percentage across the whole task stack.
    pub fn percentage(&self) -> f32 {
        let mut percent = 0.0;
        let mut weight = 1.0;

        for task in &self.tasks {
            weight *= task.percentage / 100.0;
            percent += task.percent_complete * weight;
        }

        percent
    }

    /// Returns the names of all active tasks joined with `" - "`.
    pub fn task_string(&self) -> String {
        self.tasks
            .iter()
            .filter(|task| !task.name.is_empty())
            .map(|task| task.name.as_str())
            .collect::<Vec<_>>()
            .join(" - ")
    }

    /// Returns the number of active subtasks.
    pub fn depth(&self) -> usize {
        self.tasks.len() - 1
    }

    fn notify(&mut self) {
        if self.observer.is_some() {
            let percentage = self.percentage();
            let task = self.task_string();
            if let Some(observer) = self.observer.as_mut() {
                observer(percentage, &task);
            }
        }
    }
}
