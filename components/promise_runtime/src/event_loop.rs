//! Cooperative event loop driving the deferred-job queue.
//!
//! The loop owns the shared [`JobQueue`] and hands out the [`Defer`]
//! capability promises are constructed with. One logical thread, no locks:
//! draining the queue IS the engine's entire execution model.

use std::rc::Rc;

use crate::job_queue::{Defer, Job, JobQueue};

/// Single-threaded cooperative loop that drains deferred jobs in FIFO
/// order.
///
/// Promises never run callbacks inline; they defer them through the
/// scheduler handle this loop hands out, and nothing runs until the loop
/// is driven. A promise whose setup routine never settles keeps its
/// descendants pending forever - the loop simply goes idle.
///
/// # Examples
///
/// ```
/// use promise_runtime::{EventLoop, Job};
///
/// let event_loop = EventLoop::new();
/// event_loop.defer(Job::new(|| {}));
/// event_loop.run_until_idle();
/// assert!(event_loop.is_idle());
/// ```
#[derive(Debug, Default)]
pub struct EventLoop {
    jobs: Rc<JobQueue>,
}

impl EventLoop {
    /// Creates a new EventLoop with an empty queue.
    pub fn new() -> Self {
        Self {
            jobs: Rc::new(JobQueue::new()),
        }
    }

    /// Returns the scheduling capability promises are built with.
    ///
    /// Every clone defers onto this loop's queue.
    pub fn scheduler(&self) -> Rc<dyn Defer> {
        Rc::clone(&self.jobs) as Rc<dyn Defer>
    }

    /// Schedules a job directly on this loop's queue.
    pub fn defer(&self, job: Job) {
        self.jobs.defer(job);
    }

    /// Runs queued jobs until the queue stays empty.
    ///
    /// Jobs deferred while draining (settlements cascading down a chain)
    /// run within the same call.
    pub fn run_until_idle(&self) {
        while let Some(job) = self.jobs.take_next() {
            tracing::trace!("running deferred job");
            job.run();
        }
    }

    /// Runs a single queued job.
    ///
    /// Returns false if the queue was empty.
    pub fn run_one(&self) -> bool {
        match self.jobs.take_next() {
            Some(job) => {
                job.run();
                true
            }
            None => false,
        }
    }

    /// Returns true if no jobs are queued.
    pub fn is_idle(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Returns the number of jobs currently queued.
    pub fn pending_jobs(&self) -> usize {
        self.jobs.len()
    }
}
