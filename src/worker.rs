//! Single-consumer deferred work queue.
//!
//! Every deferred action in the firmware (event dispatch, LED blink
//! steps, anything an ISR wants done "later") is pushed here and
//! executed, one at a time and in FIFO order, by the thread running
//! [`Worker::run`].
//!
//! ```text
//! ┌─────────────┐
//! │ Button ISR  │──┐  push_work     ┌──────────────┐  run  ┌──────────────┐
//! │ Sampling    │──┼─────────────▶│ ready  (N)   │─────▶│ worker thread │
//! │ PubSub      │──┤  push_or_defer │ deferred (N) │       └──────────────┘
//! │ ...         │──┘  (or false)    └──────────────┘
//! ```
//!
//! Tasks are borrowed trait objects, so queuing never allocates.  A full
//! ready queue rejects `push_work` synchronously; retrying is the
//! caller's call.  `push_or_defer` additionally parks the task in the
//! deferred list, which is moved into the ready queue as slots free up,
//! so an obligation that must not be lost (a pubsub's dispatch task)
//! survives a momentarily full worker.
//!
//! A task that blocks stalls every task behind it.  That serialization
//! is what gives subscribers a single-threaded execution context.

use core::cell::RefCell;
use core::mem::ManuallyDrop;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use heapless::Deque;
use log::debug;

use crate::notification::Notification;

/// A zero-argument unit of deferred work.
///
/// `run` receives the same `'a` borrow the job was queued with, so a job
/// can push itself back onto the worker.
pub trait Job<'a>: Sync {
    fn run(&'a self);
}

impl<'a, F> Job<'a> for F
where
    F: Fn() + Sync,
{
    fn run(&'a self) {
        self()
    }
}

/// A queued job.  The referent must stay alive until the job has run.
pub type Task<'a> = &'a (dyn Job<'a> + 'a);

/// The producer-side contract of a worker.
pub trait WorkQueue<'a>: Sync {
    /// Enqueue `task`.  Returns `false` if the queue is full or the
    /// worker is stopping; the task is then not queued.
    fn push_work(&self, task: Task<'a>) -> bool;

    /// Enqueue `task`, or hold it until the queue has room.  Returns
    /// `false` only if the worker is stopping or cannot hold it either.
    fn push_or_defer(&self, task: Task<'a>) -> bool;
}

// ── Queue state ───────────────────────────────────────────────

// Tasks are plain borrows with nothing to drop.  Skipping the deques'
// drop glue lets a worker hold tasks that borrow the worker itself.
type TaskDeque<'a, const N: usize> = ManuallyDrop<Deque<Task<'a>, N>>;

struct Queue<'a, const N: usize> {
    ready: TaskDeque<'a, N>,
    // Non-empty only while `ready` is full.
    deferred: TaskDeque<'a, N>,
    stopping: bool,
}

enum Next<'a> {
    Run(Task<'a>),
    Idle,
    Stopped,
}

impl<'a, const N: usize> Queue<'a, N> {
    const fn new() -> Self {
        Self {
            ready: ManuallyDrop::new(Deque::new()),
            deferred: ManuallyDrop::new(Deque::new()),
            stopping: false,
        }
    }

    fn next(&mut self) -> Next<'a> {
        let task = match self.ready.pop_front() {
            Some(task) => Some(task),
            None => self.deferred.pop_front(),
        };
        self.promote();
        match task {
            Some(task) => Next::Run(task),
            None if self.stopping => Next::Stopped,
            None => Next::Idle,
        }
    }

    fn promote(&mut self) {
        while let Some(&task) = self.deferred.front() {
            if self.ready.push_back(task).is_err() {
                break;
            }
            self.deferred.pop_front();
        }
    }

    fn len(&self) -> usize {
        self.ready.len() + self.deferred.len()
    }
}

// ── Worker ────────────────────────────────────────────────────

/// Bounded FIFO of tasks with a single executing thread.
///
/// `N` is the capacity of both the ready queue and the deferred list.
/// Construct once (usually as a `static`) and hand out `&Worker` to
/// every producer.
pub struct Worker<'a, const N: usize> {
    queue: Mutex<CriticalSectionRawMutex, RefCell<Queue<'a, N>>>,
    wake: Notification,
}

impl<'a, const N: usize> Worker<'a, N> {
    pub const fn new() -> Self {
        assert!(N > 0, "worker queue capacity must be non-zero");
        Self {
            queue: Mutex::new(RefCell::new(Queue::new())),
            wake: Notification::new(),
        }
    }

    /// Enqueue `task`.  Never blocks.
    pub fn push_work(&self, task: Task<'a>) -> bool {
        let queued = self.queue.lock(|q| {
            let mut q = q.borrow_mut();
            !q.stopping && q.ready.push_back(task).is_ok()
        });
        if queued {
            self.wake.release();
        }
        queued
    }

    /// Enqueue `task`, falling back to the deferred list when the ready
    /// queue is full.  Deferred tasks run after everything that was
    /// ready when they were deferred.  Never blocks.
    pub fn push_or_defer(&self, task: Task<'a>) -> bool {
        let queued = self.queue.lock(|q| {
            let mut q = q.borrow_mut();
            !q.stopping
                && (q.ready.push_back(task).is_ok() || q.deferred.push_back(task).is_ok())
        });
        if queued {
            self.wake.release();
        }
        queued
    }

    /// Thread body: run tasks in enqueue order until [`stop`](Self::stop)
    /// is requested and the queue has drained.
    ///
    /// Must be called from exactly one thread.
    pub fn run(&self) {
        debug!("worker: started ({} slots)", N);
        loop {
            match self.next() {
                Next::Run(task) => task.run(),
                Next::Idle => self.wake.acquire(),
                Next::Stopped => break,
            }
        }
        debug!("worker: stopped");
    }

    /// Run the oldest queued task on the calling thread, if there is
    /// one.  For callers that own the consumer side (a main loop, or a
    /// test); never call it while another thread is in [`run`](Self::run).
    pub fn poll(&self) -> bool {
        match self.next() {
            Next::Run(task) => {
                task.run();
                true
            }
            Next::Idle | Next::Stopped => false,
        }
    }

    /// Stop accepting tasks and let `run` return once every task already
    /// accepted (ready or deferred) has executed.
    pub fn stop(&self) {
        self.queue.lock(|q| q.borrow_mut().stopping = true);
        self.wake.release();
    }

    pub fn is_stopping(&self) -> bool {
        self.queue.lock(|q| q.borrow().stopping)
    }

    /// Number of tasks waiting to run, deferred ones included.
    pub fn pending(&self) -> usize {
        self.queue.lock(|q| q.borrow().len())
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    fn next(&self) -> Next<'a> {
        self.queue.lock(|q| q.borrow_mut().next())
    }
}

impl<'a, const N: usize> WorkQueue<'a> for Worker<'a, N> {
    fn push_work(&self, task: Task<'a>) -> bool {
        Worker::push_work(self, task)
    }

    fn push_or_defer(&self, task: Task<'a>) -> bool {
        Worker::push_or_defer(self, task)
    }
}

impl<const N: usize> Default for Worker<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}
