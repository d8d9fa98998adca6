//! Render scheduling.
//!
//! A [`RenderManager`] owns an ordered queue of tasks and a pool of worker
//! threads. Every worker repeatedly takes the task at the front of the queue
//! and asks it for one unit of work, so one task is driven by many workers
//! at once and a region's tiles render in parallel while regions themselves
//! are worked front to back. A task whose `has_more_work` turns false is
//! retired from the queue; its final bookkeeping happens inside the last
//! `do_work` call, not in the manager.
//!
//! The queue order comes from a comparator given at construction.
//! Scheduling refuses tasks that compare equal to an already queued one,
//! which is what keeps at most one task per region in the system.

pub mod task;

use std::cmp::Ordering;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;

/// A transient unit of scheduled work, driven concurrently by many workers.
pub trait RenderTask: Send + Sync {
    /// Whether another `do_work` call could still be useful. Turns false
    /// once every unit is handed out or the task is cancelled.
    fn has_more_work(&self) -> bool;

    /// Perform one unit of work. Called by worker threads without any
    /// manager lock held; must be safe to call concurrently and to call
    /// spuriously when no work remains.
    fn do_work(&self);

    /// Completed fraction in `[0, 1]`.
    fn estimate_progress(&self) -> f64;

    /// Cooperatively cancel: pending units are dropped, in-flight units
    /// finish, final bookkeeping is skipped.
    fn cancel(&self);

    fn description(&self) -> String;
}

struct TaskQueue<T> {
    tasks: Vec<Arc<T>>,
    // workers currently inside do_work
    busy: usize,
    stopped: bool,
}

/// Worker pool plus ordered task queue.
pub struct RenderManager<T: RenderTask> {
    queue: Mutex<TaskQueue<T>>,
    work_available: Condvar,
    idle: Condvar,
    comparator: Box<dyn Fn(&T, &T) -> Ordering + Send + Sync>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<T: RenderTask + 'static> RenderManager<T> {
    pub fn new(
        comparator: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    ) -> Arc<RenderManager<T>> {
        Arc::new(RenderManager {
            queue: Mutex::new(TaskQueue {
                tasks: Vec::new(),
                busy: 0,
                stopped: false,
            }),
            work_available: Condvar::new(),
            idle: Condvar::new(),
            comparator: Box::new(comparator),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Spawn worker threads. May be called again after [`stop`](Self::stop).
    pub fn start(self: &Arc<Self>, thread_count: usize) {
        self.lock_queue().stopped = false;
        let mut workers = lock(&self.workers);
        for _ in 0..thread_count {
            let manager = Arc::clone(self);
            workers.push(std::thread::spawn(move || manager.worker_loop()));
        }
    }

    /// Insert a task at its ordered queue position. Returns false without
    /// enqueueing when an equal task is already queued.
    pub fn schedule(&self, task: Arc<T>) -> bool {
        let mut queue = self.lock_queue();
        for queued in &queue.tasks {
            if (self.comparator)(queued, &task) == Ordering::Equal {
                return false;
            }
        }
        let position = queue
            .tasks
            .iter()
            .position(|queued| (self.comparator)(queued, &task) == Ordering::Greater)
            .unwrap_or(queue.tasks.len());
        queue.tasks.insert(position, task);
        drop(queue);
        self.work_available.notify_all();
        true
    }

    /// Number of tasks currently queued.
    pub fn queued_tasks(&self) -> usize {
        self.lock_queue().tasks.len()
    }

    /// Cancel every queued task and drop the queue. In-flight work units
    /// finish on their own.
    pub fn cancel_all(&self) {
        let mut queue = self.lock_queue();
        for task in queue.tasks.drain(..) {
            task.cancel();
        }
        if queue.busy == 0 {
            self.idle.notify_all();
        }
    }

    /// Block until the queue is empty and every worker is between work
    /// units.
    pub fn wait_idle(&self) {
        let mut queue = self.lock_queue();
        while !(queue.tasks.is_empty() && queue.busy == 0) {
            queue = wait(&self.idle, queue);
        }
    }

    /// Ask workers to exit after their current work unit and join them.
    pub fn stop(&self) {
        self.lock_queue().stopped = true;
        self.work_available.notify_all();
        let handles: Vec<JoinHandle<()>> = lock(&self.workers).drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                log::error!("A render worker thread panicked");
            }
        }
    }

    fn worker_loop(&self) {
        loop {
            let task = {
                let mut queue = self.lock_queue();
                loop {
                    if queue.stopped {
                        return;
                    }
                    // retire spent tasks at the front
                    while let Some(front) = queue.tasks.first() {
                        if front.has_more_work() {
                            break;
                        }
                        queue.tasks.remove(0);
                    }
                    if let Some(front) = queue.tasks.first() {
                        let task = Arc::clone(front);
                        queue.busy += 1;
                        break task;
                    }
                    if queue.busy == 0 {
                        self.idle.notify_all();
                    }
                    queue = wait(&self.work_available, queue);
                }
            };

            task.do_work();

            let mut queue = self.lock_queue();
            queue.busy -= 1;
            if !task.has_more_work() {
                if let Some(position) = queue
                    .tasks
                    .iter()
                    .position(|queued| Arc::ptr_eq(queued, &task))
                {
                    queue.tasks.remove(position);
                }
            }
            if queue.tasks.is_empty() && queue.busy == 0 {
                self.idle.notify_all();
            }
        }
    }

    fn lock_queue(&self) -> MutexGuard<'_, TaskQueue<T>> {
        lock(&self.queue)
    }
}

fn lock<'a, V>(mutex: &'a Mutex<V>) -> MutexGuard<'a, V> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn wait<'a, V>(condvar: &Condvar, guard: MutexGuard<'a, V>) -> MutexGuard<'a, V> {
    match condvar.wait(guard) {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
