//! The pool controller: task and result queues, the pending counter, and the
//! flush/fill protocols that move tasks to workers and results back.

use crate::channel::{Endpoint, ReadStatus, WriteStatus};
use crate::procedure::Procedure;
use crate::worker::{self, SpawnError, WorkerHandle, WorkerId};
use crossbeam_channel::Select;
use std::collections::VecDeque;
use std::time::Duration;

/// A bounded pool of workers that executes one procedure on pushed values and
/// yields results in arrival order.
///
/// The pool is driven entirely from the calling thread: [`push`](Pool::push)
/// dispatches queued tasks to write-ready workers (flush), and
/// [`pull`](Pool::pull) drains read-ready workers into the result queue
/// (fill). Both steps poll every worker channel through a single
/// [`Select`], so the only place the calling thread can block is the
/// readiness wait, bounded by the pool's timeout (`None` blocks until an
/// endpoint becomes ready).
///
/// Delivery is not guaranteed: a task written to a worker that dies is lost,
/// and the loss is observable only through [`pending`](Pool::pending) and a
/// result that never arrives. There is no retry and no acknowledgment. The
/// pool does not replace dead workers on its own; it spawns a worker only
/// when a flush finds none.
///
/// A `Pool` is single-owner. Results are consumed in the order workers
/// produced them, which is generally not submission order.
pub struct Pool<P: Procedure> {
    procedure: P,
    timeout: Option<Duration>,
    workers: Vec<WorkerHandle>,
    /// Endpoints of workers that were asked to stop but may still owe
    /// results. Polled by fill, never dispatched to, pruned on hangup.
    stopped: Vec<Endpoint>,
    queue: VecDeque<P::Input>,
    results: VecDeque<P::Output>,
    pending: usize,
    next_id: usize,
}

impl<P: Procedure> Pool<P> {
    /// Creates a pool and spawns `num_workers` workers immediately.
    ///
    /// `num_workers` may be 0, in which case the first flush spawns one
    /// worker lazily. `timeout` bounds every readiness wait; `None` means
    /// wait indefinitely for an endpoint to become ready.
    pub fn new(
        procedure: P,
        num_workers: usize,
        timeout: Option<Duration>,
    ) -> Result<Self, SpawnError> {
        let mut pool = Pool {
            procedure,
            timeout,
            workers: Vec::with_capacity(num_workers),
            stopped: Vec::new(),
            queue: VecDeque::new(),
            results: VecDeque::new(),
            pending: 0,
            next_id: 0,
        };
        for _ in 0..num_workers {
            pool.grow()?;
        }
        Ok(pool)
    }

    /// Creates a pool with one worker per available CPU.
    pub fn with_default_size(procedure: P, timeout: Option<Duration>) -> Result<Self, SpawnError> {
        Self::new(procedure, num_cpus::get(), timeout)
    }

    /// Spawns one additional worker and returns its id.
    pub fn grow(&mut self) -> Result<WorkerId, SpawnError> {
        let id = WorkerId(self.next_id);
        let handle = worker::spawn(id, self.procedure.clone())?;
        self.next_id += 1;
        self.workers.push(handle);
        Ok(id)
    }

    /// Asks the most recently spawned worker to stop and returns its id, or
    /// `None` if the pool has no workers.
    ///
    /// The stop is cooperative: the worker receives the exit sentinel and
    /// finishes any task already in flight. Its results remain collectable
    /// until it hangs up; it just receives no further tasks. If the sentinel
    /// cannot be delivered (the worker's buffer is full), the worker exits
    /// when the pool closes its channel, at the latest once nothing is
    /// pending or on pool drop.
    pub fn shrink(&mut self) -> Option<WorkerId> {
        let worker = self.workers.pop()?;
        worker.endpoint.request_exit();
        tracing::debug!(worker = %worker.id, "stopping worker");
        let WorkerHandle { id, endpoint, .. } = worker;
        self.stopped.push(endpoint);
        Some(id)
    }

    /// Enqueues one task and attempts to dispatch.
    pub fn push(&mut self, value: P::Input) {
        self.queue.push_back(value);
        self.flush();
    }

    /// Enqueues every value, then attempts to dispatch at most once per
    /// enqueued value. The bound keeps a pool with no writable workers from
    /// blocking indefinitely on a bulk submission.
    pub fn push_all<I: IntoIterator<Item = P::Input>>(&mut self, values: I) {
        let before = self.queue.len();
        self.queue.extend(values);
        let added = self.queue.len() - before;
        for _ in 0..added {
            if self.queue.is_empty() {
                break;
            }
            self.flush();
        }
    }

    /// Collects any completed results and returns the oldest one, or `None`
    /// if nothing is available.
    ///
    /// With tasks in flight and an empty result queue this waits up to the
    /// pool's timeout for a worker to become readable. With nothing in flight
    /// it returns immediately.
    pub fn pull(&mut self) -> Option<P::Output> {
        self.fill();
        self.results.pop_front()
    }

    /// Number of tasks dispatched to workers whose outcome has not yet been
    /// observed, successfully or otherwise.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Number of live workers.
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Dispatches queued tasks to write-ready workers.
    ///
    /// Spawns a worker if none exist; if that fails the queue is left intact
    /// for a later attempt. Otherwise waits once for any endpoint to become
    /// writable, then hands one task to each worker that accepts it. A task
    /// written to a dead worker is lost and does not count as pending.
    fn flush(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        if self.workers.is_empty() {
            match self.grow() {
                Ok(_) => {}
                Err(error) => {
                    tracing::debug!(%error, "flush could not spawn a worker");
                    return;
                }
            }
        }
        let ready = {
            let mut select = Select::new();
            for worker in &self.workers {
                select.send(worker.endpoint.tasks());
            }
            wait(&mut select, self.timeout)
        };
        if !ready {
            return;
        }
        for worker in &self.workers {
            let Some(task) = self.queue.pop_front() else {
                break;
            };
            match worker.endpoint.try_write(&task) {
                WriteStatus::Sent => self.pending += 1,
                WriteStatus::Busy => self.queue.push_front(task),
                WriteStatus::Disconnected => {
                    tracing::debug!(worker = %worker.id, "task lost: worker channel closed");
                }
            }
        }
    }

    /// Drains read-ready workers into the result queue.
    ///
    /// No-op when nothing is pending. Waits for read-readiness with a zero
    /// timeout when results are already buffered (non-blocking drain), else
    /// with the pool's timeout. Every read resolves one pending slot whether
    /// or not it produced a result; a hangup resolves every slot the dead
    /// worker still owed and removes it from the pool.
    ///
    /// Once nothing is pending, stopped workers owe nothing and their
    /// endpoints are dropped. That closes the task channels, which ends the
    /// blocking read of any stopped worker whose exit sentinel was lost to a
    /// full buffer.
    fn fill(&mut self) {
        if self.pending == 0 {
            self.stopped.clear();
            return;
        }
        if self.workers.is_empty() && self.stopped.is_empty() {
            return;
        }
        let timeout = if self.results.is_empty() {
            self.timeout
        } else {
            Some(Duration::ZERO)
        };
        let ready = {
            let mut select = Select::new();
            for worker in &self.workers {
                select.recv(worker.endpoint.results());
            }
            for endpoint in &self.stopped {
                select.recv(endpoint.results());
            }
            wait(&mut select, timeout)
        };
        if !ready {
            return;
        }
        for worker in &self.workers {
            Self::drain_endpoint(
                &worker.endpoint,
                Some(worker.id),
                &mut self.results,
                &mut self.pending,
            );
        }
        for endpoint in &self.stopped {
            Self::drain_endpoint(endpoint, None, &mut self.results, &mut self.pending);
        }
        self.workers.retain(|worker| !worker.endpoint.is_dead());
        if self.pending == 0 {
            self.stopped.clear();
        } else {
            self.stopped.retain(|endpoint| !endpoint.is_dead());
        }
    }

    /// One read attempt against one endpoint during a fill pass.
    fn drain_endpoint(
        endpoint: &Endpoint,
        id: Option<WorkerId>,
        results: &mut VecDeque<P::Output>,
        pending: &mut usize,
    ) {
        match endpoint.try_read::<P::Output>() {
            ReadStatus::Value(value) => {
                results.push_back(value);
                *pending = pending.saturating_sub(1);
            }
            ReadStatus::NoData => {
                tracing::trace!(worker = ?id, "pending slot retired without a result");
                *pending = pending.saturating_sub(1);
            }
            ReadStatus::NotReady => {}
            ReadStatus::Hangup(lost) => {
                if lost > 0 {
                    tracing::debug!(worker = ?id, lost, "worker hung up with tasks in flight");
                }
                *pending = pending.saturating_sub(lost);
            }
        }
    }
}

/// Blocks until some registered operation is ready, bounded by `timeout`.
/// Returns whether anything became ready. A wake may be spurious; callers
/// follow up with non-blocking operations that tolerate an empty pass.
fn wait(select: &mut Select<'_>, timeout: Option<Duration>) -> bool {
    match timeout {
        Some(timeout) => select.ready_timeout(timeout).is_ok(),
        None => {
            let _ = select.ready();
            true
        }
    }
}

/// Results in arrival order. `next` is [`Pool::pull`]: it returns `None` when
/// no result arrives within the pool's timeout, which does not mean the pool
/// is finished; pushing more values and resuming iteration is fine.
impl<P: Procedure> Iterator for Pool<P> {
    type Item = P::Output;

    fn next(&mut self) -> Option<P::Output> {
        self.pull()
    }
}

impl<P: Procedure> Drop for Pool<P> {
    /// Best-effort teardown: every live worker is asked to exit and all
    /// channels are closed. Outstanding results are not drained.
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.endpoint.request_exit();
        }
        tracing::debug!(
            workers = self.workers.len(),
            pending = self.pending,
            "pool dropped"
        );
    }
}
