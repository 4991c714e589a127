//! The channel pair connecting the pool controller to one worker.
//!
//! Each worker gets a dedicated bidirectional link made of two
//! `crossbeam_channel` halves: a bounded(1) task channel, so that
//! send-readiness approximates "this worker can accept a task", and an
//! unbounded result channel, so a worker's writes never block. Only encoded
//! records (see [`crate::codec`]) cross either half; the controller and the
//! worker share no other state.
//!
//! Readiness across many endpoints is multiplexed with
//! [`crossbeam_channel::Select`] by the controller's flush/fill loops; the
//! accessors here exist so those loops can register every sibling endpoint in
//! a single `Select` rather than dedicating a thread per worker.
//!
//! An endpoint tracks how many tasks it has transmitted that have not yet
//! produced a read. When the peer hangs up, that count is exactly the number
//! of pending slots that can never resolve, so the controller can retire them
//! in one step instead of leaking them.

use crate::codec::{self, EXIT_RECORD};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TryRecvError, TrySendError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::Cell;

/// Outcome of a non-blocking write attempt on an endpoint.
pub(crate) enum WriteStatus {
    /// The record was handed to the worker's channel.
    Sent,
    /// The channel is at capacity; the task was not consumed.
    Busy,
    /// The worker is gone. The record is lost.
    Disconnected,
}

/// Outcome of a non-blocking read attempt on an endpoint.
pub(crate) enum ReadStatus<T> {
    /// A record arrived and decoded successfully.
    Value(T),
    /// A record arrived but failed to decode. One in-flight task is resolved
    /// without a result.
    NoData,
    /// Nothing is buffered; the worker is still live.
    NotReady,
    /// The worker hung up and every buffered record has been drained. Carries
    /// the number of in-flight tasks that can no longer resolve. The endpoint
    /// is dead from this point on.
    Hangup(usize),
}

/// The controller's side of one worker's channel pair.
pub(crate) struct Endpoint {
    task_tx: Sender<String>,
    result_rx: Receiver<String>,
    in_flight: Cell<usize>,
    dead: Cell<bool>,
}

/// The worker's side of the pair, moved into the worker on spawn.
pub(crate) struct WorkerChannel {
    pub(crate) task_rx: Receiver<String>,
    pub(crate) result_tx: Sender<String>,
}

impl Endpoint {
    /// Creates a connected endpoint/worker-channel pair.
    pub(crate) fn pair() -> (Endpoint, WorkerChannel) {
        let (task_tx, task_rx) = bounded(1);
        let (result_tx, result_rx) = unbounded();
        (
            Endpoint {
                task_tx,
                result_rx,
                in_flight: Cell::new(0),
                dead: Cell::new(false),
            },
            WorkerChannel { task_rx, result_tx },
        )
    }

    /// The sender to register for write-readiness in a `Select`.
    pub(crate) fn tasks(&self) -> &Sender<String> {
        &self.task_tx
    }

    /// The receiver to register for read-readiness in a `Select`.
    pub(crate) fn results(&self) -> &Receiver<String> {
        &self.result_rx
    }

    /// Whether the peer has hung up. A dead endpoint never becomes live again
    /// and should be dropped by its owner.
    pub(crate) fn is_dead(&self) -> bool {
        self.dead.get()
    }

    /// Attempts to write one value without blocking. Encoding failure is
    /// reported as `Disconnected`: either way the task cannot reach the
    /// worker and is lost.
    pub(crate) fn try_write<T: Serialize>(&self, value: &T) -> WriteStatus {
        let record = match codec::encode(value) {
            Ok(record) => record,
            Err(_) => return WriteStatus::Disconnected,
        };
        match self.task_tx.try_send(record) {
            Ok(()) => {
                self.in_flight.set(self.in_flight.get() + 1);
                WriteStatus::Sent
            }
            Err(TrySendError::Full(_)) => WriteStatus::Busy,
            Err(TrySendError::Disconnected(_)) => WriteStatus::Disconnected,
        }
    }

    /// Attempts to read one value without blocking. Buffered records are
    /// delivered before a hangup is reported, so no completed result is lost
    /// when a worker exits.
    pub(crate) fn try_read<T: DeserializeOwned>(&self) -> ReadStatus<T> {
        match self.result_rx.try_recv() {
            Ok(record) => {
                self.in_flight.set(self.in_flight.get().saturating_sub(1));
                match codec::decode(&record) {
                    Some(value) => ReadStatus::Value(value),
                    None => ReadStatus::NoData,
                }
            }
            Err(TryRecvError::Empty) => ReadStatus::NotReady,
            Err(TryRecvError::Disconnected) => {
                self.dead.set(true);
                ReadStatus::Hangup(self.in_flight.replace(0))
            }
        }
    }

    /// Asks the worker to exit by writing the empty sentinel record. Best
    /// effort: a full or closed channel means the worker is either busy (and
    /// will see the closed channel once this endpoint drops) or already gone.
    pub(crate) fn request_exit(&self) {
        let _ = self.task_tx.try_send(EXIT_RECORD.to_owned());
    }
}
