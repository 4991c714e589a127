//! Worker spawning and the worker-side read/apply/write loop.

use crate::channel::{Endpoint, WorkerChannel};
use crate::codec::{self, EXIT_RECORD};
use crate::procedure::Procedure;
use std::fmt;
use std::thread::{Builder, JoinHandle};

/// Identifies one worker within its pool, assigned in spawn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(pub(crate) usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// The OS could not create a new worker.
#[derive(thiserror::Error, Debug)]
#[error("failed to spawn worker thread")]
pub struct SpawnError(#[from] std::io::Error);

/// The controller's record of one live worker: its id, its side of the
/// channel pair, and the join handle, which is retained but never joined
/// (teardown is best effort).
pub(crate) struct WorkerHandle {
    pub(crate) id: WorkerId,
    pub(crate) endpoint: Endpoint,
    pub(crate) _join: JoinHandle<()>,
}

/// Spawns one worker running `procedure` in a loop and returns the
/// controller-side handle.
pub(crate) fn spawn<P: Procedure>(id: WorkerId, procedure: P) -> Result<WorkerHandle, SpawnError> {
    let (endpoint, channel) = Endpoint::pair();
    let join = Builder::new()
        .name(id.to_string())
        .spawn(move || run(procedure, channel))?;
    tracing::debug!(worker = %id, "spawned worker");
    Ok(WorkerHandle {
        id,
        endpoint,
        _join: join,
    })
}

/// The worker loop: read one task, apply the procedure, write one result,
/// repeat. A closed channel, the exit sentinel, and an undecodable record all
/// end the loop; a failed write is never retried. An output that cannot be
/// encoded is replaced by the empty record so the controller still observes
/// one read for the task.
fn run<P: Procedure>(mut procedure: P, channel: WorkerChannel) {
    loop {
        let record = match channel.task_rx.recv() {
            Ok(record) => record,
            Err(_) => break,
        };
        let Some(input) = codec::decode::<P::Input>(&record) else {
            break;
        };
        let output = procedure.apply(input);
        let reply = codec::encode(&output).unwrap_or_else(|_| EXIT_RECORD.to_owned());
        if channel.result_tx.send(reply).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{spawn, WorkerId};
    use crate::channel::{ReadStatus, WriteStatus};
    use crate::procedure::Call;
    use std::time::Duration;

    fn recv_value(handle: &super::WorkerHandle) -> Option<u32> {
        // readiness-poll a single endpoint with a generous deadline
        for _ in 0..100 {
            match handle.endpoint.try_read::<u32>() {
                ReadStatus::Value(value) => return Some(value),
                ReadStatus::NoData | ReadStatus::Hangup(_) => return None,
                ReadStatus::NotReady => std::thread::sleep(Duration::from_millis(10)),
            }
        }
        None
    }

    #[test]
    fn test_round_trip() {
        let handle = spawn(WorkerId(0), Call::from(|x: u32| x + 1)).unwrap();
        assert!(matches!(handle.endpoint.try_write(&41u32), WriteStatus::Sent));
        assert_eq!(recv_value(&handle), Some(42));
    }

    #[test]
    fn test_exit_sentinel_stops_worker() {
        let handle = spawn(WorkerId(0), Call::from(|x: u32| x)).unwrap();
        handle.endpoint.request_exit();
        // once the worker exits its result sender drops, which reads as a hangup
        assert_eq!(recv_value(&handle), None);
    }

    #[test]
    fn test_undecodable_task_stops_worker() {
        let handle = spawn(WorkerId(0), Call::from(|x: u32| x)).unwrap();
        assert!(matches!(
            handle.endpoint.try_write(&"not a number"),
            WriteStatus::Sent
        ));
        assert_eq!(recv_value(&handle), None);
    }
}
