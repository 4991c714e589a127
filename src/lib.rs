//! A [`Pool`] is a bounded set of workers that execute a single procedure on
//! pushed values and hand results back in arrival order.
//!
//! The [`Procedure`] trait defines the function run inside each worker; the
//! [`Call`] wrapper adapts plain closures. Every value crossing a worker
//! boundary travels as a serialized, newline-terminated record, so a
//! procedure's input and output types must be serde-serializable in both
//! directions. The workers share no memory with the pool.
//!
//! The pool is driven from the calling thread by two polling steps: a
//! *flush* that writes queued tasks to write-ready workers, and a *fill*
//! that reads completed results from read-ready workers, both multiplexed
//! over every worker channel with one [`crossbeam_channel::Select`]. The
//! calling thread blocks only inside those readiness waits, bounded by the
//! pool's timeout.
//!
//! # Examples
//!
//! ```
//! use underpool::{Call, Pool};
//! use std::time::Duration;
//!
//! let mut pool = Pool::new(
//!     Call::from(|x: i64| x * x),
//!     2,
//!     Some(Duration::from_secs(5)),
//! )
//! .unwrap();
//!
//! pool.push_all(1..=4);
//!
//! let mut results = Vec::new();
//! while results.len() < 4 {
//!     results.extend(pool.pull());
//! }
//! results.sort_unstable();
//! assert_eq!(results, vec![1, 4, 9, 16]);
//! ```
//!
//! Results arrive in the order workers finish them, not submission order.
//! Delivery is best effort: a task in flight on a worker that dies is lost
//! and observable only through [`Pool::pending`]. See the [`Pool`] docs for
//! the exact failure semantics.

mod channel;
mod codec;
mod pool;
mod procedure;
mod worker;

pub use pool::Pool;
pub use procedure::{Call, Procedure};
pub use worker::{SpawnError, WorkerId};
