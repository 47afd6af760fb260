//! # MGCP Transaction Lifecycle
//!
//! A transaction correlates one request with its eventual response, keyed by
//! the 32-bit transaction id both carry. Per id, the lifecycle is strictly
//! ordered and mutually exclusive:
//!
//! ```text
//!               request seen               response seen
//!    +--------+ ------------> +---------+ --------------> +-----------+
//!    | absent |               | pending |                 | completed |
//!    +--------+               +---------+                 +-----------+
//!         ^                        |                            |
//!         |                        | duplicate request          | retention
//!         |                        v                            | elapsed
//!         |                  (not re-executed;                  v
//!         |                   provisional answer)          +---------+
//!         +----------------------------------------------- | evicted |
//!                                                           +---------+
//! ```
//!
//! Completed records are retained for a configurable window so a
//! retransmitted request can be answered deterministically with the stored
//! response, then reaped. The absent→pending transition is an atomic
//! compare-and-insert on the registry: two concurrent "first" requests for
//! the same id can never both observe absent.
//!
//! Expected protocol conditions are not errors here. The manager hands the
//! dispatch an outcome enum ([`RequestOutcome`], [`ResponseOutcome`]) and the
//! controller matches on it exhaustively.

pub mod manager;

pub use manager::MgcpTransactionManager;

use std::time::Duration;

use mgcp_messages::MgcpResponse;

/// Tuning for transaction retention and reaping.
#[derive(Debug, Clone, Copy)]
pub struct TransactionConfig {
    /// How long a completed transaction is retained to answer
    /// retransmissions before it is evicted.
    pub retention: Duration,
    /// How often the reaper sweeps for evictable records.
    pub reap_interval: Duration,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        TransactionConfig {
            retention: Duration::from_secs(30),
            reap_interval: Duration::from_secs(5),
        }
    }
}

/// Outcome of routing a request through the transaction manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The id was absent; a pending transaction now exists and, for incoming
    /// requests, its command is executing.
    Started,
    /// The id is already pending. The request must not be re-executed; an
    /// incoming duplicate is answered with a provisional response.
    Duplicate,
    /// The id completed recently. The stored response makes the reply to a
    /// retransmission deterministic.
    AlreadyCompleted(MgcpResponse),
}

/// Outcome of routing a response through the transaction manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// A pending transaction was transitioned to completed.
    Completed,
    /// No pending transaction carries this id; the response cannot be
    /// attributed and is dropped by the dispatch.
    NotFound,
}
