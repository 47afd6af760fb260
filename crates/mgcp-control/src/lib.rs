//! MGCP control plane.
//!
//! This crate is the message-routing and transaction-lifecycle engine of the
//! stack. For every message crossing the wire in either direction it decides
//! whether it opens a new transaction, duplicates a pending one, answers a
//! pending one, or matches nothing at all, and it guarantees at most one
//! command execution per transaction id under duplicate and out-of-order
//! network traffic.
//!
//! The pieces:
//!
//! - [`MgcpTransactionManager`]: the registry of in-flight transactions and
//!   their `absent → pending → completed → evicted` lifecycle.
//! - [`MgcpCommand`] / [`MgcpCommandProvider`]: the boundary to the
//!   protocol-verb handlers. The provider is a pure factory; a command is
//!   executed at most once, bound to exactly one transaction.
//! - [`MgcpEndpointManager`]: the publication point through which the
//!   endpoint layer hands outgoing requests to the controller.
//! - [`MgcpController`]: the orchestrator that wires itself as an observer of
//!   the channel, the transaction manager and the endpoint manager, and
//!   implements the direction-based dispatch.

pub mod command;
pub mod controller;
pub mod endpoint;
pub mod error;
pub mod transaction;

pub use command::{CommandResult, MgcpCommand, MgcpCommandProvider};
pub use controller::MgcpController;
pub use endpoint::MgcpEndpointManager;
pub use error::{ControllerError, Result};
pub use transaction::{
    MgcpTransactionManager, RequestOutcome, ResponseOutcome, TransactionConfig,
};
