//! Datagram channel for MGCP messages.
//!
//! The channel is the boundary between the network and the control plane: it
//! binds a UDP socket, decodes every received datagram into an
//! [`mgcp_messages::MgcpMessage`] and publishes it to its observers tagged
//! [`Incoming`](mgcp_messages::MessageDirection::Incoming), and encodes and
//! transmits messages handed to [`MessageChannel::send`]. Transmission is
//! fire-and-forget from the caller's perspective; a send failure is reported
//! but never retried here.

pub mod channel;
pub mod error;

pub use channel::{MessageChannel, UdpChannel};
pub use error::{Error, Result};
