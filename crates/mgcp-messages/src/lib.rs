//! MGCP message model and message-passing primitives.
//!
//! This crate holds everything the rest of the stack agrees on when it talks
//! about an MGCP message:
//!
//! - [`MgcpMessage`] and its two variants, [`MgcpRequest`] and
//!   [`MgcpResponse`], immutable once constructed. Addressing is never stored
//!   in the message; it travels alongside it in observer notifications and
//!   send calls.
//! - [`MessageDirection`], which tags a message at the moment it is observed
//!   crossing the wire. It describes the traversal, not the content.
//! - [`ResponseCode`], the well-known RFC 3435 status codes the control plane
//!   produces.
//! - The [`codec`] module, the line-oriented wire form used at the channel
//!   boundary.
//! - The [`subject`] module, the publish-subscribe contract every message
//!   publisher (channel, transaction manager, endpoint manager) exposes.

pub mod codec;
pub mod message;
pub mod subject;

pub use codec::CodecError;
pub use message::{
    MessageDirection, MgcpMessage, MgcpRequest, MgcpResponse, MgcpVerb, ResponseCode, UnknownVerb,
};
pub use subject::{MessageBus, MgcpMessageObserver, MgcpMessageSubject};
