use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Result type for MGCP channel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for MGCP channel operations
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to bind to the specified address
    #[error("failed to bind to {0}: {1}")]
    BindFailed(SocketAddr, io::Error),

    /// Failed to send a message to the specified address
    #[error("failed to send message to {0}: {1}")]
    SendFailed(SocketAddr, io::Error),

    /// Failed to read the local address
    #[error("failed to read local address: {0}")]
    LocalAddrFailed(io::Error),

    /// Channel is not open
    #[error("channel is not open")]
    NotOpen,

    /// Channel is already open
    #[error("channel is already open")]
    AlreadyOpen,

    /// Channel is already bound
    #[error("channel is already bound")]
    AlreadyBound,
}

impl Error {
    /// Returns true when the error is a lifecycle misuse rather than an I/O
    /// failure.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Error::NotOpen | Error::AlreadyOpen | Error::AlreadyBound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_errors_are_categorized() {
        assert!(Error::NotOpen.is_lifecycle());
        assert!(Error::AlreadyBound.is_lifecycle());
        let addr = SocketAddr::from(([127, 0, 0, 1], 2427));
        let io = io::Error::new(io::ErrorKind::AddrInUse, "in use");
        assert!(!Error::BindFailed(addr, io).is_lifecycle());
    }
}
