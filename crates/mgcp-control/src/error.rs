use thiserror::Error;

/// Result type for controller lifecycle operations
pub type Result<T> = std::result::Result<T, ControllerError>;

/// Failures surfaced by the controller's lifecycle surface.
///
/// Protocol-level anomalies (duplicate transactions, unmatched responses,
/// failed sends) are handled inside the dispatch and never appear here; only
/// lifecycle misuse and channel setup failures propagate to the caller.
#[derive(Error, Debug)]
pub enum ControllerError {
    /// `activate` was called on an active controller.
    #[error("controller is already active")]
    AlreadyActive,

    /// `deactivate` was called on an inactive controller.
    #[error("controller is already inactive")]
    AlreadyInactive,

    /// The channel could not be opened or bound.
    #[error(transparent)]
    Channel(#[from] mgcp_transport::Error),
}
